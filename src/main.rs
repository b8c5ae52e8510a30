mod classify;
mod events;
mod har;
mod history;
mod prefs;
mod sniffer;
mod view;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::prefs::{FilePreferences, PreferenceSource};
use crate::sniffer::{Sniffer, host};
use crate::view::ListView;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Spot streaming manifests, subtitles and media segments in browser traffic"
)]
struct Cli {
    /// Preferences file (defaults to the user config directory)
    #[arg(long, value_name = "FILE", global = true)]
    prefs_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay HAR captures as one tab's traffic and list what was detected
    Scan {
        /// HAR files, replayed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Tab id the captured requests are attributed to
        #[arg(long, default_value_t = 0)]
        tab: i64,

        /// Hostname of the active page (defaults to the capture's page)
        #[arg(long, value_name = "HOST")]
        domain: Option<String>,

        /// Only keep requests to the active hostname
        #[arg(long, action = ArgAction::SetTrue)]
        same_domain: bool,

        /// Print bare URLs, oldest first
        #[arg(long, action = ArgAction::SetTrue)]
        urls_only: bool,

        /// Export the URL list to a text file
        #[arg(short, long, action = ArgAction::SetTrue)]
        export: bool,

        /// Export destination instead of media_subtitles_<domain>.txt
        #[arg(short, long, value_name = "FILE", requires = "export")]
        output: Option<PathBuf>,
    },

    /// Serve newline-delimited JSON messages on stdin/stdout
    Host,

    /// Show or change the stored detection flags
    Prefs {
        /// Count transport segments (.ts, .m4s) as interesting
        #[arg(long, value_name = "BOOL")]
        segments: Option<bool>,

        /// Count subtitle files (.vtt, .srt, .ttml, .dfxp) as interesting
        #[arg(long, value_name = "BOOL")]
        subtitles: Option<bool>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("RUST_LOG", "info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let prefs = match cli.prefs_file {
        Some(path) => FilePreferences::new(path),
        None => FilePreferences::at_default_location(),
    };

    match cli.command {
        Command::Scan {
            files,
            tab,
            domain,
            same_domain,
            urls_only,
            export,
            output,
        } => run_scan(
            prefs,
            &files,
            tab,
            domain,
            same_domain,
            urls_only,
            export.then_some(output),
        ),
        Command::Host => {
            let mut sniffer = Sniffer::new(prefs);
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            host::serve(&mut sniffer, stdin.lock(), &mut stdout)
        }
        Command::Prefs {
            segments,
            subtitles,
        } => run_prefs(prefs, segments, subtitles),
    }
}

fn run_scan(
    prefs: FilePreferences,
    files: &[PathBuf],
    tab: i64,
    domain: Option<String>,
    same_domain: bool,
    urls_only: bool,
    export: Option<Option<PathBuf>>,
) -> Result<()> {
    let flags = prefs.snapshot();
    info!(
        "Segments {}, subtitles {}",
        if flags.include_segments { "on" } else { "off" },
        if flags.include_subtitles { "on" } else { "off" },
    );

    let mut sniffer = Sniffer::new(prefs);
    let mut page_host = None;
    let mut recorded = 0usize;

    for path in files {
        let capture = har::load_capture(path, tab)?;
        page_host = page_host.or(capture.page_host);
        for event in &capture.events {
            if sniffer.on_completed(event).is_some() {
                recorded += 1;
            }
        }
    }
    info!("Recorded {recorded} request(s) for tab {tab}");

    let view = ListView::new(domain.or(page_host), same_domain);
    if same_domain && view.active_domain.is_none() {
        warn!("No active domain known, the same-domain filter hides everything");
    }

    let records = sniffer.list(tab);
    let mut out = BufWriter::new(io::stdout());
    if urls_only {
        let text = view.export_text(&records);
        if !text.is_empty() {
            writeln!(out, "{text}")?;
        }
    } else {
        view.render(&records, &mut out)?;
    }
    out.flush().context("Writing list to stdout failed")?;

    if let Some(output) = export {
        let path = output.unwrap_or_else(|| PathBuf::from(view.export_filename()));
        let written = view.export_to(&records, &path)?;
        info!("Exported {written} URL(s) to {}", path.display());
    }

    Ok(())
}

fn run_prefs(
    mut prefs: FilePreferences,
    segments: Option<bool>,
    subtitles: Option<bool>,
) -> Result<()> {
    let mut flags = prefs.snapshot();
    if segments.is_some() || subtitles.is_some() {
        flags.include_segments = segments.unwrap_or(flags.include_segments);
        flags.include_subtitles = subtitles.unwrap_or(flags.include_subtitles);
        prefs.update(flags)?;
    }

    println!("Preferences ({}):", prefs.path().display());
    println!("- include segments:  {}", flags.include_segments);
    println!("- include subtitles: {}", flags.include_subtitles);
    Ok(())
}
