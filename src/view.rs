use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::Path;
use url::Url;

use crate::classify;
use crate::history::ResourceRecord;

#[derive(Debug, Clone, Default)]
pub struct ListView {
    pub active_domain: Option<String>,
    pub same_domain_only: bool,
}

impl ListView {
    pub fn new(active_domain: Option<String>, same_domain_only: bool) -> Self {
        // Url::host_str is always lower-case
        ListView {
            active_domain: active_domain.map(|d| d.to_ascii_lowercase()),
            same_domain_only,
        }
    }

    /// Records passing the domain filter, oldest first.
    pub fn filtered<'a>(&self, records: &'a [ResourceRecord]) -> Vec<&'a ResourceRecord> {
        records
            .iter()
            .filter(|record| !self.same_domain_only || self.is_same_domain(&record.url))
            .collect()
    }

    fn is_same_domain(&self, url: &str) -> bool {
        let Some(domain) = self.active_domain.as_deref() else {
            return false;
        };
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|host| host == domain))
            .unwrap_or(false)
    }

    pub fn render(&self, records: &[ResourceRecord], writer: &mut dyn Write) -> Result<()> {
        let visible = self.filtered(records);
        if visible.is_empty() {
            writeln!(writer, "No media or subtitle requests detected.")?;
            return Ok(());
        }

        for record in visible.into_iter().rev() {
            writeln!(writer, "{}", record.url)?;
            writeln!(writer, "    {}", meta_line(record))?;
        }
        Ok(())
    }

    pub fn export_text(&self, records: &[ResourceRecord]) -> String {
        self.filtered(records)
            .iter()
            .map(|record| record.url.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn export_filename(&self) -> String {
        let domain = self
            .active_domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("tab");
        format!("media_subtitles_{domain}.txt")
    }

    pub fn export_to(&self, records: &[ResourceRecord], path: &Path) -> Result<usize> {
        let text = self.export_text(records);
        fs::write(path, &text).with_context(|| format!("Writing export to {}", path.display()))?;
        Ok(self.filtered(records).len())
    }
}

fn meta_line(record: &ResourceRecord) -> String {
    // flags don't matter here: anything stored already passed the classifier
    let kind = classify::kind(&record.url, Some(record.content_type.as_str()), true, true)
        .map(|k| k.label())
        .unwrap_or("req");
    let content_type = if record.content_type.is_empty() {
        "unknown"
    } else {
        record.content_type.as_str()
    };

    format!(
        "{kind} • {} • {content_type} • {} • {} • {}",
        record.kind.label(),
        record.method,
        record.status,
        record.observed_at.with_timezone(&Local).format("%H:%M:%S"),
    )
}
