use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub include_segments: bool,
    pub include_subtitles: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            include_segments: true,
            include_subtitles: true,
        }
    }
}

pub trait PreferenceSource {
    fn snapshot(&self) -> Preferences;
    fn update(&mut self, prefs: Preferences) -> Result<()>;
}

impl PreferenceSource for Preferences {
    fn snapshot(&self) -> Preferences {
        *self
    }

    fn update(&mut self, prefs: Preferences) -> Result<()> {
        *self = prefs;
        Ok(())
    }
}

pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: PathBuf) -> Self {
        FilePreferences { path }
    }

    pub fn at_default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("media-sniffer")
            .join("prefs.json");
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceSource for FilePreferences {
    fn snapshot(&self) -> Preferences {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("Using default preferences ({}: {err})", self.path.display());
                return Preferences::default();
            }
        };

        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            debug!("Ignoring unreadable preferences file {}: {err}", self.path.display());
            Preferences::default()
        })
    }

    fn update(&mut self, prefs: Preferences) -> Result<()> {
        persist(&self.path, &prefs)
            .with_context(|| format!("Saving preferences to {}", self.path.display()))?;
        info!(
            "Preferences saved (segments: {}, subtitles: {})",
            prefs.include_segments, prefs.include_subtitles
        );
        Ok(())
    }
}

fn persist(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(prefs)?)?;
    fs::rename(tmp, path)?;
    Ok(())
}
