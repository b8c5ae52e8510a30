use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::Receiver;
use log::debug;

use crate::classify;
use crate::events::NetworkEvent;
use crate::history::{HistoryStore, HistoryUpdate, ResourceRecord};
use crate::prefs::{PreferenceSource, Preferences};

pub mod host;


pub struct Sniffer<P> {
    prefs: P,
    history: HistoryStore,
}

impl<P: PreferenceSource> Sniffer<P> {
    pub fn new(prefs: P) -> Self {
        Sniffer {
            prefs,
            history: HistoryStore::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<HistoryUpdate> {
        self.history.subscribe()
    }

    pub fn on_completed(&mut self, event: &NetworkEvent) -> Option<ResourceRecord> {
        if event.tab_id < 0 {
            return None;
        }

        let prefs = self.prefs.snapshot();
        let content_type = event.content_type();
        if !classify::classify(
            &event.url,
            content_type,
            prefs.include_segments,
            prefs.include_subtitles,
        ) {
            return None;
        }

        let record = ResourceRecord {
            url: event.url.clone(),
            content_type: content_type.unwrap_or_default().to_string(),
            method: event.method.clone(),
            status: event.status_code,
            kind: event.kind,
            observed_at: Utc::now(),
        };

        if !self.history.append(event.tab_id, record.clone()) {
            return None;
        }
        debug!("Recorded for tab {}: {}", event.tab_id, record.url);
        Some(record)
    }

    pub fn on_tab_removed(&mut self, tab_id: i64) {
        self.history.remove(tab_id);
    }

    pub fn list(&self, tab_id: i64) -> Vec<ResourceRecord> {
        self.history.list(tab_id)
    }

    pub fn clear(&mut self, tab_id: i64) {
        self.history.clear(tab_id);
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.snapshot()
    }

    pub fn set_preferences(&mut self, prefs: Preferences) -> Result<()> {
        self.prefs.update(prefs)
    }
}
