use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::events::RequestKind;

pub const HISTORY_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub url: String,
    pub content_type: String,
    pub method: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryUpdate {
    Appended { tab_id: i64, record: ResourceRecord },
    Cleared { tab_id: i64 },
    Removed { tab_id: i64 },
}

/// Per-tab records, oldest first. Only a repeat of the tab's latest url is dropped.
#[derive(Debug, Default)]
pub struct HistoryStore {
    tabs: HashMap<i64, VecDeque<ResourceRecord>>,
    subscribers: Vec<Sender<HistoryUpdate>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<HistoryUpdate> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn append(&mut self, tab_id: i64, record: ResourceRecord) -> bool {
        if tab_id < 0 {
            debug!("Ignoring record for tab {tab_id}: {}", record.url);
            return false;
        }

        let entries = self.tabs.entry(tab_id).or_default();
        if entries.back().is_some_and(|last| last.url == record.url) {
            debug!("Skipping repeated url for tab {tab_id}: {}", record.url);
            return false;
        }

        entries.push_back(record.clone());
        while entries.len() > HISTORY_CAP {
            entries.pop_front();
        }

        self.publish(HistoryUpdate::Appended { tab_id, record });
        true
    }

    pub fn list(&self, tab_id: i64) -> Vec<ResourceRecord> {
        self.tabs
            .get(&tab_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self, tab_id: i64) {
        if let Some(entries) = self.tabs.get_mut(&tab_id) {
            entries.clear();
            self.publish(HistoryUpdate::Cleared { tab_id });
        }
    }

    pub fn remove(&mut self, tab_id: i64) {
        if self.tabs.remove(&tab_id).is_some() {
            self.publish(HistoryUpdate::Removed { tab_id });
        }
    }

    #[cfg(test)]
    pub fn contains_tab(&self, tab_id: i64) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    fn publish(&mut self, update: HistoryUpdate) {
        // a send only fails once the receiver is gone; forget that subscriber
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }
}
