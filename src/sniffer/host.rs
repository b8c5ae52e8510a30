use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use super::Sniffer;
use crate::events::{RawEvent, no_tab, tab_id_or_none};
use crate::history::{HistoryUpdate, ResourceRecord};
use crate::prefs::{PreferenceSource, Preferences};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Completed(RawEvent),
    GetList {
        #[serde(rename = "tabId", default = "no_tab", deserialize_with = "tab_id_or_none")]
        tab_id: i64,
    },
    ClearList {
        #[serde(rename = "tabId", default = "no_tab", deserialize_with = "tab_id_or_none")]
        tab_id: i64,
    },
    TabRemoved {
        #[serde(rename = "tabId", default = "no_tab", deserialize_with = "tab_id_or_none")]
        tab_id: i64,
    },
    GetPrefs,
    SetPrefs(PrefsUpdate),
}

// an absent flag switches the feature off, unlike the stored file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefsUpdate {
    pub include_segments: bool,
    pub include_subtitles: bool,
}

impl From<PrefsUpdate> for Preferences {
    fn from(update: PrefsUpdate) -> Self {
        Preferences {
            include_segments: update.include_segments,
            include_subtitles: update.include_subtitles,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Update {
        #[serde(rename = "tabId")]
        tab_id: i64,
        entry: ResourceRecord,
    },
    List {
        #[serde(rename = "tabId")]
        tab_id: i64,
        list: Vec<ResourceRecord>,
    },
    Prefs(Preferences),
    Ok,
    Error {
        message: String,
    },
}

impl<P: PreferenceSource> Sniffer<P> {
    pub fn handle(&mut self, request: Request) -> Option<Reply> {
        match request {
            Request::Completed(raw) => {
                if let Some(event) = raw.into_event() {
                    self.on_completed(&event);
                }
                None
            }
            Request::GetList { tab_id } => Some(Reply::List {
                tab_id,
                list: self.list(tab_id),
            }),
            Request::ClearList { tab_id } => {
                self.clear(tab_id);
                Some(Reply::Ok)
            }
            Request::TabRemoved { tab_id } => {
                self.on_tab_removed(tab_id);
                Some(Reply::Ok)
            }
            Request::GetPrefs => Some(Reply::Prefs(self.preferences())),
            Request::SetPrefs(update) => match self.set_preferences(update.into()) {
                Ok(()) => Some(Reply::Ok),
                Err(err) => Some(Reply::Error {
                    message: format!("{err:#}"),
                }),
            },
        }
    }
}

pub fn serve<P: PreferenceSource>(
    sniffer: &mut Sniffer<P>,
    input: impl BufRead,
    output: &mut dyn Write,
) -> Result<()> {
    let updates = sniffer.subscribe();
    let mut handled = 0u64;

    for line in input.lines() {
        let line = line.context("Reading request from input failed")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!("Handling {request:?}");
                sniffer.handle(request)
            }
            Err(err) => {
                warn!("Ignoring malformed request: {err}");
                Some(Reply::Error {
                    message: err.to_string(),
                })
            }
        };
        handled += 1;

        forward_updates(&updates, output)?;
        if let Some(reply) = reply {
            write_reply(output, &reply)?;
        }
    }

    info!("Input closed after {handled} message(s)");
    Ok(())
}

fn forward_updates(updates: &Receiver<HistoryUpdate>, output: &mut dyn Write) -> Result<()> {
    for update in updates.try_iter() {
        match update {
            HistoryUpdate::Appended { tab_id, record } => write_reply(
                output,
                &Reply::Update {
                    tab_id,
                    entry: record,
                },
            )?,
            HistoryUpdate::Cleared { tab_id } => debug!("Tab {tab_id} cleared"),
            HistoryUpdate::Removed { tab_id } => debug!("Tab {tab_id} closed, history dropped"),
        }
    }
    Ok(())
}

fn write_reply(output: &mut dyn Write, reply: &Reply) -> Result<()> {
    serde_json::to_writer(&mut *output, reply).context("Encoding reply failed")?;
    output.write_all(b"\n").context("Writing reply failed")?;
    output.flush().ok();
    Ok(())
}
