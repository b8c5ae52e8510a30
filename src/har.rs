use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use url::Url;

use crate::events::{Header, NetworkEvent, RequestKind};

#[derive(Debug, Deserialize)]
struct HarFile {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    #[serde(default)]
    pages: Vec<HarPage>,
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarPage {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
    response: HarResponse,
    #[serde(default, rename = "_resourceType")]
    resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    #[serde(default)]
    method: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct HarResponse {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug)]
pub struct Capture {
    pub page_host: Option<String>,
    pub events: Vec<NetworkEvent>,
}

pub fn load_capture(path: &Path, tab_id: i64) -> Result<Capture> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Reading HAR file {}", path.display()))?;
    parse_capture(&body, tab_id).with_context(|| format!("Parsing HAR file {}", path.display()))
}

pub fn parse_capture(body: &str, tab_id: i64) -> Result<Capture> {
    let har: HarFile = serde_json::from_str(body)?;

    // Chrome stores the page URL as the page title
    let page_host = har
        .log
        .pages
        .iter()
        .find_map(|page| host_of(&page.title))
        .or_else(|| har.log.entries.first().and_then(|e| host_of(&e.request.url)));

    let total = har.log.entries.len();
    let events: Vec<NetworkEvent> = har
        .log
        .entries
        .into_iter()
        .filter_map(|entry| {
            let raw_kind = entry.resource_type.as_deref().unwrap_or("other");
            let Some(kind) = RequestKind::from_resource_type(raw_kind) else {
                debug!("Skipping {raw_kind} request {}", entry.request.url);
                return None;
            };
            Some(NetworkEvent {
                url: entry.request.url,
                method: if entry.request.method.is_empty() {
                    "GET".into()
                } else {
                    entry.request.method
                },
                status_code: entry.response.status,
                tab_id,
                kind,
                response_headers: entry.response.headers,
            })
        })
        .collect();

    debug!("Loaded {} of {total} HAR entries", events.len());
    Ok(Capture { page_host, events })
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok()?.host_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Preferences;
    use crate::sniffer::Sniffer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CAPTURE: &str = r#"{
        "log": {
            "version": "1.2",
            "pages": [ { "id": "page_1", "title": "https://www.example.com/watch/42" } ],
            "entries": [
                {
                    "_resourceType": "document",
                    "request": { "method": "GET", "url": "https://www.example.com/watch/42", "headers": [] },
                    "response": { "status": 200, "headers": [ { "name": "Content-Type", "value": "text/html" } ] }
                },
                {
                    "_resourceType": "script",
                    "request": { "method": "GET", "url": "https://www.example.com/player.js", "headers": [] },
                    "response": { "status": 200, "headers": [] }
                },
                {
                    "_resourceType": "xhr",
                    "request": { "method": "GET", "url": "https://cdn.example.net/vod/master.m3u8?sig=1", "headers": [] },
                    "response": { "status": 200, "headers": [ { "name": "content-type", "value": "application/vnd.apple.mpegurl" } ] }
                },
                {
                    "request": { "url": "https://cdn.example.net/vod/en.vtt" },
                    "response": { "status": 304 }
                }
            ]
        }
    }"#;

    #[test]
    fn entries_become_events_for_tab() {
        let capture = parse_capture(CAPTURE, 12).unwrap();

        assert_eq!(capture.page_host.as_deref(), Some("www.example.com"));
        let urls: Vec<_> = capture.events.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://www.example.com/watch/42",
                "https://cdn.example.net/vod/master.m3u8?sig=1",
                "https://cdn.example.net/vod/en.vtt",
            ]
        );
        assert!(capture.events.iter().all(|e| e.tab_id == 12));

        let manifest = &capture.events[1];
        assert_eq!(manifest.kind, RequestKind::XmlHttpRequest);
        assert_eq!(manifest.content_type(), Some("application/vnd.apple.mpegurl"));

        let subtitle = &capture.events[2];
        assert_eq!(subtitle.kind, RequestKind::Other);
        assert_eq!(subtitle.method, "GET");
        assert_eq!(subtitle.status_code, 304);
    }

    #[test]
    fn page_host_falls_back_to_first_entry() {
        let har = r#"{"log":{"entries":[
            {"request":{"url":"https://media.example.org/a.mpd"},"response":{"status":200}}
        ]}}"#;
        let capture = parse_capture(har, 0).unwrap();
        assert_eq!(capture.page_host.as_deref(), Some("media.example.org"));
    }

    #[test]
    fn texttrack_subtitles_are_recorded() {
        let har = r#"{"log":{"entries":[
            {
                "_resourceType": "texttrack",
                "request": { "method": "GET", "url": "https://cdn.example.net/subs/en.vtt" },
                "response": { "status": 200, "headers": [ { "name": "Content-Type", "value": "text/vtt" } ] }
            }
        ]}}"#;
        let capture = parse_capture(har, 5).unwrap();
        assert_eq!(capture.events.len(), 1);
        assert_eq!(capture.events[0].kind, RequestKind::Other);

        let mut sniffer = Sniffer::new(Preferences::default());
        for event in &capture.events {
            sniffer.on_completed(event);
        }
        let listed: Vec<_> = sniffer.list(5).into_iter().map(|r| r.url).collect();
        assert_eq!(listed, ["https://cdn.example.net/subs/en.vtt"]);
    }

    #[test]
    fn load_reports_invalid_json() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"{\"log\": ").unwrap();
        f.flush().unwrap();

        let err = load_capture(f.path(), 0).unwrap_err();
        assert!(format!("{err:#}").contains("Parsing HAR file"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(CAPTURE.as_bytes()).unwrap();
        f.flush().unwrap();

        let capture = load_capture(f.path(), 1).unwrap();
        assert_eq!(capture.events.len(), 3);
    }
}
