use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

// browser tab id for requests outside any tab (service workers, background pages)
pub const NO_TAB: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    MainFrame,
    SubFrame,
    #[serde(rename = "xmlhttprequest")]
    XmlHttpRequest,
    Media,
    Other,
}

impl RequestKind {
    /// Types the listener never subscribes to (scripts, images, fonts...) map to `None`.
    pub fn from_resource_type(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "main_frame" | "document" => Some(RequestKind::MainFrame),
            "sub_frame" | "iframe" => Some(RequestKind::SubFrame),
            "xmlhttprequest" | "xhr" | "fetch" => Some(RequestKind::XmlHttpRequest),
            "media" => Some(RequestKind::Media),
            // <track> subtitle loads arrive as "other" in the browser
            "other" | "texttrack" | "" => Some(RequestKind::Other),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestKind::MainFrame => "main_frame",
            RequestKind::SubFrame => "sub_frame",
            RequestKind::XmlHttpRequest => "xmlhttprequest",
            RequestKind::Media => "media",
            RequestKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEvent {
    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub tab_id: i64,
    pub kind: RequestKind,
    pub response_headers: Vec<Header>,
}

impl NetworkEvent {
    pub fn content_type(&self) -> Option<&str> {
        header_value(&self.response_headers, "content-type")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default = "no_tab", deserialize_with = "tab_id_or_none")]
    pub tab_id: i64,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub response_headers: Vec<Header>,
}

impl RawEvent {
    pub fn into_event(self) -> Option<NetworkEvent> {
        let raw_kind = self.resource_type.as_deref().unwrap_or("other");
        let Some(kind) = RequestKind::from_resource_type(raw_kind) else {
            debug!("Skipping {raw_kind} request {}", self.url);
            return None;
        };
        Some(NetworkEvent {
            url: self.url,
            method: self.method,
            status_code: self.status_code,
            tab_id: self.tab_id,
            kind,
            response_headers: self.response_headers,
        })
    }
}

pub fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

pub fn tab_id_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64().unwrap_or(NO_TAB))
}

pub fn no_tab() -> i64 {
    NO_TAB
}

fn default_method() -> String {
    "GET".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn content_type_lookup_ignores_header_case() {
        let event = NetworkEvent {
            url: "https://example.com/a".into(),
            method: "GET".into(),
            status_code: 200,
            tab_id: 3,
            kind: RequestKind::XmlHttpRequest,
            response_headers: vec![
                Header {
                    name: "Cache-Control".into(),
                    value: "no-cache".into(),
                },
                Header {
                    name: "CONTENT-TYPE".into(),
                    value: "application/vnd.apple.mpegurl".into(),
                },
            ],
        };

        assert_eq!(event.content_type(), Some("application/vnd.apple.mpegurl"));
    }

    #[test]
    fn missing_fields_take_browser_defaults() {
        let event = raw(r#"{"url":"https://example.com/x.vtt"}"#)
            .into_event()
            .unwrap();

        assert_eq!(event.method, "GET");
        assert_eq!(event.tab_id, NO_TAB);
        assert_eq!(event.kind, RequestKind::Other);
        assert_eq!(event.content_type(), None);
    }

    #[test]
    fn raw_resource_type_goes_through_subscription_filter() {
        let event = raw(r#"{"url":"https://e.com/a.m3u8","tabId":1,"resourceType":"fetch"}"#)
            .into_event()
            .unwrap();
        assert_eq!(event.kind, RequestKind::XmlHttpRequest);

        let script = raw(r#"{"url":"https://e.com/a.m3u8","tabId":1,"resourceType":"script"}"#);
        assert!(script.into_event().is_none());
    }

    #[test]
    fn non_integer_tab_id_means_no_tab() {
        assert_eq!(raw(r#"{"url":"u","tabId":"abc"}"#).tab_id, NO_TAB);
        assert_eq!(raw(r#"{"url":"u","tabId":null}"#).tab_id, NO_TAB);
        assert_eq!(raw(r#"{"url":"u","tabId":12}"#).tab_id, 12);
    }

    #[test]
    fn resource_types_outside_subscription_are_dropped() {
        assert_eq!(
            RequestKind::from_resource_type("XHR"),
            Some(RequestKind::XmlHttpRequest)
        );
        assert_eq!(
            RequestKind::from_resource_type("document"),
            Some(RequestKind::MainFrame)
        );
        assert_eq!(
            RequestKind::from_resource_type("texttrack"),
            Some(RequestKind::Other)
        );
        assert_eq!(RequestKind::from_resource_type("script"), None);
        assert_eq!(RequestKind::from_resource_type("image"), None);
    }

    #[test]
    fn wire_names_match_browser_types() {
        let kind: RequestKind = serde_json::from_str(r#""xmlhttprequest""#).unwrap();
        assert_eq!(kind, RequestKind::XmlHttpRequest);
        assert_eq!(
            serde_json::to_string(&RequestKind::SubFrame).unwrap(),
            r#""sub_frame""#
        );
    }
}
