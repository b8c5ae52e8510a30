const MANIFEST_SUFFIXES: &[&str] = &[".mpd", ".m3u8"];
const SUBTITLE_SUFFIXES: &[&str] = &[".vtt", ".srt", ".ttml", ".dfxp"];
const SEGMENT_SUFFIXES: &[&str] = &[".ts", ".m4s"];

const SUBTITLE_MIME_HINTS: &[&str] = &["vtt", "subtitle", "ttml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Manifest,
    Subtitle,
    Segment,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Manifest => "manifest",
            MediaKind::Subtitle => "subtitle",
            MediaKind::Segment => "segment",
        }
    }
}

pub fn classify(
    url: &str,
    content_type: Option<&str>,
    include_segments: bool,
    include_subtitles: bool,
) -> bool {
    kind(url, content_type, include_segments, include_subtitles).is_some()
}

pub fn kind(
    url: &str,
    content_type: Option<&str>,
    include_segments: bool,
    include_subtitles: bool,
) -> Option<MediaKind> {
    if url.is_empty() {
        return None;
    }

    let bare = bare_path(url);
    let ends_with_any = |suffixes: &[&str]| suffixes.iter().any(|s| bare.ends_with(s));

    if ends_with_any(MANIFEST_SUFFIXES) {
        return Some(MediaKind::Manifest);
    }
    if include_subtitles && ends_with_any(SUBTITLE_SUFFIXES) {
        return Some(MediaKind::Subtitle);
    }
    if include_segments && ends_with_any(SEGMENT_SUFFIXES) {
        return Some(MediaKind::Segment);
    }

    // servers that hide the extension still tend to send a useful MIME type
    let ct = content_type.unwrap_or_default().to_ascii_lowercase();
    if ct.contains("application/dash+xml") {
        return Some(MediaKind::Manifest);
    }
    if include_subtitles && SUBTITLE_MIME_HINTS.iter().any(|hint| ct.contains(hint)) {
        return Some(MediaKind::Subtitle);
    }
    if include_segments && ct.contains("video/mp2t") {
        return Some(MediaKind::Segment);
    }

    None
}

pub fn bare_path(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    without_query.to_lowercase()
}
