// ABOUTME: Format normalization: turns platform-native descriptors into canonical FormatRecords.
// ABOUTME: Handles MIME splitting, signature cipher decoding, relative URL resolution, dedup and validity.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Whether a stream carries audio only or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    #[default]
    Video,
}

impl MediaType {
    /// `audio` for the literal `audio` type, `video` for anything else.
    pub fn from_mime_type(top_level: &str) -> Self {
        if top_level.trim().eq_ignore_ascii_case("audio") {
            MediaType::Audio
        } else {
            MediaType::Video
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            other => Err(format!("unknown media type {:?} (expected audio or video)", other)),
        }
    }
}

/// One downloadable stream in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecord {
    /// Resolution token (`720p`) or descriptive tag (`original (no watermark)`).
    pub quality: String,
    pub container: String,
    /// Bare `type/subtype`.
    pub mime_type: String,
    pub media_type: MediaType,
    /// 0 when unknown.
    pub size_bytes: u64,
    pub url: String,
}

/// A platform-native stream description, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub quality: String,
    pub mime_type: String,
    pub url: Option<String>,
    /// Signature-bearing query string (`url=..&sp=..&s=..`) used instead of `url`.
    pub cipher: Option<String>,
    pub content_length: Option<u64>,
}

impl FormatDescriptor {
    /// Descriptor with a direct URL.
    pub fn direct(quality: impl Into<String>, mime_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            mime_type: mime_type.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.content_length = size;
        self
    }
}

/// Split a MIME string into (bare mime, container, media type).
///
/// `video/mp4; codecs="avc1"` gives `("video/mp4", "mp4", Video)`.
pub fn split_mime(mime: &str) -> (String, String, MediaType) {
    let bare = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let (top, sub) = bare.split_once('/').unwrap_or((bare.as_str(), ""));
    (bare.clone(), sub.trim().to_string(), MediaType::from_mime_type(top))
}

/// Guess a MIME type from a locator's file extension.
pub fn guess_mime(url: &str) -> &'static str {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or("").to_lowercase());
    if path.ends_with(".webm") {
        "video/webm"
    } else if path.ends_with(".m3u8") {
        "application/x-mpegurl"
    } else if path.ends_with(".mp3") {
        "audio/mpeg"
    } else if path.ends_with(".m4a") {
        "audio/mp4"
    } else {
        "video/mp4"
    }
}

/// Decode a signature cipher into a usable URL.
///
/// The cipher is itself a query string carrying `url`, `sp` and `s`. When both
/// `s` and `sp` are present, `&{sp}={urlencode(s)}` is appended to the decoded
/// url. Returns an empty string when no url can be recovered.
pub fn decode_cipher(cipher: &str) -> String {
    let mut base = None;
    let mut sp = None;
    let mut s = None;
    for (key, value) in url::form_urlencoded::parse(cipher.trim().as_bytes()) {
        match key.as_ref() {
            "url" if base.is_none() => base = Some(value.into_owned()),
            "sp" if sp.is_none() => sp = Some(value.into_owned()),
            "s" if s.is_none() => s = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(base) = base.filter(|b| !b.trim().is_empty()) else {
        return String::new();
    };
    match (sp, s) {
        (Some(sp), Some(s)) if !sp.is_empty() => {
            format!("{}&{}={}", base, sp, urlencoding::encode(&s))
        }
        _ => base,
    }
}

/// Returns true for non-empty absolute http(s) URLs.
pub fn is_valid_locator(url: &str) -> bool {
    !url.trim().is_empty()
        && Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false)
}

fn locator(desc: &FormatDescriptor, base: Option<&Url>) -> String {
    let raw = match desc.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => url.to_string(),
        None => desc.cipher.as_deref().map(decode_cipher).unwrap_or_default(),
    };
    if raw.is_empty() || Url::parse(&raw).is_ok() {
        return raw;
    }
    base.and_then(|b| b.join(&raw).ok())
        .map(|u| u.to_string())
        .unwrap_or(raw)
}

/// Build a record from a descriptor. The result may still have an invalid url.
pub fn build(desc: &FormatDescriptor, base: Option<&Url>) -> FormatRecord {
    let url = locator(desc, base);
    let mime = if desc.mime_type.trim().is_empty() {
        guess_mime(&url).to_string()
    } else {
        desc.mime_type.clone()
    };
    let (mime_type, container, media_type) = split_mime(&mime);
    FormatRecord {
        quality: desc.quality.trim().to_string(),
        container,
        mime_type,
        media_type,
        size_bytes: desc.content_length.unwrap_or(0),
        url,
    }
}

/// Keep the first record for each url.
pub fn dedupe(records: Vec<FormatRecord>) -> Vec<FormatRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// Drop records whose url is empty or not absolute.
pub fn retain_valid(records: Vec<FormatRecord>) -> Vec<FormatRecord> {
    records
        .into_iter()
        .filter(|r| is_valid_locator(&r.url))
        .collect()
}

/// Descriptors to validated, deduplicated records. Relative urls resolve against `base`.
pub fn normalize(descriptors: &[FormatDescriptor], base: Option<&str>) -> Vec<FormatRecord> {
    let base = base.and_then(|b| Url::parse(b).ok());
    let built = descriptors
        .iter()
        .map(|d| build(d, base.as_ref()))
        .collect();
    dedupe(retain_valid(built))
}
