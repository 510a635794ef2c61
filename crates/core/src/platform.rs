// ABOUTME: Platform detection that classifies a page URL into a Platform by host and path patterns.
// ABOUTME: Also extracts platform video ids and builds canonical page URLs; pure functions, no I/O.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A supported video-hosting platform, or `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Unknown,
    YouTube,
    TikTok,
    Instagram,
    Facebook,
}

/// How the "highest" quality request orders a platform's formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Leading integer of the quality label, descending.
    Resolution,
    /// No-watermark variants first, then size descending.
    WatermarkFirst,
}

const SUPPORTED: &[Platform] = &[
    Platform::YouTube,
    Platform::TikTok,
    Platform::Instagram,
    Platform::Facebook,
];

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)|youtube-nocookie\.com/embed/|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("Invalid youtube regex")
});

static TIKTOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m)\.)?tiktok\.com/(?:@[\w.-]+/video/(\d+)|v/(\d+)|t/[\w-]+)",
    )
    .expect("Invalid tiktok regex")
});

static TIKTOK_CREATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:(?:www|m)\.)?tiktok\.com/(@[\w.-]+)/video/(\d+)")
        .expect("Invalid tiktok creator regex")
});

static TIKTOK_SHORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:vm|vt)\.tiktok\.com/[\w-]+").expect("Invalid tiktok short regex")
});

static INSTAGRAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:www\.)?instagram\.com/(?:[\w.]+/)?(?:p|reels?|tv)/([\w-]+)")
        .expect("Invalid instagram regex")
});

static FACEBOOK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:(?:www|m|web)\.)?(?:facebook\.com/(?:[\w.-]+/videos/(?:[\w.-]+/)?(\d+)|watch/?\?(?:[^#]*&)?v=(\d+)|reel/(\d+)|share/[vr]/[\w-]+)|fb\.watch/[\w-]+)",
    )
    .expect("Invalid facebook regex")
});

impl Platform {
    /// Every platform with an extractor, in listing order.
    pub fn supported() -> &'static [Platform] {
        SUPPORTED
    }

    /// Comma separated names of the supported platforms.
    pub fn supported_list() -> String {
        SUPPORTED
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Unknown => "unknown",
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }

    /// Host names recognised for this platform.
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Unknown => &[],
            Platform::YouTube => &[
                "youtube.com",
                "m.youtube.com",
                "music.youtube.com",
                "youtube-nocookie.com",
                "youtu.be",
            ],
            Platform::TikTok => &["tiktok.com", "m.tiktok.com", "vm.tiktok.com", "vt.tiktok.com"],
            Platform::Instagram => &["instagram.com"],
            Platform::Facebook => &["facebook.com", "m.facebook.com", "fb.watch"],
        }
    }

    pub fn ranking(&self) -> Ranking {
        match self {
            Platform::TikTok => Ranking::WatermarkFirst,
            _ => Ranking::Resolution,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Platform::Unknown
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a URL. Unrecognised input maps to `Platform::Unknown`.
pub fn detect(url: &str) -> Platform {
    let url = url.trim();
    if YOUTUBE_RE.is_match(url) {
        Platform::YouTube
    } else if TIKTOK_RE.is_match(url) || TIKTOK_SHORT_RE.is_match(url) {
        Platform::TikTok
    } else if INSTAGRAM_RE.is_match(url) {
        Platform::Instagram
    } else if FACEBOOK_RE.is_match(url) {
        Platform::Facebook
    } else {
        Platform::Unknown
    }
}

/// Returns true for redirecting short links whose target must be resolved first.
pub fn is_short_link(url: &str) -> bool {
    let url = url.trim();
    TIKTOK_SHORT_RE.is_match(url)
        || url.to_lowercase().contains("tiktok.com/t/")
        || url.to_lowercase().contains("fb.watch/")
        || url.to_lowercase().contains("facebook.com/share/")
}

/// Extract the platform's own identifier for the video, if the URL carries one.
pub fn video_id(platform: Platform, url: &str) -> Option<String> {
    let url = url.trim();
    let caps = match platform {
        Platform::YouTube => YOUTUBE_RE.captures(url)?,
        Platform::TikTok => TIKTOK_RE.captures(url)?,
        Platform::Instagram => INSTAGRAM_RE.captures(url)?,
        Platform::Facebook => FACEBOOK_RE.captures(url)?,
        Platform::Unknown => return None,
    };
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map(|m| m.as_str().to_string())
}

/// `https://www.tiktok.com/@handle/video/ID` when the URL names its creator.
pub fn tiktok_creator_url(url: &str) -> Option<String> {
    let caps = TIKTOK_CREATOR_RE.captures(url.trim())?;
    Some(format!("https://www.tiktok.com/{}/video/{}", &caps[1], &caps[2]))
}

/// Canonical page URL for a platform id.
pub fn canonical_url(platform: Platform, id: &str) -> Option<String> {
    match platform {
        Platform::YouTube => Some(format!("https://www.youtube.com/watch?v={}", id)),
        Platform::TikTok => Some(format!("https://www.tiktok.com/@i/video/{}", id)),
        Platform::Instagram => Some(format!("https://www.instagram.com/p/{}/", id)),
        Platform::Facebook => Some(format!("https://www.facebook.com/watch/?v={}", id)),
        Platform::Unknown => None,
    }
}
