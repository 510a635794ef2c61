// ABOUTME: Platform-independent strategies: JSON-LD VideoObject snippets and direct markup (meta tags, video src).
// ABOUTME: Each returns a Candidate of normalized formats resolved against the page URL.

use serde_json::Value;

use crate::error::ExtractError;
use crate::extractors::chain::{clean_text, Candidate};
use crate::extractors::duration::parse_duration_seconds;
use crate::extractors::embedded::parse_json;
use crate::extractors::json::{as_u64_lenient, find_object, matches_type, str_at, url_like};
use crate::extractors::page::Page;
use crate::formats::{guess_mime, normalize, FormatDescriptor};

/// Quality label from a pixel height, or `original` when unknown.
pub fn height_label(height: Option<u64>) -> String {
    match height {
        Some(h) if h > 0 => format!("{}p", h),
        _ => "original".to_string(),
    }
}

fn mime_from_encoding(format: Option<&str>, url: &str) -> String {
    match format.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) if f.contains('/') => f.to_string(),
        Some(f) => format!("video/{}", f.trim_start_matches('.').to_lowercase()),
        None => guess_mime(url).to_string(),
    }
}

fn video_object_candidate(obj: &Value, page: &Page) -> Candidate {
    let mut descriptors = Vec::new();
    if let Some(content) = obj.get("contentUrl").and_then(url_like) {
        let height = obj.get("height").and_then(as_u64_lenient);
        descriptors.push(
            FormatDescriptor::direct(
                height_label(height),
                mime_from_encoding(str_at(obj, "/encodingFormat"), content),
                content,
            )
            .with_size(obj.get("contentSize").and_then(as_u64_lenient)),
        );
    }

    Candidate {
        title: clean_text(str_at(obj, "/name")),
        description: clean_text(str_at(obj, "/description")),
        duration: str_at(obj, "/duration").and_then(parse_duration_seconds),
        thumbnail: obj
            .get("thumbnailUrl")
            .or_else(|| obj.get("thumbnail"))
            .and_then(url_like)
            .and_then(|t| page.resolve(t)),
        formats: normalize(&descriptors, Some(&page.url)),
    }
}

/// Rich snippet: the first `VideoObject` among the page's JSON-LD scripts.
///
/// A malformed block is skipped; the error surfaces only when no block
/// describes a video.
pub fn ld_json_candidate(page: &Page) -> Result<Candidate, ExtractError> {
    let mut parse_error = None;
    for block in page.ld_json() {
        let value = match parse_json(block, &page.url, "ld+json") {
            Ok(value) => value,
            Err(err) => {
                parse_error.get_or_insert(err);
                continue;
            }
        };
        let video = find_object(&value, &|map| {
            map.get("@type")
                .is_some_and(|t| matches_type(t, "VideoObject"))
        });
        if let Some(obj) = video {
            return Ok(video_object_candidate(obj, page));
        }
    }
    match parse_error {
        Some(err) => Err(err),
        None => Ok(Candidate::default()),
    }
}

const VIDEO_META_KEYS: &[&str] = &[
    "og:video:secure_url",
    "og:video:url",
    "og:video",
    "twitter:player:stream",
];

/// Direct markup: Open Graph / Twitter tags, `itemprop=duration` and `<video>` sources.
pub fn meta_candidate(page: &Page) -> Candidate {
    // og:video often points at an HTML player; only trust it for media types
    let declared = page.meta("og:video:type").map(str::to_lowercase);
    let playable = declared
        .as_deref()
        .map(|t| t.starts_with("video/") || t.starts_with("audio/"))
        .unwrap_or(true);

    let mut descriptors = Vec::new();
    if playable {
        let height = page
            .first_meta(&["og:video:height", "twitter:player:height"])
            .and_then(|h| h.trim().parse::<u64>().ok());
        for key in VIDEO_META_KEYS {
            let Some(url) = page.meta(key).and_then(|u| page.resolve(u)) else {
                continue;
            };
            let mime = declared
                .clone()
                .unwrap_or_else(|| guess_mime(&url).to_string());
            descriptors.push(FormatDescriptor::direct(height_label(height), mime, url));
        }
    }
    for src in page.media_sources() {
        if let Some(url) = page.resolve(src) {
            let mime = guess_mime(&url);
            descriptors.push(FormatDescriptor::direct("original", mime, url));
        }
    }

    Candidate {
        title: clean_text(
            page.first_meta(&["og:title", "twitter:title"])
                .or_else(|| page.document_title()),
        ),
        description: clean_text(page.first_meta(&[
            "og:description",
            "twitter:description",
            "description",
        ])),
        duration: page
            .first_meta(&["duration", "video:duration", "og:video:duration"])
            .and_then(parse_duration_seconds),
        thumbnail: page
            .first_meta(&["og:image:secure_url", "og:image", "twitter:image"])
            .and_then(|t| page.resolve(t)),
        formats: normalize(&descriptors, Some(&page.url)),
    }
}

/// Thumbnail URL from a JSON value shaped as a string, list or `{url}` object.
pub fn thumbnail_from(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| value.pointer(p))
        .find_map(url_like)
        .map(str::to_string)
}
