// ABOUTME: Response types: VideoMetadata for extract and FormatsReport for the formats listing.
// ABOUTME: Built once per request from a platform extraction and the filtered format list.

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::formats::FormatRecord;
use crate::platform::Platform;
use crate::platforms::Extraction;

/// A specialized Result type for clipmeta operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Metadata and candidate formats for one video page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub platform: Platform,
    pub id: Option<String>,
    /// Canonical page URL.
    pub url: String,
    pub title: String,
    pub description: String,
    /// 0 when unknown.
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    /// Best first when the request asked for `highest`.
    pub formats: Vec<FormatRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_download_url: Option<String>,
}

impl VideoMetadata {
    /// Assemble metadata from an extraction and its filtered formats.
    pub fn from_extraction(platform: Platform, extraction: Extraction, formats: Vec<FormatRecord>) -> Self {
        let candidate = extraction.candidate;
        Self {
            platform,
            id: extraction.id,
            url: extraction.page_url,
            title: candidate.title.unwrap_or_default(),
            description: candidate.description.unwrap_or_default(),
            duration_seconds: candidate.duration.unwrap_or(0),
            thumbnail_url: candidate.thumbnail.unwrap_or_default(),
            formats,
            selected_download_url: None,
        }
    }

    /// The first remaining format's URL.
    pub fn best_url(&self) -> Option<&str> {
        self.formats.first().map(|f| f.url.as_str())
    }
}

/// Formats available for a page, as returned by `Client::formats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatsReport {
    pub platform: Platform,
    pub formats: Vec<FormatRecord>,
}
