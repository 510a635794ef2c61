// ABOUTME: ExtractionRequest: the caller's URL plus optional container, quality and media type filters.
// ABOUTME: Defaults are applied first and explicit fields override them, including an explicit "no filter".

use serde::{Deserialize, Serialize};

use crate::formats::MediaType;
use crate::pipeline::{FilterSpec, HIGHEST};
use crate::platform::Ranking;

pub const DEFAULT_CONTAINER: &str = "mp4";
pub const DEFAULT_QUALITY: &str = HIGHEST;
pub const DEFAULT_MEDIA_TYPE: MediaType = MediaType::Video;

fn default_container() -> Option<String> {
    Some(DEFAULT_CONTAINER.to_string())
}

fn default_quality() -> Option<String> {
    Some(DEFAULT_QUALITY.to_string())
}

fn default_media_type() -> Option<MediaType> {
    Some(DEFAULT_MEDIA_TYPE)
}

/// One extraction request.
///
/// Deserializing fills absent fields with the defaults, while an explicit
/// `null` disables that filter:
///
/// ```
/// use clipmeta_core::ExtractionRequest;
///
/// let req: ExtractionRequest =
///     serde_json::from_str(r#"{"url": "https://youtu.be/dQw4w9WgXcQ", "format": null}"#).unwrap();
/// assert_eq!(req.container, None);
/// assert_eq!(req.quality.as_deref(), Some("highest"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_container", alias = "format")]
    pub container: Option<String>,
    #[serde(default = "default_quality")]
    pub quality: Option<String>,
    #[serde(default = "default_media_type", alias = "type")]
    pub media_type: Option<MediaType>,
    #[serde(default, alias = "download")]
    pub wants_download_link: bool,
    #[serde(default, alias = "info")]
    pub info_only: bool,
}

impl ExtractionRequest {
    /// A request for `url` with every default applied.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            container: default_container(),
            quality: default_quality(),
            media_type: default_media_type(),
            wants_download_link: false,
            info_only: false,
        }
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Accept every container.
    pub fn any_container(mut self) -> Self {
        self.container = None;
        self
    }

    /// Quality token; `highest` ranks instead of filtering.
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Keep extraction order and every quality.
    pub fn any_quality(mut self) -> Self {
        self.quality = None;
        self
    }

    pub fn media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    pub fn any_media_type(mut self) -> Self {
        self.media_type = None;
        self
    }

    pub fn download_link(mut self, wants: bool) -> Self {
        self.wants_download_link = wants;
        self
    }

    pub fn info_only(mut self, info_only: bool) -> Self {
        self.info_only = info_only;
        self
    }

    /// Pipeline criteria for this request on a platform with `ranking`.
    pub fn filter_spec(&self, ranking: Ranking) -> FilterSpec {
        let non_blank = |s: &Option<String>| s.as_ref().filter(|v| !v.trim().is_empty()).cloned();
        FilterSpec {
            container: non_blank(&self.container),
            quality: non_blank(&self.quality),
            media_type: self.media_type,
            ranking,
        }
    }
}
