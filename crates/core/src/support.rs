// ABOUTME: Static capability listing: supported platforms, their hosts, containers, quality tokens and media types.
// ABOUTME: Optionally narrowed to the platform a URL belongs to.

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::formats::MediaType;
use crate::pipeline::HIGHEST;
use crate::platform::{detect, Platform, Ranking};

const RESOLUTIONS: &[&str] = &["2160p", "1440p", "1080p", "720p", "480p", "360p", "240p", "144p"];

/// What one platform can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSupport {
    pub platform: Platform,
    pub hosts: Vec<String>,
    /// Container values records from this platform carry.
    pub containers: Vec<String>,
    /// Tokens accepted by the quality filter.
    pub qualities: Vec<String>,
    /// `resolution` or `watermark-first`.
    pub ranking: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportInfo {
    pub platforms: Vec<PlatformSupport>,
    pub containers: Vec<String>,
    pub qualities: Vec<String>,
    pub media_types: Vec<MediaType>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn platform_support(platform: Platform) -> PlatformSupport {
    let (containers, extra): (&[&str], &[&str]) = match platform {
        Platform::YouTube => (&["mp4", "webm"], RESOLUTIONS),
        Platform::TikTok => (&["mp4", "mpeg"], &["hd", "original", "no watermark", "watermark", "audio"]),
        Platform::Instagram => (&["mp4"], &["1080p", "720p", "640p", "original"]),
        Platform::Facebook => (&["mp4"], &["hd", "sd"]),
        Platform::Unknown => (&[], &[]),
    };
    let mut qualities = vec![HIGHEST.to_string()];
    qualities.extend(strings(extra));

    PlatformSupport {
        platform,
        hosts: strings(platform.hosts()),
        containers: strings(containers),
        qualities,
        ranking: match platform.ranking() {
            Ranking::Resolution => "resolution".to_string(),
            Ranking::WatermarkFirst => "watermark-first".to_string(),
        },
    }
}

fn union(lists: impl Iterator<Item = Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in lists.flatten() {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Capability listing for every platform, or only the one `url` belongs to.
pub fn support(url: Option<&str>) -> Result<SupportInfo, ExtractError> {
    let platforms: Vec<PlatformSupport> = match url.map(str::trim).filter(|u| !u.is_empty()) {
        None => Platform::supported().iter().copied().map(platform_support).collect(),
        Some(url) => {
            let platform = detect(url);
            if !platform.is_known() {
                return Err(ExtractError::unsupported(
                    url,
                    "Support",
                    Some(anyhow::anyhow!(
                        "supported platforms: {}",
                        Platform::supported_list()
                    )),
                ));
            }
            vec![platform_support(platform)]
        }
    };

    Ok(SupportInfo {
        containers: union(platforms.iter().map(|p| p.containers.clone())),
        qualities: union(platforms.iter().map(|p| p.qualities.clone())),
        media_types: vec![MediaType::Video, MediaType::Audio],
        platforms,
    })
}
