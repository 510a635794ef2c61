// ABOUTME: Quality/type filter-sort pipeline applied to normalized formats before they are returned.
// ABOUTME: Stages are pure functions; apply() composes them and reports the stage that emptied the set.

use std::cmp::Reverse;
use std::fmt;

use crate::error::ExtractError;
use crate::formats::{is_valid_locator, FormatRecord, MediaType};
use crate::platform::Ranking;

/// Quality token that selects ranking instead of substring filtering.
pub const HIGHEST: &str = "highest";

/// A pipeline stage, reported by `ErrorCode::NoMatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Container,
    Quality,
    MediaType,
    Locator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Container => "container",
            Stage::Quality => "quality",
            Stage::MediaType => "media type",
            Stage::Locator => "locator",
        };
        write!(f, "{}", s)
    }
}

/// Filter criteria for one request. `None` disables a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub container: Option<String>,
    pub quality: Option<String>,
    pub media_type: Option<MediaType>,
    pub ranking: Ranking,
}

pub fn is_highest(quality: &str) -> bool {
    quality.trim().eq_ignore_ascii_case(HIGHEST)
}

/// Keep records whose container equals `container`, ignoring case.
pub fn by_container(records: Vec<FormatRecord>, container: &str) -> Vec<FormatRecord> {
    let want = container.trim();
    records
        .into_iter()
        .filter(|r| r.container.eq_ignore_ascii_case(want))
        .collect()
}

/// Keep records whose quality label contains `quality`, ignoring case.
pub fn by_quality(records: Vec<FormatRecord>, quality: &str) -> Vec<FormatRecord> {
    let want = quality.trim().to_lowercase();
    records
        .into_iter()
        .filter(|r| r.quality.to_lowercase().contains(&want))
        .collect()
}

pub fn by_media_type(records: Vec<FormatRecord>, media_type: MediaType) -> Vec<FormatRecord> {
    records
        .into_iter()
        .filter(|r| r.media_type == media_type)
        .collect()
}

pub fn by_locator(records: Vec<FormatRecord>) -> Vec<FormatRecord> {
    records
        .into_iter()
        .filter(|r| is_valid_locator(&r.url))
        .collect()
}

/// Leading integer of a quality label; `1080p60` gives 1080, `hd` gives 0.
pub fn leading_number(label: &str) -> u64 {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

fn is_watermark_free(label: &str) -> bool {
    label.to_lowercase().contains("no watermark")
}

/// Order records best-first. The sort is stable, so ties keep extraction order.
pub fn rank(mut records: Vec<FormatRecord>, ranking: Ranking) -> Vec<FormatRecord> {
    match ranking {
        Ranking::Resolution => records.sort_by_key(|r| Reverse(leading_number(&r.quality))),
        Ranking::WatermarkFirst => records.sort_by_key(|r| {
            (
                Reverse(is_watermark_free(&r.quality)),
                Reverse(r.size_bytes),
            )
        }),
    }
    records
}

fn non_empty(
    records: Vec<FormatRecord>,
    stage: Stage,
    url: &str,
    criterion: impl FnOnce() -> String,
) -> Result<Vec<FormatRecord>, ExtractError> {
    if records.is_empty() {
        Err(ExtractError::no_match(
            stage,
            url,
            Some(anyhow::anyhow!("{}", criterion())),
        ))
    } else {
        Ok(records)
    }
}

/// Run every stage in order, failing as soon as one leaves nothing.
pub fn apply(
    records: Vec<FormatRecord>,
    spec: &FilterSpec,
    url: &str,
) -> Result<Vec<FormatRecord>, ExtractError> {
    let mut records = records;

    if let Some(container) = spec.container.as_deref() {
        records = non_empty(by_container(records, container), Stage::Container, url, || {
            format!("no {} formats available", container)
        })?;
    }

    if let Some(quality) = spec.quality.as_deref() {
        if is_highest(quality) {
            records = rank(records, spec.ranking);
        } else {
            records = non_empty(by_quality(records, quality), Stage::Quality, url, || {
                format!("no formats with quality {:?}", quality)
            })?;
        }
    }

    if let Some(media_type) = spec.media_type {
        records = non_empty(by_media_type(records, media_type), Stage::MediaType, url, || {
            format!("no {} formats available", media_type)
        })?;
    }

    non_empty(by_locator(records), Stage::Locator, url, || {
        "no formats with a usable URL".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(quality: &str, mime: &str, size: u64, url: &str) -> FormatRecord {
        let (mime_type, container, media_type) = crate::formats::split_mime(mime);
        FormatRecord {
            quality: quality.to_string(),
            container,
            mime_type,
            media_type,
            size_bytes: size,
            url: url.to_string(),
        }
    }

    fn qualities(records: &[FormatRecord]) -> Vec<&str> {
        records.iter().map(|r| r.quality.as_str()).collect()
    }

    fn spec(container: Option<&str>, quality: Option<&str>, media_type: Option<MediaType>) -> FilterSpec {
        FilterSpec {
            container: container.map(str::to_string),
            quality: quality.map(str::to_string),
            media_type,
            ranking: Ranking::Resolution,
        }
    }

    #[test]
    fn leading_number_parsing() {
        assert_eq!(leading_number("1080p"), 1080);
        assert_eq!(leading_number("720p60"), 720);
        assert_eq!(leading_number("hd"), 0);
        assert_eq!(leading_number(""), 0);
        assert_eq!(leading_number(" 360p"), 360);
    }

    #[test]
    fn resolution_ranking_is_descending_and_stable() {
        let records = vec![
            record("360p", "video/mp4", 0, "https://a.test/1"),
            record("hd", "video/mp4", 0, "https://a.test/2"),
            record("1080p", "video/mp4", 0, "https://a.test/3"),
            record("sd", "video/mp4", 0, "https://a.test/4"),
            record("720p", "video/mp4", 0, "https://a.test/5"),
            record("1080p60", "video/mp4", 0, "https://a.test/6"),
        ];
        let ranked = rank(records, Ranking::Resolution);
        assert_eq!(qualities(&ranked), vec!["1080p", "1080p60", "720p", "360p", "hd", "sd"]);
    }

    #[test]
    fn watermark_first_ranking() {
        let records = vec![
            record("original (watermark)", "video/mp4", 9_000_000, "https://t.test/wm"),
            record("original (no watermark)", "video/mp4", 5_000_000, "https://t.test/nwm"),
            record("audio", "audio/mpeg", 0, "https://t.test/a"),
            record("hd (No Watermark)", "video/mp4", 8_000_000, "https://t.test/hd"),
        ];
        let ranked = rank(records, Ranking::WatermarkFirst);
        assert_eq!(
            qualities(&ranked),
            vec![
                "hd (No Watermark)",
                "original (no watermark)",
                "original (watermark)",
                "audio"
            ]
        );
    }

    #[test]
    fn ranking_twice_changes_nothing() {
        let records = vec![
            record("hd", "video/mp4", 0, "https://a.test/hd-1"),
            record("1080p", "video/mp4", 0, "https://a.test/1080-1"),
            record("360p", "video/mp4", 0, "https://a.test/360"),
            record("hd", "video/webm", 0, "https://a.test/hd-2"),
            record("1080p", "video/webm", 0, "https://a.test/1080-2"),
            record("original (no watermark)", "video/mp4", 4_000, "https://t.test/nwm-1"),
            record("original (watermark)", "video/mp4", 4_000, "https://t.test/wm"),
            record("hd (no watermark)", "video/mp4", 4_000, "https://t.test/nwm-2"),
        ];
        for ranking in [Ranking::Resolution, Ranking::WatermarkFirst] {
            let once = rank(records.clone(), ranking);
            let twice = rank(once.clone(), ranking);
            assert_eq!(twice, once, "{:?}", ranking);
        }

        let ranked = rank(records, Ranking::WatermarkFirst);
        let urls: Vec<&str> = ranked.iter().take(2).map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://t.test/nwm-1", "https://t.test/nwm-2"]);
    }

    #[test]
    fn quality_filter_is_idempotent() {
        let records = vec![
            record("720p", "video/mp4", 0, "https://a.test/1"),
            record("720p60", "video/webm", 0, "https://a.test/2"),
            record("360p", "video/mp4", 0, "https://a.test/3"),
        ];
        let once = by_quality(records, "720P");
        let twice = by_quality(once.clone(), "720P");
        assert_eq!(once, twice);
        assert_eq!(qualities(&once), vec!["720p", "720p60"]);
    }

    #[test]
    fn container_filter_is_exact_and_case_insensitive() {
        let records = vec![
            record("720p", "video/mp4", 0, "https://a.test/1"),
            record("720p", "video/webm", 0, "https://a.test/2"),
            record("audio", "audio/mp4", 0, "https://a.test/3"),
        ];
        let kept = by_container(records, "MP4");
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.container == "mp4"));
    }

    #[test]
    fn apply_runs_stages_in_order() {
        let records = vec![
            record("360p", "video/mp4", 0, "https://a.test/1"),
            record("audio", "audio/mp4", 0, "https://a.test/2"),
            record("720p", "video/mp4", 0, "https://a.test/3"),
            record("1080p", "video/webm", 0, "https://a.test/4"),
        ];
        let out = apply(records, &spec(Some("mp4"), Some("highest"), Some(MediaType::Video)), "u").unwrap();
        assert_eq!(qualities(&out), vec!["720p", "360p"]);
    }

    #[test]
    fn apply_reports_emptying_stage() {
        let records = vec![record("720p", "video/mp4", 0, "https://a.test/1")];

        let err = apply(records.clone(), &spec(Some("webm"), None, None), "u").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NoMatch(Stage::Container));

        let err = apply(records.clone(), &spec(None, Some("1080"), None), "u").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NoMatch(Stage::Quality));
        assert!(err.to_string().contains("1080"));

        let err = apply(records, &spec(None, None, Some(MediaType::Audio)), "u").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NoMatch(Stage::MediaType));
    }

    #[test]
    fn apply_without_filters_keeps_order() {
        let records = vec![
            record("360p", "video/mp4", 0, "https://a.test/1"),
            record("720p", "video/mp4", 0, "https://a.test/2"),
        ];
        let out = apply(records.clone(), &spec(None, None, None), "u").unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn apply_on_empty_input_fails_at_locator() {
        let err = apply(Vec::new(), &spec(None, None, None), "u").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NoMatch(Stage::Locator));
    }
}
