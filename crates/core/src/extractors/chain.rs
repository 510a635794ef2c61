// ABOUTME: Ordered fallback chain of extraction strategies evaluated by a first-success runner.
// ABOUTME: Candidate fields merge first-found-wins; later strategies are dropped unpolled once formats exist.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Outcome};
use crate::error::ExtractError;
use crate::formats::FormatRecord;
use crate::platform::Platform;

/// Best-effort structured data produced by one strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<u64>,
    pub thumbnail: Option<String>,
    /// Normalized, valid records.
    pub formats: Vec<FormatRecord>,
}

impl Candidate {
    pub fn has_formats(&self) -> bool {
        !self.formats.is_empty()
    }

    /// Fill only the fields still unset.
    pub fn merge(&mut self, other: Candidate) {
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.duration.is_none() {
            self.duration = other.duration;
        }
        if self.thumbnail.is_none() {
            self.thumbnail = other.thumbnail;
        }
        if self.formats.is_empty() {
            self.formats = other.formats;
        }
    }
}

/// Trimmed, whitespace-collapsed text, or None when blank.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    s.map(crate::extractors::fields::normalize_whitespace)
        .filter(|s| !s.is_empty())
}

type Strategy<'a> = (&'static str, BoxFuture<'a, Result<Candidate, ExtractError>>);

/// Strategies for one platform, tried strictly in insertion order.
pub struct Chain<'a> {
    platform: Platform,
    url: String,
    steps: Vec<Strategy<'a>>,
}

impl<'a> Chain<'a> {
    pub fn new(platform: Platform, url: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
            steps: Vec::new(),
        }
    }

    /// Append a strategy. The future is not polled until its turn comes.
    pub fn step<F>(mut self, name: &'static str, strategy: F) -> Self
    where
        F: Future<Output = Result<Candidate, ExtractError>> + Send + 'a,
    {
        self.steps.push((name, Box::pin(strategy)));
        self
    }

    /// Run strategies until one yields formats.
    ///
    /// Failures are reported to `sink` and the chain moves on. Only a fetch
    /// failure (HTTP, timeout, SSRF) of the final strategy is returned; when
    /// every strategy comes up empty the merged candidate has no formats.
    pub async fn run(
        self,
        sink: &dyn DiagnosticSink,
        timeout: Duration,
    ) -> Result<Candidate, ExtractError> {
        let Chain {
            platform,
            url,
            steps,
        } = self;
        let total = steps.len();
        let mut merged = Candidate::default();
        let mut remaining = steps.into_iter().enumerate();

        while let Some((index, (name, strategy))) = remaining.next() {
            let is_last = index + 1 == total;
            let result = match tokio::time::timeout(timeout, strategy).await {
                Ok(result) => result,
                Err(_) => Err(ExtractError::timeout(
                    &url,
                    name,
                    Some(anyhow::anyhow!("strategy exceeded {:?}", timeout)),
                )),
            };

            match result {
                Ok(candidate) if candidate.has_formats() => {
                    let formats = candidate.formats.len();
                    merged.merge(candidate);
                    sink.record(&Diagnostic {
                        platform,
                        strategy: name,
                        outcome: Outcome::Yielded { formats },
                    });
                    for (_, (skipped, _)) in remaining.by_ref() {
                        sink.record(&Diagnostic {
                            platform,
                            strategy: skipped,
                            outcome: Outcome::Skipped,
                        });
                    }
                    return Ok(merged);
                }
                Ok(candidate) => {
                    merged.merge(candidate);
                    sink.record(&Diagnostic {
                        platform,
                        strategy: name,
                        outcome: Outcome::Empty,
                    });
                }
                Err(err) => {
                    sink.record(&Diagnostic {
                        platform,
                        strategy: name,
                        outcome: Outcome::Failed {
                            code: err.code,
                            message: err.to_string(),
                        },
                    });
                    if is_last && err.is_fetch_failure() {
                        return Err(err);
                    }
                }
            }
        }

        debug!(platform = %platform, url = %url, "every strategy came up empty");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::error::ErrorCode;
    use crate::formats::MediaType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(url: &str) -> FormatRecord {
        FormatRecord {
            quality: "720p".to_string(),
            container: "mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            media_type: MediaType::Video,
            size_bytes: 0,
            url: url.to_string(),
        }
    }

    fn with_formats(title: Option<&str>, url: &str) -> Candidate {
        Candidate {
            title: title.map(str::to_string),
            formats: vec![record(url)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_found_fields_win_and_later_steps_are_skipped() {
        let sink = CollectingSink::new();
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();

        let candidate = Chain::new(Platform::YouTube, "u")
            .step("first", async {
                Ok(Candidate {
                    title: Some("from first".to_string()),
                    ..Default::default()
                })
            })
            .step("second", async {
                Ok(Candidate {
                    title: Some("from second".to_string()),
                    duration: Some(12),
                    formats: vec![record("https://a.test/1")],
                    ..Default::default()
                })
            })
            .step("third", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(with_formats(None, "https://a.test/2"))
            })
            .run(&sink, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(candidate.title.as_deref(), Some("from first"));
        assert_eq!(candidate.duration, Some(12));
        assert_eq!(candidate.formats.len(), 1);
        assert_eq!(polled.load(Ordering::SeqCst), 0);
        assert_eq!(sink.outcomes_for("first"), vec![Outcome::Empty]);
        assert_eq!(sink.outcomes_for("second"), vec![Outcome::Yielded { formats: 1 }]);
        assert_eq!(sink.outcomes_for("third"), vec![Outcome::Skipped]);
    }

    #[tokio::test]
    async fn parse_failure_does_not_abort() {
        let sink = CollectingSink::new();
        let candidate = Chain::new(Platform::TikTok, "u")
            .step("broken", async { Err(ExtractError::parse("u", "broken", None)) })
            .step("fine", async { Ok(with_formats(Some("t"), "https://a.test/1")) })
            .run(&sink, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(candidate.has_formats());
        assert!(matches!(
            sink.outcomes_for("broken").as_slice(),
            [Outcome::Failed { code: ErrorCode::Parse, .. }]
        ));
    }

    #[tokio::test]
    async fn fetch_failure_before_last_step_is_recovered() {
        let sink = CollectingSink::new();
        let candidate = Chain::new(Platform::Facebook, "u")
            .step("page", async { Err(ExtractError::http_status("u", "Fetch", 404)) })
            .step("mobile", async { Ok(with_formats(None, "https://a.test/1")) })
            .run(&sink, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(candidate.has_formats());
    }

    #[tokio::test]
    async fn fetch_failure_on_last_step_propagates() {
        let sink = CollectingSink::new();
        let err = Chain::new(Platform::Facebook, "u")
            .step("page", async { Ok(Candidate::default()) })
            .step("mobile", async { Err(ExtractError::http_status("u", "Fetch", 503)) })
            .run(&sink, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Http { status: Some(503) });
    }

    #[tokio::test]
    async fn parse_failure_on_last_step_is_swallowed() {
        let sink = CollectingSink::new();
        let candidate = Chain::new(Platform::Instagram, "u")
            .step("meta", async {
                Ok(Candidate {
                    title: Some("kept".to_string()),
                    ..Default::default()
                })
            })
            .step("embed", async { Err(ExtractError::parse("u", "embed", None)) })
            .run(&sink, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(candidate.title.as_deref(), Some("kept"));
        assert!(!candidate.has_formats());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_strategy_times_out_and_falls_through() {
        let sink = CollectingSink::new();
        let candidate = Chain::new(Platform::YouTube, "u")
            .step("slow", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(with_formats(None, "https://a.test/slow"))
            })
            .step("fast", async { Ok(with_formats(None, "https://a.test/fast")) })
            .run(&sink, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(candidate.formats[0].url, "https://a.test/fast");
        assert!(matches!(
            sink.outcomes_for("slow").as_slice(),
            [Outcome::Failed { code: ErrorCode::Timeout, .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_on_last_step_propagates() {
        let sink = CollectingSink::new();
        let err = Chain::new(Platform::YouTube, "u")
            .step("only", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Candidate::default())
            })
            .run(&sink, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn clean_text_collapses_and_drops_blank() {
        assert_eq!(clean_text(Some("  a \n b ")).as_deref(), Some("a b"));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }
}
