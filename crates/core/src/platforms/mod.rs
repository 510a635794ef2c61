// ABOUTME: Per-platform scrapers and the shared request context they run against.
// ABOUTME: Defines the PlatformExtractor trait, the once-per-request LazyPage and extractor lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::diagnostics::DiagnosticSink;
use crate::error::ExtractError;
use crate::extractors::chain::Candidate;
use crate::extractors::embedded::parse_json;
use crate::extractors::page::Page;
use crate::platform::{is_short_link, Platform};
use crate::resource::PageFetcher;

pub mod facebook;
pub mod instagram;
pub mod tiktok;
pub mod youtube;

pub const ACCEPT_LANGUAGE: (&str, &str) = ("Accept-Language", "en-US,en;q=0.9");

/// Collaborators and settings shared by every strategy of a request.
#[derive(Debug, Clone)]
pub struct Context {
    pub fetcher: Arc<dyn PageFetcher>,
    pub sink: Arc<dyn DiagnosticSink>,
    /// Caller-supplied headers; these win over platform defaults.
    pub headers: HashMap<String, String>,
    /// Per-strategy time bound.
    pub timeout: Duration,
    /// Base URL of the TikTok public data API.
    pub tiktok_api: String,
}

impl Context {
    /// Platform defaults overlaid with caller headers. Names compare case-insensitively.
    fn headers_with(&self, defaults: &[(&str, &str)]) -> HashMap<String, String> {
        let mut headers: HashMap<String, String> = defaults
            .iter()
            .filter(|(k, _)| !self.headers.keys().any(|own| own.eq_ignore_ascii_case(k)))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    /// Fetch a page and reduce it to facts.
    pub async fn fetch_page(&self, url: &str, defaults: &[(&str, &str)]) -> Result<Page, ExtractError> {
        let result = self.fetcher.fetch(url, &self.headers_with(defaults)).await?;
        debug!(url = %url, final_url = %result.final_url, bytes = result.body.len(), "fetched page");
        Ok(Page::parse(result.final_url.clone(), result.text()))
    }

    /// Fetch a JSON document.
    pub async fn fetch_json(&self, url: &str, defaults: &[(&str, &str)]) -> Result<Value, ExtractError> {
        let result = self.fetcher.fetch(url, &self.headers_with(defaults)).await?;
        parse_json(&result.text(), url, "api")
    }

    /// Follow a short link to its target. Failure keeps the original URL.
    pub async fn resolve_short_link(&self, url: &str, defaults: &[(&str, &str)]) -> String {
        if !is_short_link(url) {
            return url.to_string();
        }
        let headers = self.headers_with(defaults);
        let result = tokio::time::timeout(self.timeout, self.fetcher.fetch_head(url, &headers))
            .await
            .unwrap_or_else(|_| {
                Err(ExtractError::timeout(
                    url,
                    "Head",
                    Some(anyhow::anyhow!("short link resolution exceeded {:?}", self.timeout)),
                ))
            });
        match result {
            Ok(resolved) => {
                debug!(url = %url, resolved = %resolved, "resolved short link");
                resolved
            }
            Err(err) => {
                warn!(url = %url, error = %err, "short link resolution failed");
                url.to_string()
            }
        }
    }
}

/// A page shared by several strategies, fetched at most once per request.
///
/// A failed fetch is cached too, so every strategy reading the page sees the
/// same error without another round trip.
pub struct LazyPage<'c> {
    ctx: &'c Context,
    url: String,
    defaults: &'static [(&'static str, &'static str)],
    cell: OnceCell<Result<Page, ExtractError>>,
}

impl<'c> LazyPage<'c> {
    pub fn new(
        ctx: &'c Context,
        url: impl Into<String>,
        defaults: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            ctx,
            url: url.into(),
            defaults,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&Page, ExtractError> {
        let result = self
            .cell
            .get_or_init(|| self.ctx.fetch_page(&self.url, self.defaults))
            .await;
        result.as_ref().map_err(ExtractError::duplicate)
    }
}

/// What a platform scraper hands back to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Platform id of the video, when known.
    pub id: Option<String>,
    /// Canonical page URL.
    pub page_url: String,
    pub candidate: Candidate,
}

#[async_trait]
pub trait PlatformExtractor: Send + Sync {
    /// Run the platform's fallback chain for `url`.
    async fn extract(&self, ctx: &Context, url: &str) -> Result<Extraction, ExtractError>;
}

static YOUTUBE: youtube::YouTube = youtube::YouTube;
static TIKTOK: tiktok::TikTok = tiktok::TikTok;
static INSTAGRAM: instagram::Instagram = instagram::Instagram;
static FACEBOOK: facebook::Facebook = facebook::Facebook;

/// The scraper for a platform; `None` for `Unknown`.
pub fn extractor_for(platform: Platform) -> Option<&'static dyn PlatformExtractor> {
    match platform {
        Platform::YouTube => Some(&YOUTUBE),
        Platform::TikTok => Some(&TIKTOK),
        Platform::Instagram => Some(&INSTAGRAM),
        Platform::Facebook => Some(&FACEBOOK),
        Platform::Unknown => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::resource::FetchResult;
    use std::sync::Mutex;

    /// Fetcher serving canned bodies by URL prefix; unmatched URLs get 404.
    #[derive(Debug, Default)]
    pub struct StubFetcher {
        routes: Vec<(String, Result<String, u16>)>,
        pub requests: Mutex<Vec<(String, HashMap<String, String>)>>,
        pub redirect: Option<String>,
        /// Make `fetch_head` never complete.
        pub stall_head: bool,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, prefix: &str, body: &str) -> Self {
            self.routes.push((prefix.to_string(), Ok(body.to_string())));
            self
        }

        pub fn fail(mut self, prefix: &str, status: u16) -> Self {
            self.routes.push((prefix.to_string(), Err(status)));
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests
                .lock()
                .map(|r| r.iter().map(|(u, _)| u.clone()).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(
            &self,
            url: &str,
            headers: &HashMap<String, String>,
        ) -> Result<FetchResult, ExtractError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push((url.to_string(), headers.clone()));
            }
            match self.routes.iter().find(|(prefix, _)| url.starts_with(prefix.as_str())) {
                Some((_, Ok(body))) => Ok(FetchResult::from_text(url, body.clone())),
                Some((_, Err(status))) => Err(ExtractError::http_status(url, "Fetch", *status)),
                None => Err(ExtractError::http_status(url, "Fetch", 404)),
            }
        }

        async fn fetch_head(
            &self,
            url: &str,
            _headers: &HashMap<String, String>,
        ) -> Result<String, ExtractError> {
            if self.stall_head {
                std::future::pending::<()>().await;
            }
            self.redirect
                .clone()
                .ok_or_else(|| ExtractError::http_status(url, "Head", 404))
        }
    }

    pub fn context(fetcher: StubFetcher) -> (Context, Arc<StubFetcher>, Arc<CollectingSink>) {
        let fetcher = Arc::new(fetcher);
        let sink = Arc::new(CollectingSink::new());
        let ctx = Context {
            fetcher: fetcher.clone(),
            sink: sink.clone(),
            headers: HashMap::new(),
            timeout: Duration::from_secs(5),
            tiktok_api: "https://api.test/tiktok/".to_string(),
        };
        (ctx, fetcher, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn lazy_page_fetches_once() {
        let (ctx, fetcher, _) = context(StubFetcher::new().route("https://a.test/", "<title>x</title>"));
        let page = LazyPage::new(&ctx, "https://a.test/page", &[ACCEPT_LANGUAGE]);
        assert_eq!(page.get().await.unwrap().document_title(), Some("x"));
        assert_eq!(page.get().await.unwrap().document_title(), Some("x"));
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn lazy_page_caches_failure() {
        let (ctx, fetcher, _) = context(StubFetcher::new().fail("https://a.test/", 500));
        let page = LazyPage::new(&ctx, "https://a.test/page", &[]);
        assert_eq!(
            page.get().await.unwrap_err().code,
            crate::error::ErrorCode::Http { status: Some(500) }
        );
        assert!(page.get().await.is_err());
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let (mut ctx, fetcher, _) = context(StubFetcher::new().route("https://a.test/", ""));
        ctx.headers
            .insert("Accept-Language".to_string(), "de-DE".to_string());
        ctx.fetch_page("https://a.test/", &[ACCEPT_LANGUAGE, ("Referer", "https://r.test/")])
            .await
            .unwrap();
        let requests = fetcher.requests.lock().unwrap();
        let headers = &requests[0].1;
        assert_eq!(headers.get("Accept-Language").map(String::as_str), Some("de-DE"));
        assert_eq!(headers.get("Referer").map(String::as_str), Some("https://r.test/"));
    }

    #[tokio::test]
    async fn caller_header_names_ignore_case() {
        let (mut ctx, fetcher, _) = context(StubFetcher::new().route("https://a.test/", ""));
        ctx.headers
            .insert("accept-language".to_string(), "fr-FR".to_string());
        ctx.fetch_page("https://a.test/", &[ACCEPT_LANGUAGE]).await.unwrap();
        let requests = fetcher.requests.lock().unwrap();
        let headers = &requests[0].1;
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept-language").map(String::as_str), Some("fr-FR"));
        assert!(headers.get("Accept-Language").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_short_link_resolution_times_out_to_input() {
        let mut stub = StubFetcher::new();
        stub.stall_head = true;
        stub.redirect = Some("https://www.tiktok.com/@u/video/123".to_string());
        let (mut ctx, _, _) = context(stub);
        ctx.timeout = Duration::from_secs(1);

        let resolved = tokio::time::timeout(
            Duration::from_secs(3600),
            ctx.resolve_short_link("https://vm.tiktok.com/ZMabc/", &[]),
        )
        .await
        .expect("resolution is bounded by the context timeout");
        assert_eq!(resolved, "https://vm.tiktok.com/ZMabc/");
    }

    #[tokio::test]
    async fn short_link_resolution_falls_back_to_input() {
        let (ctx, _, _) = context(StubFetcher::new());
        assert_eq!(
            ctx.resolve_short_link("https://vm.tiktok.com/ZMabc/", &[]).await,
            "https://vm.tiktok.com/ZMabc/"
        );

        let mut stub = StubFetcher::new();
        stub.redirect = Some("https://www.tiktok.com/@u/video/123".to_string());
        let (ctx, _, _) = context(stub);
        assert_eq!(
            ctx.resolve_short_link("https://vm.tiktok.com/ZMabc/", &[]).await,
            "https://www.tiktok.com/@u/video/123"
        );
        assert_eq!(
            ctx.resolve_short_link("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &[]).await,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
