// ABOUTME: The Client orchestrating detection, platform extraction, normalization and the filter-sort pipeline.
// ABOUTME: Provides async extract() and formats() plus the static support() listing.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::diagnostics::TracingSink;
use crate::error::ExtractError;
use crate::formats::{dedupe, retain_valid, MediaType};
use crate::options::{ClientBuilder, Options};
use crate::pipeline::{self, FilterSpec};
use crate::platform::{detect, Platform};
use crate::platforms::{extractor_for, Context, Extraction};
use crate::request::ExtractionRequest;
use crate::resource::{HttpFetcher, PageFetcher};
use crate::result::{FormatsReport, Result, VideoMetadata};
use crate::support::{support, SupportInfo};

/// The clipmeta client. Cheap to clone; clones share the fetcher and sink.
#[derive(Debug, Clone)]
pub struct Client {
    ctx: Arc<Context>,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Result<Self> {
        let fetcher: Arc<dyn PageFetcher> = match (opts.fetcher, opts.http_client) {
            (Some(fetcher), _) => fetcher,
            (None, Some(client)) => Arc::new(HttpFetcher::with_client(client, opts.allow_private_networks)),
            (None, None) => Arc::new(HttpFetcher::new(
                &opts.user_agent,
                opts.timeout,
                opts.allow_private_networks,
            )?),
        };
        let sink = opts.sink.unwrap_or_else(|| Arc::new(TracingSink));

        Ok(Self {
            ctx: Arc::new(Context {
                fetcher,
                sink,
                headers: opts.headers,
                timeout: opts.timeout,
                tiktok_api: opts.tiktok_api,
            }),
        })
    }

    /// Validate the URL and classify it.
    fn classify(url: &str, op: &str) -> Result<Platform> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ExtractError::validation(
                url,
                op,
                Some(anyhow::anyhow!("url is required")),
            ));
        }
        let parsed = Url::parse(url).map_err(|e| {
            ExtractError::validation(url, op, Some(anyhow::anyhow!("malformed URL: {}", e)))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::validation(
                url,
                op,
                Some(anyhow::anyhow!("scheme must be http or https")),
            ));
        }

        let platform = detect(url);
        if !platform.is_known() {
            return Err(ExtractError::unsupported(
                url,
                op,
                Some(anyhow::anyhow!(
                    "supported platforms: {}",
                    Platform::supported_list()
                )),
            ));
        }
        Ok(platform)
    }

    /// Run the platform scraper and normalize what it found.
    async fn run_extractor(&self, platform: Platform, url: &str, op: &str) -> Result<Extraction> {
        let extractor = extractor_for(platform).ok_or_else(|| {
            ExtractError::unsupported(url, op, Some(anyhow::anyhow!("no extractor for {}", platform)))
        })?;

        info!(platform = %platform, url = %url, "extracting");
        let mut extraction = extractor.extract(&self.ctx, url.trim()).await?;
        let formats = std::mem::take(&mut extraction.candidate.formats);
        extraction.candidate.formats = dedupe(retain_valid(formats));

        if extraction.candidate.formats.is_empty() {
            return Err(ExtractError::no_formats(url, op));
        }
        debug!(
            platform = %platform,
            formats = extraction.candidate.formats.len(),
            "extraction finished"
        );
        Ok(extraction)
    }

    /// Extract metadata and the formats matching `request`.
    ///
    /// Filtering, ranking and download-link selection all run before
    /// `info_only` trims the formats, so an info request still fails when
    /// nothing usable was found.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<VideoMetadata> {
        let url = request.url.trim();
        let platform = Self::classify(url, "Extract")?;
        let mut extraction = self.run_extractor(platform, url, "Extract").await?;

        let spec = request.filter_spec(platform.ranking());
        let formats = std::mem::take(&mut extraction.candidate.formats);
        let formats = pipeline::apply(formats, &spec, url)?;

        let mut metadata = VideoMetadata::from_extraction(platform, extraction, formats);
        if request.wants_download_link {
            metadata.selected_download_url = metadata.best_url().map(str::to_string);
        }
        if request.info_only {
            metadata.formats.clear();
            metadata.selected_download_url = None;
        }
        Ok(metadata)
    }

    /// Every usable format for `url`, optionally restricted to one media type.
    pub async fn formats(&self, url: &str, media_type: Option<MediaType>) -> Result<FormatsReport> {
        let url = url.trim();
        let platform = Self::classify(url, "Formats")?;
        let extraction = self.run_extractor(platform, url, "Formats").await?;

        let spec = FilterSpec {
            container: None,
            quality: None,
            media_type,
            ranking: platform.ranking(),
        };
        let formats = pipeline::apply(extraction.candidate.formats, &spec, url)?;
        Ok(FormatsReport { platform, formats })
    }

    /// Static capability listing; see [`crate::support::support`].
    pub fn support(&self, url: Option<&str>) -> Result<SupportInfo> {
        support(url)
    }
}
