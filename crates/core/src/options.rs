// ABOUTME: Configuration options for clipmeta including Options and ClientBuilder.
// ABOUTME: ClientBuilder provides a fluent API for constructing Client instances with custom settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::diagnostics::DiagnosticSink;
use crate::error::ExtractError;
use crate::resource::PageFetcher;

/// Desktop browser User-Agent; several platforms serve reduced pages to unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Public TikTok data API queried when the page itself yields nothing.
pub const DEFAULT_TIKTOK_API: &str = "https://www.tikwm.com/api/";

/// Configuration options for the clipmeta client.
#[derive(Debug, Clone)]
pub struct Options {
    /// Bound on each fallback strategy, and on each HTTP request of the default fetcher.
    pub timeout: Duration,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    /// Replaces the reqwest-backed fetcher entirely.
    pub fetcher: Option<Arc<dyn PageFetcher>>,
    /// Receives per-strategy telemetry; defaults to `TracingSink`.
    pub sink: Option<Arc<dyn DiagnosticSink>>,
    pub tiktok_api: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
            fetcher: None,
            sink: None,
            tiktok_api: DEFAULT_TIKTOK_API.to_string(),
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the per-strategy timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Use a custom page fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.opts.fetcher = Some(fetcher);
        self
    }

    /// Send strategy telemetry to `sink`.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.opts.sink = Some(sink);
        self
    }

    /// Override the TikTok public API base URL.
    pub fn tiktok_api(mut self, base: impl Into<String>) -> Self {
        self.opts.tiktok_api = base.into();
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Result<Client, ExtractError> {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
