// ABOUTME: Page fetching: the PageFetcher collaborator trait and the default reqwest-backed HttpFetcher.
// ABOUTME: Handles redirects, private-network guarding, body size limits and charset decoding.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};

use crate::error::ExtractError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Build a result from an in-memory body, as stub fetchers do.
    pub fn from_text(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            status: 200,
            final_url: url.clone(),
            url,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: Bytes::from(body.into()),
        }
    }

    /// Decode the body as text, using the content-type charset or detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// The transport capability the extraction core depends on.
///
/// Implementations must follow redirects and report non-2xx responses as
/// `ErrorCode::Http { status: Some(_) }`.
#[async_trait]
pub trait PageFetcher: Send + Sync + fmt::Debug {
    /// GET `url` with the given extra headers.
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResult, ExtractError>;

    /// Resolve redirects for `url` and return the final URL.
    async fn fetch_head(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<String, ExtractError>;
}

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            const RANGES: &[&str] = &[
                "10.0.0.0/8",
                "172.16.0.0/12",
                "192.168.0.0/16",
                "127.0.0.0/8",
                "169.254.0.0/16",
            ];
            RANGES
                .iter()
                .filter_map(|r| r.parse::<Ipv4Net>().ok())
                .any(|net| net.contains(ip))
        }
        IpAddr::V6(ip) => {
            if ip.is_loopback() {
                return true;
            }
            ["fc00::/7", "fe80::/10"]
                .iter()
                .filter_map(|r| r.parse::<Ipv6Net>().ok())
                .any(|net| net.contains(ip))
        }
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        if let Some(charset) = part.trim().strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Reject URLs whose host is, or resolves to, a private address.
async fn guard_private(url: &url::Url, original: &str) -> Result<(), ExtractError> {
    let Some(host) = url.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(ExtractError::ssrf(
                original,
                "Fetch",
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        ExtractError::fetch(
            original,
            "Fetch",
            Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
        )
    })?;
    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(ExtractError::ssrf(
                original,
                "Fetch",
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
    }
    Ok(())
}

fn map_send_error(url: &str, op: &str, err: reqwest::Error) -> ExtractError {
    if err.is_timeout() {
        ExtractError::timeout(url, op, Some(anyhow::anyhow!("request timed out: {}", err)))
    } else if let Some(status) = err.status() {
        ExtractError::http_status(url, op, status.as_u16())
    } else {
        ExtractError::fetch(url, op, Some(anyhow::anyhow!("request failed: {}", err)))
    }
}

/// Default `PageFetcher` backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    allow_private_networks: bool,
}

impl HttpFetcher {
    /// Build a fetcher with its own reqwest client.
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        allow_private_networks: bool,
    ) -> Result<Self, ExtractError> {
        let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= 10 {
                return attempt.error("too many redirects");
            }
            if !allow_private_networks {
                let next = attempt.url().clone();
                if let Some(host) = next.host_str() {
                    let port = next.port_or_known_default().unwrap_or(80);
                    if let Ok(ip) = host.parse::<IpAddr>() {
                        if is_private_ip(&ip) {
                            return attempt.error("redirect to private IP blocked");
                        }
                    } else {
                        // synchronous DNS resolution to avoid async in redirect policy
                        match format!("{}:{}", host, port).to_socket_addrs() {
                            Ok(addrs) => {
                                for sa in addrs {
                                    if is_private_ip(&sa.ip()) {
                                        return attempt.error("redirect to private IP blocked");
                                    }
                                }
                            }
                            Err(_) => return attempt.error("DNS lookup failed during redirect"),
                        }
                    }
                }
            }
            attempt.follow()
        });

        let client = reqwest::Client::builder()
            .redirect(redirect_policy)
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| {
                ExtractError::fetch("", "Client", Some(anyhow::anyhow!("failed to build HTTP client: {}", e)))
            })?;

        Ok(Self {
            client,
            allow_private_networks,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client, allow_private_networks: bool) -> Self {
        Self {
            client,
            allow_private_networks,
        }
    }

    async fn prepare(&self, url: &str) -> Result<url::Url, ExtractError> {
        if url.is_empty() {
            return Err(ExtractError::validation(url, "Fetch", None));
        }
        let parsed = url::Url::parse(url).map_err(|e| {
            ExtractError::validation(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ExtractError::validation(
                url,
                "Fetch",
                Some(anyhow::anyhow!("scheme must be http or https")),
            ));
        }
        if !self.allow_private_networks {
            guard_private(&parsed, url).await?;
        }
        Ok(parsed)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResult, ExtractError> {
        self.prepare(url).await?;

        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(url, "Fetch", e))?;

        if !self.allow_private_networks {
            guard_private(response.url(), url).await?;
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_CONTENT_LENGTH {
                return Err(ExtractError::fetch(
                    url,
                    "Fetch",
                    Some(anyhow::anyhow!("content too large")),
                ));
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_lowercase());

        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(url, "Fetch", e))?;

        if body.len() > MAX_CONTENT_LENGTH {
            return Err(ExtractError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }

        if !(200..300).contains(&status) {
            return Err(ExtractError::http_status(url, "Fetch", status));
        }

        Ok(FetchResult {
            status,
            url: url.to_string(),
            final_url,
            content_type,
            body,
        })
    }

    async fn fetch_head(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<String, ExtractError> {
        self.prepare(url).await?;

        let mut request = self.client.head(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(url, "Head", e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ExtractError::http_status(url, "Head", status));
        }
        Ok(response.url().to_string())
    }
}
