// ABOUTME: Error types for clipmeta including the ErrorCode taxonomy and the ExtractError struct.
// ABOUTME: Provides categorized errors with convenience constructors, boolean helpers and a facade status code.

use std::fmt;

use crate::pipeline::Stage;

/// Error codes representing the categories of extraction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Missing or malformed request input.
    Validation,
    /// The URL does not match any known platform pattern.
    UnsupportedPlatform,
    /// Non-2xx response (`Some(status)`) or transport failure (`None`).
    Http { status: Option<u16> },
    Timeout,
    Ssrf,
    /// Malformed embedded data. Recovered locally, never returned by `Client`.
    Parse,
    /// A filter stage emptied the result set.
    NoMatch(Stage),
    /// Extraction produced zero usable records.
    NoFormats,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Validation => write!(f, "invalid request"),
            ErrorCode::UnsupportedPlatform => write!(f, "unsupported platform"),
            ErrorCode::Http { status: Some(status) } => write!(f, "HTTP status {}", status),
            ErrorCode::Http { status: None } => write!(f, "fetch error"),
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::Ssrf => write!(f, "SSRF blocked"),
            ErrorCode::Parse => write!(f, "parse error"),
            ErrorCode::NoMatch(stage) => write!(f, "no formats match {}", stage),
            ErrorCode::NoFormats => write!(f, "no formats found"),
        }
    }
}

/// The error type for every fallible clipmeta operation.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clipmeta: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    pub fn new(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Validation error.
    pub fn validation(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Validation, url, op, source)
    }

    /// Create an UnsupportedPlatform error.
    pub fn unsupported(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::UnsupportedPlatform, url, op, source)
    }

    /// Create an Http error for a non-2xx response.
    pub fn http_status(url: impl Into<String>, op: impl Into<String>, status: u16) -> Self {
        Self::new(ErrorCode::Http { status: Some(status) }, url, op, None)
    }

    /// Create an Http error for a transport failure.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Http { status: None }, url, op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Timeout, url, op, source)
    }

    /// Create an SSRF error.
    pub fn ssrf(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Ssrf, url, op, source)
    }

    /// Create a Parse error.
    pub fn parse(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Parse, url, op, source)
    }

    /// Create a NoMatch error for the given filter stage.
    pub fn no_match(
        stage: Stage,
        url: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::NoMatch(stage), url, "Filter", source)
    }

    /// Create a NoFormats error.
    pub fn no_formats(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoFormats, url, op, None)
    }

    /// Returns true if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::Validation
    }

    /// Returns true if this is an UnsupportedPlatform error.
    pub fn is_unsupported(&self) -> bool {
        self.code == ErrorCode::UnsupportedPlatform
    }

    /// Returns true if this is an Http error, regardless of status.
    pub fn is_http(&self) -> bool {
        matches!(self.code, ErrorCode::Http { .. })
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if this is an SSRF error.
    pub fn is_ssrf(&self) -> bool {
        self.code == ErrorCode::Ssrf
    }

    /// Returns true if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        self.code == ErrorCode::Parse
    }

    /// Returns true if this is a NoMatch error for any stage.
    pub fn is_no_match(&self) -> bool {
        matches!(self.code, ErrorCode::NoMatch(_))
    }

    /// Returns true if this is a NoFormats error.
    pub fn is_no_formats(&self) -> bool {
        self.code == ErrorCode::NoFormats
    }

    /// Returns true for failures of the network layer (HTTP, timeout, SSRF).
    pub fn is_fetch_failure(&self) -> bool {
        self.is_http() || self.is_timeout() || self.is_ssrf()
    }

    /// HTTP-style status code reported by the JSON facade.
    ///
    /// Request problems map to 400; everything else collapses to 500.
    pub fn status_code(&self) -> u16 {
        match self.code {
            ErrorCode::Validation | ErrorCode::UnsupportedPlatform => 400,
            _ => 500,
        }
    }

    /// Copy of this error without its source chain, keeping the message.
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            code: self.code,
            url: self.url.clone(),
            op: self.op.clone(),
            source: self.source.as_ref().map(|s| anyhow::anyhow!("{}", s)),
        }
    }
}
