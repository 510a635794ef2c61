// ABOUTME: Main library entry point for clipmeta, a video page metadata extractor.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, ExtractionRequest, VideoMetadata, ExtractError, ErrorCode.

//! clipmeta - metadata and downloadable formats for YouTube, TikTok,
//! Instagram and Facebook video pages.
//!
//! Each platform runs an ordered chain of scraping strategies; the first one
//! that finds formats wins, and the rest only fill in missing fields. The
//! records are then filtered by container, quality and media type.
//!
//! # Example
//!
//! ```no_run
//! use clipmeta_core::{Client, ExtractError, ExtractionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let client = Client::builder().build()?;
//!     let request = ExtractionRequest::new("https://youtu.be/dQw4w9WgXcQ").download_link(true);
//!     let metadata = client.extract(&request).await?;
//!     println!("{} -> {:?}", metadata.title, metadata.selected_download_url);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod options;
pub mod pipeline;
pub mod platform;
pub mod platforms;
pub mod request;
pub mod resource;
pub mod result;
pub mod support;

pub use crate::client::Client;
pub use crate::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Outcome, TracingSink};
pub use crate::error::{ErrorCode, ExtractError};
pub use crate::formats::{FormatRecord, MediaType};
pub use crate::options::{ClientBuilder, Options};
pub use crate::pipeline::Stage;
pub use crate::platform::{detect, Platform};
pub use crate::request::ExtractionRequest;
pub use crate::resource::{FetchResult, HttpFetcher, PageFetcher};
pub use crate::result::{FormatsReport, Result, VideoMetadata};
pub use crate::support::{PlatformSupport, SupportInfo};
