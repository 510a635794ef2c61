// ABOUTME: HTML and embedded-JSON extraction strategies shared by every platform scraper.
// ABOUTME: Includes page facts, blob location, tolerant JSON access and the fallback chain runner.

//! Extraction building blocks.
//!
//! Submodules:
//! - `page`: one-pass page facts (meta tags, scripts, media sources).
//! - `embedded`: locating and parsing JSON blobs inside markup.
//! - `json`: presence-checked accessors over `serde_json::Value`.
//! - `chain`: the ordered first-success strategy runner.
//! - `generic`: JSON-LD and meta-tag strategies used by all platforms.

pub mod chain;
pub mod duration;
pub mod embedded;
pub mod fields;
pub mod generic;
pub mod json;
pub mod page;
