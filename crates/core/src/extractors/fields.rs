// ABOUTME: Selector helpers that pull attribute values and text out of a parsed HTML document.
// ABOUTME: Used to collect meta tags, media sources and titles into page facts.

//! Selector-based field helpers.
//!
//! Key behaviors:
//! - Text selectors are tried in order; first non-empty match wins.
//! - Whitespace is normalized (collapsed to single spaces, trimmed).
//! - Empty strings are treated as no match.

use scraper::{Html, Selector};

/// Normalizes whitespace in a string by collapsing runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collects every non-empty value of `attr` on elements matching `selector`, in document order.
pub fn collect_attr(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts normalized text content from the first selector that yields a non-empty match.
pub fn extract_field_text_single(doc: &Html, selectors: &[&str]) -> Option<String> {
    for &sel_str in selectors {
        let sel = match Selector::parse(sel_str) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for el in doc.select(&sel) {
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            let normalized = normalize_whitespace(&text);
            if !normalized.is_empty() {
                return Some(normalized);
            }
        }
    }
    None
}
