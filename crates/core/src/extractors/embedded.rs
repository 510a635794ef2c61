// ABOUTME: Locates embedded JSON blobs in markup (assigned globals, script bodies, inline string fields).
// ABOUTME: Brace matching understands string literals and escapes; parse failures surface as Parse errors.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ExtractError;

/// `key: "value"` pairs, with the key optionally quoted.
static STRING_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""?([A-Za-z_$][\w$]*)"?\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("Invalid string field regex")
});

/// Parse a candidate blob, mapping failure to a recoverable Parse error.
pub fn parse_json(text: &str, url: &str, op: &str) -> Result<Value, ExtractError> {
    serde_json::from_str::<Value>(text.trim()).map_err(|e| {
        ExtractError::parse(url, op, Some(anyhow::anyhow!("malformed JSON: {}", e)))
    })
}

/// Slice of `src` from its first `{` through the matching `}`.
pub fn balanced_object(src: &str) -> Option<&str> {
    let start = src.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in src[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&src[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the object assigned to `marker` (e.g. `ytInitialPlayerResponse = {...};`) and parse it.
///
/// Every occurrence of the marker is tried in order; the first one followed by
/// an assignment of a parseable object wins.
pub fn assigned_json(html: &str, marker: &str, url: &str) -> Result<Value, ExtractError> {
    let mut last_err = None;
    for (pos, _) in html.match_indices(marker) {
        let rest = html[pos + marker.len()..]
            .trim_start_matches(|c: char| c == '"' || c == '\'' || c == ']' || c.is_whitespace());
        let Some(rest) = rest
            .strip_prefix('=')
            .or_else(|| rest.strip_prefix(':'))
            .or_else(|| rest.strip_prefix(','))
        else {
            continue;
        };
        let rest = rest.trim_start();
        if !rest.starts_with('{') {
            continue;
        }
        let Some(blob) = balanced_object(rest) else {
            last_err = Some(ExtractError::parse(
                url,
                marker,
                Some(anyhow::anyhow!("unterminated object after {}", marker)),
            ));
            continue;
        };
        match parse_json(blob, url, marker) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        ExtractError::parse(url, marker, Some(anyhow::anyhow!("{} not found", marker)))
    }))
}

/// Decode the body of a JSON string literal (without the surrounding quotes).
pub fn decode_json_string(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

/// Every string value assigned to `key` in inline script text, decoded.
///
/// Matches both JSON (`"key":"..."`) and object-literal (`key:"..."`) forms.
pub fn string_fields(html: &str, key: &str) -> Vec<String> {
    STRING_FIELD_RE
        .captures_iter(html)
        .filter(|caps| caps.get(1).is_some_and(|k| k.as_str() == key))
        .filter_map(|caps| caps.get(2))
        .filter_map(|m| decode_json_string(m.as_str()))
        .filter(|s| !s.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_object_handles_strings_and_nesting() {
        let src = r#"x = {"a":{"b":"}{"},"c":"He said \"hi\""}; more"#;
        assert_eq!(
            balanced_object(src),
            Some(r#"{"a":{"b":"}{"},"c":"He said \"hi\""}"#)
        );
        assert_eq!(balanced_object("no braces"), None);
        assert_eq!(balanced_object(r#"{"open": 1"#), None);
    }

    #[test]
    fn assigned_json_finds_var_assignment() {
        let html = r#"<script>var ytInitialPlayerResponse = {"videoDetails":{"title":"T"}};var x=1;</script>"#;
        let value = assigned_json(html, "ytInitialPlayerResponse", "u").unwrap();
        assert_eq!(value["videoDetails"]["title"], "T");
    }

    #[test]
    fn assigned_json_skips_references_without_assignment() {
        let html = r#"if (window.ytInitialPlayerResponse) {}; window["ytInitialPlayerResponse"] = {"ok":true};"#;
        let value = assigned_json(html, "ytInitialPlayerResponse", "u").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn assigned_json_malformed_is_parse_error() {
        let html = r#"window._sharedData = {"a": nope};"#;
        let err = assigned_json(html, "window._sharedData", "u").unwrap_err();
        assert!(err.is_parse());

        let err = assigned_json("<p>nothing</p>", "window._sharedData", "u").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn string_fields_decode_escapes() {
        let html = r#"{"playable_url":"https:\/\/video.example.com\/v.mp4?a=1&b=2","x":1} hd_src:"https://cdn.example.com/hd.mp4""#;
        assert_eq!(
            string_fields(html, "playable_url"),
            vec!["https://video.example.com/v.mp4?a=1&b=2".to_string()]
        );
        assert_eq!(
            string_fields(html, "hd_src"),
            vec!["https://cdn.example.com/hd.mp4".to_string()]
        );
        assert!(string_fields(html, "sd_src").is_empty());
    }

    #[test]
    fn string_fields_match_whole_keys_only() {
        let html = r#"{"playable_url":"https://a.test/sd.mp4","playable_url_quality_hd":"https://a.test/hd.mp4","note":"x playable_url:\"https://a.test/no.mp4\""}"#;
        assert_eq!(
            string_fields(html, "playable_url"),
            vec!["https://a.test/sd.mp4".to_string()]
        );
        assert_eq!(
            string_fields(html, "playable_url_quality_hd"),
            vec!["https://a.test/hd.mp4".to_string()]
        );
    }

    #[test]
    fn parse_json_error_is_recoverable() {
        assert!(parse_json("{]", "u", "ld+json").unwrap_err().is_parse());
        assert_eq!(parse_json(" {\"a\":1} ", "u", "ld+json").unwrap()["a"], 1);
    }
}
