// ABOUTME: Duration string parsing for video lengths found in metadata tags and JSON blobs.
// ABOUTME: Supports ISO-8601 (PT1H2M3S), integer seconds, HH:MM:SS and MM:SS.

use once_cell::sync::Lazy;
use regex::Regex;

static ISO_8601_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.\d+)?S)?)?$")
        .expect("Invalid ISO-8601 duration regex")
});

/// Parses a duration string into whole seconds.
/// Returns None if the input is empty or not in a recognised format.
pub fn parse_duration_seconds(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }

    if let Ok(secs) = s.parse::<f64>() {
        if secs >= 0.0 {
            return Some(secs as u64);
        }
        return None;
    }

    if s.contains(':') {
        return parse_colon_format(s);
    }

    parse_iso_8601(s)
}

fn parse_iso_8601(s: &str) -> Option<u64> {
    if s.eq_ignore_ascii_case("P") || s.eq_ignore_ascii_case("PT") {
        return None;
    }
    let caps = ISO_8601_RE.captures(s)?;
    let mut total: u64 = 0;
    for (group, unit) in [(1, 86_400u64), (2, 3_600), (3, 60), (4, 1)] {
        let Some(m) = caps.get(group) else {
            continue;
        };
        let value: u64 = m.as_str().parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    Some(total)
}

/// `[[h:]m:]s` with every unit checked for overflow; page values are untrusted.
fn parse_colon_format(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let mut total: u64 = 0;
    for part in parts {
        let value: u64 = part.trim().parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    Some(total)
}
