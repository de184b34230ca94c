//! Rendering glue the HTTP layer needs that doesn't belong in the core:
//! the JSON-API list envelope and `Range`/`Content-Range` header handling.
//! Per-file Content-Disposition/MIME resolution lives in
//! `filegate::content_disposition` since specification §8 tests it as a
//! standalone, directly unit-testable scenario.

use filegate::metadata::Metadata;
use serde_json::{json, Value};

/// Builds a `{"data": [...]}` envelope out of a folder listing, reusing
/// each entry's own [`Metadata::json_api_serialized`] `data` object.
pub fn list_envelope(resource: &str, entries: &[Metadata]) -> Value {
    let data: Vec<Value> = entries
        .iter()
        .map(|entry| entry.json_api_serialized(resource)["data"].clone())
        .collect();
    json!({ "data": data })
}

/// Parses a `Range: bytes=...` header value into the half-open
/// `(start, end)` interval [`filegate::provider::Provider::download`]
/// expects, resolving open-ended forms against `total` when known.
/// Returns `None` for anything malformed or unresolvable, in which case
/// the caller should fall back to a full, unranged response.
pub fn parse_range(value: &str, total: Option<u64>) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start_s, end_s) = spec.split_once('-')?;
    match (start_s.trim(), end_s.trim()) {
        ("", "") => None,
        ("", suffix) => {
            let total = total?;
            let suffix_len: u64 = suffix.parse().ok()?;
            Some((total.saturating_sub(suffix_len), total))
        }
        (start, "") => {
            let start: u64 = start.parse().ok()?;
            Some((start, total.unwrap_or(u64::MAX)))
        }
        (start, end) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if end < start {
                return None;
            }
            Some((start, end.saturating_add(1)))
        }
    }
}

/// Builds the `Content-Range: bytes start-end/total` response header for a
/// resolved, half-open `[start, end)` interval.
pub fn content_range_header(start: u64, end: u64, total: Option<u64>) -> String {
    let total = total.map(|t| t.to_string()).unwrap_or_else(|| "*".to_string());
    format!("bytes {}-{}/{}", start, end.saturating_sub(1), total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bounded_range_as_half_open() {
        assert_eq!(parse_range("bytes=2-6", Some(10)), Some((2, 7)));
    }

    #[test]
    fn parses_an_open_ended_range_against_a_known_total() {
        assert_eq!(parse_range("bytes=5-", Some(10)), Some((5, 10)));
    }

    #[test]
    fn parses_a_suffix_range_against_a_known_total() {
        assert_eq!(parse_range("bytes=-3", Some(10)), Some((7, 10)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_range("nonsense", Some(10)), None);
        assert_eq!(parse_range("bytes=10-2", Some(10)), None);
    }

    #[test]
    fn renders_content_range() {
        assert_eq!(content_range_header(2, 7, Some(10)), "bytes 2-6/10");
        assert_eq!(content_range_header(0, 5, None), "bytes 0-4/*");
    }
}
