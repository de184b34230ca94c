//! Download-response framing (specification §6, "Content-Disposition" and
//! "MIME override table").
//!
//! These are pure functions rather than something baked into
//! [`crate::provider::Provider::download`] because they depend only on a
//! display name and a reported content type, not on any backend state — the
//! HTTP layer (out of scope for this crate, see §1) calls them once per
//! response.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use unicode_normalization::UnicodeNormalization;

/// RFC 5987 `attr-char`: alphanumerics plus a handful of symbols are left
/// unescaped; everything else (including every non-ASCII byte) is
/// percent-encoded. `NON_ALPHANUMERIC` already covers the superset we want,
/// so narrow it back down to the handful of punctuation RFC 5987 actually
/// permits unescaped.
const RFC5987_ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds the `Content-Disposition` header value for downloading an entity
/// named `name`: an ASCII-only `filename` fallback for legacy clients and an
/// RFC 5987 `filename*` carrying the exact UTF-8 name.
///
/// Mirrors `waterbutler.core.utils.make_disposition`.
pub fn content_disposition(name: &str) -> String {
    let stripped = stripped_filename(name);
    let encoded = utf8_percent_encode(name, RFC5987_ATTR_CHAR);
    format!("attachment; filename=\"{stripped}\"; filename*=UTF-8''{encoded}")
}

/// Reduces `name` to an ASCII-safe `filename` fallback: decomposes accented
/// characters to their base letter (dropping the combining marks Unicode
/// decomposition splits them into), replaces control characters (0x00–0x1F)
/// with `_`, and backslash-escapes `\` and `"` so the result is safe to
/// quote in a header value.
fn stripped_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.nfkd() {
        if !c.is_ascii() {
            continue;
        }
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => out.push('_'),
            c => out.push(c),
        }
    }
    out
}

/// Extensions for which the reported backend content type is overridden
/// outright, so a downstream renamer never appends a misleading `.txt`
/// (specification §6, "MIME override table").
const MIME_OVERRIDES: &[(&str, &str)] = &[
    ("csv", "text/csv"),
    ("md", "text/x-markdown"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("webm", "video/webm"),
    ("ogv", "video/ogg"),
];

/// Resolves the content type to report for `name`: the whitelist override
/// if its extension matches one, otherwise `backend_content_type`, falling
/// back to `application/octet-stream` if neither is known.
pub fn resolve_content_type(name: &str, backend_content_type: Option<&str>) -> String {
    let extension = name.rsplit('.').next().filter(|ext| *ext != name).map(str::to_lowercase);
    if let Some(extension) = extension.as_deref() {
        if let Some((_, mime)) = MIME_OVERRIDES.iter().find(|(ext, _)| *ext == extension) {
            return mime.to_string();
        }
    }
    backend_content_type
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accented_display_name_decomposes_to_ascii_and_keeps_the_exact_utf8_form() {
        let header = content_disposition("résumé.txt");
        assert_eq!(
            header,
            "attachment; filename=\"resume.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"
        );
    }

    #[test]
    fn control_characters_are_replaced_and_quotes_are_escaped() {
        let stripped_only = content_disposition("evil\"\\name\u{0007}.txt");
        assert!(stripped_only.contains("filename=\"evil\\\"\\\\name_.txt\""));
    }

    #[test]
    fn plain_ascii_name_round_trips_unchanged_in_both_forms() {
        let header = content_disposition("report.txt");
        assert_eq!(
            header,
            "attachment; filename=\"report.txt\"; filename*=UTF-8''report.txt"
        );
    }

    #[test]
    fn whitelisted_extensions_override_the_backend_content_type() {
        assert_eq!(resolve_content_type("data.csv", Some("application/octet-stream")), "text/csv");
        assert_eq!(resolve_content_type("notes.md", Some("text/plain")), "text/x-markdown");
        assert_eq!(resolve_content_type("clip.webm", None), "video/webm");
    }

    #[test]
    fn unlisted_extensions_keep_whatever_the_backend_reported() {
        assert_eq!(resolve_content_type("photo.png", Some("image/png")), "image/png");
    }

    #[test]
    fn unknown_content_type_falls_back_to_octet_stream() {
        assert_eq!(resolve_content_type("mystery", None), "application/octet-stream");
    }
}
