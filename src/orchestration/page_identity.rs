//! Canonical ID extraction from URLs and title sanitization.
//!
//! Both functions are pure and `#[must_use]`; together they are the only
//! place path-segment-safe names are derived (spec.md §4.3).

use regex::Regex;
use std::sync::OnceLock;

fn hex32_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[0-9a-fA-F]{32}").expect("valid regex"))
}

fn non_alnum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[^A-Za-z0-9]+").expect("valid regex"))
}

/// Returns the last 32-character hex run in `url`'s path, lowercased. If
/// none is present, `url` itself is the id (kept worker-side consistent).
#[must_use]
pub fn extract_canonical_id(url: &str) -> String {
    match hex32_re().find_iter(url).last() {
        Some(m) => m.as_str().to_lowercase(),
        None => url.to_string(),
    }
}

/// Collapses runs of non-`[A-Za-z0-9]` characters to a single `_`, trims
/// leading/trailing `_`, and falls back to `"Untitled"` when empty.
/// Deterministic and idempotent: `sanitize(sanitize(x)) == sanitize(x)`.
#[must_use]
pub fn sanitize(title: &str) -> String {
    let collapsed = non_alnum_re().replace_all(title, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_hex_run() {
        let id = extract_canonical_id("https://wiki.example.com/Getting-Started-deadbeefdeadbeefdeadbeefdeadbeef");
        assert_eq!(id, "deadbeefdeadbeefdeadbeefdeadbeef");
    }

    #[test]
    fn falls_back_to_url_when_no_hex_run() {
        let url = "https://wiki.example.com/about";
        assert_eq!(extract_canonical_id(url), url);
    }

    #[test]
    fn uses_last_hex_run_when_multiple_present() {
        let id = extract_canonical_id(
            "https://wiki.example.com/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
        );
        assert_eq!(id, "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    }

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize("Getting Started: FAQ!!"), "Getting_Started_FAQ");
        assert_eq!(sanitize("  leading/trailing  "), "leading_trailing");
    }

    #[test]
    fn sanitize_empty_falls_back_to_untitled() {
        assert_eq!(sanitize(""), "Untitled");
        assert_eq!(sanitize("***"), "Untitled");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["Hello, World!", "", "already_clean", "___weird___"] {
            let once = sanitize(input);
            let twice = sanitize(&once);
            assert_eq!(once, twice);
        }
    }
}
