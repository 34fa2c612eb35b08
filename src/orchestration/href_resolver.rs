//! Path Resolver (href): rewrites a discovered href into the link the
//! mirrored HTML should actually carry (spec.md §4.12).
//!
//! Grounded on the teacher's `link_rewriter`/`link_index` relative-path
//! walk, generalized to three explicit strategies tried in order rather
//! than one combined branch.

use uuid::Uuid;

use crate::orchestration::context::PageContext;

/// Canonicalizes a 32-hex string to the 8-4-4-4-12 UUID form. Returns the
/// input unchanged if it isn't exactly 32 hex characters.
#[must_use]
pub fn format_block_id(block_id: &str) -> String {
    if block_id.len() == 32 && block_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(block_id) {
            if let Ok(array) = <[u8; 16]>::try_from(bytes.as_slice()) {
                return Uuid::from_bytes(array).to_string();
            }
        }
    }
    block_id.to_string()
}

fn relative_walk(source_segments: &[String], target_segments: &[String]) -> String {
    let shared = source_segments
        .iter()
        .zip(target_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = source_segments.len() - shared;
    let mut parts: Vec<&str> = Vec::with_capacity(ups + target_segments.len() - shared + 1);
    for _ in 0..ups {
        parts.push("..");
    }
    for seg in &target_segments[shared..] {
        parts.push(seg);
    }
    parts.push("index.html");
    parts.join("/")
}

/// Resolves the href to write back into `source`'s HTML for a link whose
/// original target was `href`. `target` is `None` for an external (unknown)
/// link. Deterministic and idempotent: re-resolving an already-rewritten
/// relative href through the same `(source, target)` pair yields the same
/// string.
#[must_use]
pub fn resolve_href(source: &PageContext, target: Option<&PageContext>, href: &str, block_id: Option<&str>) -> String {
    match target {
        Some(target) if target.id == source.id => match block_id {
            Some(id) => format!("#{}", format_block_id(id)),
            None => String::new(),
        },
        Some(target) => {
            let mut path = relative_walk(&source.path_segments, &target.path_segments);
            if let Some(id) = block_id {
                path.push('#');
                path.push_str(&format_block_id(id));
            }
            path
        }
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::context::PageId;

    fn ctx(id: &str, segments: &[&str]) -> PageContext {
        PageContext {
            id: PageId::new(id),
            url: format!("https://example.com/{id}"),
            depth: segments.len() as u32,
            parent_id: None,
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments: segments.iter().map(|s| s.to_string()).collect(),
            children: vec![],
            target_file_path: None,
            discovery_order: 0,
            section: None,
            subsection: None,
        }
    }

    #[test]
    fn intra_page_without_block_id_is_empty() {
        let a = ctx("a", &["a"]);
        assert_eq!(resolve_href(&a, Some(&a), "#ignored", None), "");
    }

    #[test]
    fn intra_page_with_block_id_is_hash_fragment() {
        let a = ctx("a", &["a"]);
        let resolved = resolve_href(&a, Some(&a), "#x", Some("deadbeefdeadbeefdeadbeefdeadbeef"));
        assert!(resolved.starts_with('#'));
        assert!(!resolved.contains('/'));
    }

    #[test]
    fn inter_page_drops_shared_prefix_and_walks_up() {
        let source = ctx("s", &["guides", "intro", "s"]);
        let target = ctx("t", &["guides", "advanced", "t"]);
        let href = resolve_href(&source, Some(&target), "ignored", None);
        assert_eq!(href, "../../advanced/t/index.html");
    }

    #[test]
    fn external_link_passes_through_unchanged() {
        let source = ctx("s", &["a"]);
        let href = resolve_href(&source, None, "https://other.example.com/page", None);
        assert_eq!(href, "https://other.example.com/page");
    }

    #[test]
    fn inter_page_never_contains_absolute_filesystem_path() {
        let source = ctx("s", &["a", "b"]);
        let target = ctx("t", &["x"]);
        let href = resolve_href(&source, Some(&target), "ignored", None);
        assert!(!href.starts_with('/'));
    }

    #[test]
    fn format_block_id_canonicalizes_hex_to_uuid_form() {
        let formatted = format_block_id("deadbeefdeadbeefdeadbeefdeadbeef");
        assert_eq!(formatted, "deadbeef-dead-beef-dead-beefdeadbeef");
    }

    #[test]
    fn format_block_id_passes_through_non_hex32() {
        assert_eq!(format_block_id("not-a-block-id"), "not-a-block-id");
    }
}
