//! Filesystem path mapping: `PageContext` path segments to an on-disk
//! target, and that target to an absolute save path (spec.md §4.8, §4.15).
//!
//! Grounded on `utils::get_mirror_path`'s domain/path-join idiom, but pure
//! and synchronous: the orchestrator already has `path_segments` resolved,
//! so there is no URL to parse here.

use std::path::{Path, PathBuf};

use crate::orchestration::context::PageContext;

/// `path_segments.join("index.html")`, or plain `"index.html"` at the root.
#[must_use]
pub fn target_file_path(ctx: &PageContext) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in &ctx.path_segments {
        path.push(segment);
    }
    path.push("index.html");
    path
}

/// `resolve(cwd, output_dir, target)` per spec.md §4.8: always returns an
/// absolute path. Panics in debug builds if the caller already handed in a
/// relative `output_dir` — that is the fatal programmer error the spec
/// calls out, not a recoverable runtime condition.
#[must_use]
pub fn absolute_save_path(output_dir: &Path, target: &Path) -> PathBuf {
    debug_assert!(output_dir.is_absolute(), "output_dir must already be absolute");
    output_dir.join(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::context::PageId;

    fn ctx(segments: &[&str]) -> PageContext {
        PageContext {
            id: PageId::new("x"),
            url: "https://example.com".into(),
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
    fn root_target_is_bare_index() {
        assert_eq!(target_file_path(&ctx(&[])), PathBuf::from("index.html"));
    }

    #[test]
    fn nested_target_joins_segments() {
        assert_eq!(target_file_path(&ctx(&["guides", "intro"])), PathBuf::from("guides/intro/index.html"));
    }

    #[test]
    fn absolute_save_path_joins_output_dir() {
        let resolved = absolute_save_path(Path::new("/out"), Path::new("guides/intro/index.html"));
        assert_eq!(resolved, PathBuf::from("/out/guides/intro/index.html"));
    }
}
