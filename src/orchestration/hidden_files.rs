//! Hidden File Registry: cross-page deduplication of asset URLs (spec.md §4.9).
//!
//! Backed by `DashMap` rather than a plain `HashMap` behind a lock: multiple
//! worker RESULT handlers can race to claim the same asset URL during the
//! Download phase, and `entry()` gives atomic claim semantics without the
//! master having to serialize access itself.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone)]
pub enum AssetOutcome {
    Downloaded { saved_path: String, size: u64 },
    Failed { message: String },
}

#[derive(Debug, Clone)]
struct AssetRecord {
    page_id: String,
    outcome: Option<AssetOutcome>,
}

/// Lowercases the host, strips volatile (cache-busting) query parameters,
/// and preserves path and fragment (spec.md §4.9).
#[must_use]
pub fn normalize(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    if let Some(host) = parsed.host_str() {
        let lower = host.to_lowercase();
        let _ = parsed.set_host(Some(&lower));
    }
    let volatile = ["t", "v", "cb", "cache", "_", "timestamp"];
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !volatile.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }
    parsed.into()
}

#[derive(Debug, Default)]
pub struct HiddenFileRegistry {
    entries: DashMap<String, AssetRecord>,
}

impl HiddenFileRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `url` is neither already recorded nor currently pending.
    #[must_use]
    pub fn should_process(&self, url: &str) -> bool {
        !self.entries.contains_key(&normalize(url))
    }

    /// Atomic claim: returns `false` if another caller already claimed this
    /// URL, `true` if this call is the one that won.
    pub fn mark_pending(&self, url: &str, page_id: &str) -> bool {
        let key = normalize(url);
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(AssetRecord { page_id: page_id.to_string(), outcome: None });
                true
            }
        }
    }

    pub fn record_download(&self, url: &str, saved_path: &str, page_id: &str, size: u64) {
        let key = normalize(url);
        self.entries.insert(
            key,
            AssetRecord {
                page_id: page_id.to_string(),
                outcome: Some(AssetOutcome::Downloaded { saved_path: saved_path.to_string(), size }),
            },
        );
    }

    pub fn record_failure(&self, url: &str, page_id: &str, message: &str) {
        let key = normalize(url);
        self.entries.insert(
            key,
            AssetRecord {
                page_id: page_id.to_string(),
                outcome: Some(AssetOutcome::Failed { message: message.to_string() }),
            },
        );
    }

    /// Path a later worker should rewrite references to, if this asset has
    /// already been downloaded successfully.
    #[must_use]
    pub fn get_saved_path(&self, url: &str) -> Option<String> {
        let key = normalize(url);
        match self.entries.get(&key)?.outcome.as_ref()? {
            AssetOutcome::Downloaded { saved_path, .. } => Some(saved_path.clone()),
            AssetOutcome::Failed { .. } => None,
        }
    }

    /// Every already-downloaded asset, keyed by its normalized URL. Handed
    /// to a worker dispatching a new `DOWNLOAD` task so it can skip assets
    /// a different worker process already fetched for an earlier page.
    #[must_use]
    pub fn snapshot(&self) -> std::collections::HashMap<String, String> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.value().outcome {
                Some(AssetOutcome::Downloaded { saved_path, .. }) => {
                    Some((entry.key().clone(), saved_path.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_loses() {
        let reg = HiddenFileRegistry::new();
        assert!(reg.mark_pending("https://a.com/x.png", "p1"));
        assert!(!reg.mark_pending("https://a.com/x.png", "p2"));
    }

    #[test]
    fn should_process_false_once_pending_or_recorded() {
        let reg = HiddenFileRegistry::new();
        assert!(reg.should_process("https://a.com/x.png"));
        reg.mark_pending("https://a.com/x.png", "p1");
        assert!(!reg.should_process("https://a.com/x.png"));
    }

    #[test]
    fn normalize_strips_cache_busting_query_and_lowercases_host() {
        let a = normalize("https://A.COM/x.png?v=123&size=full");
        let b = normalize("https://a.com/x.png?size=full");
        assert_eq!(a, b);
    }

    #[test]
    fn recorded_download_is_retrievable_by_later_worker() {
        let reg = HiddenFileRegistry::new();
        reg.mark_pending("https://a.com/x.png", "p1");
        reg.record_download("https://a.com/x.png", "/out/assets/x.png", "p1", 1024);
        assert_eq!(reg.get_saved_path("https://a.com/x.png"), Some("/out/assets/x.png".to_string()));
    }

    #[test]
    fn failed_asset_has_no_saved_path() {
        let reg = HiddenFileRegistry::new();
        reg.mark_pending("https://a.com/x.png", "p1");
        reg.record_failure("https://a.com/x.png", "p1", "timeout");
        assert_eq!(reg.get_saved_path("https://a.com/x.png"), None);
    }
}
