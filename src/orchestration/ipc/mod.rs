//! Master↔worker IPC: typed envelopes over newline-delimited JSON on a
//! child process's stdio (spec.md §4.1).

pub mod transport;

pub use transport::{Envelope, IpcError, WorkerTransport};

use serde::{Deserialize, Serialize};

use crate::orchestration::context::{Link, PageId};
use crate::orchestration::error::WireError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MasterCommand {
    Init { config: InitSnapshot, titles: std::collections::HashMap<PageId, String> },
    SetCookies { cookies: Vec<CookieRecord> },
    Discover {
        url: String,
        page_id: PageId,
        parent_id: Option<PageId>,
        depth: u32,
        is_first_page: bool,
        cookies: Option<Vec<CookieRecord>>,
    },
    Download {
        url: String,
        page_id: PageId,
        depth: u32,
        save_path: std::path::PathBuf,
        /// Absolute mirror root; `save_path` is always a descendant of it.
        /// Lets the worker compute a relative href from any page to any
        /// other page's or asset's `save_path` without the master having
        /// to pre-resolve every cross-page link itself.
        output_dir: std::path::PathBuf,
        cookies: Vec<CookieRecord>,
        link_rewrite_map: std::collections::HashMap<PageId, String>,
        /// Normalized asset URL -> already-saved relative path, snapshotted
        /// from the master's Hidden File Registry (spec.md §4.9). A worker
        /// skips re-downloading anything present here.
        known_assets: std::collections::HashMap<String, String>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSnapshot {
    pub root_url: String,
    pub max_depth: u32,
    pub page_load_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub cookie_wait_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkerMessage {
    Ready { pid: u32 },
    Result {
        task_type: TaskType,
        data: Option<ResultData>,
        error: Option<WireError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Discover,
    Download,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultData {
    Discovery(DiscoveryResult),
    Download(DownloadResult),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub page_id: PageId,
    pub url: String,
    pub resolved_title: Option<String>,
    pub links: Vec<Link>,
    pub cookies: Option<Vec<CookieRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub page_id: PageId,
    pub saved_path: std::path::PathBuf,
    pub assets_downloaded: u32,
    pub links_rewritten: u32,
    /// Assets this worker actually fetched (i.e. not already present in
    /// `known_assets`), reported back so the master can register them in
    /// the Hidden File Registry before the next `DOWNLOAD` dispatch.
    pub new_assets: Vec<DownloadedAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedAsset {
    pub url: String,
    pub saved_path: String,
    pub size: u64,
}
