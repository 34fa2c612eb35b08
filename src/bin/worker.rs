//! `worker` — chromiumoxide-backed process satisfying the master's IPC
//! contract: reads `MasterCommand` envelopes as newline-delimited JSON on
//! stdin, writes `WorkerMessage` envelopes to stdout.
//!
//! Grounded on the teacher's `crawl_engine::page_processor`/`page_extractor`
//! navigate-then-`page.evaluate()` idiom: one long-lived `Browser`, a fresh
//! `Page` per task, all DOM reads and rewrites done in-page via JavaScript
//! rather than a second HTML-parsing crate.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use wiki_mirror::orchestration::context::{Link, PageId};
use wiki_mirror::orchestration::error::{ErrorKind, WireError};
use wiki_mirror::orchestration::hidden_files::normalize;
use wiki_mirror::orchestration::ipc::{
    CookieRecord, DiscoveryResult, DownloadResult, DownloadedAsset, InitSnapshot, MasterCommand,
    ResultData, TaskType, WorkerMessage,
};
use wiki_mirror::orchestration::page_identity::extract_canonical_id;
use wiki_mirror::utils::is_valid_url;
use wiki_mirror::{apply_stealth_measures, launch_browser};

const LINKS_SCRIPT: &str = r"
(() => {
    const seen = new Set();
    const out = [];
    for (const a of document.querySelectorAll('a[href]')) {
        let absolute;
        try {
            absolute = new URL(a.getAttribute('href'), window.location.href).href;
        } catch (e) {
            continue;
        }
        if (!absolute.startsWith('http:') && !absolute.startsWith('https:')) continue;
        if (seen.has(absolute)) continue;
        seen.add(absolute);
        out.push({ url: absolute, text: (a.textContent || '').trim() });
    }
    return out;
})()
";

const ASSET_URLS_SCRIPT: &str = r"
(() => {
    const seen = new Set();
    const out = [];
    const push = (src) => {
        if (!src) return;
        let absolute;
        try {
            absolute = new URL(src, window.location.href).href;
        } catch (e) {
            return;
        }
        if (!absolute.startsWith('http:') && !absolute.startsWith('https:')) return;
        if (seen.has(absolute)) return;
        seen.add(absolute);
        out.push(absolute);
    };
    document.querySelectorAll('img[src]').forEach(el => push(el.getAttribute('src')));
    document.querySelectorAll('script[src]').forEach(el => push(el.getAttribute('src')));
    document.querySelectorAll('link[rel=\"stylesheet\"][href]').forEach(el => push(el.getAttribute('href')));
    return out;
})()
";

fn hex32_run(href: &str) -> Option<String> {
    let id = extract_canonical_id(href);
    if id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(id)
    } else {
        None
    }
}

/// Builds the rewrite script: replaces internal anchor hrefs whose trailing
/// 32-hex run is a key of `link_relatives`, and asset `src`/`href`
/// attributes matching a key of `asset_relatives`, then returns the
/// rewritten document's outer HTML alongside how many anchors were touched.
fn rewrite_script(link_relatives: &HashMap<String, String>, asset_relatives: &HashMap<String, String>) -> String {
    let link_json = serde_json::to_string(link_relatives).unwrap_or_else(|_| "{}".into());
    let asset_json = serde_json::to_string(asset_relatives).unwrap_or_else(|_| "{}".into());
    format!(
        r"
(() => {{
    const linkMap = {link_json};
    const assetMap = {asset_json};
    const hex32 = /[0-9a-fA-F]{{32}}/g;
    let rewritten = 0;

    for (const a of document.querySelectorAll('a[href]')) {{
        let absolute;
        try {{
            absolute = new URL(a.getAttribute('href'), window.location.href).href;
        }} catch (e) {{
            continue;
        }}
        const matches = absolute.match(hex32);
        if (!matches) continue;
        const id = matches[matches.length - 1].toLowerCase();
        const rel = linkMap[id];
        if (rel !== undefined) {{
            a.setAttribute('href', rel);
            rewritten += 1;
        }}
    }}

    const rewriteAttr = (el, attr) => {{
        const raw = el.getAttribute(attr);
        if (!raw) return;
        let absolute;
        try {{
            absolute = new URL(raw, window.location.href).href;
        }} catch (e) {{
            return;
        }}
        const rel = assetMap[absolute];
        if (rel !== undefined) el.setAttribute(attr, rel);
    }};
    document.querySelectorAll('img[src]').forEach(el => rewriteAttr(el, 'src'));
    document.querySelectorAll('script[src]').forEach(el => rewriteAttr(el, 'src'));
    document.querySelectorAll('link[rel=\"stylesheet\"][href]').forEach(el => rewriteAttr(el, 'href'));

    return {{ html: document.documentElement.outerHTML, rewritten }};
}})()
"
    )
}

fn fetch_hex_script(url: &str) -> String {
    let encoded = serde_json::to_string(url).unwrap_or_else(|_| format!("\"{url}\""));
    format!(
        r"
(async () => {{
    const res = await fetch({encoded});
    const buf = await res.arrayBuffer();
    const bytes = new Uint8Array(buf);
    let hex = '';
    for (let i = 0; i < bytes.length; i++) {{
        hex += bytes[i].toString(16).padStart(2, '0');
    }}
    return hex;
}})()
"
    )
}

#[derive(serde::Deserialize)]
struct RewriteOutcome {
    html: String,
    rewritten: u32,
}

#[derive(serde::Deserialize)]
struct RawLink {
    url: String,
    text: String,
}

struct WorkerState {
    browser: Browser,
    _handler: JoinHandle<()>,
    config: Option<InitSnapshot>,
    cookies: Vec<CookieRecord>,
}

impl WorkerState {
    fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.config.as_ref().map_or(30, |c| c.page_load_timeout_secs))
    }

    fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.as_ref().map_or(30, |c| c.navigation_timeout_secs))
    }

    fn cookie_wait(&self) -> Duration {
        Duration::from_secs(self.config.as_ref().map_or(2, |c| c.cookie_wait_secs))
    }
}

fn send(message: &WorkerMessage) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(line.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn to_cookie_params(cookies: &[CookieRecord]) -> Vec<CookieParam> {
    cookies
        .iter()
        .filter_map(|c| {
            CookieParam::builder()
                .name(c.name.clone())
                .value(c.value.clone())
                .domain(c.domain.clone())
                .path(c.path.clone())
                .build()
                .ok()
        })
        .collect()
}

async fn new_page(state: &WorkerState, cookies: &[CookieRecord]) -> anyhow::Result<Page> {
    let page = state.browser.new_page("about:blank").await?;
    if let Err(err) = apply_stealth_measures(&page).await {
        tracing::warn!(error = %err, "stealth measures failed, continuing without them");
    }
    if !cookies.is_empty() {
        page.set_cookies(to_cookie_params(cookies)).await?;
    }
    Ok(page)
}

async fn navigate(page: &Page, url: &str, load_timeout: Duration, nav_timeout: Duration) -> Result<(), WireError> {
    tokio::time::timeout(load_timeout, page.goto(url))
        .await
        .map_err(|_| WireError {
            message: format!("navigation to {url} timed out after {}s", load_timeout.as_secs()),
            kind: ErrorKind::NavigationTimeout,
            stack_trace: None,
        })?
        .map_err(|e| WireError { message: e.to_string(), kind: ErrorKind::HttpError, stack_trace: None })?;

    tokio::time::timeout(nav_timeout, page.wait_for_navigation())
        .await
        .map_err(|_| WireError {
            message: format!("page load for {url} timed out after {}s", nav_timeout.as_secs()),
            kind: ErrorKind::NavigationTimeout,
            stack_trace: None,
        })?
        .map_err(|e| WireError { message: e.to_string(), kind: ErrorKind::HttpError, stack_trace: None })?;
    Ok(())
}

async fn handle_discover(
    state: &WorkerState,
    url: String,
    page_id: PageId,
    is_first_page: bool,
    cookies: Option<Vec<CookieRecord>>,
) -> WorkerMessage {
    let effective_cookies = cookies.unwrap_or_else(|| state.cookies.clone());
    let page = match new_page(state, &effective_cookies).await {
        Ok(page) => page,
        Err(err) => return fail(TaskType::Discover, ErrorKind::HttpError, err.to_string()),
    };

    if let Err(wire) = navigate(&page, &url, state.page_load_timeout(), state.navigation_timeout()).await {
        return WorkerMessage::Result { task_type: TaskType::Discover, data: None, error: Some(wire) };
    }

    if is_first_page {
        tokio::time::sleep(state.cookie_wait()).await;
    }

    let title: Option<String> = page
        .evaluate("document.title || null")
        .await
        .ok()
        .and_then(|v| v.into_value::<Option<String>>().ok())
        .flatten();

    let raw_links: Vec<RawLink> = match page.evaluate(LINKS_SCRIPT).await {
        Ok(value) => value.into_value::<Vec<RawLink>>().unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %err, url = %url, "link extraction failed, reporting zero links");
            Vec::new()
        }
    };
    let links: Vec<Link> = raw_links
        .into_iter()
        .filter(|l| is_valid_url(&l.url))
        .map(|l| Link { url: l.url, link_text: l.text, section: None, subsection: None })
        .collect();

    let captured_cookies = if is_first_page {
        match page.get_cookies().await {
            Ok(cookies) => Some(
                cookies
                    .into_iter()
                    .map(|c| CookieRecord { name: c.name, value: c.value, domain: c.domain, path: c.path })
                    .collect(),
            ),
            Err(err) => {
                tracing::warn!(error = %err, "cookie capture failed on first page");
                None
            }
        }
    } else {
        None
    };

    let _ = page.close().await;

    WorkerMessage::Result {
        task_type: TaskType::Discover,
        data: Some(ResultData::Discovery(DiscoveryResult {
            page_id,
            url,
            resolved_title: title,
            links,
            cookies: captured_cookies,
        })),
        error: None,
    }
}

fn asset_save_rel(url: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    normalize(url).hash(&mut hasher);
    let digest = hasher.finish();
    let ext = Path::new(url).extension().and_then(|e| e.to_str()).unwrap_or("bin");
    format!("assets/{digest:016x}.{ext}")
}

#[allow(clippy::too_many_arguments)]
async fn handle_download(
    state: &WorkerState,
    url: String,
    page_id: PageId,
    save_path: PathBuf,
    output_dir: PathBuf,
    cookies: Vec<CookieRecord>,
    link_rewrite_map: HashMap<PageId, String>,
    known_assets: HashMap<String, String>,
) -> WorkerMessage {
    let page = match new_page(state, &cookies).await {
        Ok(page) => page,
        Err(err) => return fail(TaskType::Download, ErrorKind::HttpError, err.to_string()),
    };

    if let Err(wire) = navigate(&page, &url, state.page_load_timeout(), state.navigation_timeout()).await {
        return WorkerMessage::Result { task_type: TaskType::Download, data: None, error: Some(wire) };
    }

    let page_dir = save_path.parent().map(Path::to_path_buf).unwrap_or_else(|| output_dir.clone());

    let asset_urls: Vec<String> = match page.evaluate(ASSET_URLS_SCRIPT).await {
        Ok(value) => value.into_value::<Vec<String>>().unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %err, url = %url, "asset discovery failed, skipping assets");
            Vec::new()
        }
    };

    let mut asset_relatives: HashMap<String, String> = HashMap::new();
    let mut new_assets = Vec::new();

    for asset_url in asset_urls {
        if let Some(existing_rel) = known_assets.get(&normalize(&asset_url)) {
            let relative = pathdiff::diff_paths(output_dir.join(existing_rel), &page_dir)
                .unwrap_or_else(|| PathBuf::from(existing_rel));
            asset_relatives.insert(asset_url, relative.to_string_lossy().replace('\\', "/"));
            continue;
        }

        let saved_rel = asset_save_rel(&asset_url);
        let script = fetch_hex_script(&asset_url);
        let hex_body = match page.evaluate(script.as_str()).await {
            Ok(value) => value.into_value::<String>().unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, asset = %asset_url, "asset fetch failed");
                continue;
            }
        };
        let Ok(bytes) = hex::decode(&hex_body) else {
            tracing::warn!(asset = %asset_url, "asset fetch returned non-hex payload");
            continue;
        };

        let absolute = output_dir.join(&saved_rel);
        if let Some(parent) = absolute.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %err, "failed to create asset directory");
                continue;
            }
        }
        if let Err(err) = tokio::fs::write(&absolute, &bytes).await {
            tracing::warn!(error = %err, "failed to write asset to disk");
            continue;
        }

        let relative = pathdiff::diff_paths(&absolute, &page_dir).unwrap_or_else(|| PathBuf::from(&saved_rel));
        asset_relatives.insert(asset_url.clone(), relative.to_string_lossy().replace('\\', "/"));
        new_assets.push(DownloadedAsset { url: asset_url, saved_path: saved_rel, size: bytes.len() as u64 });
    }

    let mut link_relatives: HashMap<String, String> = HashMap::new();
    for (target_id, target_rel) in &link_rewrite_map {
        let Some(id) = hex32_run(target_id.as_str()) else { continue };
        let relative = pathdiff::diff_paths(output_dir.join(target_rel), &page_dir)
            .unwrap_or_else(|| PathBuf::from(target_rel));
        link_relatives.insert(id, relative.to_string_lossy().replace('\\', "/"));
    }

    let script = rewrite_script(&link_relatives, &asset_relatives);
    let outcome: RewriteOutcome = match page.evaluate(script.as_str()).await {
        Ok(value) => match value.into_value::<RewriteOutcome>() {
            Ok(outcome) => outcome,
            Err(err) => return fail(TaskType::Download, ErrorKind::InvalidPayload, err.to_string()),
        },
        Err(err) => return fail(TaskType::Download, ErrorKind::HttpError, err.to_string()),
    };

    if let Some(parent) = save_path.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            return fail(TaskType::Download, ErrorKind::HttpError, err.to_string());
        }
    }
    if let Err(err) = tokio::fs::write(&save_path, outcome.html.as_bytes()).await {
        return fail(TaskType::Download, ErrorKind::HttpError, err.to_string());
    }

    let _ = page.close().await;

    WorkerMessage::Result {
        task_type: TaskType::Download,
        data: Some(ResultData::Download(DownloadResult {
            page_id,
            saved_path: save_path,
            assets_downloaded: new_assets.len() as u32,
            links_rewritten: outcome.rewritten,
            new_assets,
        })),
        error: None,
    }
}

fn fail(task_type: TaskType, kind: ErrorKind, message: String) -> WorkerMessage {
    WorkerMessage::Result { task_type, data: None, error: Some(WireError { message, kind, stack_trace: None }) }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("worker fatal error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let (browser, handler, _profile_dir) = launch_browser(true, None).await?;
    let mut state = WorkerState { browser, _handler: handler, config: None, cookies: Vec::new() };

    send(&WorkerMessage::Ready { pid: std::process::id() })?;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command: MasterCommand = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed master command");
                continue;
            }
        };

        match command {
            MasterCommand::Init { config, .. } => {
                state.config = Some(config);
            }
            MasterCommand::SetCookies { cookies } => {
                state.cookies = cookies;
            }
            MasterCommand::Shutdown => break,
            MasterCommand::Discover { url, page_id, is_first_page, cookies, .. } => {
                let message = handle_discover(&state, url, page_id, is_first_page, cookies).await;
                send(&message)?;
            }
            MasterCommand::Download { url, page_id, save_path, cookies, link_rewrite_map, known_assets, output_dir, .. } => {
                let message =
                    handle_download(&state, url, page_id, save_path, output_dir, cookies, link_rewrite_map, known_assets)
                        .await;
                send(&message)?;
            }
        }
    }

    let _ = state.browser.close().await;
    Ok(())
}
