//! Type-safe builder for `OrchestratorConfig` using the typestate pattern.
//!
//! Mirrors the teacher's `CrawlConfigBuilder`: required fields advance the
//! builder through marker states, and `.build()` is only callable once both
//! the output directory and the root URL have been supplied.

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::types::OrchestratorConfig;

// Type states for the builder.
pub struct WithOutputDir;
pub struct WithRootUrl;
pub struct Complete;

pub struct OrchestratorConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) root_url: Option<String>,
    pub(crate) max_depth: u32,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) cookie_wait_secs: u64,
    pub(crate) max_workers: Option<u32>,
    pub(crate) worker_spawn_timeout_secs: u64,
    pub(crate) worker_allocation_timeout_secs: u64,
    pub(crate) discovery_timeout_secs: u64,
    pub(crate) free_mem_mb_override: Option<u64>,
    pub(crate) dry_run: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for OrchestratorConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_dir: None,
            root_url: None,
            max_depth: 3,
            page_load_timeout_secs: 30,
            navigation_timeout_secs: 30,
            cookie_wait_secs: 2,
            max_workers: None,
            worker_spawn_timeout_secs: 30,
            worker_allocation_timeout_secs: 60,
            discovery_timeout_secs: 30 * 60,
            free_mem_mb_override: None,
            dry_run: false,
            _phantom: PhantomData,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn builder() -> OrchestratorConfigBuilder<()> {
        OrchestratorConfigBuilder::default()
    }
}

impl OrchestratorConfigBuilder<()> {
    #[must_use]
    pub fn output_dir(self, dir: impl Into<PathBuf>) -> OrchestratorConfigBuilder<WithOutputDir> {
        OrchestratorConfigBuilder {
            output_dir: Some(dir.into()),
            root_url: self.root_url,
            max_depth: self.max_depth,
            page_load_timeout_secs: self.page_load_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            cookie_wait_secs: self.cookie_wait_secs,
            max_workers: self.max_workers,
            worker_spawn_timeout_secs: self.worker_spawn_timeout_secs,
            worker_allocation_timeout_secs: self.worker_allocation_timeout_secs,
            discovery_timeout_secs: self.discovery_timeout_secs,
            free_mem_mb_override: self.free_mem_mb_override,
            dry_run: self.dry_run,
            _phantom: PhantomData,
        }
    }
}

impl OrchestratorConfigBuilder<WithOutputDir> {
    #[must_use]
    pub fn root_url(self, url: impl Into<String>) -> OrchestratorConfigBuilder<WithRootUrl> {
        OrchestratorConfigBuilder {
            output_dir: self.output_dir,
            root_url: Some(url.into()),
            max_depth: self.max_depth,
            page_load_timeout_secs: self.page_load_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            cookie_wait_secs: self.cookie_wait_secs,
            max_workers: self.max_workers,
            worker_spawn_timeout_secs: self.worker_spawn_timeout_secs,
            worker_allocation_timeout_secs: self.worker_allocation_timeout_secs,
            discovery_timeout_secs: self.discovery_timeout_secs,
            free_mem_mb_override: self.free_mem_mb_override,
            dry_run: self.dry_run,
            _phantom: PhantomData,
        }
    }
}

// Build is only available once both required fields are set.
impl OrchestratorConfigBuilder<WithRootUrl> {
    pub fn build(self) -> Result<OrchestratorConfig> {
        let output_dir = self
            .output_dir
            .context("output_dir is required")?
            .canonicalize_or_absolute()?;

        Ok(OrchestratorConfig {
            root_url: self.root_url.context("root_url is required")?,
            output_dir,
            max_depth: self.max_depth,
            page_load_timeout_secs: self.page_load_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            cookie_wait_secs: self.cookie_wait_secs,
            max_workers: self.max_workers,
            worker_spawn_timeout_secs: self.worker_spawn_timeout_secs,
            worker_allocation_timeout_secs: self.worker_allocation_timeout_secs,
            discovery_timeout_secs: self.discovery_timeout_secs,
            free_mem_mb_override: self.free_mem_mb_override,
            dry_run: self.dry_run,
        })
    }
}

/// Builder methods available regardless of the current type state.
impl<State> OrchestratorConfigBuilder<State> {
    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn cookie_wait_secs(mut self, secs: u64) -> Self {
        self.cookie_wait_secs = secs;
        self
    }

    #[must_use]
    pub fn max_workers(mut self, n: u32) -> Self {
        self.max_workers = Some(n);
        self
    }

    #[must_use]
    pub fn worker_spawn_timeout_secs(mut self, secs: u64) -> Self {
        self.worker_spawn_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn worker_allocation_timeout_secs(mut self, secs: u64) -> Self {
        self.worker_allocation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn discovery_timeout_secs(mut self, secs: u64) -> Self {
        self.discovery_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn free_mem_mb_override(mut self, mb: u64) -> Self {
        self.free_mem_mb_override = Some(mb);
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

trait AbsolutePath {
    fn canonicalize_or_absolute(self) -> Result<PathBuf>;
}

impl AbsolutePath for PathBuf {
    fn canonicalize_or_absolute(self) -> Result<PathBuf> {
        if self.is_absolute() {
            return Ok(self);
        }
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        Ok(cwd.join(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_output_dir_and_root_url() {
        let config = OrchestratorConfig::builder()
            .output_dir("/tmp/mirror-out")
            .root_url("https://example.com/wiki")
            .build()
            .expect("valid config builds");

        assert_eq!(config.root_url(), "https://example.com/wiki");
        assert!(config.output_dir().is_absolute());
        assert_eq!(config.max_depth(), 3);
    }

    #[test]
    fn max_workers_defaults_to_capacity_planning() {
        let config = OrchestratorConfig::builder()
            .output_dir("/tmp/mirror-out2")
            .root_url("https://example.com")
            .build()
            .expect("valid config builds");

        assert_eq!(config.max_workers(), None);
    }
}
