//! `master` — CLI entrypoint for the wiki-mirror orchestration kernel.

use clap::Parser;
use wiki_mirror::config::OrchestratorConfig;
use wiki_mirror::Orchestrator;

#[derive(Parser, Debug)]
#[command(name = "master", about = "Mirror a rendered documentation wiki to a self-contained offline copy")]
struct Cli {
    /// Root URL to start discovery from.
    root_url: String,

    /// Directory the mirror is written under.
    #[arg(long, short = 'o')]
    output: std::path::PathBuf,

    /// Maximum recursion depth.
    #[arg(long, default_value_t = 3)]
    max_depth: u32,

    /// Skip download/confirmation and report discovery stats only.
    #[arg(long)]
    dry_run: bool,

    /// Hard cap on concurrent worker processes; defaults to the capacity formula.
    #[arg(long)]
    max_workers: Option<u32>,

    /// Per-page navigation/load timeout in seconds.
    #[arg(long, default_value_t = 30)]
    page_timeout: u64,

    /// Per-navigation timeout in seconds.
    #[arg(long, default_value_t = 30)]
    nav_timeout: u64,

    /// Seconds Bootstrap waits after the first page loads before finalizing captured cookies.
    #[arg(long, default_value_t = 2)]
    cookie_wait: u64,

    /// Discovery phase quiescence timeout in seconds.
    #[arg(long, default_value_t = 30 * 60)]
    discovery_timeout_secs: u64,
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut builder = OrchestratorConfig::builder()
        .output_dir(cli.output)
        .root_url(cli.root_url)
        .max_depth(cli.max_depth)
        .dry_run(cli.dry_run)
        .page_load_timeout_secs(cli.page_timeout)
        .navigation_timeout_secs(cli.nav_timeout)
        .cookie_wait_secs(cli.cookie_wait)
        .discovery_timeout_secs(cli.discovery_timeout_secs);
    if let Some(n) = cli.max_workers {
        builder = builder.max_workers(n);
    }
    let config = match builder.build() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {err:#}");
            std::process::exit(1);
        }
    };

    let mut orchestrator = Orchestrator::new(config);

    let run = orchestrator.run();
    tokio::pin!(run);

    let exit_code = tokio::select! {
        result = &mut run => match result {
            Ok(stats) => {
                log::info!(
                    "run complete: discovered {} downloaded {} failed {}",
                    stats.pages_discovered, stats.pages_downloaded, stats.pages_failed
                );
                0
            }
            Err(err) => {
                log::error!("fatal error: {err:#}");
                1
            }
        },
        () = wait_for_shutdown_signal() => {
            log::warn!("shutdown signal received, terminating workers");
            orchestrator.shutdown().await;
            130
        }
    };

    std::process::exit(exit_code);
}
