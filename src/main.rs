//! CLI entry point for specfetch.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use specfetch_core::download::HttpClient;
use specfetch_core::orchestrator::Orchestrator;
use specfetch_core::progress::{NoProgress, ProgressSink, TerminalProgress};
use tracing::{debug, error, info, warn};

mod app_config;
mod cli;
mod exit;
mod output;
mod terminal;

use cli::Args;
use exit::{ProcessExit, determine_exit_outcome};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "run aborted");
            eprintln!("error: {e:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let config = app_config::resolve_crawl_config(args, file_config.as_ref())?;
    info!(
        release = %config.release,
        base_url = %config.base_url,
        listings = config.listings.len(),
        concurrency = config.concurrency,
        "specfetch starting"
    );

    let client = HttpClient::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
        .context("failed to build HTTP client")?;
    let state_file = config.state_file();

    if args.list {
        let orchestrator = Orchestrator::new(config, Arc::new(client), Arc::new(NoProgress));
        let plan = orchestrator.plan().await?;
        output::print_plan(&plan);
        return Ok(ProcessExit::Success);
    }

    let progress: Arc<dyn ProgressSink> = if terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ) {
        Arc::new(TerminalProgress::new(config.listings.len()))
    } else {
        Arc::new(NoProgress)
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after in-flight chunks");
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let orchestrator = Orchestrator::new(config, Arc::new(client), progress);
    let report = orchestrator
        .run(Arc::clone(&interrupted))
        .await
        .context("setup failed")?;

    info!(
        discovered = report.discovered,
        succeeded = report.summary.succeeded,
        failed = report.summary.failed,
        interrupted = report.summary.interrupted,
        "Download complete"
    );
    let exit = determine_exit_outcome(report.outcome());
    // Quiet runs still report left-over work.
    if !args.quiet || exit != ProcessExit::Success {
        output::print_run_summary(&report, &state_file);
    }
    Ok(exit)
}
