#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use veripay_server::AppState;
use veripay_server::handler::routes;
use veripay_server::middleware::create_trace_layer;
use veripay_upload::{ReaperWorker, UploadManager};

use crate::config::{Cli, Command, ScratchCommand};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "veripay_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "veripay_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "veripay_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.validate().context("invalid configuration")?;

    match &cli.command {
        Some(Command::Scratch { command }) => run_scratch(&cli, *command).await,
        None => run_server(cli).await,
    }
}

/// Builds the application state, spawns the session reaper and serves HTTP.
///
/// The reaper is cancelled and awaited after the server returns so the
/// final sweep cannot race process exit.
async fn run_server(cli: Cli) -> anyhow::Result<()> {
    cli.log();

    let state = AppState::from_config(&cli.service).context("failed to build application state")?;
    let upload = state.upload();

    // Scratch left behind by an unclean stop is unrecoverable; drop it
    // before accepting new chunks.
    upload
        .sweep_orphaned()
        .await
        .context("failed to sweep scratch directories")?;

    let reaper_token = CancellationToken::new();
    let reaper = ReaperWorker::new(upload, reaper_token.clone()).spawn();

    let router = create_router(state, &cli);
    let served = server::serve(router, cli.server).await;

    reaper_token.cancel();
    if let Err(error) = reaper.await {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "session reaper did not stop cleanly"
        );
    }

    Ok(served?)
}

/// Runs a scratch store maintenance command without starting the server.
async fn run_scratch(cli: &Cli, command: ScratchCommand) -> anyhow::Result<()> {
    let upload = UploadManager::new(cli.service.upload.clone());

    match command {
        ScratchCommand::Status => {
            let status = upload
                .scratch_status()
                .await
                .context("failed to read scratch status")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        ScratchCommand::Sweep => {
            let removed = upload
                .sweep_orphaned()
                .await
                .context("failed to sweep scratch directories")?;
            println!("removed {removed} orphaned scratch entries");
        }
    }

    Ok(())
}

/// Assembles the application router.
///
/// The trace layer wraps the handlers; the timeout layer sits outermost
/// so a stalled upload cannot hold a connection past the deadline.
fn create_router(state: AppState, cli: &Cli) -> Router {
    routes(&cli.cors)
        .with_state(state)
        .layer(create_trace_layer())
        .layer(TimeoutLayer::new(cli.server.request_timeout()))
}
