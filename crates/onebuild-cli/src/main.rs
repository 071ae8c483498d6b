//! onebuild CLI.
//!
//! Runs once per build execution from the job's lifecycle hooks:
//! `onebuild start` before the job's real work, `onebuild finish` after
//! it, unconditionally. Context comes from the environment Travis sets
//! on every job.

use clap::{Parser, Subcommand};
use onebuild_core::{BuildContext, Sequencer};
use onebuild_travis::TravisClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

mod gate;

#[derive(Parser)]
#[command(name = "onebuild")]
#[command(about = "Limits a branch to one running CI build", long_about = None)]
struct Cli {
    /// Travis API endpoint
    #[arg(long, env = "TRAVIS_ENDPOINT")]
    endpoint: Url,

    /// API token scoped to the repository
    #[arg(long, env = "TRAVIS_TOKEN", hide_env_values = true)]
    token: String,

    /// Id of the currently-executing build
    #[arg(long, env = "TRAVIS_BUILD_ID")]
    build_id: u64,

    /// Branch this build runs for
    #[arg(long, env = "TRAVIS_BRANCH")]
    branch: String,

    /// Repository slug, e.g. owner/name
    #[arg(long, env = "TRAVIS_REPO_SLUG")]
    repo: String,

    /// Event that triggered this build
    #[arg(long, env = "TRAVIS_EVENT_TYPE")]
    event_type: String,

    /// Comma-separated branches to serialize; empty means all branches
    #[arg(long, env = "ONEBUILD_BRANCHES", default_value = "")]
    branches: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether this build may run; cancels it otherwise
    Start,
    /// Revive the newest build on the branch if it was cancelled
    Finish,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Only push builds compete for the branch.
    if cli.event_type != "push" {
        info!(event_type = %cli.event_type, "Not a push build, exiting");
        return Ok(());
    }

    if !gate::branch_enabled(&cli.branches, &cli.branch) {
        info!(branch = %cli.branch, list = %cli.branches, "Branch not serialized, exiting");
        return Ok(());
    }

    let control = Arc::new(TravisClient::new(cli.endpoint, cli.token, cli.repo));
    let sequencer = Sequencer::new(
        control,
        BuildContext {
            build_id: cli.build_id,
            branch: cli.branch,
            event_type: cli.event_type,
        },
    );

    match cli.command {
        Commands::Start => sequencer.start().await?,
        Commands::Finish => sequencer.finish().await?,
    }

    Ok(())
}
