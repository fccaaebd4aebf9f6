//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::builder::FalseyValueParser;

use rollout_cli::application::services::rollover::DeployFlags;
use rollout_cli::commands::deploy::{self, DeployArgs};
use rollout_cli::output::OutputContext;

/// Versioned container deployments to local or remote Docker hosts
#[derive(Parser, Debug)]
#[command(name = "rollout", version)]
pub struct Cli {
    /// Deployment document (JSON)
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// Archive an existing instance of this version and deploy over it
    #[arg(short, long)]
    pub force: bool,

    /// Remove an existing instance of this version and its data first
    #[arg(long = "rm")]
    pub recreate: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,

    /// Log every command sent to the Docker host
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Execute the deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the deployment fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            file,
            force,
            recreate,
            quiet,
            no_color,
            verbose: _,
        } = self;
        let ctx = OutputContext::new(no_color, quiet);
        let args = DeployArgs {
            file,
            flags: DeployFlags { force, recreate },
        };
        deploy::run(&ctx, &args).await
    }
}
