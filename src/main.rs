use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod build;
mod commands;
mod config;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: HellfireCommand,
}

#[derive(Parser)]
struct BuildArgs {
    /// The blog source directory
    #[arg(default_value = ".")]
    source: PathBuf,

    /// Where to write the generated site
    #[arg(short, long, default_value = "./dist")]
    out: PathBuf,

    /// Remove the output directory before building
    #[arg(long, default_value = "false")]
    clean: bool,
}

#[derive(Parser)]
struct NewArgs {
    /// Title of the new post
    title: String,

    /// The blog source directory
    #[arg(default_value = ".")]
    source: PathBuf,
}

#[derive(Parser)]
struct WatchArgs {
    /// The blog source directory
    #[arg(default_value = ".")]
    source: PathBuf,

    /// Where to write the generated site
    #[arg(short, long, default_value = "./dist")]
    out: PathBuf,

    /// Poll for changes instead of using native file notifications
    #[arg(long, default_value = "false")]
    poll: bool,
}

#[derive(Subcommand)]
enum HellfireCommand {
    /// Build the blog once
    Build(BuildArgs),

    /// Create a new post
    New(NewArgs),

    /// Build the blog and rebuild whenever its sources change
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        HellfireCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        HellfireCommand::New(args) => {
            commands::new::run(&args)?;
        }
        HellfireCommand::Watch(args) => {
            commands::watch::run(&args).await?;
        }
    }

    Ok(())
}
