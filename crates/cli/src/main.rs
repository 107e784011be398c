mod commands;
mod config;
mod progress;
mod render;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{Command, Context};
use config::AppConfig;

#[derive(Parser)]
#[command(
    name = "whoop",
    version,
    about = "WHOOP recovery, sleep, strain and workout tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Env file holding credentials and tokens (default: ./.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries tool output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()?;
    let env_file = config.env_file(cli.env_file.as_deref());
    let ctx = Context { config, env_file };

    let result = match cli.command {
        Command::Init(args) => commands::init::run(args, &ctx).await,
        Command::Summary => commands::summary::run(&ctx).await,
        Command::Sleep(args) => commands::sleep::run(args, &ctx).await,
        Command::Recovery(args) => commands::recovery::run(args, &ctx).await,
        Command::Workouts(args) => commands::workouts::run(args, &ctx).await,
        Command::Profile => commands::profile::run(&ctx).await,
    };

    if let Err(err) = result {
        println!("{}", render::describe_error(&err));
        std::process::exit(1);
    }
    Ok(())
}
