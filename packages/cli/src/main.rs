mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check, init, inspect, render, sanitize, CheckArgs, InitArgs, InspectArgs, RenderArgs,
    SanitizeArgs,
};
use tracing_subscriber::EnvFilter;

/// Pagecraft CLI - block-based page builder
#[derive(Parser, Debug)]
#[command(name = "pagecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Pagecraft project
    Init(InitArgs),

    /// Render a saved page schema to HTML
    Render(RenderArgs),

    /// Sanitize a markup file
    Sanitize(SanitizeArgs),

    /// Show a template's drop areas and settings
    Inspect(InspectArgs),

    /// Report unreachable links and assets in a saved page
    Check(CheckArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Render(args) => render(args, &cwd).await,
            Command::Sanitize(args) => sanitize(args, &cwd),
            Command::Inspect(args) => inspect(args, &cwd).await,
            Command::Check(args) => check(args, &cwd).await,
        },
        Err(e) => Err(anyhow::anyhow!("Cannot get current directory: {}", e)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
