//! Packlens CLI - browse merged virtual file trees of game archive packages.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{extract, info, tree};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "packlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enumerate all containers and print the merged virtual tree
    Tree(tree::TreeArgs),
    /// Extract a file from the highest-priority container that has it
    Extract(extract::ExtractArgs),
    /// Show which container backs a path, with size and deletion status
    Info(info::InfoArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Command::Tree(args) => tree::run(args).await,
        Command::Extract(args) => extract::run(args),
        Command::Info(args) => info::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
