//! bfs - browse object storage like a filesystem
//!
//! Resolves `/container/key` paths against the configured backend (S3, a local
//! directory or an in-memory store) and lists, describes and reads them.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;
mod exit_code;
mod output;

use commands::{Commands, GlobalArgs};

#[derive(Parser, Debug)]
#[command(name = "bfs", version, about = "Browse object storage like a filesystem")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    let code = commands::execute::<Cli>(cli.command, &cli.global).await;
    code.into()
}
