//! CLI command definitions and dispatch

use std::path::PathBuf;

use clap::{Args, CommandFactory, Subcommand};
use clap_complete::Shell;

use crate::backend::ConnectOptions;
use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

pub mod cat;
pub mod ls;
pub mod mkdir;
pub mod stat;

/// Flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "BFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve a local directory instead of the configured backend
    #[arg(long, global = true, env = "BFS_LOCAL_ROOT")]
    pub local_root: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color,
            quiet: self.quiet,
        }
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            config: self.config.clone(),
            local_root: self.local_root.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List containers or directory contents
    Ls(ls::LsArgs),

    /// Show metadata for a path
    Stat(stat::StatArgs),

    /// Print the contents of a file
    Cat(cat::CatArgs),

    /// Create a directory
    Mkdir(mkdir::MkdirArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Run a parsed command
pub async fn execute<C: CommandFactory>(command: Commands, global: &GlobalArgs) -> ExitCode {
    let output = global.output_config();
    let connect = global.connect_options();

    match command {
        Commands::Ls(args) => ls::execute(args, output, connect).await,
        Commands::Stat(args) => stat::execute(args, output, connect).await,
        Commands::Cat(args) => cat::execute(args, output, connect).await,
        Commands::Mkdir(args) => mkdir::execute(args, output, connect).await,
        Commands::Completions { shell } => {
            let mut cmd = C::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    }
}
