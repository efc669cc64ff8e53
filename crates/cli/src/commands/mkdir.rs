//! mkdir command - Create a directory marker

use clap::Args;
use serde::Serialize;

use crate::backend::{ConnectOptions, open_fs};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a directory inside a container
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Directory path (/container/dir)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    success: bool,
    path: String,
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, output_config: OutputConfig, connect: ConnectOptions) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let fs = match open_fs(&connect, &formatter).await {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    if let Err(e) = fs.mkdir(&args.path).await {
        formatter.error(&e.to_string());
        return ExitCode::from_error(&e);
    }

    if formatter.is_json() {
        formatter.json(&MkdirOutput {
            success: true,
            path: args.path,
        });
    } else {
        formatter.success(&format!("Created directory '{}'", args.path));
    }

    ExitCode::Success
}
