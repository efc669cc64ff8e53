//! cat command - Print file contents
//!
//! Streams an object to stdout. With `--etag`, nothing is transferred when the
//! object still carries that tag.

use bucketfs_core::ReadOptions;
use clap::Args;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::backend::{ConnectOptions, open_fs};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Print the contents of a file
#[derive(Args, Debug)]
pub struct CatArgs {
    /// File path (/container/key)
    pub path: String,

    /// Entity tag already held; skip the transfer when it still matches
    #[arg(long)]
    pub etag: Option<String>,
}

#[derive(Debug, Serialize)]
struct NotModifiedOutput {
    path: String,
    etag: Option<String>,
    not_modified: bool,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig, connect: ConnectOptions) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let fs = match open_fs(&connect, &formatter).await {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    let options = ReadOptions {
        etag: args.etag.clone(),
    };
    let meta = match fs.readfile(&args.path, &options).await {
        Ok(meta) => meta,
        Err(e) => {
            formatter.error(&format!("Failed to read '{}': {e}", args.path));
            return ExitCode::from_error(&e);
        }
    };

    let Some(mut content) = meta.content else {
        if formatter.is_json() {
            formatter.json(&NotModifiedOutput {
                path: args.path,
                etag: meta.etag,
                not_modified: meta.is_unmodified,
            });
        } else {
            formatter.warning(&format!("'{}' not modified", args.path));
        }
        return ExitCode::Success;
    };

    let mut stdout = tokio::io::stdout();
    let mut written = 0u64;
    while let Some(chunk) = content.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                formatter.error(&format!("Failed to read '{}': {e}", args.path));
                return ExitCode::from_error(&e);
            }
        };
        if let Err(e) = stdout.write_all(&chunk).await {
            formatter.error(&format!("Failed to write output: {e}"));
            return ExitCode::GeneralError;
        }
        written += chunk.len() as u64;
    }

    if let Err(e) = stdout.flush().await {
        formatter.error(&format!("Failed to write output: {e}"));
        return ExitCode::GeneralError;
    }

    tracing::debug!(written, expected = meta.size_bytes, "cat finished");
    ExitCode::Success
}
