//! ls command - List a directory
//!
//! Lists containers at the root, or the entries one level below a path.
//! Entries are printed as the listing streams in; JSON output collects them.

use bucketfs_core::{DirectoryEntry, ReaddirOptions, StreamEvent};
use clap::Args;
use humansize::{BINARY, format_size};
use jiff::Timestamp;
use serde::Serialize;

use crate::backend::{ConnectOptions, open_fs};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List containers or directory contents
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Path to list (/, /container or /container/prefix)
    #[arg(default_value = "/")]
    pub path: String,

    /// Only show entries whose name matches a glob pattern
    #[arg(short = 'P', long)]
    pub pattern: Option<String>,

    /// Records requested per backend page
    #[arg(long)]
    pub page_size: Option<i32>,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    entries: Vec<DirectoryEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig, connect: ConnectOptions) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let pattern = if let Some(ref p) = args.pattern {
        match glob::Pattern::new(p) {
            Ok(pat) => Some(pat),
            Err(e) => {
                formatter.error(&format!("Invalid pattern: {e}"));
                return ExitCode::UsageError;
            }
        }
    } else {
        None
    };

    let fs = match open_fs(&connect, &formatter).await {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    let options = ReaddirOptions {
        page_size: args.page_size,
    };
    let mut stream = match fs.readdir(&args.path, &options).await {
        Ok(s) => s,
        Err(e) => {
            formatter.error(&format!("Failed to list '{}': {e}", args.path));
            return ExitCode::from_error(&e);
        }
    };

    let mut entries = Vec::new();
    let mut errors = Vec::new();

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::Data(entry) => {
                if !matches_pattern(&entry, pattern.as_ref()) {
                    continue;
                }
                if formatter.is_json() {
                    entries.push(entry);
                } else {
                    formatter.println(&format_entry(&entry, &formatter));
                }
            }
            StreamEvent::Error(e) => {
                formatter.warning(&format!("Skipped entry: {e}"));
                errors.push(e.to_string());
            }
            StreamEvent::End => break,
        }
    }

    tracing::debug!(produced = stream.produced(), "listing finished");

    let code = if errors.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            path: args.path,
            entries,
            errors,
        });
    }

    code
}

fn matches_pattern(entry: &DirectoryEntry, pattern: Option<&glob::Pattern>) -> bool {
    pattern.is_none_or(|p| p.matches(&entry.name))
}

fn format_date(modified_at: i64) -> String {
    Timestamp::from_millisecond(modified_at)
        .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| "-".to_string())
}

fn format_entry(entry: &DirectoryEntry, formatter: &Formatter) -> String {
    let date = formatter.style_date(&format!("[{}]", format_date(entry.modified_at)));
    if entry.is_dir() {
        let size = formatter.style_size(&format!("{:>10}", "0B"));
        let name = formatter.style_dir(&format!("{}/", entry.name));
        format!("{date} {size} {name}")
    } else {
        let size = formatter.style_size(&format!("{:>10}", format_size(entry.size_bytes, BINARY)));
        format!("{date} {size} {}", entry.name)
    }
}
