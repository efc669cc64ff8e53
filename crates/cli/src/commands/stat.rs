//! stat command - Describe a path

use bucketfs_core::DirectoryEntry;
use clap::Args;
use humansize::{BINARY, format_size};
use jiff::Timestamp;

use crate::backend::{ConnectOptions, open_fs};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show metadata for a path
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Path to describe
    pub path: String,
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig, connect: ConnectOptions) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let fs = match open_fs(&connect, &formatter).await {
        Ok(fs) => fs,
        Err(code) => return code,
    };

    let entry = match fs.stat(&args.path).await {
        Ok(entry) => entry,
        Err(e) => {
            formatter.error(&format!("Failed to stat '{}': {e}", args.path));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&entry);
    } else {
        for (key, value) in describe(&entry) {
            formatter.println(&format!("{} {value}", formatter.style_key(&format!("{key:<9}:"))));
        }
    }

    ExitCode::Success
}

fn permissions(entry: &DirectoryEntry) -> String {
    let r = if entry.access.readable() { 'r' } else { '-' };
    let w = if entry.access.writable() { 'w' } else { '-' };
    format!("{r}{w}")
}

fn describe(entry: &DirectoryEntry) -> Vec<(&'static str, String)> {
    let kind = if entry.is_dir() { "directory" } else { "file" };
    let modified = Timestamp::from_millisecond(entry.modified_at)
        .map(|ts| ts.to_string())
        .unwrap_or_else(|_| "-".to_string());

    let mut lines = vec![
        ("Name", entry.name.clone()),
        ("Path", entry.path.clone()),
        ("Type", kind.to_string()),
        ("Mime", entry.mime_type.clone()),
        (
            "Size",
            format!("{} ({} bytes)", format_size(entry.size_bytes, BINARY), entry.size_bytes),
        ),
        ("Modified", modified),
        ("Access", permissions(entry)),
    ];
    if let Some(etag) = &entry.etag {
        lines.push(("ETag", etag.clone()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_file() {
        let mut entry = DirectoryEntry::file("/docs/a.txt", "a.txt", 10);
        entry.modified_at = 0;
        entry.etag = Some("abc".into());

        let lines = describe(&entry);
        assert_eq!(lines[2], ("Type", "file".to_string()));
        assert_eq!(lines[3], ("Mime", "text/plain".to_string()));
        assert_eq!(lines[4], ("Size", "10 B (10 bytes)".to_string()));
        assert_eq!(lines[5], ("Modified", "1970-01-01T00:00:00Z".to_string()));
        assert_eq!(lines[6], ("Access", "rw".to_string()));
        assert_eq!(lines.last(), Some(&("ETag", "abc".to_string())));
    }

    #[test]
    fn test_describe_directory_has_no_etag() {
        let entry = DirectoryEntry::directory("/docs", "docs");
        let lines = describe(&entry);
        assert_eq!(lines[2], ("Type", "directory".to_string()));
        assert!(lines.iter().all(|(k, _)| *k != "ETag"));
    }
}
