//! upload command - Upload files matching shell patterns
//!
//! Patterns are expanded locally; each match lands under its own name below
//! the remote directory.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use minx_core::{BatchReport, Error, ProgressTracker, to_key};

use super::{Context, open, report_batch};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload files and directories matching glob patterns
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local paths or glob patterns (e.g. "*.jpg")
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Remote directory (defaults to the current directory)
    #[arg(long)]
    pub remote: Option<String>,

    /// Concurrent uploads (1-10)
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Include hidden files and directories
    #[arg(long)]
    pub all: bool,

    /// Append per-file failures to this file
    #[arg(long = "err-log")]
    pub err_log: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    destination: String,
    paths: Vec<String>,
    bytes: u64,
    report: BatchReport,
}

/// Expand each pattern, returning matched paths and patterns that matched nothing
fn expand(patterns: &[String]) -> Result<(Vec<PathBuf>, Vec<String>), Error> {
    let mut paths = Vec::new();
    let mut unmatched = Vec::new();
    for pattern in patterns {
        let entries = glob::glob(pattern)
            .map_err(|e| Error::InvalidPath(format!("bad pattern '{pattern}': {e}")))?;
        let before = paths.len();
        paths.extend(entries.filter_map(|entry| entry.ok()));
        if paths.len() == before {
            unmatched.push(pattern.clone());
        }
    }
    paths.sort();
    paths.dedup();
    Ok((paths, unmatched))
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());

    let (paths, unmatched) = match expand(&args.patterns) {
        Ok(expanded) => expanded,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };
    for pattern in &unmatched {
        formatter.warning(&format!("No match for '{pattern}'"));
    }
    if paths.is_empty() {
        formatter.error("Nothing to upload");
        return ExitCode::UsageError;
    }

    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };
    let destination = match active.resolve(args.remote.as_deref().unwrap_or_default()) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let mut options = active.transfer_options(args.workers).include_hidden(args.all);
    if let Some(log) = &args.err_log {
        options = options.error_log(log);
    }
    let engine = active.engine(store, options, ctx);

    let tracker = ProgressTracker::default();
    let renderer = active.progress(ctx, &tracker, "upload");
    let result = engine.upload_paths(&paths, &to_key(&destination), &tracker).await;
    renderer.finish().await;

    let report = match result {
        Ok(r) => r,
        Err(e) => return formatter.fail("Upload failed", &e),
    };

    if formatter.is_json() {
        formatter.json(&UploadOutput {
            destination,
            paths: paths.iter().map(|p| p.display().to_string()).collect(),
            bytes: tracker.current(),
            report,
        });
    } else {
        report_batch(&formatter, "Uploaded", &report, tracker.current());
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let root = dir.path().display();
        let patterns = vec![
            format!("{root}/*.jpg"),
            format!("{root}/a.jpg"),
            format!("{root}/*.png"),
        ];

        let (paths, unmatched) = expand(&patterns).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
        assert_eq!(unmatched, vec![format!("{root}/*.png")]);
    }

    #[test]
    fn test_expand_rejects_bad_pattern() {
        assert!(matches!(
            expand(&["[".to_string()]),
            Err(Error::InvalidPath(_))
        ));
    }
}
