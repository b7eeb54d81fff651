//! get command - Download a file or directory
//!
//! Directories are fetched by a worker pool; `-c` continues partial files.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use minx_core::{BatchReport, ProgressTracker, base_name, to_key};

use super::{Context, open, report_batch};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Download a file or directory
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Remote file or directory
    pub remote: String,

    /// Local destination (defaults to the remote name in the working directory)
    pub local: Option<PathBuf>,

    /// Concurrent downloads (1-10)
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Continue partially downloaded files
    #[arg(short = 'c', long = "continue")]
    pub resume: bool,

    /// Skip files whose relative path sorts before this
    #[arg(long)]
    pub start: Option<String>,

    /// Skip files whose relative path sorts at or after this
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    source: String,
    destination: String,
    bytes: u64,
    report: BatchReport,
}

/// Local name for a download when none was given
fn default_local(key: &str) -> PathBuf {
    match base_name(key).trim_end_matches('/') {
        "" => PathBuf::from("."),
        name => PathBuf::from(name),
    }
}

/// Execute the get command
pub async fn execute(args: GetArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let path = match active.resolve(&args.remote) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let key = to_key(&path);
    let local = args.local.unwrap_or_else(|| default_local(&key));

    let options = active
        .transfer_options(args.workers)
        .resume(args.resume)
        .range(args.start, args.end);
    let engine = active.engine(store, options, ctx);

    let tracker = ProgressTracker::default();
    let renderer = active.progress(ctx, &tracker, "get");
    let result = engine.download_path(&key, &local, &tracker).await;
    renderer.finish().await;

    let report = match result {
        Ok(r) => r,
        Err(e) => return formatter.fail(&format!("Failed to download '{path}'"), &e),
    };

    if formatter.is_json() {
        formatter.json(&GetOutput {
            source: path,
            destination: local.display().to_string(),
            bytes: tracker.current(),
            report,
        });
    } else {
        report_batch(&formatter, "Downloaded", &report, tracker.current());
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local() {
        assert_eq!(default_local("docs/report.pdf"), PathBuf::from("report.pdf"));
        assert_eq!(default_local("docs/2024/"), PathBuf::from("2024"));
        assert_eq!(default_local("docs/2024"), PathBuf::from("2024"));
        assert_eq!(default_local(""), PathBuf::from("."));
    }
}
