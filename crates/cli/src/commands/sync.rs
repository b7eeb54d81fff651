//! sync command - Mirror a local directory into the bucket
//!
//! Only new or changed files are uploaded. With `--delete`, remote files that
//! no longer exist locally are removed afterwards.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use minx_core::{ProgressTracker, SyncAction, SyncPlanner, SyncReport, to_key};

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload what changed in a local directory
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Local directory
    pub local: PathBuf,

    /// Remote directory (defaults to the current directory)
    pub remote: Option<String>,

    /// Concurrent uploads (1-10)
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Delete remote files that are missing locally
    #[arg(long)]
    pub delete: bool,

    /// Include hidden files and directories
    #[arg(long)]
    pub all: bool,

    /// List every file and the action taken
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct SyncOutput {
    source: String,
    destination: String,
    bytes: u64,
    #[serde(flatten)]
    report: SyncReport,
}

fn summary_line(report: &SyncReport) -> String {
    let skipped = report.entries.len() - report.uploaded();
    let mut line = format!("{} uploaded, {skipped} unchanged", report.batch.succeeded);
    if report.batch.failed > 0 {
        line.push_str(&format!(", {} failed", report.batch.failed));
    }
    if !report.deleted.is_empty() {
        line.push_str(&format!(", {} deleted", report.deleted.len()));
    }
    if !report.delete_failed.is_empty() {
        line.push_str(&format!(", {} not deleted", report.delete_failed.len()));
    }
    line
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };
    let destination = match active.resolve(args.remote.as_deref().unwrap_or_default()) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let options = active.transfer_options(args.workers).include_hidden(args.all);
    let planner = SyncPlanner::new(active.engine(store, options, ctx)).delete_extraneous(args.delete);

    let tracker = ProgressTracker::default();
    let renderer = active.progress(ctx, &tracker, "sync");
    let result = planner.run(&args.local, &to_key(&destination), &tracker).await;
    renderer.finish().await;

    let report = match result {
        Ok(r) => r,
        Err(e) => return formatter.fail("Sync failed", &e),
    };

    if formatter.is_json() {
        formatter.json(&SyncOutput {
            source: args.local.display().to_string(),
            destination,
            bytes: tracker.current(),
            report,
        });
        return ExitCode::Success;
    }

    if args.verbose {
        for entry in &report.entries {
            let mark = match entry.action {
                SyncAction::Upload => "+",
                SyncAction::Skip => "=",
            };
            formatter.println(&format!("{mark} {}", entry.rel));
        }
        for key in &report.deleted {
            formatter.println(&format!("- /{key}"));
        }
    }

    let line = summary_line(&report);
    let size = humansize::format_size(tracker.current(), humansize::BINARY);
    let had_failures = report.batch.has_failures() || !report.delete_failed.is_empty();
    formatter.summary(&format!("Synced {size}: {line}"), had_failures);
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use minx_core::{BatchReport, SyncDiffEntry};

    fn entry(rel: &str, action: SyncAction) -> SyncDiffEntry {
        SyncDiffEntry {
            rel: rel.into(),
            action,
        }
    }

    #[test]
    fn test_summary_line() {
        let mut report = SyncReport {
            entries: vec![
                entry("a.txt", SyncAction::Upload),
                entry("b.txt", SyncAction::Skip),
                entry("c.txt", SyncAction::Upload),
            ],
            batch: BatchReport {
                attempted: 2,
                succeeded: 2,
                skipped: 0,
                failed: 0,
            },
            ..Default::default()
        };
        assert_eq!(summary_line(&report), "2 uploaded, 1 unchanged");

        report.batch.succeeded = 1;
        report.batch.failed = 1;
        report.deleted = vec!["site/old.txt".into()];
        assert_eq!(summary_line(&report), "1 uploaded, 1 unchanged, 1 failed, 1 deleted");
    }
}
