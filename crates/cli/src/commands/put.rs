//! put command - Upload a file or directory
//!
//! Large files go up as multipart uploads; `-c` resumes an interrupted one.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use minx_core::{BatchReport, Error, ProgressTracker, TransferOutcome, to_key};

use super::{Context, open, report_batch};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload a file or directory
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file or directory
    pub local: PathBuf,

    /// Remote destination (defaults to the local name in the current directory)
    pub remote: Option<String>,

    /// Concurrent uploads (1-10)
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Resume interrupted uploads and skip files already uploaded
    #[arg(short = 'c', long = "continue")]
    pub resume: bool,

    /// Include hidden files and directories
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    source: String,
    destination: String,
    bytes: u64,
    report: BatchReport,
}

/// Name of a local path, resolving `.` and `..`
async fn local_name(local: &Path) -> Result<String, Error> {
    if let Some(name) = local.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    let absolute = tokio::fs::canonicalize(local).await?;
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(format!("'{}' has no name", local.display())))
}

/// Remote target: the given path, with the local name appended to a
/// directory-style (`/`-terminated) destination
fn remote_target(remote: Option<&str>, name: &str) -> String {
    match remote {
        None => name.to_string(),
        Some(r) if r.ends_with('/') => format!("{r}{name}"),
        Some(r) => r.to_string(),
    }
}

/// Execute the put command
pub async fn execute(args: PutArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());

    let meta = match tokio::fs::metadata(&args.local).await {
        Ok(m) => m,
        Err(e) => {
            return formatter.fail(&format!("Cannot read '{}'", args.local.display()), &e.into());
        }
    };
    let name = match local_name(&args.local).await {
        Ok(n) => n,
        Err(e) => return formatter.fail("Invalid local path", &e),
    };

    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };
    let path = match active.resolve(&remote_target(args.remote.as_deref(), &name)) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let key = to_key(&path);

    let options = active
        .transfer_options(args.workers)
        .resume(args.resume)
        .include_hidden(args.all);
    let engine = active.engine(store, options, ctx);

    let tracker = ProgressTracker::default();
    let renderer = active.progress(ctx, &tracker, "put");
    let result = if meta.is_dir() {
        engine.upload_directory(&args.local, &key, &tracker).await
    } else {
        engine
            .upload(&args.local, &key, &tracker)
            .await
            .map(|outcome| BatchReport {
                attempted: 1,
                succeeded: usize::from(matches!(outcome, TransferOutcome::Transferred(_))),
                skipped: usize::from(outcome == TransferOutcome::AlreadyComplete),
                failed: 0,
            })
    };
    renderer.finish().await;

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            return formatter.fail(&format!("Failed to upload '{}'", args.local.display()), &e);
        }
    };

    if formatter.is_json() {
        formatter.json(&PutOutput {
            source: args.local.display().to_string(),
            destination: path,
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
    fn test_remote_target() {
        assert_eq!(remote_target(None, "a.txt"), "a.txt");
        assert_eq!(remote_target(Some("/backup/"), "a.txt"), "/backup/a.txt");
        assert_eq!(remote_target(Some("b.txt"), "a.txt"), "b.txt");
    }

    #[tokio::test]
    async fn test_local_name_resolves_dot() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("photos");
        std::fs::create_dir(&nested).unwrap();

        assert_eq!(local_name(&nested).await.unwrap(), "photos");
        assert_eq!(local_name(&nested.join(".")).await.unwrap(), "photos");
    }
}
