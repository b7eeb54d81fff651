//! rm command - Remove files, directories or wildcard matches
//!
//! Plain files are removed by default. Directories need `-d` (markers and
//! their contents) or `-a`.

use clap::Args;
use serde::Serialize;

use minx_core::wildcard::has_wildcard;
use minx_core::{DeleteMode, DeleteSelection, Deletion, to_key};

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove files or directories
#[derive(Args, Debug)]
pub struct RmArgs {
    /// File, directory or wildcard pattern (`*` and `?`)
    pub path: String,

    /// Remove directories (takes precedence over `-a`)
    #[arg(short = 'd', long = "dirs")]
    pub dirs: bool,

    /// Remove files and directories
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Delete on a background task and report the match count first
    #[arg(long = "async")]
    pub background: bool,
}

impl RmArgs {
    fn selection(&self) -> DeleteSelection {
        if self.dirs {
            DeleteSelection::Dirs
        } else if self.all {
            DeleteSelection::All
        } else {
            DeleteSelection::Files
        }
    }

    fn mode(&self) -> DeleteMode {
        if self.background {
            DeleteMode::Background
        } else {
            DeleteMode::Foreground
        }
    }
}

#[derive(Debug, Serialize)]
struct RmOutput {
    deleted: Vec<String>,
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let path = match active.resolve(&args.path) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let key = to_key(&path);

    let engine = active.engine(store, active.transfer_options(None), ctx);
    let started = if has_wildcard(&key) {
        engine.delete_matching(&key, args.selection(), args.mode()).await
    } else {
        engine.remove(&key, args.selection(), args.mode()).await
    };
    let deletion = match started {
        Ok(d) => d,
        Err(e) => return formatter.fail(&format!("Cannot remove '{path}'"), &e),
    };

    if let Deletion::Background(task) = &deletion {
        formatter.println(&format!("Deleting {} object(s) in the background", task.matched()));
    }

    let report = match deletion.wait().await {
        Ok(r) => r,
        Err(e) => return formatter.fail("Deletion failed", &e),
    };

    if formatter.is_json() {
        formatter.json(&RmOutput {
            total: report.deleted.len() + report.failed.len(),
            deleted: report.deleted,
            failed: report.failed,
        });
        return ExitCode::Success;
    }

    for key in &report.failed {
        formatter.warning(&format!("Failed to remove '/{key}'"));
    }
    let mut message = format!("Removed {} object(s)", report.deleted.len());
    if !report.failed.is_empty() {
        message.push_str(&format!(", {} failed", report.failed.len()));
    }
    formatter.summary(&message, !report.failed.is_empty());
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RmArgs,
    }

    fn parse(argv: &[&str]) -> RmArgs {
        let mut full = vec!["rm"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_selection_flags() {
        assert_eq!(parse(&["a.txt"]).selection(), DeleteSelection::Files);
        assert_eq!(parse(&["-d", "dir"]).selection(), DeleteSelection::Dirs);
        assert_eq!(parse(&["-a", "dir"]).selection(), DeleteSelection::All);
        assert_eq!(parse(&["--async", "x"]).mode(), DeleteMode::Background);
        assert_eq!(parse(&["x"]).mode(), DeleteMode::Foreground);
    }

    #[test]
    fn test_dirs_wins_over_all() {
        assert_eq!(parse(&["-d", "-a", "x"]).selection(), DeleteSelection::Dirs);
        assert_eq!(parse(&["-a", "-d", "x"]).selection(), DeleteSelection::Dirs);
    }
}
