//! ls command - List a virtual directory
//!
//! Directories come first, then files ordered by modification time.

use clap::Args;
use serde::Serialize;

use minx_core::{Entry, Error, LevelOptions, ObjectInfo, ObjectLister, to_prefix};

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List a virtual directory
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Directory to list (defaults to the current directory)
    pub path: Option<String>,

    /// Only show directories
    #[arg(short = 'd', long = "dirs")]
    pub dirs_only: bool,

    /// Newest files first
    #[arg(short = 'r', long = "reverse")]
    pub reverse: bool,

    /// Show only the first N entries
    #[arg(short = 'c', long = "count", value_name = "N")]
    pub count: Option<usize>,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    entries: Vec<Entry>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let path = match active.resolve(args.path.as_deref().unwrap_or_default()) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let prefix = to_prefix(&path);

    let lister = ObjectLister::new(store.as_ref());
    let listing = match lister.list_level(&prefix).await {
        Ok(l) => l,
        Err(e) => return formatter.fail("Failed to list objects", &e),
    };

    // an empty level is fine for an existing directory, not for a typo
    if listing.is_empty() && !prefix.is_empty() {
        match lister.exists(&prefix).await {
            Ok(true) => {}
            Ok(false) => {
                let e = Error::ObjectNotFound(format!("directory '{path}' does not exist"));
                return formatter.fail("ls", &e);
            }
            Err(e) => return formatter.fail("Failed to list objects", &e),
        }
    }

    let entries = listing.entries(&LevelOptions {
        dirs_only: args.dirs_only,
        newest_first: args.reverse,
        limit: args.count.filter(|n| *n > 0),
    });

    if formatter.is_json() {
        formatter.json(&LsOutput { path, entries });
        return ExitCode::Success;
    }

    for entry in &entries {
        match entry {
            Entry::Dir { name } => formatter.println(&formatter.dir_name(name)),
            Entry::File { name, info } => formatter.println(&file_line(name, info)),
        }
    }
    ExitCode::Success
}

fn file_line(name: &str, info: &ObjectInfo) -> String {
    let date = info
        .last_modified
        .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| " ".repeat(19));
    let size = info.size_human.as_deref().unwrap_or("0 B");
    format!("{date}  {size:>10}  {name}")
}
