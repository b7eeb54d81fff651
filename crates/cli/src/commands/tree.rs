//! tree command - Show a virtual directory as a tree
//!
//! The whole subtree is listed once and rendered from that snapshot.

use clap::Args;
use serde::Serialize;

use minx_core::{ObjectLister, Tree, to_prefix};

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Show a directory tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Root of the tree (defaults to the current directory)
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
struct TreeOutput {
    path: String,
    directories: usize,
    files: usize,
    keys: Vec<String>,
}

/// Execute the tree command
pub async fn execute(args: TreeArgs, ctx: &Context) -> ExitCode {
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

    let objects = match ObjectLister::new(store.as_ref()).collect(&prefix, true).await {
        Ok(o) => o,
        Err(e) => return formatter.fail("Failed to list objects", &e),
    };
    let tree = Tree::build(&prefix, &objects);
    let (directories, files) = tree.counts();

    if formatter.is_json() {
        formatter.json(&TreeOutput {
            path,
            directories,
            files,
            keys: objects.into_iter().map(|o| o.key).collect(),
        });
        return ExitCode::Success;
    }

    formatter.println(tree.render(&path).trim_end());
    formatter.println(&format!("\n{directories} directories, {files} files"));
    ExitCode::Success
}
