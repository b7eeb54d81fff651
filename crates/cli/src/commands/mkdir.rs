//! mkdir command - Create a directory marker

use clap::Args;
use serde::Serialize;

use minx_core::to_key;

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Create a directory
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Directory to create
    pub path: String,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    status: &'static str,
    path: String,
    key: String,
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let path = match active.resolve(&args.path) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let engine = active.engine(store, active.transfer_options(None), ctx);
    match engine.make_directory(&to_key(&path)).await {
        Ok(info) => {
            if formatter.is_json() {
                formatter.json(&MkdirOutput {
                    status: "success",
                    path,
                    key: info.key,
                });
            } else {
                formatter.success(&format!("Created directory '{path}'"));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to create directory", &e),
    }
}
