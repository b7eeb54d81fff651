//! cp command - Server-side copy of a file
//!
//! Bytes never leave the bucket. `mv` reuses this path and deletes the source
//! afterwards.

use clap::Args;
use serde::Serialize;

use minx_core::to_key;

use super::{Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Copy a file inside the bucket
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source file
    pub source: String,

    /// Destination file, or a directory ending in `/`
    pub destination: String,

    /// Overwrite an existing destination
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct CopyOutput {
    status: &'static str,
    source: String,
    destination: String,
    overwritten: bool,
    size: u64,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, ctx: &Context) -> ExitCode {
    relocate(&args.source, &args.destination, args.force, false, ctx).await
}

/// Copy, or move when `remove_source` is set
pub(crate) async fn relocate(
    source: &str,
    destination: &str,
    force: bool,
    remove_source: bool,
    ctx: &Context,
) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let (source, destination) = match (active.resolve(source), active.resolve(destination)) {
        (Ok(s), Ok(d)) => (s, d),
        (Err(e), _) | (_, Err(e)) => return formatter.fail("Invalid path", &e),
    };

    let engine = active.engine(store, active.transfer_options(None), ctx);
    let (src_key, dst_key) = (to_key(&source), to_key(&destination));
    let result = if remove_source {
        engine.move_object(&src_key, &dst_key, force).await
    } else {
        engine.copy(&src_key, &dst_key, force).await
    };
    let verb = if remove_source { "move" } else { "copy" };

    match result {
        Ok(outcome) => {
            let destination = format!("/{}", outcome.destination);
            if formatter.is_json() {
                formatter.json(&CopyOutput {
                    status: "success",
                    source,
                    destination,
                    overwritten: outcome.overwritten,
                    size: outcome.info.size_bytes,
                });
            } else {
                let done = if remove_source { "Moved" } else { "Copied" };
                let replaced = if outcome.overwritten { " (overwritten)" } else { "" };
                formatter.success(&format!("{done} {source} -> {destination}{replaced}"));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to {verb} '{source}'"), &e),
    }
}
