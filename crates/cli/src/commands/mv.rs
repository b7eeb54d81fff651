//! mv command - Rename a file inside the bucket

use clap::Args;

use super::Context;
use super::cp::relocate;
use crate::exit_code::ExitCode;

/// Move or rename a file
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Source file
    pub source: String,

    /// Destination file, or a directory ending in `/`
    pub destination: String,

    /// Overwrite an existing destination
    #[arg(short = 'f', long)]
    pub force: bool,
}

/// Execute the mv command
///
/// If the copy succeeds but the source cannot be deleted the object is left
/// at both keys and the command exits with a conflict.
pub async fn execute(args: MvArgs, ctx: &Context) -> ExitCode {
    relocate(&args.source, &args.destination, args.force, true, ctx).await
}
