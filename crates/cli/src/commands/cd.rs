//! cd and pwd commands
//!
//! The current directory lives in the saved session; `cd` checks that the
//! target exists before writing it back.

use clap::Args;
use serde::Serialize;

use minx_core::{Error, SessionManager, change_directory};

use super::{ActiveSession, Context, open};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Change the current virtual directory
#[derive(Args, Debug)]
pub struct CdArgs {
    /// Target directory: absolute, relative, `..` or `/`
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Debug, Serialize)]
struct PathOutput {
    path: String,
}

/// Execute the cd command
pub async fn execute(args: CdArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let (active, store) = match open(ctx, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };
    if active.ephemeral {
        let e = Error::InvalidPath("cd needs a saved session; --auth sessions always start at /".into());
        return formatter.fail("cd", &e);
    }

    let path = match change_directory(store.as_ref(), &active.session.current_path, &args.path).await {
        Ok(p) => p,
        Err(e) => return formatter.fail("cd", &e),
    };

    let saved = SessionManager::new().and_then(|m| m.update_current_path(&path));
    if let Err(e) = saved {
        return formatter.fail("Failed to save current directory", &e);
    }

    print_path(&formatter, path);
    ExitCode::Success
}

/// Execute the pwd command
pub fn pwd(ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    match ActiveSession::load(ctx.auth.as_deref()) {
        Ok(active) => {
            print_path(&formatter, active.session.current_path);
            ExitCode::Success
        }
        Err(e) => formatter.fail("No session", &e),
    }
}

fn print_path(formatter: &Formatter, path: String) {
    if formatter.is_json() {
        formatter.json(&PathOutput { path });
    } else {
        formatter.println(&path);
    }
}
