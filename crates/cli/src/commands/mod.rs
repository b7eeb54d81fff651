//! CLI command definitions and execution
//!
//! Every command loads the active session (or the ad-hoc one given with
//! `--auth`), resolves its path arguments against the session's current
//! directory and hands the work to `minx-core`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use minx_core::{
    BatchReport, ConfigManager, Defaults, MultipartConfig, ObjectStore, ProgressTracker, Result,
    Session, SessionManager, TransferEngine, TransferOptions, parse_auth_string,
};
use minx_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressRenderer};

mod cd;
mod cp;
mod get;
mod ls;
mod mkdir;
mod mv;
mod put;
mod rm;
mod session;
mod sync;
mod tree;
mod upload;

/// minx - browse an S3 bucket like a filesystem
///
/// Log in once, then move around the bucket with ls/cd/pwd and transfer
/// files and directories with get/put/upload/sync.
#[derive(Parser, Debug)]
#[command(name = "minx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use an ad-hoc session instead of the saved one
    /// (endpoint:accessKey:secretKey:bucket)
    #[arg(long, global = true, env = "MINX_AUTH", hide_env_values = true)]
    pub auth: Option<String>,

    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a bucket and save it as the active session
    Login(session::LoginArgs),

    /// Forget the active session
    Logout,

    /// List saved sessions
    Sessions,

    /// Make another saved session active
    Switch(session::SwitchArgs),

    /// Show the active session and bucket statistics
    Info,

    /// Print an auth string for use with --auth
    Auth(session::AuthArgs),

    /// List a virtual directory
    Ls(ls::LsArgs),

    /// Change the current virtual directory
    Cd(cd::CdArgs),

    /// Print the current virtual directory
    Pwd,

    /// Create a directory marker
    Mkdir(mkdir::MkdirArgs),

    /// Show a directory tree
    Tree(tree::TreeArgs),

    /// Download a file or directory
    Get(get::GetArgs),

    /// Upload a file or directory
    Put(put::PutArgs),

    /// Upload files and directories matching local patterns
    Upload(upload::UploadArgs),

    /// Remove files or directories
    Rm(rm::RmArgs),

    /// Move an object (server-side copy, then delete)
    Mv(mv::MvArgs),

    /// Copy an object server-side
    Cp(cp::CpArgs),

    /// Upload new and changed files from a local directory
    Sync(sync::SyncArgs),
}

/// Shared state handed to every command
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputConfig,
    pub auth: Option<String>,
    pub cancel: CancellationToken,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli, cancel: CancellationToken) -> ExitCode {
    let ctx = Context {
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            no_progress: cli.no_progress,
            quiet: cli.quiet,
        },
        auth: cli.auth,
        cancel,
    };

    match cli.command {
        Commands::Login(args) => session::login(args, &ctx).await,
        Commands::Logout => session::logout(&ctx),
        Commands::Sessions => session::sessions(&ctx),
        Commands::Switch(args) => session::switch(args, &ctx),
        Commands::Info => session::info(&ctx).await,
        Commands::Auth(args) => session::auth(args, &ctx),
        Commands::Ls(args) => ls::execute(args, &ctx).await,
        Commands::Cd(args) => cd::execute(args, &ctx).await,
        Commands::Pwd => cd::pwd(&ctx),
        Commands::Mkdir(args) => mkdir::execute(args, &ctx).await,
        Commands::Tree(args) => tree::execute(args, &ctx).await,
        Commands::Get(args) => get::execute(args, &ctx).await,
        Commands::Put(args) => put::execute(args, &ctx).await,
        Commands::Upload(args) => upload::execute(args, &ctx).await,
        Commands::Rm(args) => rm::execute(args, &ctx).await,
        Commands::Mv(args) => mv::execute(args, &ctx).await,
        Commands::Cp(args) => cp::execute(args, &ctx).await,
        Commands::Sync(args) => sync::execute(args, &ctx).await,
    }
}

/// Load the session and connect to its bucket, reporting failures
pub(crate) async fn open(
    ctx: &Context,
    formatter: &Formatter,
) -> std::result::Result<(ActiveSession, Arc<dyn ObjectStore>), ExitCode> {
    let active = ActiveSession::load(ctx.auth.as_deref())
        .map_err(|e| formatter.fail("No session", &e))?;
    let store = active
        .connect()
        .await
        .map_err(|e| formatter.fail("Failed to create S3 client", &e))?;
    Ok((active, store))
}

/// Print the closing summary of a batch transfer
///
/// Per-item failures do not change the exit code; they were logged as they
/// happened and are counted here.
pub(crate) fn report_batch(formatter: &Formatter, verb: &str, report: &BatchReport, bytes: u64) {
    let size = humansize::format_size(bytes, humansize::BINARY);
    formatter.summary(&format!("{verb} {size}: {report}"), report.has_failures());
}

/// The session a command runs against
#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
    pub session: Session,
    /// Built from `--auth`; never written back to the config
    pub ephemeral: bool,
    pub defaults: Defaults,
    /// Directory holding the config file, if one could be located
    pub config_dir: Option<PathBuf>,
}

impl ActiveSession {
    /// Load the `--auth` session if given, otherwise the saved current one
    pub fn load(auth: Option<&str>) -> Result<Self> {
        let config_manager = ConfigManager::new().ok();
        let config_dir = config_manager
            .as_ref()
            .and_then(|m| m.config_dir().map(PathBuf::from));

        if let Some(auth) = auth {
            let defaults = config_manager
                .and_then(|m| m.load().ok())
                .map(|c| c.defaults)
                .unwrap_or_default();
            return Ok(Self {
                session: parse_auth_string(auth)?,
                ephemeral: true,
                defaults,
                config_dir,
            });
        }

        let manager = SessionManager::new()?;
        let defaults = manager.config()?.defaults;
        Ok(Self {
            session: manager.current()?,
            ephemeral: false,
            defaults,
            config_dir,
        })
    }

    /// Resolve a path argument against the current directory
    pub fn resolve(&self, input: &str) -> Result<String> {
        self.session.format_path(input)
    }

    /// Connect to the session's bucket
    pub async fn connect(&self) -> Result<Arc<dyn ObjectStore>> {
        let client = S3Client::new(&self.session).await?;
        Ok(Arc::new(client))
    }

    /// Transfer options seeded from the configured defaults
    pub fn transfer_options(&self, workers: Option<usize>) -> TransferOptions {
        let mut multipart = MultipartConfig::new().part_size(self.defaults.part_size_mib * 1024 * 1024);
        if let Some(dir) = &self.config_dir {
            multipart = multipart.state_dir(dir.join("uploads"));
        }
        TransferOptions::default()
            .workers(workers.unwrap_or(self.defaults.workers))
            .multipart(multipart)
    }

    /// Engine bound to `store`, sharing the command's cancellation token
    pub fn engine(
        &self,
        store: Arc<dyn ObjectStore>,
        options: TransferOptions,
        ctx: &Context,
    ) -> TransferEngine {
        TransferEngine::new(store, options).with_cancellation(ctx.cancel.clone())
    }

    /// Progress renderer honouring both the flags and `defaults.progress`
    pub fn progress(&self, ctx: &Context, tracker: &ProgressTracker, label: &str) -> ProgressRenderer {
        let mut output = ctx.output.clone();
        output.no_progress |= !self.defaults.progress;
        ProgressRenderer::start(&output, tracker, label)
    }
}
