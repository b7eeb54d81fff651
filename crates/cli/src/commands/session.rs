//! Session commands: login, logout, sessions, switch, info, auth
//!
//! A session is a saved connection to one bucket; the active one is what
//! every other command runs against.

use clap::Args;
use serde::Serialize;

use minx_core::{Error, ListOptions, ObjectStore, Session, SessionManager};
use minx_s3::S3Client;

use super::{ActiveSession, Context};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Objects sampled by `info` for its statistics
const INFO_SAMPLE: i32 = 1000;

/// Arguments for the `login` command
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Endpoint URL (e.g. "http://localhost:9000"); https is assumed without a scheme
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Bucket to present as the filesystem root
    pub bucket: String,

    /// Region used to sign requests
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Use virtual-hosted style addressing instead of path style
    #[arg(long)]
    pub virtual_host: bool,
}

/// Arguments for the `switch` command
#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Session name as shown by `minx sessions`
    pub name: String,
}

/// Arguments for the `auth` command
#[derive(Args, Debug)]
pub struct AuthArgs {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

/// Session information for JSON output (without secrets)
#[derive(Debug, Serialize)]
struct SessionInfo {
    name: String,
    endpoint: String,
    bucket: String,
    region: String,
    current_path: String,
    active: bool,
}

impl SessionInfo {
    fn new(session: &Session, active: bool) -> Self {
        Self {
            name: session.name.clone(),
            endpoint: session.endpoint.clone(),
            bucket: session.bucket.clone(),
            region: session.region.clone(),
            current_path: session.current_path.clone(),
            active,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionOperationOutput {
    success: bool,
    session: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    session: SessionInfo,
    access_key: String,
    reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<BucketStats>,
}

#[derive(Debug, Serialize)]
struct BucketStats {
    objects: usize,
    /// More objects exist than were sampled
    more: bool,
    total_size_bytes: u64,
    total_size_human: String,
}

fn report(formatter: &Formatter, session: &str, message: String) {
    if formatter.is_json() {
        formatter.json(&SessionOperationOutput {
            success: true,
            session: session.to_string(),
            message,
        });
    } else {
        formatter.success(&message);
    }
}

/// Execute the `login` command
pub async fn login(args: LoginArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());

    if args.endpoint.trim().is_empty() || args.bucket.trim().is_empty() {
        formatter.error("Endpoint and bucket cannot be empty");
        return ExitCode::UsageError;
    }

    let mut session = Session::new(&args.endpoint, args.access_key, args.secret_key, args.bucket);
    session.region = args.region;
    session.path_style = !args.virtual_host;

    let client = match S3Client::new(&session).await {
        Ok(c) => c,
        Err(e) => return formatter.fail("Failed to create S3 client", &e),
    };
    match client.bucket_exists().await {
        Ok(true) => {}
        Ok(false) => {
            let e = Error::ObjectNotFound(format!("bucket '{}' does not exist", session.bucket));
            return formatter.fail("Login failed", &e);
        }
        Err(e) => return formatter.fail("Failed to verify bucket", &e),
    }

    let manager = match SessionManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load sessions", &e),
    };
    let name = session.name.clone();
    if let Err(e) = manager.add(session) {
        return formatter.fail("Failed to save session", &e);
    }

    tracing::info!(session = %name, "logged in");
    report(&formatter, &name, format!("Logged in, current session: {name}"));
    ExitCode::Success
}

/// Execute the `logout` command
pub fn logout(ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let manager = match SessionManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load sessions", &e),
    };

    let current = match manager.current() {
        Ok(s) => s,
        Err(e) => return formatter.fail("Logout failed", &e),
    };
    if let Err(e) = manager.remove(&current.name) {
        return formatter.fail("Failed to remove session", &e);
    }

    report(&formatter, &current.name, format!("Logged out of {}", current.name));
    ExitCode::Success
}

/// Execute the `sessions` command
pub fn sessions(ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let manager = match SessionManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load sessions", &e),
    };
    let (sessions, current) = match manager.list() {
        Ok(listed) => listed,
        Err(e) => return formatter.fail("Failed to load sessions", &e),
    };

    let is_current = |s: &Session| current.as_deref() == Some(s.name.as_str());

    if formatter.is_json() {
        let items: Vec<SessionInfo> = sessions
            .iter()
            .map(|s| SessionInfo::new(s, is_current(s)))
            .collect();
        formatter.json(&items);
    } else if sessions.is_empty() {
        formatter.println("No saved sessions.");
    } else {
        for session in &sessions {
            let marker = if is_current(session) { "> " } else { "  " };
            formatter.println(&format!("{marker}{}", session.name));
        }
    }
    ExitCode::Success
}

/// Execute the `switch` command
pub fn switch(args: SwitchArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let manager = match SessionManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load sessions", &e),
    };
    if let Err(e) = manager.switch(&args.name) {
        return formatter.fail("Switch failed", &e);
    }

    report(&formatter, &args.name, format!("Switched to {}", args.name));
    ExitCode::Success
}

/// Execute the `info` command
pub async fn info(ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let active = match ActiveSession::load(ctx.auth.as_deref()) {
        Ok(a) => a,
        Err(e) => return formatter.fail("No session", &e),
    };
    let session = &active.session;

    let mut output = InfoOutput {
        session: SessionInfo::new(session, !active.ephemeral),
        access_key: session.access_key.clone(),
        reachable: false,
        error: None,
        stats: None,
    };

    match collect_stats(&active).await {
        Ok(stats) => {
            output.reachable = true;
            output.stats = stats;
        }
        Err(e) => output.error = Some(e.to_string()),
    }

    if formatter.is_json() {
        formatter.json(&output);
        return ExitCode::Success;
    }

    formatter.println("Current session:");
    formatter.println(&format!("  Endpoint:     {}", session.endpoint));
    formatter.println(&format!("  Bucket:       {}", session.bucket));
    formatter.println(&format!("  Access Key:   {}", session.access_key));
    formatter.println(&format!("  Current Path: {}", session.current_path));
    match (&output.error, &output.stats) {
        (Some(e), _) => formatter.println(&format!("  Status:       unreachable ({e})")),
        (None, None) => formatter.println(&format!(
            "  Status:       bucket '{}' does not exist",
            session.bucket
        )),
        (None, Some(stats)) => {
            formatter.println("  Status:       bucket exists and is accessible");
            let count = if stats.more {
                format!(">{INFO_SAMPLE}")
            } else {
                stats.objects.to_string()
            };
            formatter.println(&format!("  Objects:      {count}"));
            formatter.println(&format!("  Used:         {}", stats.total_size_human));
        }
    }
    ExitCode::Success
}

/// Check the bucket and sample its first page of objects
async fn collect_stats(active: &ActiveSession) -> minx_core::Result<Option<BucketStats>> {
    let store = active.connect().await?;
    if !store.bucket_exists().await? {
        return Ok(None);
    }

    let page = store
        .list_objects(ListOptions {
            max_keys: Some(INFO_SAMPLE),
            recursive: true,
            ..Default::default()
        })
        .await?;
    let total: u64 = page.items.iter().map(|o| o.size_bytes).sum();
    Ok(Some(BucketStats {
        objects: page.items.len(),
        more: page.truncated,
        total_size_bytes: total,
        total_size_human: humansize::format_size(total, humansize::BINARY),
    }))
}

/// Execute the `auth` command
pub fn auth(args: AuthArgs, ctx: &Context) -> ExitCode {
    let formatter = Formatter::new(ctx.output.clone());
    let session = Session::new(&args.endpoint, args.access_key, args.secret_key, args.bucket);
    let auth = session.to_auth_string();

    if formatter.is_json() {
        formatter.json(&serde_json::json!({ "auth": auth }));
    } else {
        // printed even with --quiet; the string is the whole point
        println!("{auth}");
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_info_has_no_secret() {
        let session = Session::new("localhost:9000", "ak", "very-secret", "b");
        let json = serde_json::to_string(&SessionInfo::new(&session, true)).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(json.contains("\"endpoint\":\"https://localhost:9000\""));
        assert!(json.contains("\"active\":true"));
    }
}
