//! Session management
//!
//! A session binds one bucket on an S3-compatible endpoint together with the
//! credentials used to reach it and the virtual working directory the user is
//! currently in. Sessions are plain values: commands load the active one,
//! pass it explicitly to the core operations, and write back path changes
//! through [`SessionManager`].

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigManager};
use crate::error::{Error, Result};
use crate::path;

/// A saved connection to one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique name, `bucket/endpoint` unless given explicitly
    pub name: String,

    /// Endpoint URL including scheme
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Bucket presented as the filesystem root
    pub bucket: String,

    /// Region sent with signed requests
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style addressing (`endpoint/bucket/key`)
    #[serde(default = "default_path_style")]
    pub path_style: bool,

    /// Current virtual directory, always starting with `/`
    #[serde(default = "default_current_path")]
    pub current_path: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

fn default_current_path() -> String {
    "/".to_string()
}

/// Prefix `https://` when the endpoint carries no scheme
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

impl Session {
    /// Create a session rooted at `/`
    pub fn new(
        endpoint: impl AsRef<str>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let endpoint = normalize_endpoint(endpoint.as_ref());
        let bucket = bucket.into();
        Self {
            name: format!("{bucket}/{endpoint}"),
            endpoint,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket,
            region: default_region(),
            path_style: default_path_style(),
            current_path: default_current_path(),
        }
    }

    /// Resolve `input` against this session's working directory
    pub fn format_path(&self, input: &str) -> Result<String> {
        path::format_path(Some(&self.current_path), input)
    }

    /// Render the session as an auth string
    pub fn to_auth_string(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.endpoint, self.access_key, self.secret_key, self.bucket
        )
    }
}

/// Parse `endpoint:accessKey:secretKey:bucketName`
///
/// The endpoint itself may contain colons (scheme, port), so the three
/// trailing fields are split off from the right.
pub fn parse_auth_string(auth: &str) -> Result<Session> {
    let mut parts = auth.rsplitn(4, ':');
    let bucket = parts.next().unwrap_or_default();
    let secret_key = parts.next().unwrap_or_default();
    let access_key = parts.next().unwrap_or_default();
    let endpoint = parts.next().unwrap_or_default();

    if [endpoint, access_key, secret_key, bucket]
        .iter()
        .any(|part| part.is_empty())
    {
        return Err(Error::Config(
            "Invalid auth string. Expected endpoint:accessKey:secretKey:bucketName".into(),
        ));
    }

    Ok(Session::new(endpoint, access_key, secret_key, bucket))
}

/// Manager for saved sessions
#[derive(Debug, Clone)]
pub struct SessionManager {
    config_manager: ConfigManager,
}

impl SessionManager {
    /// Create a new SessionManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new SessionManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// Load the whole configuration
    pub fn config(&self) -> Result<Config> {
        self.config_manager.load()
    }

    /// List all saved sessions together with the active session name
    pub fn list(&self) -> Result<(Vec<Session>, Option<String>)> {
        let config = self.config_manager.load()?;
        Ok((config.sessions, config.current))
    }

    /// Get a session by name
    pub fn get(&self, name: &str) -> Result<Session> {
        let config = self.config_manager.load()?;
        config
            .sessions
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SessionNotFound(name.to_string()))
    }

    /// Get the active session
    pub fn current(&self) -> Result<Session> {
        let config = self.config_manager.load()?;
        let name = config.current.ok_or_else(no_active_session)?;
        config
            .sessions
            .into_iter()
            .find(|s| s.name == name)
            .ok_or(Error::SessionNotFound(name))
    }

    /// Add or replace a session and make it the active one
    pub fn add(&self, session: Session) -> Result<()> {
        self.config_manager.update(|config| {
            config.sessions.retain(|s| s.name != session.name);
            config.current = Some(session.name.clone());
            config.sessions.push(session);
            Ok(())
        })
    }

    /// Remove a session; if it was active, another saved session takes over
    pub fn remove(&self, name: &str) -> Result<()> {
        self.config_manager.update(|config| {
            let before = config.sessions.len();
            config.sessions.retain(|s| s.name != name);
            if config.sessions.len() == before {
                return Err(Error::SessionNotFound(name.to_string()));
            }

            if config.current.as_deref() == Some(name) {
                config.current = config.sessions.first().map(|s| s.name.clone());
            }
            Ok(())
        })
    }

    /// Make a saved session the active one
    pub fn switch(&self, name: &str) -> Result<()> {
        self.config_manager.update(|config| {
            if !config.sessions.iter().any(|s| s.name == name) {
                return Err(Error::SessionNotFound(name.to_string()));
            }
            config.current = Some(name.to_string());
            Ok(())
        })
    }

    /// Persist a new working directory for the active session
    pub fn update_current_path(&self, new_path: &str) -> Result<()> {
        if !new_path.starts_with('/') {
            return Err(Error::InvalidPath(format!(
                "'{new_path}' is not an absolute virtual path"
            )));
        }

        self.config_manager.update(|config| {
            let name = config.current.clone().ok_or_else(no_active_session)?;
            let session = config
                .sessions
                .iter_mut()
                .find(|s| s.name == name)
                .ok_or(Error::SessionNotFound(name))?;
            session.current_path = new_path.to_string();
            Ok(())
        })
    }
}

fn no_active_session() -> Error {
    Error::SessionNotFound("no active session, run `minx login` first".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_session_manager() -> (SessionManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_manager = ConfigManager::with_path(config_path);
        let session_manager = SessionManager::with_config_manager(config_manager);
        (session_manager, temp_dir)
    }

    #[test]
    fn test_session_new() {
        let session = Session::new("play.min.io", "access", "secret", "media");
        assert_eq!(session.endpoint, "https://play.min.io");
        assert_eq!(session.name, "media/https://play.min.io");
        assert_eq!(session.current_path, "/");
        assert_eq!(session.region, "us-east-1");
        assert!(session.path_style);
    }

    #[test]
    fn test_normalize_endpoint_keeps_scheme() {
        assert_eq!(
            normalize_endpoint("http://localhost:9000/"),
            "http://localhost:9000"
        );
        assert_eq!(normalize_endpoint("s3.local"), "https://s3.local");
    }

    #[test]
    fn test_parse_auth_string_with_scheme_and_port() {
        let session = parse_auth_string("http://localhost:9000:ak:sk:data").unwrap();
        assert_eq!(session.endpoint, "http://localhost:9000");
        assert_eq!(session.access_key, "ak");
        assert_eq!(session.secret_key, "sk");
        assert_eq!(session.bucket, "data");
        assert_eq!(session.current_path, "/");
    }

    #[test]
    fn test_parse_auth_string_round_trip() {
        let session = Session::new("https://s3.example.com", "ak", "sk", "b");
        let parsed = parse_auth_string(&session.to_auth_string()).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_parse_auth_string_rejects_short_input() {
        assert!(matches!(
            parse_auth_string("endpoint:ak:sk"),
            Err(Error::Config(_))
        ));
        assert!(parse_auth_string("endpoint:ak::bucket").is_err());
    }

    #[test]
    fn test_current_without_login() {
        let (manager, _temp_dir) = temp_session_manager();
        assert!(matches!(
            manager.current().unwrap_err(),
            Error::SessionNotFound(_)
        ));
    }

    #[test]
    fn test_add_makes_session_current() {
        let (manager, _temp_dir) = temp_session_manager();

        manager
            .add(Session::new("http://a:9000", "a", "a", "one"))
            .unwrap();
        manager
            .add(Session::new("http://b:9000", "b", "b", "two"))
            .unwrap();

        let current = manager.current().unwrap();
        assert_eq!(current.bucket, "two");

        let (sessions, active) = manager.list().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(active.as_deref(), Some("two/http://b:9000"));
    }

    #[test]
    fn test_switch_and_remove() {
        let (manager, _temp_dir) = temp_session_manager();

        manager
            .add(Session::new("http://a:9000", "a", "a", "one"))
            .unwrap();
        manager
            .add(Session::new("http://b:9000", "b", "b", "two"))
            .unwrap();

        manager.switch("one/http://a:9000").unwrap();
        assert_eq!(manager.current().unwrap().bucket, "one");

        manager.remove("one/http://a:9000").unwrap();
        assert_eq!(manager.current().unwrap().bucket, "two");

        manager.remove("two/http://b:9000").unwrap();
        assert!(manager.current().is_err());
    }

    #[test]
    fn test_switch_unknown_session() {
        let (manager, _temp_dir) = temp_session_manager();
        let result = manager.switch("nope");
        assert!(matches!(result.unwrap_err(), Error::SessionNotFound(_)));
    }

    #[test]
    fn test_remove_not_found() {
        let (manager, _temp_dir) = temp_session_manager();
        let result = manager.remove("nonexistent");
        assert!(matches!(result.unwrap_err(), Error::SessionNotFound(_)));
    }

    #[test]
    fn test_update_current_path() {
        let (manager, _temp_dir) = temp_session_manager();
        manager
            .add(Session::new("http://a:9000", "a", "a", "one"))
            .unwrap();

        manager.update_current_path("/photos/2024").unwrap();
        assert_eq!(manager.current().unwrap().current_path, "/photos/2024");

        assert!(matches!(
            manager.update_current_path("relative"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_format_path_uses_current_directory() {
        let mut session = Session::new("http://a:9000", "a", "a", "one");
        session.current_path = "/docs".into();
        assert_eq!(session.format_path("notes.txt").unwrap(), "/docs/notes.txt");
        assert_eq!(session.format_path("").unwrap(), "/docs");
    }
}
