//! Configuration file
//!
//! Sessions and transfer defaults live in one TOML file, `config.toml`, under
//! `$MINX_CONFIG_DIR` or `~/.config/minx`. The file holds secret keys, so it
//! is replaced atomically and kept at mode 0600 on Unix.
//!
//! Changing the layout means bumping [`SCHEMA_VERSION`] and teaching
//! `ConfigManager::migrate` about the previous one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Session;

pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MINX_CONFIG_DIR";

pub const DEFAULT_WORKERS: usize = 5;

const DEFAULT_PART_SIZE_MIB: u64 = 64;

/// S3 rejects multipart parts below 5 MiB (except the last one)
const MIN_PART_SIZE_MIB: u64 = 5;

const CONFIG_FILE: &str = "config.toml";

/// Everything persisted between invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Files written before versioning carry no number and read as 0
    #[serde(default)]
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    /// Name of the active session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,

    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Transfer settings used when a command does not override them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Worker count used when a command does not pass `-w`
    pub workers: usize,

    /// Draw progress while transferring
    pub progress: bool,

    /// Multipart part size in MiB
    pub part_size_mib: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            progress: true,
            part_size_mib: DEFAULT_PART_SIZE_MIB,
        }
    }
}

impl Defaults {
    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("defaults.workers must be at least 1".into()));
        }
        if self.part_size_mib < MIN_PART_SIZE_MIB {
            return Err(Error::Config(format!(
                "defaults.part_size_mib must be at least {MIN_PART_SIZE_MIB}"
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            current: None,
            sessions: Vec::new(),
        }
    }
}

/// Reads and writes the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Locate the configuration file, honouring `$MINX_CONFIG_DIR`
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .map(|d| d.join("minx"))
                .ok_or_else(|| Error::Config("cannot determine a config directory".into()))?,
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Directory holding the file; multipart resume state is kept below it
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_path.parent()
    }

    /// Load the file, or the default configuration when there is none
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&content)?;

        let config = match config.schema_version {
            v if v < SCHEMA_VERSION => self.migrate(config),
            SCHEMA_VERSION => config,
            v => {
                return Err(Error::Config(format!(
                    "{} was written by a newer minx (schema {v}, this build reads up to {SCHEMA_VERSION})",
                    self.config_path.display()
                )));
            }
        };
        config.defaults.validate()?;
        Ok(config)
    }

    /// Write the whole file through a temporary sibling and a rename
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_dir() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        let staging = self.config_path.with_extension("toml.tmp");
        std::fs::write(&staging, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&staging, &self.config_path)?;
        tracing::debug!(path = %self.config_path.display(), "config saved");
        Ok(())
    }

    /// Load, apply `change`, and save only if it succeeded
    pub fn update<T>(&self, change: impl FnOnce(&mut Config) -> Result<T>) -> Result<T> {
        let mut config = self.load()?;
        let value = change(&mut config)?;
        self.save(&config)?;
        Ok(value)
    }

    fn migrate(&self, mut config: Config) -> Config {
        // schema 0 differs only by the missing version number
        tracing::info!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "migrating config"
        );
        config.schema_version = SCHEMA_VERSION;
        config
    }
}
