//! Multipart upload planning and resume state
//!
//! Large uploads are split into fixed-size parts. After every finished part
//! the upload state is written to a JSON file so an interrupted upload can
//! continue from the next unfinished part instead of starting over.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default part size: 64 MiB
pub const DEFAULT_PART_SIZE: u64 = 64 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: u64 = 10_000;

/// Part sizing for multipart uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Part size in bytes; files at or below this go up in one request
    pub part_size: u64,

    /// Directory holding resume state files
    pub state_dir: Option<PathBuf>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            state_dir: None,
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    pub fn state_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(path.into());
        self
    }

    /// Part size actually used for a file, grown to stay under the part limit
    pub fn part_size_for(&self, file_size: u64) -> u64 {
        if file_size.div_ceil(self.part_size) <= MAX_PARTS {
            self.part_size
        } else {
            file_size
                .div_ceil(MAX_PARTS)
                .clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }

    /// Whether a file of this size needs a multipart upload
    pub fn is_multipart(&self, file_size: u64) -> bool {
        file_size > self.part_size
    }
}

/// A part the server has acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Persisted progress of one multipart upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadState {
    /// Upload ID from the server
    pub upload_id: String,

    /// Destination object key
    pub target: String,

    /// Local source file
    pub source: String,

    /// Source size when the upload started
    pub total_size: u64,

    /// Part size used
    pub part_size: u64,

    /// Acknowledged parts
    pub completed_parts: Vec<CompletedPart>,

    /// Timestamp of last update
    pub last_updated: jiff::Timestamp,
}

impl UploadState {
    pub fn new(
        upload_id: impl Into<String>,
        target: impl Into<String>,
        source: impl Into<String>,
        total_size: u64,
        part_size: u64,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            target: target.into(),
            source: source.into(),
            total_size,
            part_size,
            completed_parts: Vec::new(),
            last_updated: jiff::Timestamp::now(),
        }
    }

    /// Record an acknowledged part
    pub fn add_completed_part(&mut self, part_number: i32, etag: String) {
        self.completed_parts
            .retain(|p| p.part_number != part_number);
        self.completed_parts.push(CompletedPart { part_number, etag });
        self.completed_parts.sort_by_key(|p| p.part_number);
        self.last_updated = jiff::Timestamp::now();
    }

    /// Next part to upload
    pub fn next_part_number(&self) -> i32 {
        self.completed_parts
            .iter()
            .map(|p| p.part_number)
            .max()
            .map(|n| n + 1)
            .unwrap_or(1)
    }

    /// Bytes already acknowledged by the server
    pub fn completed_bytes(&self) -> u64 {
        self.completed_parts
            .iter()
            .map(|p| {
                let (start, end) = part_byte_range(p.part_number, self.part_size, self.total_size);
                end - start
            })
            .sum()
    }

    /// Whether this state can continue an upload of `source` to `target`
    pub fn resumes(&self, target: &str, source: &str, total_size: u64) -> bool {
        self.target == target && self.source == source && self.total_size == total_size
    }

    /// State file path for a target key
    pub fn state_file_path(state_dir: &Path, target: &str) -> PathBuf {
        let safe: String = target
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        state_dir.join(format!("upload_{safe}.json"))
    }

    /// Save state to file
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(state_dir)?;
        let path = Self::state_file_path(state_dir, &self.target);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Load the state recorded for a target, if any
    pub fn load(state_dir: &Path, target: &str) -> Result<Option<Self>> {
        let path = Self::state_file_path(state_dir, target);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(state) if state.target == target => Ok(Some(state)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable upload state");
                Ok(None)
            }
        }
    }

    /// Delete the state file for a target
    pub fn delete(state_dir: &Path, target: &str) -> Result<()> {
        let path = Self::state_file_path(state_dir, target);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> i32 {
    file_size.div_ceil(part_size).max(1) as i32
}

/// Byte range `[start, end)` covered by a part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = ((part_number as u64 - 1) * part_size).min(total_size);
    let end = (start + part_size).min(total_size);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_size_clamping() {
        let config = MultipartConfig::new().part_size(1024);
        assert_eq!(config.part_size, MIN_PART_SIZE);

        let config = MultipartConfig::new().part_size(10 * 1024 * 1024 * 1024);
        assert_eq!(config.part_size, MAX_PART_SIZE);
    }

    #[test]
    fn test_part_size_grows_for_huge_files() {
        let config = MultipartConfig::default();
        let huge_file = DEFAULT_PART_SIZE * 20_000;
        let size = config.part_size_for(huge_file);
        assert!(size > DEFAULT_PART_SIZE);
        assert!(calculate_parts(huge_file, size) as u64 <= MAX_PARTS);
    }

    #[test]
    fn test_is_multipart() {
        let config = MultipartConfig::default();
        assert!(!config.is_multipart(DEFAULT_PART_SIZE));
        assert!(config.is_multipart(DEFAULT_PART_SIZE + 1));
    }

    #[test]
    fn test_upload_state_parts() {
        let mut state = UploadState::new("upload-123", "key", "/tmp/f", 250, 100);
        assert_eq!(state.next_part_number(), 1);

        state.add_completed_part(1, "etag1".to_string());
        state.add_completed_part(3, "etag3".to_string());
        assert_eq!(state.next_part_number(), 4);
        assert_eq!(state.completed_bytes(), 150);

        state.add_completed_part(1, "etag1b".to_string());
        assert_eq!(state.completed_parts.len(), 2);
        assert_eq!(state.completed_parts[0].etag, "etag1b");
    }

    #[test]
    fn test_resumes() {
        let state = UploadState::new("u", "docs/a.bin", "/data/a.bin", 1000, 100);
        assert!(state.resumes("docs/a.bin", "/data/a.bin", 1000));
        assert!(!state.resumes("docs/a.bin", "/data/a.bin", 999));
        assert!(!state.resumes("docs/b.bin", "/data/a.bin", 1000));
    }

    #[test]
    fn test_state_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = UploadState::new("u-1", "docs/a.bin", "/data/a.bin", 1000, 100);
        state.add_completed_part(1, "e1".into());
        state.save(dir.path()).unwrap();

        let loaded = UploadState::load(dir.path(), "docs/a.bin").unwrap().unwrap();
        assert_eq!(loaded.upload_id, "u-1");
        assert_eq!(loaded.completed_parts.len(), 1);

        assert!(UploadState::load(dir.path(), "docs/other").unwrap().is_none());

        UploadState::delete(dir.path(), "docs/a.bin").unwrap();
        assert!(UploadState::load(dir.path(), "docs/a.bin").unwrap().is_none());
    }

    #[test]
    fn test_calculate_parts() {
        assert_eq!(calculate_parts(100, 10), 10);
        assert_eq!(calculate_parts(101, 10), 11);
        assert_eq!(calculate_parts(0, 10), 1);
    }

    #[test]
    fn test_part_byte_range() {
        assert_eq!(part_byte_range(1, 100, 250), (0, 100));
        assert_eq!(part_byte_range(2, 100, 250), (100, 200));
        assert_eq!(part_byte_range(3, 100, 250), (200, 250));
    }
}
