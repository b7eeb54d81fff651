//! Transfer engine
//!
//! Moves objects between the local filesystem and the bound bucket. Single
//! objects go through [`TransferEngine::download`] and
//! [`TransferEngine::upload`]; whole trees are fanned out over a
//! [`WorkerPool`]. Every byte-moving loop checks the engine's cancellation
//! token, so an interrupted transfer leaves a partial file that a later
//! resume can pick up.

mod bulk;
mod error_log;
mod pool;
mod remote;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_WORKERS;
use crate::error::{Error, Result};
use crate::multipart::{
    MultipartConfig, UploadState, calculate_parts, part_byte_range,
};
use crate::progress::ProgressTracker;
use crate::traits::{ObjectInfo, ObjectStore, UploadBody};

pub use bulk::is_hidden;
pub(crate) use bulk::{LocalEntry, walk_local};
pub use error_log::ErrorLog;
pub use pool::{BatchReport, JobOutcome, MAX_WORKERS, WorkerPool, clamp_workers};
pub use remote::{BackgroundDeletion, CopyOutcome, DeleteMode, DeleteReport, DeleteSelection, Deletion};

const CHUNK_SIZE: usize = 64 * 1024;

/// Knobs shared by every transfer of one command
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Concurrent workers for batch transfers, within `[1, MAX_WORKERS]`
    pub workers: usize,
    /// Continue partial downloads and interrupted multipart uploads
    pub resume: bool,
    /// Include entries whose name starts with `.`
    pub include_hidden: bool,
    /// Skip relative paths sorting before this
    pub start: Option<String>,
    /// Skip relative paths sorting at or after this
    pub end: Option<String>,
    /// Append per-item failures to this file
    pub error_log: Option<PathBuf>,
    /// Part sizing and resume state location
    pub multipart: MultipartConfig,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            resume: false,
            include_hidden: false,
            start: None,
            end: None,
            error_log: None,
            multipart: MultipartConfig::default(),
        }
    }
}

impl TransferOptions {
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = clamp_workers(n);
        self
    }

    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn range(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = Some(path.into());
        self
    }

    pub fn multipart(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Whether a relative path lies inside the `[start, end)` window
    pub fn in_range(&self, rel: &str) -> bool {
        if self.start.as_deref().is_some_and(|start| rel < start) {
            return false;
        }
        if self.end.as_deref().is_some_and(|end| rel >= end) {
            return false;
        }
        true
    }
}

/// Result of a single-object transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Bytes moved by this call
    Transferred(u64),
    /// The destination already held the whole object
    AlreadyComplete,
}

impl From<TransferOutcome> for JobOutcome {
    fn from(outcome: TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Transferred(_) => JobOutcome::Done,
            TransferOutcome::AlreadyComplete => JobOutcome::Skipped,
        }
    }
}

/// Moves data between local paths and the bound bucket
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    options: TransferOptions,
    cancel: CancellationToken,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn ObjectStore>, options: TransferOptions) -> Self {
        Self {
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the options, keeping store and cancellation token
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Download one object to `local`
    pub async fn download(
        &self,
        key: &str,
        local: &Path,
        progress: &ProgressTracker,
    ) -> Result<TransferOutcome> {
        self.check_cancelled()?;
        let info = self.store.head_object(key).await?;
        progress.add_total(info.size_bytes);
        self.download_object(&info, local, progress).await
    }

    pub(crate) async fn download_object(
        &self,
        info: &ObjectInfo,
        local: &Path,
        progress: &ProgressTracker,
    ) -> Result<TransferOutcome> {
        self.check_cancelled()?;
        let size = info.size_bytes;

        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let existing = match tokio::fs::metadata(local).await {
            Ok(meta) if self.options.resume && meta.is_file() => Some(meta.len()),
            _ => None,
        };

        let (mut file, offset) = match existing {
            Some(len) if len >= size => {
                debug!(key = %info.key, local = %local.display(), "already downloaded");
                progress.add(size);
                return Ok(TransferOutcome::AlreadyComplete);
            }
            Some(len) => {
                let file = OpenOptions::new().append(true).open(local).await?;
                info!(key = %info.key, offset = len, size, "resuming download");
                (file, len)
            }
            None => (File::create(local).await?, 0),
        };

        progress.add(offset);
        if size == 0 {
            return Ok(TransferOutcome::Transferred(0));
        }

        let mut reader = self
            .store
            .get_object_range(&info.key, offset, Some(size - 1))
            .await?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| Error::TransferFailed(format!("reading {}: {e}", info.key)))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            written += n as u64;
            progress.add(n as u64);

            if self.cancel.is_cancelled() {
                file.flush().await?;
                return Err(Error::Cancelled);
            }
        }
        file.flush().await?;

        if offset + written != size {
            return Err(Error::TransferFailed(format!(
                "{}: expected {} bytes, received {}",
                info.key,
                size - offset,
                written
            )));
        }

        debug!(key = %info.key, local = %local.display(), bytes = written, "downloaded");
        Ok(TransferOutcome::Transferred(written))
    }

    /// Upload one local file to `key`
    pub async fn upload(
        &self,
        local: &Path,
        key: &str,
        progress: &ProgressTracker,
    ) -> Result<TransferOutcome> {
        self.check_cancelled()?;
        let meta = tokio::fs::metadata(local).await?;
        if !meta.is_file() {
            return Err(Error::InvalidPath(format!(
                "'{}' is not a regular file",
                local.display()
            )));
        }
        progress.add_total(meta.len());
        self.upload_file(local, key, meta.len(), progress).await
    }

    pub(crate) async fn upload_file(
        &self,
        local: &Path,
        key: &str,
        size: u64,
        progress: &ProgressTracker,
    ) -> Result<TransferOutcome> {
        self.check_cancelled()?;

        if self.options.resume {
            match self.store.head_object(key).await {
                Ok(remote) if remote.size_bytes >= size => {
                    debug!(key, "already uploaded");
                    progress.add(size);
                    return Ok(TransferOutcome::AlreadyComplete);
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        let content_type = mime_guess::from_path(local)
            .first()
            .map(|mime| mime.essence_str().to_string());

        if !self.options.multipart.is_multipart(size) {
            let body = UploadBody::File {
                path: local.to_path_buf(),
                offset: 0,
                length: size,
            };
            self.store.put_object(key, body, content_type).await?;
            progress.add(size);
            debug!(key, local = %local.display(), bytes = size, "uploaded");
            return Ok(TransferOutcome::Transferred(size));
        }

        self.upload_multipart(local, key, size, content_type, progress)
            .await
    }

    async fn upload_multipart(
        &self,
        local: &Path,
        key: &str,
        size: u64,
        content_type: Option<String>,
        progress: &ProgressTracker,
    ) -> Result<TransferOutcome> {
        let config = &self.options.multipart;
        let state_dir = config.state_dir.as_deref();
        let part_size = config.part_size_for(size);
        let source = local.display().to_string();

        // state is only kept while resuming; otherwise leftovers are abandoned
        let persist = state_dir.filter(|_| self.options.resume);
        let resumed = match (persist, state_dir) {
            (Some(dir), _) => UploadState::load(dir, key)?
                .filter(|s| s.resumes(key, &source, size) && s.part_size == part_size),
            (None, Some(dir)) => {
                self.discard_upload_state(dir, key).await?;
                None
            }
            (None, None) => None,
        };

        let mut state = match resumed {
            Some(state) => {
                info!(key, upload_id = %state.upload_id, next_part = state.next_part_number(), "resuming multipart upload");
                state
            }
            None => {
                let upload_id = self
                    .store
                    .create_multipart_upload(key, content_type)
                    .await?;
                UploadState::new(upload_id, key, source, size, part_size)
            }
        };

        let already = state.completed_bytes();
        progress.add(already);
        let parts = calculate_parts(size, part_size);

        for part_number in state.next_part_number()..=parts {
            let step = async {
                self.check_cancelled()?;
                let (start, end) = part_byte_range(part_number, part_size, size);
                let body = UploadBody::File {
                    path: local.to_path_buf(),
                    offset: start,
                    length: end - start,
                };
                let etag = self
                    .store
                    .upload_part(key, &state.upload_id, part_number, body)
                    .await?;
                Ok::<_, Error>((etag, end - start))
            };

            match step.await {
                Ok((etag, len)) => {
                    state.add_completed_part(part_number, etag);
                    if let Some(dir) = persist {
                        state.save(dir)?;
                    }
                    progress.add(len);
                }
                Err(e) => {
                    if persist.is_none() {
                        self.abort_upload(key, &state.upload_id).await;
                    }
                    return Err(e);
                }
            }
        }

        self.store
            .complete_multipart_upload(key, &state.upload_id, state.completed_parts.clone())
            .await?;
        if let Some(dir) = persist {
            UploadState::delete(dir, key)?;
        }

        debug!(key, parts, bytes = size, "multipart upload complete");
        Ok(TransferOutcome::Transferred(size - already))
    }

    /// Abort the upload recorded for `key` by an earlier run and forget it
    async fn discard_upload_state(&self, dir: &Path, key: &str) -> Result<()> {
        if let Some(stale) = UploadState::load(dir, key)? {
            info!(key, upload_id = %stale.upload_id, "abandoning saved multipart upload");
            self.abort_upload(key, &stale.upload_id).await;
            UploadState::delete(dir, key)?;
        }
        Ok(())
    }

    async fn abort_upload(&self, key: &str, upload_id: &str) {
        if let Err(e) = self.store.abort_multipart_upload(key, upload_id).await {
            warn!(key, upload_id, error = %e, "failed to abort multipart upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::{MockObjectStore, ObjectReader};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(store: &Arc<MemoryStore>, options: TransferOptions) -> TransferEngine {
        TransferEngine::new(store.clone(), options)
    }

    fn small_parts(dir: &Path) -> MultipartConfig {
        MultipartConfig {
            part_size: 4,
            state_dir: Some(dir.join("state")),
        }
    }

    #[test]
    fn test_in_range() {
        let options = TransferOptions::default().range(Some("b".into()), Some("d".into()));
        assert!(!options.in_range("a.txt"));
        assert!(options.in_range("b"));
        assert!(options.in_range("c/x.txt"));
        assert!(!options.in_range("d"));
        assert!(TransferOptions::default().in_range("anything"));
    }

    #[test]
    fn test_workers_clamped() {
        assert_eq!(TransferOptions::default().workers, 5);
        assert_eq!(TransferOptions::default().workers(0).workers, 1);
        assert_eq!(TransferOptions::default().workers(50).workers, MAX_WORKERS);
    }

    #[tokio::test]
    async fn test_download_creates_parents() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("docs/a.txt", b"hello".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("nested/out/a.txt");

        let progress = ProgressTracker::default();
        let outcome = engine(&store, TransferOptions::default())
            .download("docs/a.txt", &local, &progress)
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(5));
        assert_eq!(std::fs::read(&local).unwrap(), b"hello");
        assert_eq!(progress.current(), 5);
        assert_eq!(progress.total(), 5);
    }

    #[tokio::test]
    async fn test_download_without_resume_truncates() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("a.txt", b"new".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"much longer old content").unwrap();

        engine(&store, TransferOptions::default())
            .download("a.txt", &local, &ProgressTracker::default())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_download_resume_appends_tail() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("big.bin", b"0123456789".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("big.bin");
        std::fs::write(&local, b"0123").unwrap();

        let progress = ProgressTracker::default();
        let outcome = engine(&store, TransferOptions::default().resume(true))
            .download("big.bin", &local, &progress)
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(6));
        assert_eq!(std::fs::read(&local).unwrap(), b"0123456789");
        assert_eq!(progress.current(), 10);
    }

    #[tokio::test]
    async fn test_download_resume_requests_only_missing_range() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("big.bin");
        std::fs::write(&local, vec![b'a'; 50]).unwrap();

        let mut mock = MockObjectStore::new();
        mock.expect_head_object()
            .returning(|key| Ok(ObjectInfo::file(key, 100)));
        mock.expect_get_object_range()
            .withf(|key, start, end| key == "big.bin" && *start == 50 && *end == Some(99))
            .times(1)
            .returning(|_, _, _| Ok(Box::pin(std::io::Cursor::new(vec![b'b'; 50])) as ObjectReader));

        let engine = TransferEngine::new(Arc::new(mock), TransferOptions::default().resume(true));
        let outcome = engine
            .download("big.bin", &local, &ProgressTracker::default())
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(50));
        let content = std::fs::read(&local).unwrap();
        assert_eq!(content.len(), 100);
        assert!(content[50..].iter().all(|b| *b == b'b'));
    }

    #[tokio::test]
    async fn test_download_resume_complete_makes_no_request() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("f", b"abc".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("f");
        std::fs::write(&local, b"abcdef").unwrap();

        let outcome = engine(&store, TransferOptions::default().resume(true))
            .download("f", &local, &ProgressTracker::default())
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::AlreadyComplete);
        assert_eq!(std::fs::read(&local).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let result = engine(&store, TransferOptions::default())
            .download("nope", &dir.path().join("nope"), &ProgressTracker::default())
            .await;
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_download_cancelled_before_start() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("f", b"abc".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = engine(&store, TransferOptions::default())
            .with_cancellation(token)
            .download("f", &dir.path().join("f"), &ProgressTracker::default())
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_upload_single_put_with_content_type() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("page.html");
        std::fs::write(&local, b"<html></html>").unwrap();

        let progress = ProgressTracker::default();
        engine(&store, TransferOptions::default())
            .upload(&local, "site/page.html", &progress)
            .await
            .unwrap();

        assert_eq!(store.data("site/page.html").unwrap(), b"<html></html>");
        assert_eq!(store.content_type("site/page.html").as_deref(), Some("text/html"));
        assert_eq!(progress.current(), 13);
    }

    #[tokio::test]
    async fn test_upload_multipart() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"abcdefghij").unwrap();

        let options = TransferOptions::default().multipart(small_parts(dir.path()));
        let outcome = engine(&store, options)
            .upload(&local, "data.bin", &ProgressTracker::default())
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(10));
        assert_eq!(store.data("data.bin").unwrap(), b"abcdefghij");
        assert!(store.pending_uploads().is_empty());
        assert!(UploadState::load(&dir.path().join("state"), "data.bin")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upload_multipart_resumes_from_saved_state() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"abcdefghij").unwrap();
        let multipart = small_parts(dir.path());
        let state_dir = dir.path().join("state");

        // an earlier run finished part 1 only
        let upload_id = store.create_multipart_upload("data.bin", None).await.unwrap();
        let etag = store
            .upload_part("data.bin", &upload_id, 1, UploadBody::Bytes(b"abcd".to_vec()))
            .await
            .unwrap();
        let mut state = UploadState::new(&upload_id, "data.bin", local.display().to_string(), 10, 4);
        state.add_completed_part(1, etag);
        state.save(&state_dir).unwrap();

        let progress = ProgressTracker::default();
        let options = TransferOptions::default().resume(true).multipart(multipart);
        let outcome = engine(&store, options)
            .upload(&local, "data.bin", &progress)
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(6));
        assert_eq!(store.data("data.bin").unwrap(), b"abcdefghij");
        assert_eq!(progress.current(), 10);
    }

    #[tokio::test]
    async fn test_upload_resume_skips_complete_remote() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("a.txt", b"hello".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"hello").unwrap();

        let outcome = engine(&store, TransferOptions::default().resume(true))
            .upload(&local, "a.txt", &ProgressTracker::default())
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::AlreadyComplete);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_no_pending_upload() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"abcdefghij").unwrap();
        let multipart = MultipartConfig {
            part_size: 4,
            state_dir: None,
        };

        let options = TransferOptions::default().multipart(multipart);
        let engine = engine(&store, options);
        store.fail_key("data.bin");
        let result = engine
            .upload(&local, "data.bin", &ProgressTracker::default())
            .await;

        assert!(result.is_err());
        assert!(store.pending_uploads().is_empty());
        assert!(!store.contains("data.bin"));
    }

    #[tokio::test]
    async fn test_failed_part_aborts_upload_when_not_resuming() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"abcdefghij").unwrap();

        let created = Arc::new(AtomicUsize::new(0));
        let aborted = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut mock = MockObjectStore::new();
        let counter = created.clone();
        mock.expect_create_multipart_upload().returning(move |_, _| {
            Ok(format!("upload-{}", counter.fetch_add(1, Ordering::SeqCst) + 1))
        });
        mock.expect_upload_part()
            .returning(|_, _, part_number, _| match part_number {
                1 => Ok("etag-1".to_string()),
                _ => Err(Error::Network("connection reset".into())),
            });
        let log = aborted.clone();
        mock.expect_abort_multipart_upload().returning(move |_, upload_id| {
            log.lock().push(upload_id.to_string());
            Ok(())
        });
        mock.expect_complete_multipart_upload().never();

        let options = TransferOptions::default().multipart(small_parts(dir.path()));
        let engine = TransferEngine::new(Arc::new(mock), options);
        for _ in 0..3 {
            let result = engine
                .upload(&local, "data.bin", &ProgressTracker::default())
                .await;
            assert!(matches!(result, Err(Error::Network(_))));
        }

        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert_eq!(*aborted.lock(), vec!["upload-1", "upload-2", "upload-3"]);
        let state_dir = dir.path().join("state");
        assert!(UploadState::load(&state_dir, "data.bin").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_without_resume_abandons_saved_state() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"abcdefghij").unwrap();
        let state_dir = dir.path().join("state");

        // an earlier resumable run stopped after starting the upload
        let upload_id = store.create_multipart_upload("data.bin", None).await.unwrap();
        UploadState::new(&upload_id, "data.bin", local.display().to_string(), 10, 4)
            .save(&state_dir)
            .unwrap();

        let options = TransferOptions::default().multipart(small_parts(dir.path()));
        let outcome = engine(&store, options)
            .upload(&local, "data.bin", &ProgressTracker::default())
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Transferred(10));
        assert_eq!(store.data("data.bin").unwrap(), b"abcdefghij");
        assert!(store.pending_uploads().is_empty());
        assert!(UploadState::load(&state_dir, "data.bin").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_directory_path_rejected() {
        let store = Arc::new(MemoryStore::new("b"));
        let dir = tempfile::tempdir().unwrap();
        let result = engine(&store, TransferOptions::default())
            .upload(dir.path(), "x", &ProgressTracker::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }
}
