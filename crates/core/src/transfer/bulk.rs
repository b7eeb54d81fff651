//! Batch transfers over the worker pool

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_channel::Receiver;
use futures::StreamExt;
use jiff::Timestamp;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::error_log::ErrorLog;
use super::pool::{BatchReport, JobOutcome, WorkerPool};
use super::{TransferEngine, TransferOutcome};
use crate::error::{Error, Result};
use crate::lister::ObjectLister;
use crate::path::{base_name, to_prefix};
use crate::progress::ProgressTracker;
use crate::traits::{ObjectInfo, UploadBody};

const WALK_QUEUE: usize = 64;

/// Whether a file name marks a hidden entry
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_hidden_os(name: &OsStr) -> bool {
    name.to_str().is_some_and(is_hidden)
}

/// A file or directory found below a local root
#[derive(Debug, Clone)]
pub(crate) enum LocalEntry {
    Dir {
        rel: String,
    },
    File {
        path: PathBuf,
        rel: String,
        size: u64,
        modified: Option<Timestamp>,
    },
}

/// Relative path with `/` separators regardless of platform
fn rel_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn local_entry(root: &Path, entry: walkdir::DirEntry) -> Result<Option<LocalEntry>> {
    let Some(rel) = rel_key(root, entry.path()) else {
        return Ok(None);
    };
    if entry.file_type().is_dir() {
        return Ok(Some(LocalEntry::Dir { rel }));
    }
    if !entry.file_type().is_file() {
        debug!(path = %entry.path().display(), "skipping special file");
        return Ok(None);
    }

    let meta = entry.metadata().map_err(std::io::Error::from)?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| Timestamp::try_from(t).ok());
    Ok(Some(LocalEntry::File {
        path: entry.into_path(),
        rel,
        size: meta.len(),
        modified,
    }))
}

/// Walk `root` on a blocking thread, streaming entries in file-name order
///
/// Hidden entries are pruned (with their subtrees) unless `include_hidden`.
pub(crate) fn walk_local(root: PathBuf, include_hidden: bool) -> Receiver<Result<LocalEntry>> {
    let (tx, rx) = async_channel::bounded(WALK_QUEUE);

    tokio::task::spawn_blocking(move || {
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| include_hidden || !is_hidden_os(e.file_name()));

        for entry in walker {
            let item = match entry {
                Ok(entry) => match local_entry(&root, entry) {
                    Ok(Some(item)) => Ok(item),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                },
                Err(e) => Err(Error::Io(e.into())),
            };
            if tx.send_blocking(item).is_err() {
                break;
            }
        }
    });

    rx
}

/// Join a `/`-separated relative key below a local root, refusing `..`
fn safe_join(root: &Path, rel: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in rel.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." {
            return None;
        }
        path.push(segment);
    }
    (path != root).then_some(path)
}

struct DownloadJob {
    info: ObjectInfo,
    local: PathBuf,
}

impl fmt::Display for DownloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "download '{}' -> '{}'", self.info.key, self.local.display())
    }
}

struct UploadJob {
    local: PathBuf,
    key: String,
    size: u64,
}

impl fmt::Display for UploadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload '{}' -> '{}'", self.local.display(), self.key)
    }
}

impl TransferEngine {
    pub(crate) async fn open_error_log(&self) -> Result<Option<Arc<ErrorLog>>> {
        match &self.options.error_log {
            Some(path) => Ok(Some(Arc::new(ErrorLog::open(path).await?))),
            None => Ok(None),
        }
    }

    fn download_pool(&self, error_log: Option<Arc<ErrorLog>>, progress: &ProgressTracker) -> WorkerPool<DownloadJob> {
        let engine = Arc::new(self.clone());
        let progress = progress.clone();
        WorkerPool::spawn(self.options.workers, error_log, move |job: DownloadJob| {
            let engine = Arc::clone(&engine);
            let progress = progress.clone();
            async move {
                engine
                    .download_object(&job.info, &job.local, &progress)
                    .await
                    .map(JobOutcome::from)
            }
        })
    }

    fn upload_pool(&self, error_log: Option<Arc<ErrorLog>>, progress: &ProgressTracker) -> WorkerPool<UploadJob> {
        let engine = Arc::new(self.clone());
        let progress = progress.clone();
        WorkerPool::spawn(self.options.workers, error_log, move |job: UploadJob| {
            let engine = Arc::clone(&engine);
            let progress = progress.clone();
            async move {
                engine
                    .upload_file(&job.local, &job.key, job.size, &progress)
                    .await
                    .map(JobOutcome::from)
            }
        })
    }

    /// Download a file or a whole virtual directory
    ///
    /// A key that is not an object but has children is treated as a
    /// directory. When `local` is an existing directory a single file lands
    /// inside it under its own name.
    pub async fn download_path(
        &self,
        key: &str,
        local: &Path,
        progress: &ProgressTracker,
    ) -> Result<BatchReport> {
        if !key.is_empty() && !key.ends_with('/') {
            match self.store.head_object(key).await {
                Ok(info) => {
                    let target = if tokio::fs::metadata(local).await.is_ok_and(|m| m.is_dir()) {
                        local.join(base_name(key))
                    } else {
                        local.to_path_buf()
                    };
                    progress.add_total(info.size_bytes);
                    let outcome = self.download_object(&info, &target, progress).await?;
                    return Ok(BatchReport {
                        attempted: 1,
                        succeeded: usize::from(matches!(outcome, TransferOutcome::Transferred(_))),
                        skipped: usize::from(outcome == TransferOutcome::AlreadyComplete),
                        failed: 0,
                    });
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        let prefix = to_prefix(key);
        if !prefix.is_empty() && !ObjectLister::new(self.store.as_ref()).exists(&prefix).await? {
            return Err(Error::ObjectNotFound(format!("'/{key}' does not exist")));
        }
        self.download_prefix(&prefix, local, progress).await
    }

    /// Download every object under `prefix` into `local_root`
    pub async fn download_prefix(
        &self,
        prefix: &str,
        local_root: &Path,
        progress: &ProgressTracker,
    ) -> Result<BatchReport> {
        tokio::fs::create_dir_all(local_root).await.map_err(|e| {
            Error::TransferFailed(format!("cannot create '{}': {e}", local_root.display()))
        })?;

        let error_log = self.open_error_log().await?;
        let pool = self.download_pool(error_log, progress);
        let lister = ObjectLister::new(self.store.as_ref());
        let mut objects = std::pin::pin!(lister.stream(prefix, true));
        let mut listed_any = false;

        while let Some(item) = objects.next().await {
            if self.cancel.is_cancelled() {
                break;
            }
            let info = match item {
                Ok(info) => info,
                Err(e) if !listed_any => {
                    pool.finish().await;
                    return Err(e);
                }
                Err(e) => {
                    pool.record_failure(prefix, &e).await;
                    break;
                }
            };
            listed_any = true;

            if info.is_marker() {
                continue;
            }
            let Some(rel) = info.key.strip_prefix(prefix) else {
                continue;
            };
            if !self.options.in_range(rel) {
                debug!(key = %info.key, "outside requested range");
                continue;
            }
            let Some(local) = safe_join(local_root, rel) else {
                let err = Error::InvalidPath(format!("unsafe key '{}'", info.key));
                pool.record_failure(&info.key, &err).await;
                continue;
            };

            progress.add_total(info.size_bytes);
            pool.submit(DownloadJob { info, local }).await?;
        }

        let report = pool.finish().await;
        self.check_cancelled()?;
        info!(prefix = %prefix, %report, "download finished");
        Ok(report)
    }

    /// Upload a local directory tree below `prefix`
    ///
    /// A marker object is created for the destination and for every
    /// subdirectory. Failing to create the destination marker aborts.
    pub async fn upload_directory(
        &self,
        local_root: &Path,
        prefix: &str,
        progress: &ProgressTracker,
    ) -> Result<BatchReport> {
        let meta = tokio::fs::metadata(local_root).await?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(format!(
                "'{}' is not a directory",
                local_root.display()
            )));
        }

        let prefix = to_prefix(prefix);
        if !prefix.is_empty() {
            self.store
                .put_object(&prefix, UploadBody::Empty, None)
                .await
                .map_err(|e| Error::TransferFailed(format!("cannot create '{prefix}': {e}")))?;
        }

        let error_log = self.open_error_log().await?;
        let pool = self.upload_pool(error_log, progress);
        self.enqueue_tree(&pool, local_root, &prefix, progress).await?;

        let report = pool.finish().await;
        self.check_cancelled()?;
        info!(prefix = %prefix, %report, "upload finished");
        Ok(report)
    }

    /// Upload files and directories, each under its own name below `prefix`
    pub async fn upload_paths(
        &self,
        paths: &[PathBuf],
        prefix: &str,
        progress: &ProgressTracker,
    ) -> Result<BatchReport> {
        let prefix = to_prefix(prefix);
        let error_log = self.open_error_log().await?;
        let pool = self.upload_pool(error_log, progress);

        for path in paths {
            if self.cancel.is_cancelled() {
                break;
            }
            let display = path.display().to_string();
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                let err = Error::InvalidPath(format!("'{display}' has no file name"));
                pool.record_failure(&display, &err).await;
                continue;
            };

            let meta = match tokio::fs::metadata(path).await {
                Ok(meta) => meta,
                Err(e) => {
                    pool.record_failure(&display, &Error::Io(e)).await;
                    continue;
                }
            };

            if meta.is_dir() {
                let dir_prefix = format!("{prefix}{name}/");
                if let Err(e) = self
                    .store
                    .put_object(&dir_prefix, UploadBody::Empty, None)
                    .await
                {
                    pool.record_failure(&dir_prefix, &e).await;
                    continue;
                }
                self.enqueue_tree(&pool, path, &dir_prefix, progress).await?;
            } else {
                progress.add_total(meta.len());
                pool.submit(UploadJob {
                    local: path.clone(),
                    key: format!("{prefix}{name}"),
                    size: meta.len(),
                })
                .await?;
            }
        }

        let report = pool.finish().await;
        self.check_cancelled()?;
        info!(prefix = %prefix, %report, "upload finished");
        Ok(report)
    }

    async fn enqueue_tree(
        &self,
        pool: &WorkerPool<UploadJob>,
        root: &Path,
        prefix: &str,
        progress: &ProgressTracker,
    ) -> Result<()> {
        let entries = walk_local(root.to_path_buf(), self.options.include_hidden);

        while let Ok(entry) = entries.recv().await {
            if self.cancel.is_cancelled() {
                break;
            }
            match entry {
                Err(e) => {
                    pool.record_failure(&root.display().to_string(), &e).await;
                }
                Ok(LocalEntry::Dir { rel }) => {
                    if !self.options.in_range(&format!("{rel}/")) {
                        continue;
                    }
                    let marker = format!("{prefix}{rel}/");
                    if let Err(e) = self
                        .store
                        .put_object(&marker, UploadBody::Empty, None)
                        .await
                    {
                        warn!(key = %marker, error = %e, "could not create directory marker");
                        pool.record_failure(&marker, &e).await;
                    }
                }
                Ok(LocalEntry::File { path, rel, size, .. }) => {
                    if !self.options.in_range(&rel) {
                        continue;
                    }
                    progress.add_total(size);
                    pool.submit(UploadJob {
                        local: path,
                        key: format!("{prefix}{rel}"),
                        size,
                    })
                    .await?;
                }
            }
        }
        Ok(())
    }
}
