//! One-way sync from a local directory to a remote prefix
//!
//! The remote side is listed once into a map keyed by relative path. Every
//! local file is then compared against that snapshot by a worker; files that
//! are new, resized or newer locally are uploaded. With `delete_extraneous`
//! set, remote files that no local file visited are removed afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::lister::ObjectLister;
use crate::path::to_prefix;
use crate::progress::ProgressTracker;
use crate::traits::ObjectInfo;
use crate::transfer::{BatchReport, JobOutcome, LocalEntry, TransferEngine, WorkerPool, walk_local};

/// What the planner decided for one local file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Upload,
    Skip,
}

/// Decision for one relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDiffEntry {
    pub rel: String,
    pub action: SyncAction,
}

/// Everything a sync run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Decisions, sorted by relative path
    pub entries: Vec<SyncDiffEntry>,
    /// Upload batch counters
    pub batch: BatchReport,
    /// Remote keys removed because no local file matched them
    pub deleted: Vec<String>,
    /// Remote keys that could not be removed
    pub delete_failed: Vec<String>,
}

impl SyncReport {
    pub fn uploaded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == SyncAction::Upload)
            .count()
    }
}

/// Whether a local file must be uploaded over `remote`
///
/// True when the remote file is missing, sizes differ, or the local file is
/// strictly newer. A remote file without a timestamp is treated as stale.
pub fn needs_upload(local_size: u64, local_modified: Option<Timestamp>, remote: Option<&ObjectInfo>) -> bool {
    let Some(remote) = remote else {
        return true;
    };
    if remote.size_bytes != local_size {
        return true;
    }
    match (local_modified, remote.last_modified) {
        (_, None) => true,
        (Some(local), Some(remote)) => local > remote,
        (None, Some(_)) => false,
    }
}

struct SyncJob {
    path: PathBuf,
    rel: String,
    size: u64,
    modified: Option<Timestamp>,
}

impl fmt::Display for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync '{}'", self.path.display())
    }
}

/// Plans and runs a local-to-remote sync
pub struct SyncPlanner {
    engine: TransferEngine,
    delete_extraneous: bool,
}

impl SyncPlanner {
    /// Wrap an engine; resume is turned off since equal sizes do not mean
    /// equal content here
    pub fn new(engine: TransferEngine) -> Self {
        let options = engine.options().clone().resume(false);
        Self {
            engine: engine.with_options(options),
            delete_extraneous: false,
        }
    }

    pub fn delete_extraneous(mut self, delete: bool) -> Self {
        self.delete_extraneous = delete;
        self
    }

    /// Sync `local_root` into `prefix`
    pub async fn run(
        &self,
        local_root: &Path,
        prefix: &str,
        progress: &ProgressTracker,
    ) -> Result<SyncReport> {
        let meta = tokio::fs::metadata(local_root).await?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(format!(
                "'{}' is not a directory",
                local_root.display()
            )));
        }

        let prefix = to_prefix(prefix);
        let store = Arc::clone(self.engine.store());
        let remote: HashMap<String, ObjectInfo> = ObjectLister::new(store.as_ref())
            .collect(&prefix, true)
            .await?
            .into_iter()
            .filter(|info| !info.is_marker())
            .filter_map(|info| {
                let rel = info.key.strip_prefix(&prefix)?.to_string();
                (!rel.is_empty()).then_some((rel, info))
            })
            .collect();
        info!(prefix = %prefix, remote_files = remote.len(), "listed remote side");

        let remote = Arc::new(remote);
        let visited: Arc<Mutex<HashSet<String>>> = Arc::default();
        let decisions: Arc<Mutex<Vec<SyncDiffEntry>>> = Arc::default();

        let pool = {
            let engine = Arc::new(self.engine.clone());
            let remote = Arc::clone(&remote);
            let visited = Arc::clone(&visited);
            let decisions = Arc::clone(&decisions);
            let progress = progress.clone();
            let prefix = prefix.clone();
            let error_log = self.engine.open_error_log().await?;

            WorkerPool::spawn(self.engine.options().workers, error_log, move |job: SyncJob| {
                let engine = Arc::clone(&engine);
                let remote = Arc::clone(&remote);
                let visited = Arc::clone(&visited);
                let decisions = Arc::clone(&decisions);
                let progress = progress.clone();
                let key = format!("{prefix}{}", job.rel);

                async move {
                    visited.lock().insert(job.rel.clone());

                    let upload = needs_upload(job.size, job.modified, remote.get(&job.rel));
                    let action = if upload { SyncAction::Upload } else { SyncAction::Skip };
                    decisions.lock().push(SyncDiffEntry {
                        rel: job.rel.clone(),
                        action,
                    });

                    if !upload {
                        debug!(rel = %job.rel, "unchanged");
                        return Ok(JobOutcome::Skipped);
                    }
                    progress.add_total(job.size);
                    engine
                        .upload_file(&job.path, &key, job.size, &progress)
                        .await
                        .map(JobOutcome::from)
                }
            })
        };

        let entries = walk_local(local_root.to_path_buf(), self.engine.options().include_hidden);
        while let Ok(entry) = entries.recv().await {
            if self.engine.cancellation_token().is_cancelled() {
                break;
            }
            match entry {
                Ok(LocalEntry::File {
                    path,
                    rel,
                    size,
                    modified,
                }) => {
                    pool.submit(SyncJob {
                        path,
                        rel,
                        size,
                        modified,
                    })
                    .await?;
                }
                Ok(LocalEntry::Dir { .. }) => {}
                Err(e) => {
                    pool.record_failure(&local_root.display().to_string(), &e).await;
                }
            }
        }

        let batch = pool.finish().await;
        if self.engine.cancellation_token().is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut report = SyncReport {
            entries: std::mem::take(&mut *decisions.lock()),
            batch,
            ..Default::default()
        };
        report.entries.sort_by(|a, b| a.rel.cmp(&b.rel));

        if self.delete_extraneous {
            let visited = visited.lock().clone();
            let mut extraneous: Vec<&String> = remote
                .keys()
                .filter(|rel| !visited.contains(*rel))
                .collect();
            extraneous.sort();

            for rel in extraneous {
                if self.engine.cancellation_token().is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let key = format!("{prefix}{rel}");
                match store.delete_object(&key).await {
                    Ok(()) => {
                        debug!(key = %key, "deleted extraneous remote file");
                        report.deleted.push(key);
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "could not delete extraneous remote file");
                        report.delete_failed.push(key);
                    }
                }
            }
        }

        info!(
            prefix = %prefix,
            uploaded = report.uploaded(),
            deleted = report.deleted.len(),
            batch = %report.batch,
            "sync finished"
        );
        Ok(report)
    }
}
