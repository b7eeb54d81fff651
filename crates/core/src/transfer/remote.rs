//! Server-side operations: deletion, copy, move and directory markers

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TransferEngine;
use crate::error::{Error, Result};
use crate::lister::ObjectLister;
use crate::path::{base_name, to_prefix};
use crate::traits::{ObjectInfo, ObjectStore, UploadBody};
use crate::wildcard;

/// Which kinds of keys a deletion may touch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteSelection {
    /// Plain objects only
    #[default]
    Files,
    /// Directory markers only
    Dirs,
    /// Everything
    All,
}

impl DeleteSelection {
    pub fn includes(self, key: &str) -> bool {
        match self {
            DeleteSelection::Files => !key.ends_with('/'),
            DeleteSelection::Dirs => key.ends_with('/'),
            DeleteSelection::All => true,
        }
    }
}

/// Whether the caller waits for deletion to finish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    #[default]
    Foreground,
    Background,
}

/// Keys removed by one deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Deletion running on its own task
///
/// Await [`BackgroundDeletion::wait`] to observe completion. If the handle is
/// dropped the task keeps going for as long as the runtime lives.
#[derive(Debug)]
pub struct BackgroundDeletion {
    matched: usize,
    handle: JoinHandle<DeleteReport>,
}

impl BackgroundDeletion {
    /// Number of keys queued for deletion
    pub fn matched(&self) -> usize {
        self.matched
    }

    pub async fn wait(self) -> Result<DeleteReport> {
        self.handle
            .await
            .map_err(|e| Error::General(format!("background deletion task failed: {e}")))
    }
}

/// Outcome of a delete request
#[derive(Debug)]
pub enum Deletion {
    Finished(DeleteReport),
    Background(BackgroundDeletion),
}

impl Deletion {
    /// Wait for completion, whichever mode was used
    pub async fn wait(self) -> Result<DeleteReport> {
        match self {
            Deletion::Finished(report) => Ok(report),
            Deletion::Background(task) => task.wait().await,
        }
    }
}

/// Result of a copy or move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    pub source: String,
    pub destination: String,
    /// An existing destination was replaced
    pub overwritten: bool,
    pub info: ObjectInfo,
}

async fn delete_one(store: &dyn ObjectStore, key: String, report: &mut DeleteReport) {
    match store.delete_object(&key).await {
        Ok(()) => {
            debug!(key = %key, "deleted");
            report.deleted.push(key);
        }
        Err(e) => {
            warn!(key = %key, error = %e, "delete failed");
            report.failed.push(key);
        }
    }
}

impl TransferEngine {
    /// Delete every key matching a wildcard pattern
    ///
    /// The listing is narrowed to the pattern's literal prefix. Matching no
    /// key at all is an error.
    pub async fn delete_matching(
        &self,
        pattern: &str,
        selection: DeleteSelection,
        mode: DeleteMode,
    ) -> Result<Deletion> {
        let prefix = wildcard::literal_prefix(pattern);
        let keys: Vec<String> = ObjectLister::new(self.store.as_ref())
            .collect(prefix, true)
            .await?
            .into_iter()
            .map(|info| info.key)
            .filter(|key| wildcard::matches(pattern, key) && selection.includes(key))
            .collect();

        if keys.is_empty() {
            return Err(Error::ObjectNotFound(format!("nothing matches '/{pattern}'")));
        }

        info!(pattern, count = keys.len(), "deleting matching objects");
        self.run_deletion(keys, mode).await
    }

    /// Delete a file, or a directory with everything below it
    ///
    /// Directories need `Dirs` or `All`; `Dirs` on a plain file is refused.
    pub async fn remove(
        &self,
        key: &str,
        selection: DeleteSelection,
        mode: DeleteMode,
    ) -> Result<Deletion> {
        let is_dir = if key.is_empty() || key.ends_with('/') {
            true
        } else {
            match self.store.head_object(key).await {
                Ok(_) => false,
                Err(e) if e.is_not_found() => {
                    if ObjectLister::new(self.store.as_ref())
                        .exists(&to_prefix(key))
                        .await?
                    {
                        true
                    } else {
                        return Err(Error::ObjectNotFound(format!("'/{key}' does not exist")));
                    }
                }
                Err(e) => return Err(e),
            }
        };

        if !is_dir {
            if selection == DeleteSelection::Dirs {
                return Err(Error::InvalidPath(format!("'/{key}' is not a directory")));
            }
            if mode == DeleteMode::Foreground {
                self.store.delete_object(key).await?;
                debug!(key, "deleted");
                return Ok(Deletion::Finished(DeleteReport {
                    deleted: vec![key.to_string()],
                    failed: Vec::new(),
                }));
            }
            return self.run_deletion(vec![key.to_string()], mode).await;
        }

        if selection == DeleteSelection::Files {
            return Err(Error::InvalidPath(format!(
                "'/{key}' is a directory, use -d or -a to remove it"
            )));
        }

        let prefix = to_prefix(key);
        let keys: Vec<String> = ObjectLister::new(self.store.as_ref())
            .collect(&prefix, true)
            .await?
            .into_iter()
            .map(|info| info.key)
            .collect();

        if keys.is_empty() {
            return Err(Error::ObjectNotFound(format!("'/{prefix}' does not exist")));
        }

        info!(prefix = %prefix, count = keys.len(), "removing directory");
        self.run_deletion(keys, mode).await
    }

    async fn run_deletion(&self, keys: Vec<String>, mode: DeleteMode) -> Result<Deletion> {
        match mode {
            DeleteMode::Foreground => {
                let mut report = DeleteReport::default();
                for key in keys {
                    self.check_cancelled()?;
                    delete_one(self.store.as_ref(), key, &mut report).await;
                }
                Ok(Deletion::Finished(report))
            }
            DeleteMode::Background => {
                let store: Arc<dyn ObjectStore> = Arc::clone(&self.store);
                let matched = keys.len();
                let handle = tokio::spawn(async move {
                    let mut report = DeleteReport::default();
                    for key in keys {
                        delete_one(store.as_ref(), key, &mut report).await;
                    }
                    report
                });
                Ok(Deletion::Background(BackgroundDeletion { matched, handle }))
            }
        }
    }

    /// Server-side copy of one object
    ///
    /// A destination ending in `/` receives the source's name. An existing
    /// destination is only replaced with `force`.
    pub async fn copy(&self, source: &str, destination: &str, force: bool) -> Result<CopyOutcome> {
        self.check_cancelled()?;
        let source_info = self.store.head_object(source).await.map_err(|e| {
            if e.is_not_found() {
                Error::ObjectNotFound(format!("source '/{source}' does not exist"))
            } else {
                e
            }
        })?;
        if source_info.is_marker() {
            return Err(Error::InvalidPath(format!("'/{source}' is a directory")));
        }

        let destination = if destination.is_empty() || destination.ends_with('/') {
            format!("{destination}{}", base_name(source))
        } else {
            destination.to_string()
        };
        if destination == source {
            return Err(Error::InvalidPath(format!(
                "'/{source}' and '/{destination}' are the same object"
            )));
        }

        let overwritten = match self.store.head_object(&destination).await {
            Ok(_) if !force => {
                return Err(Error::ObjectExists(format!(
                    "'/{destination}' already exists, use -f to overwrite"
                )));
            }
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };

        let info = self.store.copy_object(source, &destination).await?;
        debug!(source, destination = %destination, overwritten, "copied");
        Ok(CopyOutcome {
            source: source.to_string(),
            destination,
            overwritten,
            info,
        })
    }

    /// Copy then delete the source
    ///
    /// If the delete fails the object exists at both keys and
    /// `MoveIncomplete` is returned.
    pub async fn move_object(
        &self,
        source: &str,
        destination: &str,
        force: bool,
    ) -> Result<CopyOutcome> {
        let outcome = self.copy(source, destination, force).await?;
        if let Err(e) = self.store.delete_object(source).await {
            return Err(Error::MoveIncomplete {
                source_key: source.to_string(),
                destination: outcome.destination,
                reason: e.to_string(),
            });
        }
        Ok(outcome)
    }

    /// Create a zero-length directory marker
    pub async fn make_directory(&self, key: &str) -> Result<ObjectInfo> {
        let prefix = to_prefix(key);
        if prefix.is_empty() {
            return Err(Error::InvalidPath("the root directory always exists".into()));
        }
        self.store.put_object(&prefix, UploadBody::Empty, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::MockObjectStore;
    use crate::transfer::TransferOptions;

    fn engine(store: Arc<dyn ObjectStore>) -> TransferEngine {
        TransferEngine::new(store, TransferOptions::default())
    }

    fn sample() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("logs/", Vec::new());
        store.insert("logs/2024-01.gz", b"1".to_vec());
        store.insert("logs/2024-02.gz", b"2".to_vec());
        store.insert("logs/2024-old/", Vec::new());
        store.insert("logs/2023-12.gz", b"0".to_vec());
        store.insert("notes.txt", b"n".to_vec());
        store
    }

    #[tokio::test]
    async fn test_delete_matching_files_only_by_default() {
        let store = sample();
        let report = engine(store.clone())
            .delete_matching("logs/2024-*", DeleteSelection::Files, DeleteMode::Foreground)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(report.deleted, vec!["logs/2024-01.gz", "logs/2024-02.gz"]);
        assert!(store.contains("logs/2024-old/"));
        assert!(store.contains("logs/2023-12.gz"));
    }

    #[tokio::test]
    async fn test_delete_matching_dirs_and_all() {
        let store = sample();
        let report = engine(store.clone())
            .delete_matching("logs/2024-*", DeleteSelection::Dirs, DeleteMode::Foreground)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(report.deleted, vec!["logs/2024-old/"]);

        let report = engine(store.clone())
            .delete_matching("logs/*", DeleteSelection::All, DeleteMode::Foreground)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        // the marker itself matches too, `*` may be empty
        assert_eq!(report.deleted.len(), 4);
        assert_eq!(store.keys(), vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn test_delete_matching_nothing_is_error() {
        let store = sample();
        let result = engine(store)
            .delete_matching("*.png", DeleteSelection::Files, DeleteMode::Foreground)
            .await;
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_background_deletion_is_awaitable() {
        let store = sample();
        let deletion = engine(store.clone())
            .delete_matching("logs/*.gz", DeleteSelection::Files, DeleteMode::Background)
            .await
            .unwrap();

        let Deletion::Background(task) = deletion else {
            panic!("expected a background deletion");
        };
        assert_eq!(task.matched(), 3);
        let report = task.wait().await.unwrap();
        assert_eq!(report.deleted.len(), 3);
        assert!(!store.contains("logs/2023-12.gz"));
    }

    #[tokio::test]
    async fn test_remove_file_and_directory_rules() {
        let store = sample();
        let engine = engine(store.clone());

        let result = engine
            .remove("logs", DeleteSelection::Files, DeleteMode::Foreground)
            .await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));

        let result = engine
            .remove("notes.txt", DeleteSelection::Dirs, DeleteMode::Foreground)
            .await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));

        let report = engine
            .remove("notes.txt", DeleteSelection::Files, DeleteMode::Foreground)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(report.deleted, vec!["notes.txt"]);

        let report = engine
            .remove("logs", DeleteSelection::All, DeleteMode::Foreground)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(report.deleted.len(), 5);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing() {
        let store = sample();
        let result = engine(store)
            .remove("ghost", DeleteSelection::All, DeleteMode::Foreground)
            .await;
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_file_propagates_delete_error() {
        let mut mock = MockObjectStore::new();
        mock.expect_head_object()
            .returning(|key| Ok(ObjectInfo::file(key, 1)));
        mock.expect_delete_object()
            .times(1)
            .returning(|_| Err(Error::General("AccessDenied".into())));

        let result = engine(Arc::new(mock))
            .remove("a.txt", DeleteSelection::Files, DeleteMode::Foreground)
            .await;
        match result {
            Err(e) => assert_eq!(e.to_string(), "AccessDenied"),
            Ok(_) => panic!("a failed delete of a single file must be an error"),
        }
    }

    #[tokio::test]
    async fn test_copy_refuses_existing_without_force() {
        let store = sample();
        store.insert("copy.txt", b"old".to_vec());
        let engine = engine(store.clone());

        let result = engine.copy("notes.txt", "copy.txt", false).await;
        assert!(matches!(result, Err(Error::ObjectExists(_))));

        let outcome = engine.copy("notes.txt", "copy.txt", true).await.unwrap();
        assert!(outcome.overwritten);
        assert_eq!(store.data("copy.txt").unwrap(), b"n");
        assert!(store.contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_copy_into_directory_keeps_name() {
        let store = sample();
        let outcome = engine(store.clone())
            .copy("notes.txt", "archive/", false)
            .await
            .unwrap();
        assert_eq!(outcome.destination, "archive/notes.txt");
        assert!(!outcome.overwritten);
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let store = sample();
        let result = engine(store).copy("ghost.txt", "x.txt", false).await;
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_move_removes_source() {
        let store = sample();
        engine(store.clone())
            .move_object("notes.txt", "moved.txt", false)
            .await
            .unwrap();
        assert!(!store.contains("notes.txt"));
        assert_eq!(store.data("moved.txt").unwrap(), b"n");
    }

    #[tokio::test]
    async fn test_move_reports_partial_state() {
        let mut mock = MockObjectStore::new();
        mock.expect_head_object()
            .withf(|key| key == "a.txt")
            .returning(|key| Ok(ObjectInfo::file(key, 1)));
        mock.expect_head_object()
            .withf(|key| key == "b.txt")
            .returning(|key| Err(Error::ObjectNotFound(key.to_string())));
        mock.expect_copy_object()
            .times(1)
            .returning(|_, dst| Ok(ObjectInfo::file(dst, 1)));
        mock.expect_delete_object()
            .times(1)
            .returning(|_| Err(Error::Network("timeout".into())));

        let result = engine(Arc::new(mock))
            .move_object("a.txt", "b.txt", false)
            .await;
        match result {
            Err(Error::MoveIncomplete {
                source_key,
                destination,
                ..
            }) => {
                assert_eq!(source_key, "a.txt");
                assert_eq!(destination, "b.txt");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_make_directory() {
        let store = Arc::new(MemoryStore::new("b"));
        let engine = engine(store.clone());
        engine.make_directory("new/dir").await.unwrap();
        assert!(store.contains("new/dir/"));
        assert!(engine.make_directory("").await.is_err());
    }
}
