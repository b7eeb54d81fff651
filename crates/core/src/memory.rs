//! In-memory object store
//!
//! A bucket held in a `BTreeMap`, used by tests and for dry runs of the
//! transfer and sync logic without a server.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::multipart::CompletedPart;
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, UploadBody};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: Timestamp,
    content_type: Option<String>,
}

#[derive(Debug, Default)]
struct PendingUpload {
    key: String,
    content_type: Option<String>,
    parts: BTreeMap<i32, Vec<u8>>,
}

/// Bucket kept entirely in memory
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    uploads: RwLock<HashMap<String, PendingUpload>>,
    failing: RwLock<HashSet<String>>,
    next_upload: AtomicU64,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
            uploads: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            next_upload: AtomicU64::new(1),
        }
    }

    /// Store an object stamped with the current time
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        self.insert_at(key, data, Timestamp::now());
    }

    /// Store an object with an explicit modification time
    pub fn insert_at(&self, key: impl Into<String>, data: Vec<u8>, last_modified: Timestamp) {
        self.objects.write().insert(
            key.into(),
            StoredObject {
                data,
                last_modified,
                content_type: None,
            },
        );
    }

    /// Contents of an object, if present
    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().get(key).map(|o| o.data.clone())
    }

    /// Content type recorded for an object
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .get(key)
            .and_then(|o| o.content_type.clone())
    }

    /// All keys in lexicographic order
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Make every operation touching `key` fail
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing.write().insert(key.into());
    }

    /// Upload IDs that were started but neither completed nor aborted
    pub fn pending_uploads(&self) -> Vec<String> {
        self.uploads.read().keys().cloned().collect()
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing.read().contains(key) {
            return Err(Error::TransferFailed(format!("injected failure for {key}")));
        }
        Ok(())
    }

    fn info(key: &str, object: &StoredObject) -> ObjectInfo {
        let mut info = if key.ends_with('/') {
            ObjectInfo::dir(key)
        } else {
            ObjectInfo::file(key, object.data.len() as u64)
        };
        info.last_modified = Some(object.last_modified);
        info.content_type = object.content_type.clone();
        info
    }

    fn store(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> ObjectInfo {
        let object = StoredObject {
            data,
            last_modified: Timestamp::now(),
            content_type,
        };
        let info = Self::info(key, &object);
        self.objects.write().insert(key.to_string(), object);
        info
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn list_objects(&self, options: ListOptions) -> Result<ListResult> {
        let prefix = options.prefix.unwrap_or_default();
        self.check(&prefix)?;

        let objects = self.objects.read();
        let mut entries: Vec<ObjectInfo> = Vec::new();
        let mut seen_prefixes = HashSet::new();

        for (key, object) in objects.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            if !options.recursive {
                if let Some(pos) = rest.find('/') {
                    let common = format!("{prefix}{}", &rest[..=pos]);
                    if seen_prefixes.insert(common.clone()) {
                        entries.push(ObjectInfo::dir(common));
                    }
                    continue;
                }
            }
            entries.push(Self::info(key, object));
        }

        let start_after = options.continuation_token;
        let page_size = options
            .max_keys
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let mut remaining = entries
            .into_iter()
            .filter(|e| start_after.as_deref().is_none_or(|token| e.key.as_str() > token));
        let items: Vec<ObjectInfo> = remaining.by_ref().take(page_size).collect();
        let truncated = remaining.next().is_some();
        let continuation_token = if truncated {
            items.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(ListResult {
            items,
            truncated,
            continuation_token,
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectInfo> {
        self.check(key)?;
        self.objects
            .read()
            .get(key)
            .map(|object| Self::info(key, object))
            .ok_or_else(|| Error::ObjectNotFound(key.to_string()))
    }

    async fn get_object_range(
        &self,
        key: &str,
        start: u64,
        end: Option<u64>,
    ) -> Result<ObjectReader> {
        self.check(key)?;
        let objects = self.objects.read();
        let object = objects
            .get(key)
            .ok_or_else(|| Error::ObjectNotFound(key.to_string()))?;

        let len = object.data.len() as u64;
        if start > len || (start == len && len > 0) {
            return Err(Error::TransferFailed(format!(
                "range start {start} is beyond the end of {key} ({len} bytes)"
            )));
        }
        let end = end.map(|e| (e + 1).min(len)).unwrap_or(len);
        let slice = object.data[start as usize..end as usize].to_vec();
        Ok(Box::pin(std::io::Cursor::new(slice)))
    }

    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        self.check(key)?;
        let data = body.read_all().await?;
        Ok(self.store(key, data, content_type))
    }

    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<ObjectInfo> {
        self.check(src_key)?;
        self.check(dst_key)?;
        let source = self
            .objects
            .read()
            .get(src_key)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound(src_key.to_string()))?;
        Ok(self.store(dst_key, source.data, source.content_type))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.check(key)?;
        self.objects.write().remove(key);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: Option<String>,
    ) -> Result<String> {
        self.check(key)?;
        let id = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::Relaxed));
        self.uploads.write().insert(
            id.clone(),
            PendingUpload {
                key: key.to_string(),
                content_type,
                parts: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: UploadBody,
    ) -> Result<String> {
        self.check(key)?;
        let data = body.read_all().await?;
        let mut uploads = self.uploads.write();
        let upload = uploads
            .get_mut(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| Error::ObjectNotFound(format!("upload {upload_id}")))?;
        upload.parts.insert(part_number, data);
        Ok(format!("\"{upload_id}-{part_number}\""))
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<ObjectInfo> {
        self.check(key)?;
        let upload = self
            .uploads
            .write()
            .remove(upload_id)
            .ok_or_else(|| Error::ObjectNotFound(format!("upload {upload_id}")))?;

        let mut data = Vec::new();
        for part in &parts {
            let bytes = upload.parts.get(&part.part_number).ok_or_else(|| {
                Error::TransferFailed(format!("part {} was never uploaded", part.part_number))
            })?;
            data.extend_from_slice(bytes);
        }
        Ok(self.store(key, data, upload.content_type))
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> Result<()> {
        self.uploads.write().remove(upload_id);
        Ok(())
    }
}
