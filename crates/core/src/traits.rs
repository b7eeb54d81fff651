//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! Every store is bound to one bucket when it is constructed, so keys passed
//! here are plain object keys without a leading `/`.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::multipart::CompletedPart;

/// Streaming body returned by ranged reads
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata for an object or synthetic directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key, or common prefix ending in `/`
    pub key: String,

    /// Size in bytes (zero for directories)
    pub size_bytes: u64,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this is a directory marker or prefix
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: Some(humansize::format_size(size, humansize::BINARY)),
            last_modified: None,
            etag: None,
            content_type: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a directory/prefix
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: 0,
            size_human: None,
            last_modified: None,
            etag: None,
            content_type: None,
            is_dir: true,
        }
    }

    /// Attach a modification time
    pub fn with_last_modified(mut self, ts: Timestamp) -> Self {
        self.last_modified = Some(ts);
        self
    }

    /// Whether the key denotes a directory marker
    pub fn is_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Result of a list operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects; in non-recursive mode common prefixes appear as
    /// directory entries
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Prefix to filter by
    pub prefix: Option<String>,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,

    /// List every key under the prefix instead of grouping by `/`
    pub recursive: bool,
}

/// Request body for uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadBody {
    /// Zero-length object, used for directory markers
    Empty,
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// A byte window of a local file, streamed from disk
    File {
        path: PathBuf,
        offset: u64,
        length: u64,
    },
}

impl UploadBody {
    /// Number of bytes this body will send
    pub fn len(&self) -> u64 {
        match self {
            UploadBody::Empty => 0,
            UploadBody::Bytes(bytes) => bytes.len() as u64,
            UploadBody::File { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the body in memory
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        match self {
            UploadBody::Empty => Ok(Vec::new()),
            UploadBody::Bytes(bytes) => Ok(bytes.clone()),
            UploadBody::File {
                path,
                offset,
                length,
            } => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(std::io::SeekFrom::Start(*offset)).await?;
                let mut buf = Vec::with_capacity(*length as usize);
                file.take(*length).read_to_end(&mut buf).await?;
                Ok(buf)
            }
        }
    }
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and the in-memory store, and
/// can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bound bucket
    fn bucket(&self) -> &str;

    /// Check that the bound bucket exists
    async fn bucket_exists(&self) -> Result<bool>;

    /// List one page of objects
    async fn list_objects(&self, options: ListOptions) -> Result<ListResult>;

    /// Get object metadata
    async fn head_object(&self, key: &str) -> Result<ObjectInfo>;

    /// Read `[start, end]` (inclusive) or `[start, ..)` of an object
    async fn get_object_range(&self, key: &str, start: u64, end: Option<u64>)
        -> Result<ObjectReader>;

    /// Upload an object in one request
    async fn put_object(
        &self,
        key: &str,
        body: UploadBody,
        content_type: Option<String>,
    ) -> Result<ObjectInfo>;

    /// Server-side copy
    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<ObjectInfo>;

    /// Delete a single object
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Start a multipart upload, returning its upload ID
    async fn create_multipart_upload(&self, key: &str, content_type: Option<String>)
        -> Result<String>;

    /// Upload one part, returning its ETag
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: UploadBody,
    ) -> Result<String>;

    /// Assemble the uploaded parts into the final object
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<ObjectInfo>;

    /// Abandon a multipart upload
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()>;
}
