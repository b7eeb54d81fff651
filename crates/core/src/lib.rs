//! minx-core: Core library for the minx virtual filesystem client
//!
//! This crate presents one S3 bucket as a directory tree:
//! - Sessions and their persisted configuration
//! - Virtual path resolution and directory listing
//! - The `ObjectStore` trait every backend implements
//! - Downloads, uploads and sync over a bounded worker pool
//!
//! Nothing here depends on a specific S3 SDK; `minx-s3` provides the AWS
//! backend and [`memory::MemoryStore`] an in-process one.

pub mod config;
pub mod error;
pub mod lister;
pub mod memory;
pub mod multipart;
pub mod path;
pub mod progress;
pub mod session;
pub mod sync;
pub mod traits;
pub mod transfer;
pub mod tree;
pub mod wildcard;

pub use config::{Config, ConfigManager, Defaults};
pub use error::{Error, Result};
pub use lister::{Entry, LevelOptions, Listing, ObjectLister};
pub use multipart::{CompletedPart, MultipartConfig, UploadState};
pub use path::{base_name, change_directory, format_path, parent_path, to_key, to_prefix};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use session::{Session, SessionManager, parse_auth_string};
pub use sync::{SyncAction, SyncDiffEntry, SyncPlanner, SyncReport};
pub use traits::{ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, UploadBody};
pub use transfer::{
    BatchReport, DeleteMode, DeleteSelection, Deletion, TransferEngine, TransferOptions,
    TransferOutcome,
};
pub use tree::Tree;
