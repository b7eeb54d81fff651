//! Paginated object listing
//!
//! [`ObjectLister`] turns the page-at-a-time `list_objects` call into a lazy
//! stream of objects, and builds the single-level view used by `ls`.

use std::collections::HashSet;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::path::base_name;
use crate::traits::{ListOptions, ObjectInfo, ObjectStore};

/// Keys requested per page
pub const PAGE_SIZE: i32 = 1000;

/// Enumerates objects below a prefix
pub struct ObjectLister<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> ObjectLister<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Lazily stream every object under `prefix`, following continuation tokens
    ///
    /// A failed page yields a single `ListingFailed` item and ends the stream.
    pub fn stream(
        &self,
        prefix: &str,
        recursive: bool,
    ) -> impl Stream<Item = Result<ObjectInfo>> + Send + use<'a> {
        let store = self.store;
        let prefix = prefix.to_string();

        let pages = stream::unfold(Some(None::<String>), move |state| {
            let prefix = prefix.clone();
            async move {
                let token = state?;
                let options = ListOptions {
                    max_keys: Some(PAGE_SIZE),
                    prefix: Some(prefix.clone()),
                    continuation_token: token,
                    recursive,
                };

                match store.list_objects(options).await {
                    Ok(page) => {
                        debug!(prefix = %prefix, count = page.items.len(), truncated = page.truncated, "listed page");
                        let next = match (page.truncated, page.continuation_token) {
                            (true, Some(token)) => Some(Some(token)),
                            _ => None,
                        };
                        Some((Ok(page.items), next))
                    }
                    Err(e) => Some((
                        Err(Error::ListingFailed(format!("'{prefix}': {e}"))),
                        None,
                    )),
                }
            }
        });

        pages.flat_map(|page| {
            let items: Vec<Result<ObjectInfo>> = match page {
                Ok(items) => items.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }

    /// Collect the whole listing, or the first error
    pub async fn collect(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        self.stream(prefix, recursive).try_collect().await
    }

    /// Whether any object exists under `prefix`
    pub async fn exists(&self, prefix: &str) -> Result<bool> {
        let page = self
            .store
            .list_objects(ListOptions {
                max_keys: Some(1),
                prefix: Some(prefix.to_string()),
                continuation_token: None,
                recursive: true,
            })
            .await?;
        Ok(!page.items.is_empty())
    }

    /// One directory level: subdirectories and files directly under `prefix`
    pub async fn list_level(&self, prefix: &str) -> Result<Listing> {
        let mut listing = Listing {
            prefix: prefix.to_string(),
            dirs: Vec::new(),
            files: Vec::new(),
        };
        let mut seen = HashSet::new();

        let mut objects = std::pin::pin!(self.stream(prefix, false));
        while let Some(object) = objects.next().await {
            let object = object?;
            let Some(rest) = object.key.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            match rest.find('/') {
                Some(pos) => {
                    let dir = rest[..=pos].to_string();
                    if seen.insert(dir.clone()) {
                        listing.dirs.push(dir);
                    }
                }
                None => listing.files.push(object),
            }
        }

        Ok(listing)
    }
}

/// Options for presenting a [`Listing`]
#[derive(Debug, Clone, Default)]
pub struct LevelOptions {
    /// Show directories only
    pub dirs_only: bool,
    /// Newest files first
    pub newest_first: bool,
    /// Stop after this many entries
    pub limit: Option<usize>,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    Dir { name: String },
    File { name: String, info: ObjectInfo },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Dir { name } | Entry::File { name, .. } => name,
        }
    }
}

/// Single-level listing of a virtual directory
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Prefix that was listed
    pub prefix: String,
    /// Subdirectory names with trailing `/`, in key order
    pub dirs: Vec<String>,
    /// Files directly under the prefix
    pub files: Vec<ObjectInfo>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// Directories first, then files ordered by modification time
    pub fn entries(&self, options: &LevelOptions) -> Vec<Entry> {
        let dirs = self
            .dirs
            .iter()
            .map(|name| Entry::Dir { name: name.clone() });

        let mut files = if options.dirs_only {
            Vec::new()
        } else {
            self.files.clone()
        };
        files.sort_by(|a, b| a.last_modified.cmp(&b.last_modified));
        if options.newest_first {
            files.reverse();
        }
        let files = files.into_iter().map(|info| Entry::File {
            name: base_name(&info.key).to_string(),
            info,
        });

        dirs.chain(files)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
