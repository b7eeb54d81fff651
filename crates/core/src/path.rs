//! Virtual path resolution
//!
//! Virtual paths are absolute, `/`-separated and rooted at the bucket.
//! Object keys are the same paths without the leading `/`.

use crate::error::{Error, Result};
use crate::lister::ObjectLister;
use crate::traits::ObjectStore;

/// Resolve `input` against the current virtual directory
///
/// Empty input yields the current directory, absolute input is taken as is,
/// anything else is joined below the current directory.
pub fn format_path(current: Option<&str>, input: &str) -> Result<String> {
    let current = current.ok_or_else(|| {
        Error::InvalidPath("no current directory, run `minx login` first".into())
    })?;

    if input.is_empty() {
        return Ok(current.to_string());
    }
    if input.starts_with('/') {
        return Ok(input.to_string());
    }

    let base = current.trim_end_matches('/');
    Ok(format!("{base}/{input}"))
}

/// Drop the last segment of a virtual path
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => trimmed[..pos].to_string(),
    }
}

/// Object key for a virtual path
pub fn to_key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Listing prefix for a virtual directory
///
/// The root maps to the empty prefix, everything else gains a trailing `/`.
pub fn to_prefix(path: &str) -> String {
    let key = to_key(path);
    if key.is_empty() || key.ends_with('/') {
        key
    } else {
        format!("{key}/")
    }
}

/// Last segment of a key, keeping the trailing `/` of directories
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    let start = trimmed.rfind('/').map(|pos| pos + 1).unwrap_or(0);
    &key[start..]
}

/// Resolve a `cd` target and check that it exists
///
/// Returns the new virtual path. The caller persists it in the session.
pub async fn change_directory(
    store: &dyn ObjectStore,
    current: &str,
    target: &str,
) -> Result<String> {
    if target == ".." {
        return Ok(parent_path(current));
    }

    let resolved = format_path(Some(current), target)?;
    let normalized = match resolved.trim_end_matches('/') {
        "" => "/".to_string(),
        path => path.to_string(),
    };

    if normalized == "/" {
        return Ok(normalized);
    }

    let prefix = to_prefix(&normalized);
    if !ObjectLister::new(store).exists(&prefix).await? {
        return Err(Error::ObjectNotFound(format!(
            "directory '{normalized}' does not exist"
        )));
    }

    tracing::debug!(path = %normalized, "changed directory");
    Ok(normalized)
}
