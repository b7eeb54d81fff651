//! Directory tree built from a flat listing
//!
//! Object stores have no directories, only `/`-separated keys. A [`Tree`]
//! reconstructs the hierarchy from one listing snapshot: every intermediate
//! segment becomes a directory whether or not a marker object exists for it.

use std::collections::{BTreeMap, BTreeSet};

use crate::traits::ObjectInfo;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Immutable directory tree keyed by directory path
///
/// The root is `""`; every other directory path ends in `/`. Children are
/// names, with a trailing `/` for directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    nodes: BTreeMap<String, BTreeSet<String>>,
}

impl Tree {
    /// Build the tree for every object under `prefix`
    pub fn build<'a, I>(prefix: &str, objects: I) -> Self
    where
        I: IntoIterator<Item = &'a ObjectInfo>,
    {
        let mut nodes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        nodes.insert(String::new(), BTreeSet::new());

        for object in objects {
            let Some(rel) = object.key.strip_prefix(prefix) else {
                continue;
            };
            if rel.is_empty() {
                continue;
            }

            let mut parent = String::new();
            let mut rest = rel;
            while let Some(pos) = rest.find('/') {
                let dir = &rest[..=pos];
                nodes.entry(parent.clone()).or_default().insert(dir.to_string());
                parent.push_str(dir);
                nodes.entry(parent.clone()).or_default();
                rest = &rest[pos + 1..];
            }
            if !rest.is_empty() {
                nodes.entry(parent).or_default().insert(rest.to_string());
            }
        }

        Self { nodes }
    }

    /// Children of a directory, in lexicographic order
    pub fn children(&self, dir: &str) -> impl Iterator<Item = &str> {
        self.nodes
            .get(dir)
            .into_iter()
            .flat_map(|children| children.iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.children("").next().is_none()
    }

    /// Number of directories (excluding the root) and files
    pub fn counts(&self) -> (usize, usize) {
        let dirs = self.nodes.len() - 1;
        let entries: usize = self.nodes.values().map(BTreeSet::len).sum();
        (dirs, entries - dirs)
    }

    /// Render with box-drawing connectors below `label`
    pub fn render(&self, label: &str) -> String {
        let mut out = String::new();
        out.push_str(label);
        out.push('\n');
        self.render_dir("", "", &mut out);
        out
    }

    fn render_dir(&self, dir: &str, indent: &str, out: &mut String) {
        let children: Vec<&str> = self.children(dir).collect();
        let count = children.len();

        for (i, name) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { LAST_BRANCH } else { BRANCH };
            out.push_str(&format!("{indent}{connector}{name}\n"));

            if name.ends_with('/') {
                let child_indent = format!("{indent}{}", if last { SPACE } else { PIPE });
                self.render_dir(&format!("{dir}{name}"), &child_indent, out);
            }
        }
    }
}
