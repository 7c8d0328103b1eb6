//! Resource tree model.
//!
//! # Responsibility
//! - Represent the read-only file/directory hierarchy of a scanned project.
//! - Provide path lookups used to canonicalize resource ids.
//!
//! # Invariants
//! - Resource ids are `/`-rooted; directory ids end with `/`, file ids do not.
//! - The root directory is `/` and is never stored as a node.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static REPEATED_SLASHES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{2,}").expect("valid repeated slash regex"));

/// Path-like identifier of a node in the resource tree.
///
/// Kept as a type alias because ids are compared verbatim with file content.
pub type ResourceId = String;

/// One node of the resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceNode {
    File,
    Directory(BTreeMap<String, ResourceNode>),
}

/// Kind of a node found by path lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Hierarchical resource structure parsed from the input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTree {
    root: BTreeMap<String, ResourceNode>,
}

impl ResourceTree {
    /// Creates a tree from the children of the root directory.
    pub fn new(root: BTreeMap<String, ResourceNode>) -> Self {
        Self { root }
    }

    /// Looks up a node by path, ignoring a trailing slash.
    pub fn find(&self, path: &str) -> Option<NodeKind> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let Some(first) = segments.next() else {
            return Some(NodeKind::Directory);
        };

        let mut node = self.root.get(first)?;
        for segment in segments {
            match node {
                ResourceNode::Directory(children) => node = children.get(segment)?,
                ResourceNode::File => return None,
            }
        }

        Some(match node {
            ResourceNode::File => NodeKind::File,
            ResourceNode::Directory(_) => NodeKind::Directory,
        })
    }

    /// Returns whether `resource_id` names a node with matching kind.
    pub fn contains(&self, resource_id: &str) -> bool {
        match self.find(resource_id) {
            Some(NodeKind::Directory) => resource_id.ends_with('/'),
            Some(NodeKind::File) => !resource_id.ends_with('/'),
            None => false,
        }
    }

    /// Returns whether `path` names a directory, with or without trailing slash.
    pub fn is_directory(&self, path: &str) -> bool {
        self.find(path) == Some(NodeKind::Directory)
    }

    /// All resource ids below the root, depth-first in name order.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        let mut ids = Vec::new();
        collect_ids("/", &self.root, &mut ids);
        ids
    }
}

fn collect_ids(prefix: &str, children: &BTreeMap<String, ResourceNode>, ids: &mut Vec<ResourceId>) {
    for (name, node) in children {
        match node {
            ResourceNode::File => ids.push(format!("{prefix}{name}")),
            ResourceNode::Directory(grandchildren) => {
                let directory_id = format!("{prefix}{name}/");
                ids.push(directory_id.clone());
                collect_ids(&directory_id, grandchildren, ids);
            }
        }
    }
}

/// Collapses runs of `/` into one.
pub fn collapse_repeated_slashes(path: &str) -> String {
    REPEATED_SLASHES_RE.replace_all(path, "/").into_owned()
}

/// Canonical directory id for `path`: leading and trailing `/`, no repeats.
pub fn as_directory_id(path: &str) -> ResourceId {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    collapse_repeated_slashes(&format!("/{trimmed}/"))
}
