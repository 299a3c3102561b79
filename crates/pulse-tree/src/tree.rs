//! The pulse tree: an ordered table of nodes addressed by normalized paths.

use std::path::PathBuf;

use indexmap::IndexMap;
use thiserror::Error;

use crate::node::{Node, NodeUsage, Segment, TreeValue};

/// Legacy top anchor that may prefix absolute paths.
const TOP_PREFIX: &str = "\\ids::top";

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("parent node missing for {0}")]
    ParentMissing(String),
    #[error("missing triplet file: {0}")]
    MissingFile(PathBuf),
    #[error("corrupt datafile: {0}")]
    CorruptData(String),
    #[error("triplet codec failed: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lower-cases a path, strips the legacy top anchor and any leading
/// separator. Both `.` (child) and `:` (member) separators survive.
pub fn normalize_path(path: &str) -> String {
    let mut p = path.to_lowercase();
    if p.starts_with(TOP_PREFIX) {
        p = p[TOP_PREFIX.len()..].to_string();
    }
    p.trim_start_matches(['.', ':']).to_string()
}

/// Parent of a normalized path, or `None` for a top-level component.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(['.', ':']).map(|i| &path[..i])
}

fn leaf_name(path: &str) -> &str {
    match path.rfind(['.', ':']) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// One pulse tree: ordered node table plus the list of top-level subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseTree {
    /// Pulse identifier this tree belongs to.
    pub pulse: i64,
    nodes: IndexMap<String, Node>,
    top: Vec<String>,
}

impl PulseTree {
    pub fn new(pulse: i64) -> Self {
        PulseTree {
            pulse,
            nodes: IndexMap::new(),
            top: Vec::new(),
        }
    }

    /// Adds a node at `path`, registering it with its parent (which must
    /// already exist). A single-component path becomes a top-level subtree.
    pub fn add(&mut self, path: &str, usage: NodeUsage) -> Result<&mut Node, TreeError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(TreeError::InvalidPath(path));
        }
        match parent_path(&path) {
            Some(parent) => {
                let parent = parent.to_string();
                let entry = self
                    .nodes
                    .get_mut(&parent)
                    .ok_or_else(|| TreeError::ParentMissing(path.clone()))?;
                entry.children.push(path.clone());
            }
            None => self.top.push(path.clone()),
        }
        let node = Node::new(leaf_name(&path), usage);
        self.nodes.insert(path.clone(), node);
        Ok(self.nodes.get_mut(&path).unwrap_or_else(|| unreachable!()))
    }

    /// Internal insert used by the triplet reader: no parent bookkeeping,
    /// child lists come from the file.
    pub(crate) fn insert_raw(&mut self, path: String, node: Node) {
        self.nodes.insert(path, node);
    }

    pub(crate) fn set_top(&mut self, top: Vec<String>) {
        self.top = top;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(&normalize_path(path))
    }

    pub fn node(&self, path: &str) -> Result<&Node, TreeError> {
        let key = normalize_path(path);
        self.nodes
            .get(&key)
            .ok_or(TreeError::NodeNotFound(key))
    }

    pub fn node_mut(&mut self, path: &str) -> Result<&mut Node, TreeError> {
        let key = normalize_path(path);
        self.nodes
            .get_mut(&key)
            .ok_or(TreeError::NodeNotFound(key))
    }

    /// Paths of the top-level subtrees (IDS roots), in document order.
    pub fn top_descendants(&self) -> &[String] {
        &self.top
    }

    /// All `(path, node)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn put_payload(&mut self, path: &str, value: TreeValue) -> Result<(), TreeError> {
        self.node_mut(path)?.payload = Some(value);
        Ok(())
    }

    /// Replaces every segment of the node at `path`.
    pub fn set_segments(&mut self, path: &str, segments: Vec<Segment>) -> Result<(), TreeError> {
        self.node_mut(path)?.segments = segments;
        Ok(())
    }
}
