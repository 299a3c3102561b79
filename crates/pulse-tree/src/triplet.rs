//! Triplet file codec.
//!
//! One pulse tree is persisted as three files sharing a stem:
//!
//! | File                  | Content                                   |
//! |-----------------------|-------------------------------------------|
//! | `<stem>.tree`           | structural metadata (JSON, document order) |
//! | `<stem>.characteristics`| per-node segment descriptors + offsets     |
//! | `<stem>.datafile`       | raw segment payload bytes                  |
//!
//! Output is fully deterministic for a given tree: nodes are written in
//! document order and payload bytes are laid out in the same order, so two
//! identical trees produce byte-identical triplets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeUsage, Segment, SegmentData, TreeValue};
use crate::tree::{PulseTree, TreeError};

/// Extensions of the three triplet files, in canonical order.
pub const TRIPLET_EXTS: [&str; 3] = ["tree", "characteristics", "datafile"];

/// Combined pulse identifier used in triplet file names.
pub fn combined_id(pulse: i64, run: i64) -> i64 {
    run + pulse * 10_000
}

/// File-name stem for a combined id, zero-padded to at least three digits.
pub fn pulse_stem(id: i64) -> String {
    format!("ids_{id:03}")
}

/// The three file paths for a stem, in [`TRIPLET_EXTS`] order.
pub fn triplet_paths(dir: &Path, stem: &str) -> [PathBuf; 3] {
    TRIPLET_EXTS.map(|ext| dir.join(format!("{stem}.{ext}")))
}

// ── Codec documents ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct TreeDoc {
    pulse: i64,
    top: Vec<String>,
    nodes: Vec<NodeMeta>,
}

#[derive(Serialize, Deserialize)]
struct NodeMeta {
    path: String,
    name: String,
    usage: NodeUsage,
    children: Vec<String>,
    payload: Option<TreeValue>,
    time_path: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct NodeSegments {
    path: String,
    segments: Vec<SegmentMeta>,
}

#[derive(Serialize, Deserialize)]
enum SegmentKind {
    F64,
    Bytes,
}

#[derive(Serialize, Deserialize)]
struct SegmentMeta {
    times: Vec<f64>,
    kind: SegmentKind,
    offset: u64,
    len: u64,
}

// ── Writer ────────────────────────────────────────────────────────────────

/// Writes `tree` as the triplet `<dir>/<stem>.{tree,characteristics,datafile}`.
pub fn write_triplet(tree: &PulseTree, dir: &Path, stem: &str) -> Result<(), TreeError> {
    let mut doc = TreeDoc {
        pulse: tree.pulse,
        top: tree.top_descendants().to_vec(),
        nodes: Vec::with_capacity(tree.len()),
    };
    let mut characteristics: Vec<NodeSegments> = Vec::new();
    let mut datafile: Vec<u8> = Vec::new();

    for (path, node) in tree.iter() {
        doc.nodes.push(NodeMeta {
            path: path.clone(),
            name: node.name.clone(),
            usage: node.usage,
            children: node.children.clone(),
            payload: node.payload.clone(),
            time_path: node.time_path.clone(),
        });
        if node.segments.is_empty() {
            continue;
        }
        let mut metas = Vec::with_capacity(node.segments.len());
        for seg in &node.segments {
            let offset = datafile.len() as u64;
            let kind = match &seg.data {
                SegmentData::F64(values) => {
                    for v in values {
                        datafile.extend_from_slice(&v.to_le_bytes());
                    }
                    SegmentKind::F64
                }
                SegmentData::Bytes(bytes) => {
                    datafile.extend_from_slice(bytes);
                    SegmentKind::Bytes
                }
            };
            metas.push(SegmentMeta {
                times: seg.times.clone(),
                kind,
                offset,
                len: datafile.len() as u64 - offset,
            });
        }
        characteristics.push(NodeSegments {
            path: path.clone(),
            segments: metas,
        });
    }

    let [tree_path, char_path, data_path] = triplet_paths(dir, stem);
    fs::write(tree_path, serde_json::to_vec(&doc)?)?;
    fs::write(char_path, serde_json::to_vec(&characteristics)?)?;
    fs::write(data_path, datafile)?;
    Ok(())
}

// ── Reader ────────────────────────────────────────────────────────────────

/// Reads the triplet `<dir>/<stem>.*` back into a [`PulseTree`].
///
/// Fails with [`TreeError::MissingFile`] when any of the three files is
/// absent.
pub fn read_triplet(dir: &Path, stem: &str) -> Result<PulseTree, TreeError> {
    let paths = triplet_paths(dir, stem);
    for p in &paths {
        if !p.is_file() {
            return Err(TreeError::MissingFile(p.clone()));
        }
    }
    let [tree_path, char_path, data_path] = paths;

    let doc: TreeDoc = serde_json::from_slice(&fs::read(tree_path)?)?;
    let characteristics: Vec<NodeSegments> = serde_json::from_slice(&fs::read(char_path)?)?;
    let datafile = fs::read(data_path)?;

    let mut tree = PulseTree::new(doc.pulse);
    for meta in doc.nodes {
        let mut node = Node::new(meta.name, meta.usage);
        node.children = meta.children;
        node.payload = meta.payload;
        node.time_path = meta.time_path;
        tree.insert_raw(meta.path, node);
    }
    tree.set_top(doc.top);

    for rec in characteristics {
        let mut segments = Vec::with_capacity(rec.segments.len());
        for meta in rec.segments {
            let start = meta.offset as usize;
            let end = start + meta.len as usize;
            let slice = datafile
                .get(start..end)
                .ok_or_else(|| {
                    TreeError::CorruptData(format!(
                        "range {start}..{end} out of bounds for {}",
                        rec.path
                    ))
                })?;
            let data = match meta.kind {
                SegmentKind::F64 => SegmentData::F64(
                    slice
                        .chunks_exact(8)
                        .map(|c| f64::from_le_bytes(c.try_into().unwrap_or_default()))
                        .collect(),
                ),
                SegmentKind::Bytes => SegmentData::Bytes(slice.to_vec()),
            };
            segments.push(Segment {
                times: meta.times,
                data,
            });
        }
        tree.set_segments(&rec.path, segments)?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_id_packs_pulse_and_run() {
        assert_eq!(combined_id(0, 7), 7);
        assert_eq!(combined_id(12, 34), 120_034);
    }

    #[test]
    fn stem_is_zero_padded() {
        assert_eq!(pulse_stem(7), "ids_007");
        assert_eq!(pulse_stem(120_034), "ids_120034");
    }

    #[test]
    fn triplet_paths_use_canonical_extensions() {
        let [t, c, d] = triplet_paths(Path::new("/x"), "ids_007");
        assert_eq!(t, Path::new("/x/ids_007.tree"));
        assert_eq!(c, Path::new("/x/ids_007.characteristics"));
        assert_eq!(d, Path::new("/x/ids_007.datafile"));
    }
}
