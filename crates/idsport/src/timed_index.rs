//! Sequential slot allocation for time-dependent nodes.
//!
//! The new layout stores every timed node of a repeated-structure base
//! under flat, fixed-size groups instead of its legacy position. Slots are
//! handed out in depth-first pre-order, which is load-bearing: downstream
//! readers address slots purely by `(group, item)`, never by name.

use indexmap::IndexMap;

use pulse_tree::{Node, PulseTree};

use crate::classify::{classify, repetition_child, NodeClass};
use crate::errors::MigrateError;

/// Entries per group; keeps child counts within the new schema's limits.
pub const GROUP_SIZE: usize = 1000;

/// Slot assignments for one base path. Two independent counters: byte-typed
/// segmented leaves (array-of-structure items) and all other segmented
/// leaves (plain data items).
#[derive(Debug, Default)]
pub struct TimedIndexMap {
    /// legacy path → `<base>.timed_aos.group_<g>.item_<i>`
    pub aos: IndexMap<String, String>,
    /// legacy path → `<base>.timed_data.group_<g>:item_<i>`
    pub data: IndexMap<String, String>,
}

/// 1-based `(group, item-within-group)` for a 0-based running index.
/// Index 1000 is the first item of group 2.
fn slot(index: usize) -> (usize, usize) {
    (index / GROUP_SIZE + 1, index % GROUP_SIZE + 1)
}

/// Builds the slot map for the subtree rooted at `base`.
///
/// Repeated structures recurse through the live shape count read during
/// this traversal, visiting element children `1..=count` in index order
/// and ignoring trailing unused slots. The map is only valid for this
/// base path within this migration run.
pub fn build_timed_map(tree: &PulseTree, base: &str) -> Result<TimedIndexMap, MigrateError> {
    let base = pulse_tree::normalize_path(base);
    let mut map = TimedIndexMap::default();
    let mut counters = [0usize; 2];
    let node = tree.node(&base)?;
    visit(tree, &base, node, &base, &mut counters, &mut map);
    Ok(map)
}

fn visit(
    tree: &PulseTree,
    path: &str,
    node: &Node,
    base: &str,
    counters: &mut [usize; 2],
    map: &mut TimedIndexMap,
) {
    match classify(tree, node) {
        NodeClass::Leaf => {
            if !node.is_segmented() {
                return;
            }
            if node.segments[0].is_bytes() {
                let (g, i) = slot(counters[0]);
                counters[0] += 1;
                map.aos.insert(
                    path.to_string(),
                    format!("{base}.timed_aos.group_{g}.item_{i}"),
                );
            } else {
                let (g, i) = slot(counters[1]);
                counters[1] += 1;
                map.data.insert(
                    path.to_string(),
                    format!("{base}.timed_data.group_{g}:item_{i}"),
                );
            }
        }
        NodeClass::RepeatedStructure { count } => {
            for i in 1..=count.max(0) {
                if let Some(child_path) = repetition_child(tree, node, i) {
                    if let Ok(child) = tree.node(child_path) {
                        visit(tree, child_path, child, base, counters, map);
                    }
                }
            }
        }
        // The split-time triad is not special here: its timed branch is a
        // byte-typed segmented leaf and claims an AoS slot like any other.
        NodeClass::SplitTimeStructure | NodeClass::PlainStructure => {
            for child_path in &node.children {
                if let Ok(child) = tree.node(child_path) {
                    visit(tree, child_path, child, base, counters, map);
                }
            }
        }
    }
}
