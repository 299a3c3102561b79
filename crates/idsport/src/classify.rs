//! Node-shape classification.
//!
//! Every node falls into exactly one of four shapes, decided once from its
//! descendant list and dispatched by exhaustive match everywhere else.

use pulse_tree::{Node, PulseTree};

use crate::names;

/// Shape of one legacy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// No descendants; payload or segments are copied directly.
    Leaf,
    /// Last descendant is the reserved shape sentinel holding the live
    /// repetition count. `count == -1` means no instances at all (distinct
    /// from an empty but present array).
    RepeatedStructure { count: i64 },
    /// Exactly the fixed triad: non-time data, time reference, timed data.
    SplitTimeStructure,
    /// Any other non-empty descendant set.
    PlainStructure,
}

/// Classifies `node` from its descendant shape.
pub fn classify(tree: &PulseTree, node: &Node) -> NodeClass {
    if node.children.is_empty() {
        return NodeClass::Leaf;
    }
    let names: Vec<&str> = node
        .children
        .iter()
        .filter_map(|p| tree.node(p).ok())
        .map(|n| n.name.as_str())
        .collect();

    if names.last() == Some(&names::SHAPE_OF) {
        let count = node
            .children
            .last()
            .and_then(|p| tree.node(p).ok())
            .and_then(|n| n.payload.as_ref())
            .and_then(|v| v.as_i64())
            .unwrap_or(-1);
        return NodeClass::RepeatedStructure { count };
    }
    if names.len() == 3
        && names[0] == names::NON_TIME
        && names[1] == names::TIME
        && names[2] == names::TIMED
    {
        return NodeClass::SplitTimeStructure;
    }
    NodeClass::PlainStructure
}

/// Path of the child of `node` whose name is the decimal repetition index
/// `i`, if present.
pub fn repetition_child<'a>(tree: &'a PulseTree, node: &'a Node, i: i64) -> Option<&'a String> {
    let want = i.to_string();
    node.children
        .iter()
        .find(|p| tree.node(p).map(|n| n.name == want).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_tree::{NodeUsage, TreeValue};

    fn tree_with(paths: &[(&str, NodeUsage)]) -> PulseTree {
        let mut t = PulseTree::new(0);
        for (p, u) in paths {
            t.add(p, *u).unwrap();
        }
        t
    }

    #[test]
    fn no_descendants_is_leaf() {
        let t = tree_with(&[("x0", NodeUsage::Signal)]);
        assert_eq!(classify(&t, t.node("x0").unwrap()), NodeClass::Leaf);
    }

    #[test]
    fn trailing_shape_sentinel_is_repeated_structure() {
        let mut t = tree_with(&[
            ("coil0", NodeUsage::Structure),
            ("coil0.1", NodeUsage::Structure),
            ("coil0.2", NodeUsage::Structure),
            ("coil0.shape_of0", NodeUsage::Numeric),
        ]);
        t.put_payload("coil0.shape_of0", TreeValue::I64s(vec![2])).unwrap();
        assert_eq!(
            classify(&t, t.node("coil0").unwrap()),
            NodeClass::RepeatedStructure { count: 2 }
        );
    }

    #[test]
    fn unreadable_shape_count_means_no_instances() {
        let t = tree_with(&[
            ("coil0", NodeUsage::Structure),
            ("coil0.shape_of0", NodeUsage::Numeric),
        ]);
        assert_eq!(
            classify(&t, t.node("coil0").unwrap()),
            NodeClass::RepeatedStructure { count: -1 }
        );
    }

    #[test]
    fn fixed_triad_is_split_time_structure() {
        let t = tree_with(&[
            ("ggd0", NodeUsage::Structure),
            ("ggd0.non_time100", NodeUsage::Structure),
            ("ggd0.time0", NodeUsage::Signal),
            ("ggd0.timed0", NodeUsage::Numeric),
        ]);
        assert_eq!(
            classify(&t, t.node("ggd0").unwrap()),
            NodeClass::SplitTimeStructure
        );
    }

    #[test]
    fn triad_order_matters() {
        let t = tree_with(&[
            ("ggd0", NodeUsage::Structure),
            ("ggd0.time0", NodeUsage::Signal),
            ("ggd0.non_time100", NodeUsage::Structure),
            ("ggd0.timed0", NodeUsage::Numeric),
        ]);
        assert_eq!(
            classify(&t, t.node("ggd0").unwrap()),
            NodeClass::PlainStructure
        );
    }

    #[test]
    fn anything_else_is_plain_structure() {
        let t = tree_with(&[
            ("eq0", NodeUsage::Structure),
            ("eq0.a0", NodeUsage::Numeric),
            ("eq0:b0", NodeUsage::Text),
        ]);
        assert_eq!(
            classify(&t, t.node("eq0").unwrap()),
            NodeClass::PlainStructure
        );
    }

    #[test]
    fn repetition_child_finds_numeric_names() {
        let t = tree_with(&[
            ("coil0", NodeUsage::Structure),
            ("coil0.1", NodeUsage::Structure),
            ("coil0.3", NodeUsage::Structure),
            ("coil0.shape_of0", NodeUsage::Numeric),
        ]);
        let node = t.node("coil0").unwrap();
        assert_eq!(repetition_child(&t, node, 3), Some(&"coil0.3".to_string()));
        assert_eq!(repetition_child(&t, node, 2), None);
    }
}
