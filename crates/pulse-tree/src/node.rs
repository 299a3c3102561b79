//! Node, segment, and value types for one pulse tree.

use serde::{Deserialize, Serialize};

// ── NodeUsage ─────────────────────────────────────────────────────────────

/// Usage class a node was recorded with in the legacy tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeUsage {
    /// Structural container with no own payload semantics.
    Structure,
    /// Time-segmented signal.
    Signal,
    /// Numeric value (segmented numerics encode repeated substructures).
    Numeric,
    /// Text value or fixed-width text array.
    Text,
}

// ── TreeValue ─────────────────────────────────────────────────────────────

/// Ordered, heterogeneous value written to a tree node.
///
/// Composites keep legacy document order. `Empty` is an explicit
/// present-but-empty marker and is distinct from an absent entry: repeated
/// substructure slots that yield nothing are still written as `Empty` so
/// index alignment with sibling arrays survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeValue {
    Str(String),
    I64s(Vec<i64>),
    F64s(Vec<f64>),
    /// Variable-length text array (pre-transcode form).
    Text(Vec<String>),
    /// Fixed-width text block transcoded to a byte matrix: one column per
    /// string, one row per character position, row-major.
    ByteMatrix {
        rows: usize,
        cols: usize,
        data: Vec<u8>,
    },
    Bytes(Vec<u8>),
    /// Reference to another node of the same tree, by normalized path.
    NodeRef(String),
    Composite(Vec<TreeValue>),
    /// Present but empty.
    Empty,
}

impl TreeValue {
    /// First integer of an integer payload, if this value carries one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TreeValue::I64s(v) => v.first().copied(),
            TreeValue::F64s(v) => v.first().map(|f| *f as i64),
            _ => None,
        }
    }
}

// ── Segment ───────────────────────────────────────────────────────────────

/// Payload of one time segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentData {
    F64(Vec<f64>),
    /// Byte-typed segments mark array-of-structure encoded nodes.
    Bytes(Vec<u8>),
}

impl SegmentData {
    pub fn len(&self) -> usize {
        match self {
            SegmentData::F64(v) => v.len(),
            SegmentData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One time segment: an ordered time axis and the samples recorded on it.
///
/// Segments of one node are contiguous and time-ordered. Only the last
/// segment of a node may carry trailing unwritten capacity, marked by time
/// values equal to the sentinel `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub times: Vec<f64>,
    pub data: SegmentData,
}

impl Segment {
    pub fn f64(times: Vec<f64>, values: Vec<f64>) -> Self {
        Segment {
            times,
            data: SegmentData::F64(values),
        }
    }

    pub fn bytes(times: Vec<f64>, values: Vec<u8>) -> Self {
        Segment {
            times,
            data: SegmentData::Bytes(values),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.times.len()
    }

    /// Payload elements recorded per time sample (at least 1).
    pub fn stride(&self) -> usize {
        if self.times.is_empty() {
            1
        } else {
            (self.data.len() / self.times.len()).max(1)
        }
    }

    pub fn start(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn end(&self) -> Option<f64> {
        self.times.last().copied()
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self.data, SegmentData::Bytes(_))
    }

    /// Copy of this segment cut down to its first `samples` time samples.
    /// Whole samples are kept together: the payload is cut at the matching
    /// stride boundary.
    pub fn truncated(&self, samples: usize) -> Segment {
        let samples = samples.min(self.times.len());
        let cut = samples * self.stride();
        let data = match &self.data {
            SegmentData::F64(v) => SegmentData::F64(v[..cut.min(v.len())].to_vec()),
            SegmentData::Bytes(v) => SegmentData::Bytes(v[..cut.min(v.len())].to_vec()),
        };
        Segment {
            times: self.times[..samples].to_vec(),
            data,
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────

/// One node of a pulse tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Last path component, lower-case.
    pub name: String,
    pub usage: NodeUsage,
    /// Full paths of the node's descendants, in document order.
    pub children: Vec<String>,
    /// Static payload, if any.
    pub payload: Option<TreeValue>,
    /// Time segments; empty for non-segmented nodes.
    pub segments: Vec<Segment>,
    /// Legacy path of this node's time base, for segmented nodes.
    pub time_path: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, usage: NodeUsage) -> Self {
        Node {
            name: name.into(),
            usage,
            children: Vec::new(),
            payload: None,
            segments: Vec::new(),
            time_path: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_segmented(&self) -> bool {
        !self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_counts_elements_per_sample() {
        let seg = Segment::f64(vec![0.0, 1.0], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(seg.stride(), 3);
        assert_eq!(seg.sample_count(), 2);
    }

    #[test]
    fn truncated_cuts_whole_samples() {
        let seg = Segment::f64(vec![0.0, 1.0, 2.0], vec![10.0, 11.0, 20.0, 21.0, 30.0, 31.0]);
        let cut = seg.truncated(2);
        assert_eq!(cut.times, vec![0.0, 1.0]);
        assert_eq!(cut.data, SegmentData::F64(vec![10.0, 11.0, 20.0, 21.0]));
    }

    #[test]
    fn truncated_clamps_to_available_samples() {
        let seg = Segment::bytes(vec![0.0], vec![1, 2]);
        let cut = seg.truncated(5);
        assert_eq!(cut.times.len(), 1);
        assert_eq!(cut.data, SegmentData::Bytes(vec![1, 2]));
    }

    #[test]
    fn tree_value_as_i64() {
        assert_eq!(TreeValue::I64s(vec![3, 4]).as_i64(), Some(3));
        assert_eq!(TreeValue::F64s(vec![2.0]).as_i64(), Some(2));
        assert_eq!(TreeValue::Str("3".into()).as_i64(), None);
        assert_eq!(TreeValue::Empty.as_i64(), None);
    }
}
