//! In-memory model of one pulse tree plus the triplet file codec.
//!
//! A pulse tree is a hierarchy of named nodes addressed by dotted/colon
//! paths. Nodes carry an optional static value and, for time-dependent
//! nodes, an ordered list of [`Segment`]s. Trees are persisted as a file
//! triplet `ids_<id>.{tree,characteristics,datafile}`: structural metadata,
//! segment descriptors, and raw payload bytes respectively.

pub mod node;
pub mod tree;
pub mod triplet;

pub use node::{Node, NodeUsage, Segment, SegmentData, TreeValue};
pub use tree::{normalize_path, parent_path, PulseTree, TreeError};
pub use triplet::{combined_id, pulse_stem, read_triplet, triplet_paths, write_triplet};
