//! One-shot structural migrator for hierarchical, time-segmented pulse
//! trees: rewrites a tree stored under the legacy hashed-name layout into
//! an equivalent tree under the new chunked-name layout, preserving every
//! time-series segment boundary and repeated-substructure slot.
//!
//! # Pipeline
//!
//! | Stage                     | Module          |
//! |---------------------------|-----------------|
//! | hash/name/path rewriting  | [`names`]       |
//! | node-shape classification | [`classify`]    |
//! | timed slot allocation     | [`timed_index`] |
//! | segment alignment/trim    | [`segments`]    |
//! | recursive walk + assembly | [`walker`]      |
//! | bulk AoS delegation       | [`external`]    |
//! | per-pulse driver          | [`pulse`]       |
//!
//! All per-run state lives in a [`context::MigrationContext`] built fresh
//! for every pulse; nothing migrates across pulses.

pub mod classify;
pub mod context;
pub mod errors;
pub mod external;
pub mod names;
pub mod pulse;
pub mod segments;
pub mod timed_index;
pub mod walker;

pub use context::{MigrationContext, TimeMode};
pub use errors::MigrateError;
pub use external::{AosConverter, CommandAosConverter};
pub use names::NameMap;
pub use pulse::{migrate_pulse, PulseReport};
