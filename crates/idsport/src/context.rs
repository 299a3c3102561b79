//! Per-run migration state.
//!
//! All state that the legacy tool kept in process-wide globals (name map,
//! homogeneous-time flag, diagnostic lists) lives in an explicit
//! [`MigrationContext`] built fresh for every pulse. The time mode is
//! additionally re-resolved for every top-level subtree.

use pulse_tree::PulseTree;

use crate::errors::MigrateError;
use crate::external::AosConverter;
use crate::names::{self, NameMap};

/// How segmented nodes of one subtree resolve their time base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeMode {
    /// Every timed node of the subtree shares the global time path.
    Homogeneous(String),
    /// Each timed node carries its own time path.
    Heterogeneous,
}

pub struct MigrationContext<'a> {
    pub names: &'a NameMap,
    pub converter: &'a dyn AosConverter,
    pub time_mode: TimeMode,
    /// Legacy names that had no entry in the model map.
    pub failed_names: Vec<String>,
    /// Legacy paths whose target node is absent in the new schema.
    pub missed_nodes: Vec<String>,
}

impl<'a> MigrationContext<'a> {
    pub fn new(names: &'a NameMap, converter: &'a dyn AosConverter) -> Self {
        MigrationContext {
            names,
            converter,
            time_mode: TimeMode::Heterogeneous,
            failed_names: Vec::new(),
            missed_nodes: Vec::new(),
        }
    }

    /// Rewrites a legacy path, recording resolution misses.
    pub fn rewrite_path(&mut self, path: &str) -> String {
        names::rewrite_path(self.names, path, &mut self.failed_names)
    }

    /// True name of a legacy node name, for composite-value labels. Falls
    /// back to the lower-cased raw name (and records it) on a miss.
    pub fn resolve_or_record(&mut self, name: &str) -> String {
        match self.names.resolve(name) {
            Some(true_name) => true_name.to_string(),
            None => {
                let fallback = name.to_lowercase();
                self.failed_names.push(fallback.clone());
                fallback
            }
        }
    }

    /// Resolves the time mode of the subtree rooted at `ids_path` from its
    /// homogeneous-time property node. Fails with
    /// [`MigrateError::MissingTimeMode`] when the property cannot be read;
    /// the caller must then abort that subtree (and only that subtree).
    pub fn resolve_time_mode(
        &mut self,
        tree: &PulseTree,
        ids_path: &str,
    ) -> Result<(), MigrateError> {
        let probe = format!(
            "{ids_path}.{}:{}",
            names::IDS_PROPERTIES,
            names::HOMOGENEOUS
        );
        let flag = tree
            .node(&probe)
            .ok()
            .and_then(|n| n.payload.as_ref())
            .and_then(|v| v.as_i64())
            .ok_or_else(|| MigrateError::MissingTimeMode(ids_path.to_string()))?;
        self.time_mode = if flag == 1 {
            TimeMode::Homogeneous(format!("{ids_path}:{}", names::TIME))
        } else {
            TimeMode::Heterogeneous
        };
        Ok(())
    }

    /// Resets the time mode before walking the next subtree.
    pub fn reset_time_mode(&mut self) {
        self.time_mode = TimeMode::Heterogeneous;
    }
}
