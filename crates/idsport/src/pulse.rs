//! Per-pulse migration driver and install-prefix helpers.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;

use pulse_tree::{read_triplet, PulseTree};

use crate::context::MigrationContext;
use crate::errors::MigrateError;
use crate::external::AosConverter;
use crate::names::NameMap;
use crate::walker;

/// Environment variable pointing at the install prefix holding the name
/// model document and the external converter executable.
pub const PREFIX_ENV: &str = "IDSPORT_PREFIX";

/// Name model document under the install prefix.
const MODEL_XML_RELATIVE_PATH: &str = "models/ids.xml";

/// Stem of the target-schema model triplet under `<prefix>/models/`.
const MODEL_TRIPLET_STEM: &str = "ids_model";

pub fn install_prefix() -> Result<PathBuf, MigrateError> {
    std::env::var_os(PREFIX_ENV)
        .map(PathBuf::from)
        .ok_or(MigrateError::PrefixUnset(PREFIX_ENV))
}

/// Loads the legacy-name map from the model document. Rebuilt for every
/// pulse; the table never carries across pulses.
pub fn load_name_map(prefix: &Path) -> Result<NameMap, MigrateError> {
    NameMap::from_model_file(&prefix.join(MODEL_XML_RELATIVE_PATH))
}

/// Loads a fresh target tree skeleton from the new-schema model triplet.
pub fn load_target_model(prefix: &Path) -> Result<PulseTree, MigrateError> {
    Ok(read_triplet(&prefix.join("models"), MODEL_TRIPLET_STEM)?)
}

/// Diagnostics emitted by one pulse migration for operator review.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PulseReport {
    /// Legacy names that had no entry in the model map.
    pub failed_names: Vec<String>,
    /// Legacy paths whose target node is absent in the new schema.
    pub missed_nodes: Vec<String>,
}

/// Migrates every top-level subtree of `src` into `dst`.
///
/// Always runs to completion: a subtree whose time mode cannot be
/// determined is skipped whole, every other failure is local. The
/// returned report lists what was skipped or renamed by fallback.
pub fn migrate_pulse(
    src: &PulseTree,
    dst: &mut PulseTree,
    names: &NameMap,
    converter: &dyn AosConverter,
) -> PulseReport {
    let mut ctx = MigrationContext::new(names, converter);
    let tops: Vec<String> = src.top_descendants().to_vec();
    for ids in tops {
        info!("migrating subtree {ids}");
        ctx.reset_time_mode();
        match walker::migrate_ids(src, dst, &ids, &mut ctx) {
            Ok(()) => {}
            Err(MigrateError::MissingTimeMode(p)) => {
                warn!("skipping subtree {p}: time mode undetermined");
            }
            Err(e) => error!("subtree {ids} aborted: {e}"),
        }
    }
    PulseReport {
        failed_names: ctx.failed_names,
        missed_nodes: ctx.missed_nodes,
    }
}
