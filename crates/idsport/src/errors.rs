//! Migration error kinds.
//!
//! Only [`MigrateError::MissingTimeMode`] aborts a whole subtree; every
//! other kind is handled locally (fallback name, skipped node, omitted
//! composite entry) so a pulse migration always runs to completion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("name hash not in model map: {0}")]
    NameResolution(String),
    #[error("segmented numeric leaf outside a repeated structure: {0}")]
    StructuralMismatch(String),
    #[error("external converter failed for {path}: {reason}")]
    ExternalTool { path: String, reason: String },
    #[error("cannot determine time mode for subtree {0}")]
    MissingTimeMode(String),
    #[error("install prefix environment variable {0} is not set")]
    PrefixUnset(&'static str),
    #[error("invalid argument: {0}")]
    BadArgument(String),
    #[error("model document parse failed: {0}")]
    ModelXml(#[from] quick_xml::Error),
    #[error(transparent)]
    Tree(#[from] pulse_tree::TreeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
