//! Legacy-name hashing, the hash → true-name map, and path rewriting.
//!
//! Legacy node names are derived from true model names by an 8+sum hash
//! ([`legacy_hash`]). The new layout re-expands hashes to true names and
//! splits them into 12-character chunks joined by `.` (child) or `:`
//! (member) per the path grammar.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use crate::errors::MigrateError;

/// Maximum segment-name width in the new layout.
const CHUNK: usize = 12;

/// Legacy top anchor kept verbatim when rewriting absolute paths.
const TOP_ANCHOR: &str = "\\ids::top";

// Hashed names of the reserved structural members.
pub const SHAPE_OF: &str = "shape_of0";
pub const NON_TIME: &str = "non_time100";
pub const TIME: &str = "time0";
pub const TIMED: &str = "timed0";
pub const STATIC: &str = "static0";
pub const IDS_PROPERTIES: &str = "ids_prop652";
pub const HOMOGENEOUS: &str = "homogene869";

/// Hashes a true model name into its legacy node name: lower-case, first
/// eight characters, then the decimal sum of the character codes from
/// position eight onward (0 for short names).
///
/// Deterministic but not collision-free; the map keeps the last name
/// inserted for a colliding hash.
pub fn legacy_hash(name: &str) -> String {
    let low = name.to_lowercase();
    let head: String = low.chars().take(8).collect();
    let tail: u32 = low.chars().skip(8).map(|c| c as u32).sum();
    format!("{head}{tail}")
}

// ── NameMap ───────────────────────────────────────────────────────────────

/// Hash → true-name table built from the model description document.
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    entries: IndexMap<String, String>,
}

impl NameMap {
    /// Registers one true name under its hash. A later insertion with the
    /// same hash silently overwrites the earlier one.
    pub fn insert(&mut self, true_name: &str) {
        self.entries
            .insert(legacy_hash(true_name), true_name.to_string());
    }

    /// Case-insensitive lookup of a legacy hash.
    pub fn resolve(&self, hash: &str) -> Option<&str> {
        self.entries.get(&hash.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the map from a model XML document: every `member` or `node`
    /// element contributes its `NAME` attribute.
    pub fn from_model_xml(xml: &str) -> Result<Self, MigrateError> {
        let mut map = NameMap::default();
        let mut reader = XmlReader::from_str(xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    let tag = e.name();
                    if tag.as_ref() == b"member" || tag.as_ref() == b"node" {
                        for attr in e.attributes() {
                            let attr = attr.map_err(quick_xml::Error::from)?;
                            if attr.key.as_ref() == b"NAME" {
                                map.insert(&attr.unescape_value()?);
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => (),
            }
            buf.clear();
        }
        Ok(map)
    }

    pub fn from_model_file(path: &Path) -> Result<Self, MigrateError> {
        Self::from_model_xml(&fs::read_to_string(path)?)
    }
}

// ── Name translation ──────────────────────────────────────────────────────

/// Translates one legacy path component into the new layout.
///
/// Passed through verbatim without a table lookup: purely numeric names
/// (repetition indices), the structural placeholder `aos`, and names
/// already carrying the new-scheme `timed_` / `group_` / `item_` tags.
/// `static0` maps to the fixed member name `static`.
pub fn translate_name(
    map: &NameMap,
    name: &str,
    is_member: bool,
) -> Result<String, MigrateError> {
    if name == STATIC {
        return Ok("static".to_string());
    }
    if name == "aos"
        || name.starts_with("timed_")
        || name.starts_with("group_")
        || name.starts_with("item_")
    {
        return Ok(name.to_string());
    }
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
        return Ok(name.to_string());
    }
    let true_name = map
        .resolve(name)
        .ok_or_else(|| MigrateError::NameResolution(name.to_lowercase()))?;
    Ok(chunk_name(true_name, is_member))
}

/// Splits a true name into 12-character chunks. Chunks join with `.`,
/// except the final chunk of a member name, which joins with `:`.
/// Chunk width counts characters, not bytes; model names are arbitrary
/// attribute text and may be multibyte.
fn chunk_name(name: &str, is_member: bool) -> String {
    let total = name.chars().count();
    let last = total / CHUNK;
    let mut out = String::with_capacity(name.len() + last + 1);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && i % CHUNK == 0 {
            if i / CHUNK == last && is_member {
                out.push(':');
            } else {
                out.push('.');
            }
        }
        out.push(c);
    }
    out
}

/// Rewrites one full legacy path into the new layout.
///
/// Splits on `.` (child) and `:` (member), translates each component, and
/// re-joins. The separator before a member stays `:` unless the legacy
/// component name is longer than 12 characters, which forces `.`.
/// Resolution misses fall back to the lower-cased raw legacy name and are
/// recorded in `failed`.
pub fn rewrite_path(map: &NameMap, path: &str, failed: &mut Vec<String>) -> String {
    let (anchor, rest) = split_anchor(path);
    let mut out = String::with_capacity(path.len() * 2);
    for part in rest.split('.') {
        out.push('.');
        for (k, comp) in part.split(':').enumerate() {
            if k > 0 {
                if comp.chars().count() > CHUNK {
                    out.push('.');
                } else {
                    out.push(':');
                }
            }
            out.push_str(&translate_or_fall_back(map, comp, k > 0, failed));
        }
    }
    format!("{anchor}{out}")
}

fn translate_or_fall_back(
    map: &NameMap,
    comp: &str,
    is_member: bool,
    failed: &mut Vec<String>,
) -> String {
    match translate_name(map, comp, is_member) {
        Ok(name) => name,
        Err(_) => {
            let fallback = comp.to_lowercase();
            failed.push(fallback.clone());
            fallback
        }
    }
}

fn split_anchor(path: &str) -> (&'static str, &str) {
    // `get` refuses a split inside a multibyte character.
    match path.get(..TOP_ANCHOR.len()) {
        Some(head)
            if head.eq_ignore_ascii_case(TOP_ANCHOR)
                && path.as_bytes().get(TOP_ANCHOR.len()) == Some(&b'.') =>
        {
            (TOP_ANCHOR, &path[TOP_ANCHOR.len() + 1..])
        }
        _ => ("", path.trim_start_matches('.')),
    }
}
