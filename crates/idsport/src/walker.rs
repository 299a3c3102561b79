//! Recursive schema walk over one top-level subtree.
//!
//! The walk dispatches on the closed [`NodeClass`] classifier. Plain
//! recursion copies leaves node-by-node; repeated structures are assembled
//! bottom-up into one composite value written to the structure's `static`
//! member; split-time structures delegate their timed branch to the
//! external converter. Empty substructures are pruned on the way up —
//! except inside repeated structures, where a slot that yields nothing is
//! still written as an explicit present-but-empty marker so index
//! alignment with sibling arrays survives.

use log::{error, info, warn};

use pulse_tree::{normalize_path, Node, NodeUsage, PulseTree, TreeValue};

use crate::classify::{classify, repetition_child, NodeClass};
use crate::context::{MigrationContext, TimeMode};
use crate::errors::MigrateError;
use crate::names;
use crate::segments::{align_segments, resolve_time_path};
use crate::timed_index::{build_timed_map, TimedIndexMap};

/// Migrates the subtree rooted at `ids_path` from `src` into `dst`.
///
/// Resolves the subtree's time mode first; an undetermined mode aborts
/// this subtree (and only this subtree).
pub fn migrate_ids(
    src: &PulseTree,
    dst: &mut PulseTree,
    ids_path: &str,
    ctx: &mut MigrationContext<'_>,
) -> Result<(), MigrateError> {
    let ids_path = normalize_path(ids_path);
    ctx.resolve_time_mode(src, &ids_path)?;
    convert_subtree(src, dst, &ids_path, ctx)
}

fn convert_subtree(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    ctx: &mut MigrationContext<'_>,
) -> Result<(), MigrateError> {
    let node = src.node(path)?;
    match classify(src, node) {
        NodeClass::Leaf => convert_leaf(src, dst, path, node, ctx),
        NodeClass::RepeatedStructure { .. } => convert_repeated_root(src, dst, path, ctx),
        NodeClass::SplitTimeStructure => {
            info!("split-time structure: {path}");
            let timed_path = child_named(src, node, names::TIMED)
                .unwrap_or_else(|| format!("{path}:{}", names::TIMED));
            let slot = format!("{path}.timed_aos.group_1:item_1");
            let target = normalize_path(&ctx.rewrite_path(&slot));
            if let Err(e) = ctx
                .converter
                .convert(src.pulse, &timed_path, dst.pulse, &target)
            {
                warn!("split-time conversion failed for {timed_path}: {e}");
            }
            if let Some(non_time) = child_named(src, node, names::NON_TIME) {
                convert_subtree(src, dst, &non_time, ctx)?;
            }
            Ok(())
        }
        NodeClass::PlainStructure => {
            for child in &node.children {
                convert_subtree(src, dst, child, ctx)?;
            }
            Ok(())
        }
    }
}

// ── Leaves ────────────────────────────────────────────────────────────────

fn convert_leaf(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    node: &Node,
    ctx: &mut MigrationContext<'_>,
) -> Result<(), MigrateError> {
    let target = normalize_path(&ctx.rewrite_path(path));
    if node.is_segmented() {
        if node.usage != NodeUsage::Signal && node.usage != NodeUsage::Numeric {
            error!("segmented node {path} has unexpected usage, skipping");
            return Ok(());
        }
        if !dst.contains(&target) {
            warn!("target node missing for {path} ({target})");
            ctx.missed_nodes.push(path.to_string());
            return Ok(());
        }
        write_aligned_segments(src, dst, path, node, &target, ctx, None)
    } else {
        if !dst.contains(&target) {
            ctx.missed_nodes.push(path.to_string());
            return Ok(());
        }
        if let Some(payload) = &node.payload {
            let value = convert_payload(payload, node.usage);
            dst.put_payload(&target, value)?;
        }
        Ok(())
    }
}

/// Aligns the segments of `path` against its resolved time base and writes
/// them to `target`. Inside a repeated structure the time reference is
/// first mapped through the timed slot map, like the legacy layout did.
fn write_aligned_segments(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    node: &Node,
    target: &str,
    ctx: &mut MigrationContext<'_>,
    timed: Option<&TimedIndexMap>,
) -> Result<(), MigrateError> {
    let time_path = resolve_time_path(ctx, path, node);
    let time_node = match src.node(&time_path) {
        Ok(n) => n,
        Err(_) => {
            warn!("time base {time_path} missing for {path}");
            ctx.missed_nodes.push(path.to_string());
            return Ok(());
        }
    };
    let aligned = align_segments(node, time_node);
    let reference = match (timed, &ctx.time_mode) {
        (Some(map), TimeMode::Heterogeneous) => map
            .data
            .get(&time_path)
            .cloned()
            .unwrap_or_else(|| time_path.clone()),
        _ => time_path.clone(),
    };
    let target_time = normalize_path(&ctx.rewrite_path(&reference));
    let out = dst.node_mut(target)?;
    out.segments = aligned;
    out.time_path = Some(target_time);
    Ok(())
}

fn convert_payload(value: &TreeValue, usage: NodeUsage) -> TreeValue {
    match (usage, value) {
        (NodeUsage::Text, TreeValue::Text(strings)) => transcode_text_block(strings),
        _ => value.clone(),
    }
}

/// Converts a fixed-width array of strings into a byte matrix: one column
/// per string, one row per character position. The first string fixes the
/// width; shorter strings pad with zero bytes, longer ones are cut.
pub fn transcode_text_block(strings: &[String]) -> TreeValue {
    let cols = strings.len();
    let rows = strings.first().map(|s| s.len()).unwrap_or(0);
    let mut data = vec![0u8; rows * cols];
    for (col, s) in strings.iter().enumerate() {
        for (row, b) in s.bytes().take(rows).enumerate() {
            data[row * cols + col] = b;
        }
    }
    TreeValue::ByteMatrix { rows, cols, data }
}

// ── Repeated structures ───────────────────────────────────────────────────

fn convert_repeated_root(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    ctx: &mut MigrationContext<'_>,
) -> Result<(), MigrateError> {
    info!("repeated structure: {path}");
    let timed = build_timed_map(src, path)?;
    let static_path = format!("{path}:{}", names::STATIC);
    let static_target = normalize_path(&ctx.rewrite_path(&static_path));
    if !dst.contains(&static_target) {
        warn!("static target missing for repeated structure {path}");
        ctx.missed_nodes.push(static_path);
        return Ok(());
    }
    if let Some(value) = convert_struct(src, dst, path, ctx, &timed, true)? {
        dst.put_payload(&static_target, value)?;
    }
    Ok(())
}

fn convert_struct(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    ctx: &mut MigrationContext<'_>,
    timed: &TimedIndexMap,
    is_top: bool,
) -> Result<Option<TreeValue>, MigrateError> {
    let node = src.node(path)?;
    match classify(src, node) {
        NodeClass::Leaf => convert_struct_item(src, dst, path, node, ctx, timed),
        NodeClass::SplitTimeStructure => {
            let name = ctx.resolve_or_record(&node.name);
            match convert_split_time(src, dst, path, node, ctx, timed)? {
                Some(reference) => Ok(Some(TreeValue::Composite(vec![
                    TreeValue::Str(name),
                    reference,
                ]))),
                None => Ok(None),
            }
        }
        NodeClass::RepeatedStructure { count } => {
            // A negative count means no instances at all: the parent gets
            // no array field, unlike a present-but-empty count of zero.
            if count < 0 {
                return Ok(None);
            }
            let name = ctx.resolve_or_record(&node.name);
            let mut slots = Vec::with_capacity(count as usize);
            for i in 1..=count {
                let mut entry = vec![TreeValue::Str(name.clone())];
                let mut empty = true;
                if let Some(child_path) = repetition_child(src, node, i) {
                    let child_path = child_path.clone();
                    let child = src.node(&child_path)?;
                    for grandchild in &child.children {
                        if let Some(v) = convert_struct(src, dst, grandchild, ctx, timed, false)? {
                            entry.push(v);
                            empty = false;
                        }
                    }
                }
                slots.push(if empty {
                    TreeValue::Empty
                } else {
                    TreeValue::Composite(entry)
                });
            }
            let array = TreeValue::Composite(slots);
            if is_top {
                Ok(Some(array))
            } else {
                Ok(Some(TreeValue::Composite(vec![TreeValue::Str(name), array])))
            }
        }
        NodeClass::PlainStructure => {
            let name = ctx.resolve_or_record(&node.name);
            let mut out = vec![TreeValue::Str(name)];
            let mut empty = true;
            for child in &node.children {
                if let Some(v) = convert_struct(src, dst, child, ctx, timed, false)? {
                    out.push(v);
                    empty = false;
                }
            }
            if empty {
                Ok(None)
            } else {
                Ok(Some(TreeValue::Composite(out)))
            }
        }
    }
}

fn convert_struct_item(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    node: &Node,
    ctx: &mut MigrationContext<'_>,
    timed: &TimedIndexMap,
) -> Result<Option<TreeValue>, MigrateError> {
    let name = ctx.resolve_or_record(&node.name);
    if node.usage == NodeUsage::Signal && node.is_segmented() {
        let slot = timed
            .data
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_string());
        let mut target = normalize_path(&ctx.rewrite_path(&slot));
        if !dst.contains(&target) {
            let fallback = normalize_path(&ctx.rewrite_path(path));
            warn!("timed slot {target} missing for {path}, trying {fallback}");
            if dst.contains(&fallback) {
                target = fallback;
            } else {
                ctx.missed_nodes.push(path.to_string());
                return Ok(None);
            }
        }
        write_aligned_segments(src, dst, path, node, &target, ctx, Some(timed))?;
        return Ok(Some(TreeValue::Composite(vec![
            TreeValue::Str(name),
            TreeValue::NodeRef(target),
        ])));
    }
    if node.usage == NodeUsage::Numeric && node.is_segmented() {
        // Belongs to the shape of a repeated structure, not here; abort
        // this entry, siblings continue.
        error!(
            "{}",
            MigrateError::StructuralMismatch(path.to_string())
        );
        return Ok(None);
    }
    match &node.payload {
        Some(p) => Ok(Some(TreeValue::Composite(vec![
            TreeValue::Str(name),
            convert_payload(p, node.usage),
        ]))),
        None => Ok(None),
    }
}

fn convert_split_time(
    src: &PulseTree,
    dst: &mut PulseTree,
    path: &str,
    node: &Node,
    ctx: &mut MigrationContext<'_>,
    timed: &TimedIndexMap,
) -> Result<Option<TreeValue>, MigrateError> {
    let timed_path = match child_named(src, node, names::TIMED) {
        Some(p) => p,
        None => return Ok(None),
    };
    let timed_node = src.node(&timed_path)?;
    if timed_node.usage != NodeUsage::Numeric || !timed_node.is_segmented() {
        if timed_node.is_segmented() {
            error!("unexpected split-time branch shape at {timed_path}");
        }
        return Ok(None);
    }
    let slot = timed
        .aos
        .get(&timed_path)
        .cloned()
        .unwrap_or_else(|| format!("{path}.timed_aos.group_1.item_1"));
    let out_base = normalize_path(&ctx.rewrite_path(&slot));
    let reference = format!("{out_base}:aos");
    if !dst.contains(&reference) {
        warn!("target node missing for split-time branch {timed_path}");
        ctx.missed_nodes.push(timed_path);
        return Ok(None);
    }
    info!("split-time structure inside repeated structure: {path}");
    if let Err(e) = ctx
        .converter
        .convert(src.pulse, &timed_path, dst.pulse, &out_base)
    {
        warn!("split-time conversion failed for {timed_path}: {e}");
        return Ok(None);
    }
    Ok(Some(TreeValue::NodeRef(reference)))
}

fn child_named(tree: &PulseTree, node: &Node, name: &str) -> Option<String> {
    node.children
        .iter()
        .find(|p| tree.node(p).map(|n| n.name == name).unwrap_or(false))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_lays_strings_out_as_columns() {
        let strings = vec!["abc".to_string(), "xyz".to_string()];
        let out = transcode_text_block(&strings);
        assert_eq!(
            out,
            TreeValue::ByteMatrix {
                rows: 3,
                cols: 2,
                data: vec![b'a', b'x', b'b', b'y', b'c', b'z'],
            }
        );
    }

    #[test]
    fn transcode_pads_short_strings_with_zero_bytes() {
        let strings = vec!["abcd".to_string(), "x".to_string()];
        let out = transcode_text_block(&strings);
        assert_eq!(
            out,
            TreeValue::ByteMatrix {
                rows: 4,
                cols: 2,
                data: vec![b'a', b'x', b'b', 0, b'c', 0, b'd', 0],
            }
        );
    }

    #[test]
    fn transcode_of_empty_array_is_empty_matrix() {
        let out = transcode_text_block(&[]);
        assert_eq!(
            out,
            TreeValue::ByteMatrix {
                rows: 0,
                cols: 0,
                data: vec![],
            }
        );
    }
}
