//! Per-segment time-base resolution and last-segment tail trimming.
//!
//! Legacy writers pre-allocate the final segment of a timed node and mark
//! unwritten trailing capacity with time value `0`. Migration copies every
//! non-final segment verbatim and cuts the final one at the first sentinel
//! (a first sample at time `0` is legitimate and never triggers the cut).

use pulse_tree::{Node, Segment};

use crate::context::{MigrationContext, TimeMode};
use crate::names;

/// Time value marking unwritten trailing capacity in the final segment.
pub const TIME_SENTINEL: f64 = 0.0;

/// Suffix of the known legacy anomaly where a code output-flag node points
/// at the wrong time base; the fix re-targets the sibling `time0`.
const CODE_OUTPUT_FLAG_SUFFIX: &str = ".code0:output_f308";

/// Number of leading samples of a final-segment time axis that carry real
/// data: everything before the first sentinel at an index above zero.
pub fn live_sample_count(times: &[f64]) -> usize {
    let mut n = 0;
    while n < times.len() {
        if n > 0 && times[n] == TIME_SENTINEL {
            break;
        }
        n += 1;
    }
    n
}

/// Resolves the legacy time path of the segmented node at `node_path`.
///
/// Homogeneous subtrees use the global time path. Heterogeneous nodes use
/// their recorded time base, corrected for two known legacy anomalies:
/// an output-flag node re-targets its sibling `time0`, and a `time0` node
/// is always its own time base whatever its recorded one says.
pub fn resolve_time_path(ctx: &MigrationContext<'_>, node_path: &str, node: &Node) -> String {
    let mut time_path = match &ctx.time_mode {
        TimeMode::Homogeneous(global) => global.clone(),
        TimeMode::Heterogeneous => {
            let own = node
                .time_path
                .as_deref()
                .map(pulse_tree::normalize_path)
                .unwrap_or_default();
            if node_path.ends_with(CODE_OUTPUT_FLAG_SUFFIX) {
                let base = &node_path[..node_path.len() - CODE_OUTPUT_FLAG_SUFFIX.len()];
                format!("{base}:{}", names::TIME)
            } else {
                own
            }
        }
    };
    // A time0 member is its own time base, even under homogeneous time.
    if node_path.ends_with(&format!(":{}", names::TIME)) {
        time_path = node_path.to_string();
    }
    time_path
}

/// Aligns the segments of `src` against its resolved time node.
///
/// Non-final segments keep their payload untouched; the time axis (and
/// with it start/end) comes from the corresponding segment of `time_node`.
/// The final segment is trimmed to its live samples; with an empty time
/// axis it contributes nothing.
pub fn align_segments(src: &Node, time_node: &Node) -> Vec<Segment> {
    let total = src.segments.len();
    let mut out = Vec::with_capacity(total);
    for (idx, seg) in src.segments.iter().enumerate() {
        let axis = time_node
            .segments
            .get(idx)
            .map(|t| t.times.as_slice())
            .unwrap_or(seg.times.as_slice());
        if idx + 1 < total {
            out.push(Segment {
                times: axis.to_vec(),
                data: seg.data.clone(),
            });
        } else {
            if seg.times.is_empty() {
                continue;
            }
            let live = live_sample_count(&seg.times);
            let mut cut = seg.truncated(live);
            cut.times = axis[..live.min(axis.len())].to_vec();
            out.push(cut);
        }
    }
    out
}
