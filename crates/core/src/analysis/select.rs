use jsprof_protocol::ResolvedLocation;
use serde::{Deserialize, Serialize};

use super::{format_percentage, share_percent, us_to_ms};
use crate::model::{CallFrame, CallTree, ProfileNode};

/// V8's placeholder url for its own internal scripts.
pub const V8_INTERNAL_URL: &str = "v8/LoadTimes";
/// Marker in the url of scripts injected by the automation harness.
pub const HARNESS_SCRIPT_MARKER: &str = "__puppeteer_evaluation_script__";
const SYNTHETIC_NAMES: &[&str] = &["(root)", "(idle)"];

/// A ranked function: a read-only projection of one profile node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFunction {
    pub node_id: u64,
    /// Display name, see [`display_name`].
    pub name: String,
    /// Raw function name as recorded, possibly empty.
    pub function_name: String,
    pub url: String,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    pub self_time_ms: f64,
    pub total_time_ms: f64,
    pub hit_count: u64,
    /// Share of total profiled time in `[0, 100]`.
    pub share: f64,
    /// `share` with two decimals.
    pub percentage: String,
    pub resolved: Option<ResolvedLocation>,
}

impl AggregatedFunction {
    pub fn from_node(node: &ProfileNode, total_time_us: f64) -> Self {
        let frame = &node.call_frame;
        Self {
            node_id: node.id,
            name: display_name(frame),
            function_name: frame.function_name.clone(),
            url: frame.url.clone(),
            line: frame.display_line(),
            column: frame.display_column(),
            self_time_ms: us_to_ms(node.self_time),
            total_time_ms: us_to_ms(node.total_time),
            hit_count: node.hit_count,
            share: share_percent(node.self_time, total_time_us),
            percentage: format_percentage(node.self_time, total_time_us),
            resolved: None,
        }
    }

    pub fn is_source_mapped(&self) -> bool {
        self.resolved.as_ref().is_some_and(|r| r.is_resolved)
    }

    /// Name to show: the original name when source-mapped, else the display name.
    pub fn label(&self) -> &str {
        self.resolved
            .as_ref()
            .filter(|r| r.is_resolved)
            .and_then(|r| r.original_name.as_deref())
            .unwrap_or(&self.name)
    }

    /// File to show: the original file when source-mapped, else the url.
    pub fn file(&self) -> &str {
        match &self.resolved {
            Some(r) if r.is_resolved => &r.original_file,
            _ => &self.url,
        }
    }
}

/// Function name, or `(anonymous <file>:<line>)`, or `(anonymous)`.
pub fn display_name(frame: &CallFrame) -> String {
    if !frame.function_name.is_empty() {
        return frame.function_name.clone();
    }
    if frame.url.is_empty() {
        return "(anonymous)".to_string();
    }
    format!("(anonymous {}:{})", frame.file_name(), frame.display_line())
}

/// Internal and instrumentation frames that never belong in a ranking.
pub fn is_excluded(frame: &CallFrame) -> bool {
    frame.url == V8_INTERNAL_URL
        || frame.url.contains(HARNESS_SCRIPT_MARKER)
        || SYNTHETIC_NAMES.contains(&frame.function_name.as_str())
}

/// The `limit` nodes with the most self time, heaviest first.
///
/// Nodes without self time and excluded frames are skipped; ties go to the
/// lower node id.
pub fn select_top_functions(
    tree: &CallTree,
    total_time_us: f64,
    limit: usize,
) -> Vec<AggregatedFunction> {
    let mut candidates: Vec<&ProfileNode> = tree
        .nodes
        .iter()
        .filter(|n| n.self_time > 0.0 && !is_excluded(&n.call_frame))
        .collect();
    candidates.sort_by(|a, b| {
        b.self_time
            .total_cmp(&a.self_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(limit);
    candidates
        .into_iter()
        .map(|n| AggregatedFunction::from_node(n, total_time_us))
        .collect()
}
