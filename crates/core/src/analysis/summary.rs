//! Flamegraph-style summaries over the ranked function list.
//!
//! These are heuristics over a flat ranking, not call-graph analyses: the
//! "critical path" is simply the heaviest functions by self time, and every
//! "hot path" is a single function. Stack adjacency is never consulted.

use jsprof_protocol::{
    CallStackAnalysis, CriticalPathEntry, ExecutionPattern, FlamegraphAnalysis,
    FunctionHierarchy, HotPath, TopConsumer, VisualSummary,
};

use super::round2;
use super::select::AggregatedFunction;

pub const CRITICAL_PATH_LEN: usize = 5;
pub const HOT_PATH_COUNT: usize = 3;
/// A function is a leaf when its own frame holds more than this share of
/// its total time.
pub const LEAF_SELF_RATIO: f64 = 0.8;

const SINGLE_BOTTLENECK_SHARE: f64 = 50.0;
const FEW_HOT_FUNCTIONS_SHARE: f64 = 70.0;

/// `single-bottleneck` when the top function exceeds 50% of CPU,
/// `few-hot-functions` when the top three together exceed 70%,
/// otherwise `distributed`.
pub fn classify_execution_pattern(functions: &[AggregatedFunction]) -> ExecutionPattern {
    let ranked = by_self_time(functions);
    let top = ranked.first().map_or(0.0, |f| f.share);
    let top_three: f64 = ranked.iter().take(3).map(|f| f.share).sum();

    if top > SINGLE_BOTTLENECK_SHARE {
        ExecutionPattern::SingleBottleneck
    } else if top_three > FEW_HOT_FUNCTIONS_SHARE {
        ExecutionPattern::FewHotFunctions
    } else {
        ExecutionPattern::Distributed
    }
}

pub fn summarize_flamegraph(functions: &[AggregatedFunction]) -> FlamegraphAnalysis {
    let ranked = by_self_time(functions);

    let critical_path: Vec<CriticalPathEntry> = ranked
        .iter()
        .take(CRITICAL_PATH_LEN)
        .map(|f| CriticalPathEntry {
            function: f.label().to_string(),
            file: f.file().to_string(),
            self_time_ms: round2(f.self_time_ms),
            percentage: f.percentage.clone(),
        })
        .collect();
    let critical_path_time_ms = round2(
        ranked
            .iter()
            .take(CRITICAL_PATH_LEN)
            .map(|f| f.self_time_ms)
            .sum(),
    );

    let hot_paths = ranked
        .iter()
        .take(HOT_PATH_COUNT)
        .map(|f| HotPath {
            path: vec![f.label().to_string()],
            self_time_ms: round2(f.self_time_ms),
            percentage: f.percentage.clone(),
        })
        .collect();

    let (leaves, roots): (Vec<&AggregatedFunction>, Vec<&AggregatedFunction>) = ranked
        .iter()
        .copied()
        .partition(|f| f.self_time_ms > LEAF_SELF_RATIO * f.total_time_ms);

    let top_consumers = ranked
        .iter()
        .map(|f| TopConsumer {
            function: f.label().to_string(),
            weight: f.share.round() as u32,
            percentage: f.percentage.clone(),
        })
        .collect();

    FlamegraphAnalysis {
        call_stack: CallStackAnalysis {
            critical_path,
            critical_path_time_ms,
        },
        hot_paths,
        function_hierarchy: FunctionHierarchy {
            root_functions: labels(&roots),
            leaf_functions: labels(&leaves),
        },
        visual_summary: VisualSummary {
            execution_pattern: classify_execution_pattern(functions),
            top_consumers,
        },
    }
}

fn by_self_time(functions: &[AggregatedFunction]) -> Vec<&AggregatedFunction> {
    let mut ranked: Vec<&AggregatedFunction> = functions.iter().collect();
    ranked.sort_by(|a, b| b.self_time_ms.total_cmp(&a.self_time_ms));
    ranked
}

fn labels(functions: &[&AggregatedFunction]) -> Vec<String> {
    functions.iter().map(|f| f.label().to_string()).collect()
}
