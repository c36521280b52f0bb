use serde::{Deserialize, Serialize};

/// The structured performance report produced by one analysis run.
///
/// ```text
///   .cpuprofile ─▶ collapse ─▶ call tree ─▶ select ─▶ resolve ─▶ summarize ─▶ Report
///   trace.json  ─────────────────────────────────────────────────────────────▲
/// ```
///
/// Top-level keys are snake_case; per-function source-map fields follow the
/// camelCase names consumers already key on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub executive_summary: ExecutiveSummary,
    pub high_impact_functions: Vec<HighImpactFunction>,
    pub flamegraph_analysis: FlamegraphAnalysis,
    /// Present only when trace events were supplied and parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_performance: Option<ScriptPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub total_execution_time_ms: f64,
    pub total_samples: usize,
    pub sample_interval_ms: f64,
}

/// One ranked function, optionally mapped back to its original source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighImpactFunction {
    pub function: String,
    pub file: String,
    /// Self time.
    pub execution_time_ms: f64,
    /// Two-decimal percentage of total profiled time, e.g. `"12.50"`.
    pub cpu_percentage: String,
    pub call_count: u64,
    /// `file:line:column`, 1-based.
    pub location: String,
    #[serde(rename = "originalFile", default, skip_serializing_if = "Option::is_none")]
    pub original_file: Option<String>,
    #[serde(rename = "originalLine", default, skip_serializing_if = "Option::is_none")]
    pub original_line: Option<u32>,
    #[serde(rename = "originalColumn", default, skip_serializing_if = "Option::is_none")]
    pub original_column: Option<u32>,
    #[serde(rename = "originalName", default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(rename = "isSourceMapped")]
    pub is_source_mapped: bool,
    #[serde(rename = "fullOriginalPath", default, skip_serializing_if = "Option::is_none")]
    pub full_original_path: Option<String>,
    #[serde(rename = "sourceMapUrl", default, skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,
}

/// Descriptive statistics over the ranked functions.
///
/// These are heuristics over a flat ranking, not call-graph reconstructions:
/// "paths" are single functions and the critical path ignores stack adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlamegraphAnalysis {
    pub call_stack: CallStackAnalysis,
    pub hot_paths: Vec<HotPath>,
    pub function_hierarchy: FunctionHierarchy,
    pub visual_summary: VisualSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStackAnalysis {
    pub critical_path: Vec<CriticalPathEntry>,
    pub critical_path_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathEntry {
    pub function: String,
    pub file: String,
    pub self_time_ms: f64,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotPath {
    pub path: Vec<String>,
    pub self_time_ms: f64,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionHierarchy {
    pub root_functions: Vec<String>,
    /// Functions spending more than 80% of their total time in their own frame.
    pub leaf_functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSummary {
    pub execution_pattern: ExecutionPattern,
    pub top_consumers: Vec<TopConsumer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionPattern {
    /// The top function alone exceeds half of CPU time.
    SingleBottleneck,
    /// The top three together exceed 70%.
    FewHotFunctions,
    Distributed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopConsumer {
    pub function: String,
    /// Rounded percentage, usable directly as a bar width.
    pub weight: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPerformance {
    pub script_execution_analysis: ScriptExecutionAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptExecutionAnalysis {
    pub total_events: usize,
    pub total_evaluate_ms: f64,
    pub total_compile_ms: f64,
    pub total_function_call_ms: f64,
    /// Per-script totals, heaviest first.
    pub scripts: Vec<ScriptExecution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptExecution {
    pub url: String,
    pub evaluate_ms: f64,
    pub compile_ms: f64,
    pub function_call_ms: f64,
    pub total_ms: f64,
    pub event_count: usize,
    /// Earliest event start, in trace clock milliseconds.
    pub first_start_ms: f64,
}
