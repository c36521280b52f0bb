use serde::Deserialize;
use thiserror::Error;

use crate::model::{CallFrame, CpuProfile, NodeRecord};

/// Interval assumed when the profile does not record one, in microseconds.
pub const DEFAULT_SAMPLE_INTERVAL_US: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum CpuProfileParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed profile: missing `{0}` array")]
    MalformedProfile(&'static str),
}

/// V8 CPU profile node.
#[derive(Debug, Deserialize)]
struct RawNode {
    id: u64,
    #[serde(rename = "callFrame", default)]
    call_frame: RawCallFrame,
    #[serde(default)]
    children: Vec<u64>,
    #[serde(default)]
    parent: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCallFrame {
    #[serde(default, rename = "functionName")]
    function_name: String,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "lineNumber")]
    line_number: i64,
    #[serde(default, rename = "columnNumber")]
    column_number: i64,
}

/// V8 CPU profile top-level structure (.cpuprofile files).
#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    nodes: Option<Vec<RawNode>>,
    #[serde(default)]
    samples: Option<Vec<u64>>,
    #[serde(default, rename = "timeDeltas")]
    time_deltas: Option<Vec<f64>>,
    #[serde(default, rename = "startTime")]
    start_time: Option<f64>,
    #[serde(default, rename = "endTime")]
    end_time: Option<f64>,
    #[serde(default, rename = "sampleInterval")]
    sample_interval: Option<f64>,
}

/// Parse and validate a V8 CPU profile (.cpuprofile).
///
/// Used by: Node.js `--cpu-prof`, Chrome DevTools CPU profiler, Puppeteer
/// `Profiler.stop`. `nodes` and `samples` are mandatory; missing time deltas
/// are synthesised from `sampleInterval`.
pub fn parse_cpuprofile(data: &[u8]) -> Result<CpuProfile, CpuProfileParseError> {
    let raw: RawProfile = serde_json::from_slice(data)?;

    let nodes = raw
        .nodes
        .ok_or(CpuProfileParseError::MalformedProfile("nodes"))?;
    let samples = raw
        .samples
        .ok_or(CpuProfileParseError::MalformedProfile("samples"))?;

    let sample_interval = raw
        .sample_interval
        .filter(|i| *i > 0.0)
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL_US);
    let time_deltas = normalize_deltas(
        raw.time_deltas.unwrap_or_default(),
        samples.len(),
        sample_interval,
    );

    let start_time = raw.start_time.unwrap_or(0.0);
    let end_time = raw
        .end_time
        .unwrap_or_else(|| start_time + time_deltas.iter().sum::<f64>());

    let nodes = nodes
        .into_iter()
        .map(|n| NodeRecord {
            id: n.id,
            call_frame: CallFrame {
                function_name: n.call_frame.function_name,
                url: n.call_frame.url,
                line_number: n.call_frame.line_number,
                column_number: n.call_frame.column_number,
            },
            children: n.children,
            parent: n.parent,
        })
        .collect();

    Ok(CpuProfile {
        nodes,
        samples,
        time_deltas,
        start_time,
        end_time,
        sample_interval,
    })
}

/// Pad or truncate deltas to one per sample. Padding uses the sample
/// interval, except for a leading delta which is relative to start time.
fn normalize_deltas(mut deltas: Vec<f64>, sample_count: usize, interval: f64) -> Vec<f64> {
    deltas.truncate(sample_count);
    while deltas.len() < sample_count {
        deltas.push(if deltas.is_empty() { 0.0 } else { interval });
    }
    deltas
}
