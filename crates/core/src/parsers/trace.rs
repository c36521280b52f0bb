use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw Chrome trace event as found in DevTools JSON exports.
#[derive(Debug, Clone, Deserialize)]
struct TraceEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    ph: String,
    #[serde(default)]
    ts: f64,
    #[serde(default)]
    dur: Option<f64>,
    #[serde(default)]
    pid: u64,
    #[serde(default)]
    tid: u64,
    #[serde(default)]
    args: Option<serde_json::Value>,
}

/// Top-level Chrome trace JSON, in either array or object form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceFile {
    Object {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<TraceEvent>,
    },
    Array(Vec<TraceEvent>),
}

/// The script-related events the report cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptEventKind {
    EvaluateScript,
    Compile,
    FunctionCall,
}

impl ScriptEventKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "EvaluateScript" => Some(Self::EvaluateScript),
            "v8.compile" => Some(Self::Compile),
            "FunctionCall" => Some(Self::FunctionCall),
            _ => None,
        }
    }
}

/// A script evaluation, compile or call with its wall time in microseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub kind: ScriptEventKind,
    pub url: Option<String>,
    pub start: f64,
    pub duration: f64,
}

/// Extract script events from a Chrome trace. Complete (`X`) events carry
/// their own duration; `B`/`E` pairs are matched per thread. Other phases
/// (instant, async, counter, metadata) are ignored.
pub fn parse_script_events(data: &[u8]) -> Result<Vec<ScriptEvent>, TraceParseError> {
    let events = match serde_json::from_slice::<TraceFile>(data)? {
        TraceFile::Object { trace_events } => trace_events,
        TraceFile::Array(events) => events,
    };

    let mut out = Vec::new();
    let mut open: HashMap<(u64, u64, ScriptEventKind), Vec<(f64, Option<String>)>> =
        HashMap::new();

    for event in &events {
        let Some(kind) = ScriptEventKind::from_name(&event.name) else {
            continue;
        };
        match event.ph.as_str() {
            "B" => open
                .entry((event.pid, event.tid, kind))
                .or_default()
                .push((event.ts, extract_url(event))),
            "E" => {
                if let Some((start, url)) = open
                    .get_mut(&(event.pid, event.tid, kind))
                    .and_then(Vec::pop)
                {
                    out.push(ScriptEvent {
                        kind,
                        url: url.or_else(|| extract_url(event)),
                        start,
                        duration: (event.ts - start).max(0.0),
                    });
                }
            }
            "X" => out.push(ScriptEvent {
                kind,
                url: extract_url(event),
                start: event.ts,
                duration: event.dur.unwrap_or(0.0).max(0.0),
            }),
            _ => {}
        }
    }

    out.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(out)
}

/// Script URL from `args.data.url`, falling back to the other spots
/// Chrome versions have used.
fn extract_url(event: &TraceEvent) -> Option<String> {
    let args = event.args.as_ref()?;
    let data = args.get("data");
    data.and_then(|d| d.get("url"))
        .or_else(|| data.and_then(|d| d.get("scriptName")))
        .or_else(|| args.get("fileName"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}
