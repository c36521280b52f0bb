use std::collections::HashMap;

use jsprof_protocol::{ScriptExecution, ScriptExecutionAnalysis};

use super::{round2, us_to_ms};
use crate::parsers::{ScriptEvent, ScriptEventKind};

/// Bucket for events that carry no script url.
pub const UNKNOWN_SCRIPT: &str = "(unknown)";

#[derive(Default)]
struct Totals {
    evaluate: f64,
    compile: f64,
    function_call: f64,
    count: usize,
    first_start: f64,
}

/// Per-script evaluate/compile/call totals, heaviest script first.
pub fn summarize_script_events(events: &[ScriptEvent]) -> ScriptExecutionAnalysis {
    let mut by_url: HashMap<&str, Totals> = HashMap::new();
    for event in events {
        let url = event.url.as_deref().unwrap_or(UNKNOWN_SCRIPT);
        let totals = by_url.entry(url).or_insert_with(|| Totals {
            first_start: event.start,
            ..Totals::default()
        });
        match event.kind {
            ScriptEventKind::EvaluateScript => totals.evaluate += event.duration,
            ScriptEventKind::Compile => totals.compile += event.duration,
            ScriptEventKind::FunctionCall => totals.function_call += event.duration,
        }
        totals.count += 1;
        totals.first_start = totals.first_start.min(event.start);
    }

    let mut scripts: Vec<ScriptExecution> = by_url
        .into_iter()
        .map(|(url, t)| ScriptExecution {
            url: url.to_string(),
            evaluate_ms: round2(us_to_ms(t.evaluate)),
            compile_ms: round2(us_to_ms(t.compile)),
            function_call_ms: round2(us_to_ms(t.function_call)),
            total_ms: round2(us_to_ms(t.evaluate + t.compile + t.function_call)),
            event_count: t.count,
            first_start_ms: round2(us_to_ms(t.first_start)),
        })
        .collect();
    scripts.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms).then_with(|| a.url.cmp(&b.url)));

    let sum = |kind: ScriptEventKind| -> f64 {
        round2(us_to_ms(
            events
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.duration)
                .sum(),
        ))
    };

    ScriptExecutionAnalysis {
        total_events: events.len(),
        total_evaluate_ms: sum(ScriptEventKind::EvaluateScript),
        total_compile_ms: sum(ScriptEventKind::Compile),
        total_function_call_ms: sum(ScriptEventKind::FunctionCall),
        scripts,
    }
}
