pub mod aggregate;
pub mod scripts;
pub mod select;
pub mod summary;

pub use aggregate::{CollapsedSamples, attribute_self_time, collapse_samples};
pub use scripts::summarize_script_events;
pub use select::{AggregatedFunction, display_name, is_excluded, select_top_functions};
pub use summary::{classify_execution_pattern, summarize_flamegraph};

pub fn us_to_ms(us: f64) -> f64 {
    us / 1000.0
}

/// Round to two decimals for report output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total * 100`, clamped into `[0, 100]`; zero when `total` is zero.
pub fn share_percent(part: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    (part * 100.0 / total).clamp(0.0, 100.0)
}

pub fn format_percentage(part: f64, total: f64) -> String {
    format!("{:.2}", share_percent(part, total))
}
