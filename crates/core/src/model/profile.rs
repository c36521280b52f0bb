use serde::{Deserialize, Serialize};

/// Source location of a sampled frame. Line and column are 0-based as
/// recorded by V8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    pub function_name: String,
    pub url: String,
    pub line_number: i64,
    pub column_number: i64,
}

impl CallFrame {
    /// 1-based line for display; unknown (negative) positions map to 0.
    pub fn display_line(&self) -> u32 {
        to_display(self.line_number)
    }

    pub fn display_column(&self) -> u32 {
        to_display(self.column_number)
    }

    /// Last path segment of the url, without query string.
    pub fn file_name(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
    }
}

fn to_display(zero_based: i64) -> u32 {
    u32::try_from(zero_based.saturating_add(1)).unwrap_or(0)
}

/// A profile node as loaded, before tree linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub call_frame: CallFrame,
    pub children: Vec<u64>,
    /// Some exporters describe the tree bottom-up with a parent id instead.
    pub parent: Option<u64>,
}

/// A validated V8 CPU profile. Times are in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuProfile {
    pub nodes: Vec<NodeRecord>,
    pub samples: Vec<u64>,
    /// Same length as `samples`; `time_deltas[0]` is relative to `start_time`.
    pub time_deltas: Vec<f64>,
    pub start_time: f64,
    pub end_time: f64,
    pub sample_interval: f64,
}
