//! Profile analysis engine: turns a V8 `.cpuprofile` (and optional trace
//! events) into a ranked, source-mapped [`Report`](jsprof_protocol::Report).

pub mod analysis;
pub mod analyze;
pub mod config;
pub mod model;
pub mod parsers;

pub use analyze::{AnalyzeError, Analyzer};
pub use config::AnalyzerConfig;
