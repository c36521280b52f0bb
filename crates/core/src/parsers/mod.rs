pub mod cpuprofile;
pub mod trace;

pub use cpuprofile::{CpuProfileParseError, parse_cpuprofile};
pub use trace::{ScriptEvent, ScriptEventKind, TraceParseError, parse_script_events};
