pub mod location;
pub mod report;

pub use location::ResolvedLocation;
pub use report::{
    CallStackAnalysis, CriticalPathEntry, ExecutionPattern, ExecutiveSummary,
    FlamegraphAnalysis, FunctionHierarchy, HighImpactFunction, HotPath, Report,
    ScriptExecution, ScriptExecutionAnalysis, ScriptPerformance, TopConsumer, VisualSummary,
};
