use jsprof_protocol::{
    ExecutiveSummary, HighImpactFunction, Report, ResolvedLocation, ScriptPerformance,
};
use jsprof_sourcemap::{HttpFetcher, Locator, SourceFetcher, SourceMapError, SourceMapResolver};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::{
    AggregatedFunction, CollapsedSamples, attribute_self_time, collapse_samples, round2,
    select_top_functions, summarize_flamegraph, summarize_script_events, us_to_ms,
};
use crate::config::AnalyzerConfig;
use crate::model::{CallTree, CpuProfile};
use crate::parsers::{CpuProfileParseError, parse_cpuprofile, parse_script_events};

/// File label for frames without a script url (builtins, GC, program).
const NATIVE_FILE: &str = "(native)";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("cpuprofile: {0}")]
    Profile(#[from] CpuProfileParseError),
    #[error("source map resolver: {0}")]
    Resolver(#[from] SourceMapError),
}

/// Everything derived from the profile alone, before source mapping.
#[derive(Debug, Clone)]
pub struct ProfileAnalysis {
    pub tree: CallTree,
    pub collapsed: CollapsedSamples,
    /// Total elapsed time of the collapsed stream, in microseconds.
    pub total_time: f64,
    pub total_samples: usize,
    pub sample_interval: f64,
    /// Ranked, heaviest first.
    pub top_functions: Vec<AggregatedFunction>,
}

/// Collapse samples, build the call tree with totals and rank functions.
pub fn analyze_cpu_profile(profile: &CpuProfile, top_n: usize) -> ProfileAnalysis {
    let mut tree = CallTree::build(&profile.nodes);
    let collapsed = collapse_samples(&profile.samples, &profile.time_deltas);
    attribute_self_time(&mut tree, &collapsed);
    tree.compute_total_times();

    let total_time = collapsed.total_time();
    let top_functions = select_top_functions(&tree, total_time, top_n);
    debug!(
        nodes = tree.len(),
        samples = profile.samples.len(),
        visits = collapsed.node_ids.len(),
        total_time_us = total_time,
        ranked = top_functions.len(),
        "aggregated cpu profile"
    );

    ProfileAnalysis {
        tree,
        collapsed,
        total_time,
        total_samples: profile.samples.len(),
        sample_interval: profile.sample_interval,
        top_functions,
    }
}

/// Runs the full pipeline. Owns the source-map resolver, so its caches are
/// shared by every `analyze` call on the same analyzer.
pub struct Analyzer<F = HttpFetcher> {
    config: AnalyzerConfig,
    resolver: Option<SourceMapResolver<F>>,
}

impl Analyzer<HttpFetcher> {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        let resolver = if config.resolve_source_maps {
            Some(SourceMapResolver::new(config.resolver.clone())?)
        } else {
            None
        };
        Ok(Self { config, resolver })
    }
}

impl<F: SourceFetcher> Analyzer<F> {
    pub fn with_fetcher(config: AnalyzerConfig, fetcher: F) -> Self {
        let resolver = config
            .resolve_source_maps
            .then(|| SourceMapResolver::with_fetcher(fetcher, config.resolver.clone()));
        Self { config, resolver }
    }

    pub fn resolver(&self) -> Option<&SourceMapResolver<F>> {
        self.resolver.as_ref()
    }

    /// Analyze a `.cpuprofile` and optional trace into a report.
    ///
    /// Only a malformed profile is an error. Source-map and trace problems
    /// are logged and leave the affected parts unresolved or absent.
    pub async fn analyze(
        &self,
        profile: &[u8],
        trace: Option<&[u8]>,
    ) -> Result<Report, AnalyzeError> {
        let profile = parse_cpuprofile(profile)?;
        let mut analysis = analyze_cpu_profile(&profile, self.config.top_n);

        if let Some(resolver) = &self.resolver {
            resolve_functions(resolver, &mut analysis.top_functions).await;
        }
        analysis.top_functions.truncate(self.config.report_limit);

        let script_performance = trace.and_then(analyze_trace);
        Ok(build_report(&analysis, script_performance))
    }
}

async fn resolve_functions<F: SourceFetcher>(
    resolver: &SourceMapResolver<F>,
    functions: &mut [AggregatedFunction],
) {
    let locators: Vec<Locator> = functions
        .iter()
        .map(|f| Locator {
            url: f.url.clone(),
            line: f.line,
            column: f.column,
            name: (!f.function_name.is_empty()).then(|| f.function_name.clone()),
        })
        .collect();

    let resolved = resolver.resolve_all(&locators).await;
    let mapped = resolved.iter().filter(|r| r.is_resolved).count();
    info!(functions = locators.len(), mapped, "source map resolution finished");

    for (function, location) in functions.iter_mut().zip(resolved) {
        function.resolved = Some(location);
    }
}

fn analyze_trace(data: &[u8]) -> Option<ScriptPerformance> {
    match parse_script_events(data) {
        Ok(events) => {
            debug!(events = events.len(), "parsed script trace events");
            Some(ScriptPerformance {
                script_execution_analysis: summarize_script_events(&events),
            })
        }
        Err(err) => {
            warn!(%err, "skipping trace analysis");
            None
        }
    }
}

pub fn build_report(
    analysis: &ProfileAnalysis,
    script_performance: Option<ScriptPerformance>,
) -> Report {
    Report {
        executive_summary: ExecutiveSummary {
            total_execution_time_ms: round2(us_to_ms(analysis.total_time)),
            total_samples: analysis.total_samples,
            sample_interval_ms: us_to_ms(analysis.sample_interval),
        },
        high_impact_functions: analysis
            .top_functions
            .iter()
            .map(high_impact_function)
            .collect(),
        flamegraph_analysis: summarize_flamegraph(&analysis.top_functions),
        script_performance,
    }
}

fn high_impact_function(f: &AggregatedFunction) -> HighImpactFunction {
    let file = if f.url.is_empty() {
        NATIVE_FILE.to_string()
    } else {
        f.url.clone()
    };
    let resolved: Option<&ResolvedLocation> = f.resolved.as_ref().filter(|r| r.is_resolved);

    HighImpactFunction {
        function: f.name.clone(),
        location: format!("{file}:{}:{}", f.line, f.column),
        file,
        execution_time_ms: round2(f.self_time_ms),
        cpu_percentage: f.percentage.clone(),
        call_count: f.hit_count,
        original_file: resolved.map(|r| r.original_file.clone()),
        original_line: resolved.map(|r| r.original_line),
        original_column: resolved.map(|r| r.original_column),
        original_name: resolved.and_then(|r| r.original_name.clone()),
        is_source_mapped: resolved.is_some(),
        full_original_path: resolved.and_then(|r| r.full_original_path.clone()),
        source_map_url: resolved.and_then(|r| r.source_map_url.clone()),
    }
}
