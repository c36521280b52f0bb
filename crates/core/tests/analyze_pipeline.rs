//! End-to-end analysis of a captured profile against in-memory scripts and
//! source maps.

use std::collections::HashMap;
use std::sync::Mutex;

use jsprof_core::parsers::CpuProfileParseError;
use jsprof_core::{AnalyzeError, Analyzer, AnalyzerConfig};
use jsprof_protocol::ExecutionPattern;
use jsprof_sourcemap::{FetchedResource, SourceFetcher, SourceMapError};

const PROFILE: &[u8] = include_bytes!("fixtures/shop.cpuprofile");
const TRACE: &[u8] = include_bytes!("fixtures/shop-trace.json");
const APP_JS: &str = include_str!("fixtures/app.min.js");
const APP_MAP: &str = include_str!("fixtures/app.min.js.map");
const APP_URL: &str = "https://shop.test/static/js/app.min.js";
const MAP_URL: &str = "https://shop.test/static/js/app.min.js.map";

#[derive(Default)]
struct MemoryFetcher {
    resources: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn shop() -> Self {
        let mut resources = HashMap::new();
        resources.insert(APP_URL.to_string(), APP_JS.as_bytes().to_vec());
        resources.insert(MAP_URL.to_string(), APP_MAP.as_bytes().to_vec());
        Self {
            resources,
            calls: Mutex::default(),
        }
    }
}

impl SourceFetcher for MemoryFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedResource, SourceMapError> {
        self.calls.lock().unwrap().push(locator.to_string());
        match self.resources.get(locator) {
            Some(bytes) => Ok(FetchedResource {
                bytes: bytes.clone(),
                source_map_header: None,
            }),
            None => Err(SourceMapError::Fetch {
                locator: locator.to_string(),
                reason: "404".to_string(),
            }),
        }
    }
}

#[tokio::test]
async fn analyzes_profile_with_source_maps() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, None).await.unwrap();

    assert_eq!(report.executive_summary.total_execution_time_ms, 12.0);
    assert_eq!(report.executive_summary.total_samples, 13);
    assert_eq!(report.executive_summary.sample_interval_ms, 1.0);

    let names: Vec<&str> = report
        .high_impact_functions
        .iter()
        .map(|f| f.function.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "a",
            "(anonymous util.js:5)",
            "r",
            "(garbage collector)",
            "(program)",
        ]
    );

    let add = &report.high_impact_functions[0];
    assert_eq!(add.execution_time_ms, 4.0);
    assert_eq!(add.cpu_percentage, "33.33");
    assert_eq!(add.call_count, 3);
    assert_eq!(add.location, format!("{APP_URL}:1:1"));
    assert!(add.is_source_mapped);
    assert_eq!(add.original_file.as_deref(), Some("src/math.ts"));
    assert_eq!(add.original_name.as_deref(), Some("add"));
    assert_eq!(add.source_map_url.as_deref(), Some(MAP_URL));

    let util = &report.high_impact_functions[1];
    assert_eq!(util.cpu_percentage, "16.67");
    assert!(!util.is_source_mapped);
    assert_eq!(util.original_file, None);

    let gc = &report.high_impact_functions[3];
    assert_eq!(gc.file, "(native)");

    // Both app.min.js frames share one script and one map fetch.
    let calls = analyzer.resolver().unwrap().fetcher().calls.lock().unwrap().clone();
    assert_eq!(calls, vec![APP_URL.to_string(), MAP_URL.to_string()]);
    assert!(report.script_performance.is_none());
}

#[tokio::test]
async fn flamegraph_uses_original_names() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, None).await.unwrap();
    let flame = &report.flamegraph_analysis;

    let critical: Vec<&str> = flame
        .call_stack
        .critical_path
        .iter()
        .map(|e| e.function.as_str())
        .collect();
    assert_eq!(
        critical,
        vec![
            "add",
            "(anonymous util.js:5)",
            "render",
            "(garbage collector)",
            "(program)",
        ]
    );
    assert_eq!(flame.call_stack.critical_path[0].file, "src/math.ts");
    assert_eq!(flame.call_stack.critical_path_time_ms, 9.0);
    assert_eq!(flame.hot_paths.len(), 3);
    assert_eq!(flame.function_hierarchy.root_functions, vec!["render"]);
    assert!(flame.function_hierarchy.leaf_functions.contains(&"add".to_string()));
    assert_eq!(flame.visual_summary.execution_pattern, ExecutionPattern::Distributed);
    assert_eq!(flame.visual_summary.top_consumers[0].weight, 33);
}

#[tokio::test]
async fn report_limit_truncates_functions() {
    let config = AnalyzerConfig {
        report_limit: 2,
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::with_fetcher(config, MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, None).await.unwrap();

    assert_eq!(report.high_impact_functions.len(), 2);
    assert_eq!(report.flamegraph_analysis.call_stack.critical_path.len(), 2);
    assert_eq!(report.flamegraph_analysis.visual_summary.top_consumers.len(), 2);
}

#[tokio::test]
async fn disabled_source_maps_skip_fetching() {
    let config = AnalyzerConfig {
        resolve_source_maps: false,
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::with_fetcher(config, MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, None).await.unwrap();

    assert!(analyzer.resolver().is_none());
    assert!(report.high_impact_functions.iter().all(|f| !f.is_source_mapped));
    assert_eq!(report.flamegraph_analysis.call_stack.critical_path[0].function, "a");
}

#[tokio::test]
async fn unreachable_scripts_stay_unresolved() {
    let analyzer =
        Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::default());
    let report = analyzer.analyze(PROFILE, None).await.unwrap();

    assert_eq!(report.high_impact_functions.len(), 5);
    assert!(report.high_impact_functions.iter().all(|f| !f.is_source_mapped));
}

#[tokio::test]
async fn includes_script_performance_from_trace() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, Some(TRACE)).await.unwrap();

    let scripts = report.script_performance.unwrap().script_execution_analysis;
    assert_eq!(scripts.total_events, 3);
    assert_eq!(scripts.total_evaluate_ms, 8.0);
    assert_eq!(scripts.total_compile_ms, 1.2);
    assert_eq!(scripts.total_function_call_ms, 3.5);

    let app = &scripts.scripts[0];
    assert_eq!(app.url, APP_URL);
    assert_eq!(app.total_ms, 9.2);
    assert_eq!(app.event_count, 2);
    assert_eq!(app.first_start_ms, 4990.0);
    assert_eq!(scripts.scripts[1].url, "https://shop.test/src/util.js");
}

#[tokio::test]
async fn invalid_trace_is_skipped() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, Some(b"not a trace")).await.unwrap();

    assert!(report.script_performance.is_none());
    assert_eq!(report.high_impact_functions.len(), 5);
}

#[tokio::test]
async fn malformed_profile_is_an_error() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());

    let err = analyzer.analyze(br#"{"samples": []}"#, None).await.unwrap_err();
    assert!(matches!(
        err,
        AnalyzeError::Profile(CpuProfileParseError::MalformedProfile(_))
    ));

    let err = analyzer.analyze(b"{", None).await.unwrap_err();
    assert!(matches!(err, AnalyzeError::Profile(CpuProfileParseError::Json(_))));
}

#[tokio::test]
async fn report_serializes_with_wire_names() {
    let analyzer = Analyzer::with_fetcher(AnalyzerConfig::default(), MemoryFetcher::shop());
    let report = analyzer.analyze(PROFILE, Some(TRACE)).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["executive_summary"]["total_execution_time_ms"].is_number());
    let first = &json["high_impact_functions"][0];
    assert_eq!(first["isSourceMapped"], true);
    assert_eq!(first["originalFile"], "src/math.ts");
    assert_eq!(
        json["flamegraph_analysis"]["visualSummary"]["executionPattern"],
        "distributed"
    );
    assert!(json["script_performance"]["script_execution_analysis"]["scripts"].is_array());
}
