use jsprof_sourcemap::ResolverConfig;
use serde::Deserialize;

/// Settings for one [`Analyzer`](crate::Analyzer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Functions ranked (and source-mapped) internally.
    pub top_n: usize,
    /// Functions kept in the report and its summaries.
    pub report_limit: usize,
    pub resolve_source_maps: bool,
    pub resolver: ResolverConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            report_limit: 10,
            resolve_source_maps: true,
            resolver: ResolverConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_resolver_section_is_optional() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"report_limit": 5, "resolver": {"fetch_timeout_ms": 500}}"#)
                .unwrap();
        assert_eq!(config.top_n, 20);
        assert_eq!(config.report_limit, 5);
        assert_eq!(config.resolver.fetch_timeout_ms, 500);
        assert_eq!(config.resolver.search_line_radius, 3);
    }
}
