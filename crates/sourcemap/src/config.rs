use std::time::Duration;

use serde::Deserialize;

/// Tunables for [`SourceMapResolver`](crate::SourceMapResolver).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound for a single resource fetch; slower fetches count as failures.
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    /// Nearby-name search window, used when the exact mapping carries no name.
    pub search_line_radius: u32,
    pub search_column_radius: u32,
}

impl ResolverConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            user_agent: concat!("jsprof/", env!("CARGO_PKG_VERSION")).to_string(),
            search_line_radius: 3,
            search_column_radius: 200,
        }
    }
}
