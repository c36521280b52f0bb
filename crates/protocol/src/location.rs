use serde::{Deserialize, Serialize};

/// Best-effort original position of a minified call site.
///
/// When `is_resolved` is false the `original_*` fields echo the minified
/// location so presentation layers always have something to show; they must
/// branch on `is_resolved` before labelling the values as source positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    /// Display path (shortened, see `full_original_path` for the real one).
    pub original_file: String,
    /// 1-based.
    pub original_line: u32,
    /// 1-based.
    pub original_column: u32,
    pub original_name: Option<String>,
    pub is_resolved: bool,
    /// Locator of the minified resource this was resolved from.
    pub minified_url: String,
    pub minified_line: u32,
    pub minified_column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_original_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,
}

impl ResolvedLocation {
    /// The fallback result: the minified position reported as-is.
    pub fn unresolved(url: &str, line: u32, column: u32, hinted_name: Option<&str>) -> Self {
        Self {
            original_file: url.to_string(),
            original_line: line,
            original_column: column,
            original_name: hinted_name.map(String::from),
            is_resolved: false,
            minified_url: url.to_string(),
            minified_line: line,
            minified_column: column,
            full_original_path: None,
            source_map_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_echoes_minified_position() {
        let loc = ResolvedLocation::unresolved("https://cdn.test/app.min.js", 1, 42, Some("a"));
        assert!(!loc.is_resolved);
        assert_eq!(loc.original_file, loc.minified_url);
        assert_eq!(loc.original_column, 42);
        assert_eq!(loc.original_name.as_deref(), Some("a"));
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_paths() {
        let loc = ResolvedLocation::unresolved("app.js", 3, 7, None);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["isResolved"], false);
        assert_eq!(json["originalLine"], 3);
        assert!(json.get("fullOriginalPath").is_none());
        assert!(json.get("sourceMapUrl").is_none());
    }
}
