//! Display shortening for original source paths.

const VIRTUAL_PREFIXES: &[&str] = &[
    "webpack-internal:///",
    "webpack:///",
    "webpack://",
    "turbopack://[project]/",
    "turbopack://",
    "rollup://",
    "vite:",
    "/@fs/",
    "file://",
];

const NODE_MODULES: &str = "node_modules/";
const MAX_DISPLAY_LEN: usize = 60;
const MAX_DISPLAY_SEGMENTS: usize = 4;

/// Strip bundler virtual-module prefixes, namespaces and query strings.
///
/// `webpack://my-app/./src/a.ts` → `src/a.ts`
pub fn strip_virtual_prefix(path: &str) -> &str {
    let mut p = path;
    for prefix in VIRTUAL_PREFIXES {
        if let Some(rest) = p.strip_prefix(prefix) {
            p = rest;
            if *prefix == "webpack://"
                && let Some((_namespace, rest)) = p.split_once("/./")
            {
                p = rest;
            }
            break;
        }
    }
    let p = p.split(['?', '#']).next().unwrap_or(p);
    p.trim_start_matches("./").trim_start_matches('/')
}

/// Shorten an original source path for display.
///
/// Dependency files collapse to `<package>/.../<last 2 segments>`; other
/// long paths become `<first>/.../<last 3 segments>`.
pub fn shorten(path: &str) -> String {
    let p = strip_virtual_prefix(path);

    if let Some(idx) = p.rfind(NODE_MODULES) {
        let segments: Vec<&str> = p[idx + NODE_MODULES.len()..]
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let pkg_len = if segments.first().is_some_and(|s| s.starts_with('@')) {
            2
        } else {
            1
        };
        if segments.len() > pkg_len {
            let package = segments[..pkg_len].join("/");
            let inner = &segments[pkg_len..];
            return if inner.len() > 2 {
                format!("{package}/.../{}", inner[inner.len() - 2..].join("/"))
            } else {
                format!("{package}/{}", inner.join("/"))
            };
        }
    }

    let segments: Vec<&str> = p.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > MAX_DISPLAY_SEGMENTS && p.len() > MAX_DISPLAY_LEN {
        return format!(
            "{}/.../{}",
            segments[0],
            segments[segments.len() - 3..].join("/")
        );
    }
    p.to_string()
}
