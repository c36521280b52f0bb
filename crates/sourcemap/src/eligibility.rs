//! Which locators are worth a source-map lookup.

/// Locators that already point at readable source. Checked first so
/// `/src/app.bundle.js` style dev-server paths never trigger a fetch.
const ORIGINAL_SOURCE_MARKERS: &[&str] = &[
    "/src/",
    "/source/",
    "webpack://",
    "webpack-internal://",
    "vite:",
    "/@fs/",
    "/@vite/",
    "rollup://",
    "turbopack://",
];

const BUNDLE_DIRS: &[&str] = &[
    "/dist/",
    "/build/",
    "/_next/static/",
    "/static/js/",
    "/assets/",
    "/bundles/",
];

const BUNDLE_FILE_MARKERS: &[&str] = &[".min.", "bundle.", ".chunk.", ".prod.", "vendor"];

const JS_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs"];

const MIN_HASH_LEN: usize = 8;

/// Whether `url` looks like minified or bundled JavaScript.
pub fn is_minified_candidate(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let lower = url.to_ascii_lowercase();
    if ORIGINAL_SOURCE_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }

    let path = strip_query(&lower);
    if !JS_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    BUNDLE_FILE_MARKERS.iter().any(|m| file_name.contains(m))
        || has_hash_segment(file_name)
        || BUNDLE_DIRS.iter().any(|d| path.contains(d))
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Content-hash segments like `main.3f9a1c2b.js` or `chunk-9e8d7c6b5a.js`.
fn has_hash_segment(file_name: &str) -> bool {
    file_name
        .split(['.', '-', '_'])
        .any(|part| part.len() >= MIN_HASH_LEN && part.bytes().all(|b| b.is_ascii_hexdigit()))
}
