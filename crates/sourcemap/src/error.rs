use thiserror::Error;

/// Failures inside the resolver. None of these escape
/// [`SourceMapResolver::resolve`](crate::SourceMapResolver::resolve); they
/// are logged and turned into negative cache entries.
#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("fetch failed for {locator}: {reason}")]
    Fetch { locator: String, reason: String },
    #[error("fetch timed out after {timeout_ms}ms for {locator}")]
    Timeout { locator: String, timeout_ms: u64 },
    #[error("unsupported locator scheme: {0}")]
    UnsupportedLocator(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("source map has no `sources` list")]
    MissingSources,
    #[error("source map has no `mappings` string")]
    MissingMappings,
    #[error("invalid mappings on generated line {line}: {reason}")]
    InvalidMapping { line: usize, reason: &'static str },
    #[error("invalid data URI: {0}")]
    InvalidDataUri(&'static str),
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cannot resolve `{reference}` against `{base}`")]
    UnresolvableReference { base: String, reference: String },
}
