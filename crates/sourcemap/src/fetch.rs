use std::future::Future;
use std::path::PathBuf;

use reqwest::Url;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::SourceMapError;

/// Bytes of a fetched resource plus the transport-level map hint, if any.
#[derive(Debug, Clone, Default)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    /// Value of a `SourceMap` / `X-SourceMap` response header.
    pub source_map_header: Option<String>,
}

/// Fetch raw bytes for a locator. The seam between the resolver and the
/// network/filesystem; tests substitute in-memory implementations.
pub trait SourceFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        locator: &str,
    ) -> impl Future<Output = Result<FetchedResource, SourceMapError>> + Send;
}

/// Default fetcher: `http(s)` through reqwest, `file://` and bare paths
/// through the filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ResolverConfig) -> Result<Self, SourceMapError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.fetch_timeout())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, locator: &str) -> Result<FetchedResource, SourceMapError> {
        let response = self.client.get(locator).send().await?.error_for_status()?;
        let source_map_header = ["SourceMap", "X-SourceMap"].iter().find_map(|name| {
            response
                .headers()
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });
        let bytes = response.bytes().await?.to_vec();
        debug!(locator, bytes = bytes.len(), "fetched over http");
        Ok(FetchedResource {
            bytes,
            source_map_header,
        })
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedResource, SourceMapError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return self.fetch_http(locator).await;
        }
        let path = file_path(locator)?;
        let bytes = tokio::fs::read(&path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "read from disk");
        Ok(FetchedResource {
            bytes,
            source_map_header: None,
        })
    }
}

fn file_path(locator: &str) -> Result<PathBuf, SourceMapError> {
    if locator.starts_with("file://") {
        return Url::parse(locator)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| SourceMapError::UnsupportedLocator(locator.to_string()));
    }
    if locator.contains("://") {
        return Err(SourceMapError::UnsupportedLocator(locator.to_string()));
    }
    Ok(PathBuf::from(locator))
}
