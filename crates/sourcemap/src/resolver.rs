use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use jsprof_protocol::ResolvedLocation;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::discovery::{
    data_uri_label, decode_data_uri, find_source_mapping_url, is_data_uri, resolve_reference,
};
use crate::eligibility::is_minified_candidate;
use crate::error::SourceMapError;
use crate::fetch::{FetchedResource, HttpFetcher, SourceFetcher};
use crate::mapping::SourceMap;
use crate::paths;

/// A minified call site to resolve. `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub url: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

/// A parsed map together with the locator it was loaded from.
#[derive(Debug)]
struct LoadedMap {
    map: SourceMap,
    map_url: String,
}

/// `None` is a cached negative result.
type SharedResource = Shared<BoxFuture<'static, Option<Arc<FetchedResource>>>>;
type SharedMap = Shared<BoxFuture<'static, Option<Arc<LoadedMap>>>>;

/// Resolves minified locations to original source positions.
///
/// Owns two caches keyed by locator: fetched bytes and parsed maps. Both hold
/// shared in-flight futures, so concurrent requests for one locator attach to
/// a single fetch and every later request is a cache hit. Entries are written
/// once and live as long as the resolver.
pub struct SourceMapResolver<F = HttpFetcher> {
    inner: Arc<Inner<F>>,
}

struct Inner<F> {
    fetcher: F,
    config: ResolverConfig,
    resources: Mutex<HashMap<String, SharedResource>>,
    maps: Mutex<HashMap<String, SharedMap>>,
}

impl SourceMapResolver<HttpFetcher> {
    pub fn new(config: ResolverConfig) -> Result<Self, SourceMapError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: SourceFetcher> SourceMapResolver<F> {
    pub fn with_fetcher(fetcher: F, config: ResolverConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                config,
                resources: Mutex::new(HashMap::new()),
                maps: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.inner.fetcher
    }

    /// Resolve one location. Never fails: anything that goes wrong yields
    /// [`ResolvedLocation::unresolved`].
    pub async fn resolve(
        &self,
        url: &str,
        line: u32,
        column: u32,
        hinted_name: Option<&str>,
    ) -> ResolvedLocation {
        if line == 0 || column == 0 || !is_minified_candidate(url) {
            debug!(url, line, column, "not a minified location, skipping source map lookup");
            return ResolvedLocation::unresolved(url, line, column, hinted_name);
        }

        let Some(loaded) = self.inner.map_for(url).await else {
            return ResolvedLocation::unresolved(url, line, column, hinted_name);
        };
        self.inner
            .lookup(&loaded, url, line, column, hinted_name)
            .unwrap_or_else(|| ResolvedLocation::unresolved(url, line, column, hinted_name))
    }

    /// Resolve many locations concurrently; output order matches input order.
    pub async fn resolve_all(&self, locators: &[Locator]) -> Vec<ResolvedLocation> {
        join_all(
            locators
                .iter()
                .map(|l| self.resolve(&l.url, l.line, l.column, l.name.as_deref())),
        )
        .await
    }

    /// Number of resources with a parsed map (negative entries excluded).
    pub fn cached_map_count(&self) -> usize {
        lock(&self.inner.maps)
            .values()
            .filter(|f| matches!(f.peek(), Some(Some(_))))
            .count()
    }
}

impl<F: SourceFetcher> Inner<F> {
    fn resource(self: &Arc<Self>, locator: &str) -> SharedResource {
        let mut resources = lock(&self.resources);
        if let Some(pending) = resources.get(locator) {
            debug!(locator, "resource cache hit");
            return pending.clone();
        }

        let weak = Arc::downgrade(self);
        let key = locator.to_string();
        let fut = async move {
            let inner = weak.upgrade()?;
            inner.fetch_uncached(&key).await.map(Arc::new)
        }
        .boxed()
        .shared();
        resources.insert(locator.to_string(), fut.clone());
        fut
    }

    async fn fetch_uncached(&self, locator: &str) -> Option<FetchedResource> {
        let timeout = self.config.fetch_timeout();
        let result = match tokio::time::timeout(timeout, self.fetcher.fetch(locator)).await {
            Ok(result) => result,
            Err(_) => Err(SourceMapError::Timeout {
                locator: locator.to_string(),
                timeout_ms: self.config.fetch_timeout_ms,
            }),
        };
        result
            .inspect_err(|err| warn!(locator, %err, "source fetch failed"))
            .ok()
    }

    fn map_for(self: &Arc<Self>, url: &str) -> SharedMap {
        let mut maps = lock(&self.maps);
        if let Some(pending) = maps.get(url) {
            debug!(url, "source map cache hit");
            return pending.clone();
        }

        let weak = Arc::downgrade(self);
        let key = url.to_string();
        let fut = async move {
            let inner = weak.upgrade()?;
            match inner.load_map(&key).await {
                Ok(Some(loaded)) => Some(Arc::new(loaded)),
                Ok(None) => {
                    debug!(url = %key, "no source map reference");
                    None
                }
                Err(err) => {
                    warn!(url = %key, %err, "source map unavailable");
                    None
                }
            }
        }
        .boxed()
        .shared();
        maps.insert(url.to_string(), fut.clone());
        fut
    }

    /// Discover, fetch and parse the map for `url`. `Ok(None)` means the
    /// resource carries no map reference at all.
    async fn load_map(self: &Arc<Self>, url: &str) -> Result<Option<LoadedMap>, SourceMapError> {
        let resource = self
            .resource(url)
            .await
            .ok_or_else(|| fetch_failed(url))?;

        let reference = match &resource.source_map_header {
            Some(header) => header.clone(),
            None => {
                let content = String::from_utf8_lossy(&resource.bytes);
                match find_source_mapping_url(&content) {
                    Some(found) => found.to_string(),
                    None => return Ok(None),
                }
            }
        };

        let (bytes, map_url) = if is_data_uri(&reference) {
            (
                decode_data_uri(&reference)?,
                data_uri_label(&reference).to_string(),
            )
        } else {
            let map_url = resolve_reference(url, &reference)?;
            let fetched = self
                .resource(&map_url)
                .await
                .ok_or_else(|| fetch_failed(&map_url))?;
            (fetched.bytes.clone(), map_url)
        };

        let map = SourceMap::from_slice(&bytes)?;
        debug!(url, %map_url, sources = map.sources().len(), "loaded source map");
        Ok(Some(LoadedMap { map, map_url }))
    }

    fn lookup(
        &self,
        loaded: &LoadedMap,
        url: &str,
        line: u32,
        column: u32,
        hinted_name: Option<&str>,
    ) -> Option<ResolvedLocation> {
        let map = &loaded.map;
        let (gen_line, gen_column) = (line.saturating_sub(1), column.saturating_sub(1));
        let segment = map.original_position_for(gen_line, gen_column)?;
        let source = map.source(segment)?;

        let name = map.name(segment).or_else(|| {
            map.nearest_named(
                segment.source?,
                gen_line,
                gen_column,
                self.config.search_line_radius,
                self.config.search_column_radius,
            )
            .and_then(|nearby| map.name(nearby))
        });

        Some(ResolvedLocation {
            original_file: paths::shorten(source),
            original_line: segment.original_line + 1,
            original_column: segment.original_column + 1,
            original_name: name.or(hinted_name).map(String::from),
            is_resolved: true,
            minified_url: url.to_string(),
            minified_line: line,
            minified_column: column,
            full_original_path: Some(source.to_string()),
            source_map_url: Some(loaded.map_url.clone()),
        })
    }
}

fn fetch_failed(locator: &str) -> SourceMapError {
    SourceMapError::Fetch {
        locator: locator.to_string(),
        reason: "resource unavailable".to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct StaticFetcher {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl SourceFetcher for StaticFetcher {
        async fn fetch(&self, _locator: &str) -> Result<FetchedResource, SourceMapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedResource {
                bytes: self.body.as_bytes().to_vec(),
                source_map_header: None,
            })
        }
    }

    #[tokio::test]
    async fn resource_without_map_reference_is_cached_negative() {
        let resolver = SourceMapResolver::with_fetcher(
            StaticFetcher {
                body: "var a=1;",
                calls: AtomicUsize::new(0),
            },
            ResolverConfig::default(),
        );
        let first = resolver.resolve("https://cdn.test/app.min.js", 1, 5, Some("a")).await;
        let second = resolver.resolve("https://cdn.test/app.min.js", 1, 9, None).await;

        assert!(!first.is_resolved);
        assert_eq!(first.original_name.as_deref(), Some("a"));
        assert!(!second.is_resolved);
        assert_eq!(resolver.fetcher().calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached_map_count(), 0);
    }

    #[tokio::test]
    async fn skips_fetch_for_original_sources() {
        let resolver = SourceMapResolver::with_fetcher(
            StaticFetcher {
                body: "",
                calls: AtomicUsize::new(0),
            },
            ResolverConfig::default(),
        );
        let loc = resolver.resolve("https://app.test/src/main.js", 3, 1, None).await;
        assert!(!loc.is_resolved);
        assert_eq!(loc.original_file, "https://app.test/src/main.js");

        let unknown = resolver.resolve("https://cdn.test/app.min.js", 0, 0, None).await;
        assert!(!unknown.is_resolved);
        assert_eq!(resolver.fetcher().calls.load(Ordering::SeqCst), 0);
    }
}
