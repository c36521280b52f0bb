//! Maps minified/bundled JavaScript call sites back to their original source.
//!
//! Resolution is best-effort: every failure degrades to an unresolved
//! [`ResolvedLocation`] instead of an error.

pub mod config;
pub mod discovery;
pub mod eligibility;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod paths;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::SourceMapError;
pub use fetch::{FetchedResource, HttpFetcher, SourceFetcher};
pub use jsprof_protocol::ResolvedLocation;
pub use mapping::SourceMap;
pub use resolver::{Locator, SourceMapResolver};
