//! Infrastructure Layer
//!
//! Cross-cutting concerns: caching, resilient outbound HTTP, counters.

pub mod http_fetch;
pub mod stats;
pub mod ttl_cache;

pub use http_fetch::{FetchError, HttpFetcher};
pub use stats::{StatsRegistry, StatsSnapshot};
pub use ttl_cache::TtlCache;
