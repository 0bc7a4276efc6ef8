//! Offline cache for the mini app's static assets.
//!
//! The cache follows a precache-only lifecycle:
//!
//! - **Install** fetches a fixed asset list and stores it under a
//!   version-tagged cache name. Any failed fetch aborts the install and
//!   nothing is written.
//! - **Activate** deletes every cache whose name differs from the current
//!   one and claims existing clients.
//! - **Fetch** answers from the current cache and falls through to the
//!   network on a miss. Network responses are never added to the cache.
//!
//! The version tag is injected through [`CacheConfig`]; redeploying with a
//! new tag is what triggers the purge of the old snapshot.

pub mod error;
pub mod fetcher;
pub mod offline;
pub mod response;
pub mod storage;

pub use error::{CacheError, Result};
pub use fetcher::{AssetFetcher, HttpFetcher};
pub use offline::{
    ActivationReport, CacheConfig, CacheState, CacheStatus, FetchSource, Fetched, OfflineCache,
};
pub use response::CachedResponse;
pub use storage::{CacheStorage, FsCacheStorage, MemoryCacheStorage};
