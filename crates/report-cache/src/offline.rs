//! Install / activate / fetch lifecycle of the versioned cache.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CacheError, Result};
use crate::fetcher::AssetFetcher;
use crate::response::CachedResponse;
use crate::storage::CacheStorage;

/// Assets precached by default: the scope root and the main document.
pub const DEFAULT_ASSETS: &[&str] = &["./", "index.html"];

/// Configuration for an [`OfflineCache`].
///
/// The version is a deployment-time value; changing it is what retires the
/// previous snapshot on activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Name prefix shared by every version of this app's cache.
    pub prefix: String,
    /// Version token embedded in the cache name.
    pub version: String,
    /// URL the app is served from; assets resolve relative to it.
    pub scope: Url,
    /// Asset paths, relative to `scope`.
    pub assets: Vec<String>,
}

impl CacheConfig {
    /// Creates a config with the default asset list.
    ///
    /// A scope without a trailing slash is treated as a directory, so
    /// `https://host/app` and `https://host/app/` are equivalent.
    pub fn new(prefix: impl Into<String>, version: impl Into<String>, scope: &str) -> Result<Self> {
        let mut scope = Url::parse(scope).map_err(|source| CacheError::InvalidUrl {
            url: scope.to_string(),
            source,
        })?;
        if !scope.path().ends_with('/') {
            let path = format!("{}/", scope.path());
            scope.set_path(&path);
        }
        Ok(Self {
            prefix: prefix.into(),
            version: version.into(),
            scope,
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replaces the asset list.
    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    /// Name of the cache for this version.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.prefix, self.version)
    }

    /// Returns true if `name` is a cache of this app, of any version.
    pub fn owns(&self, name: &str) -> bool {
        self.version_of(name).is_some()
    }

    /// Version tag of one of this app's cache names.
    pub fn version_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
    }

    /// Resolves a (possibly relative) URL against the scope.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.scope.join(url).map_err(|source| CacheError::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    /// Absolute URLs of every precached asset.
    pub fn precache_urls(&self) -> Result<Vec<Url>> {
        self.assets.iter().map(|asset| self.resolve(asset)).collect()
    }
}

/// Lifecycle state of an [`OfflineCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing attempted yet.
    Idle,
    /// Precaching the asset list.
    Installing,
    /// Snapshot stored, waiting for activation.
    Installed,
    /// Purging stale snapshots.
    Activating,
    /// Serving fetches from the current snapshot.
    Active,
    /// Last install failed; the previous snapshot (if any) stays in service.
    Failed,
}

/// Where a fetch was answered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    /// The named cache snapshot.
    Cache(String),
    /// The network (response not stored).
    Network,
}

/// A fetch result and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub response: CachedResponse,
    pub source: FetchSource,
}

/// What an activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale cache names that were deleted.
    pub deleted: Vec<String>,
}

/// Snapshot of the cache's state for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: CacheState,
    pub cache_name: String,
    pub stored: Vec<String>,
    pub claimed: bool,
}

#[derive(Debug)]
struct Lifecycle {
    state: CacheState,
    claimed: bool,
}

/// Versioned precache for the mini app.
pub struct OfflineCache {
    config: CacheConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn AssetFetcher>,
    lifecycle: Mutex<Lifecycle>,
}

impl OfflineCache {
    pub fn new(
        config: CacheConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            fetcher,
            lifecycle: Mutex::new(Lifecycle {
                state: CacheState::Idle,
                claimed: false,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn set_state(&self, state: CacheState) -> Result<()> {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))?;
        debug!(from = ?lifecycle.state, to = ?state, "cache state change");
        lifecycle.state = state;
        if state == CacheState::Active {
            lifecycle.claimed = true;
        }
        Ok(())
    }

    fn lifecycle(&self) -> Result<(CacheState, bool)> {
        let lifecycle = self
            .lifecycle
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))?;
        Ok((lifecycle.state, lifecycle.claimed))
    }

    pub fn state(&self) -> Result<CacheState> {
        Ok(self.lifecycle()?.0)
    }

    /// Precaches every configured asset under the versioned cache name.
    ///
    /// All assets are fetched before anything is written. If any fetch
    /// fails or returns a non-2xx status the install is aborted with
    /// [`CacheError::InstallFailure`], storage is left untouched, and the
    /// state becomes [`CacheState::Failed`].
    pub async fn install(&self) -> Result<()> {
        let name = self.config.cache_name();
        self.set_state(CacheState::Installing)?;
        info!(cache = %name, "installing offline cache");

        match self.precache(&name).await {
            Ok(entries) => {
                let count = entries.len();
                if let Err(e) = self.storage.put_all(&name, entries) {
                    self.set_state(CacheState::Failed)?;
                    return Err(e);
                }
                self.set_state(CacheState::Installed)?;
                info!(cache = %name, assets = count, "offline cache installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(CacheState::Failed)?;
                warn!(cache = %name, error = %e, "offline cache install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self, name: &str) -> Result<Vec<CachedResponse>> {
        let urls = self.config.precache_urls()?;
        let fetches = urls.iter().map(|url| self.fetcher.fetch(url));
        let results = join_all(fetches).await;

        let mut entries = Vec::with_capacity(results.len());
        for (url, result) in urls.iter().zip(results) {
            let response = result.map_err(|e| CacheError::InstallFailure {
                cache: name.to_string(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(CacheError::InstallFailure {
                    cache: name.to_string(),
                    url: url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            entries.push(CachedResponse {
                url: url.to_string(),
                ..response
            });
        }
        Ok(entries)
    }

    /// Deletes every stored cache of this app other than the current one,
    /// then claims existing clients. Caches under other prefixes are left
    /// alone.
    ///
    /// # Errors
    /// Returns [`CacheError::NotInstalled`] if the current version has no
    /// stored snapshot.
    pub async fn activate(&self) -> Result<ActivationReport> {
        let name = self.config.cache_name();
        if !self.storage.has(&name)? {
            return Err(CacheError::NotInstalled(name));
        }

        self.set_state(CacheState::Activating)?;
        let mut report = ActivationReport::default();
        for stale in self.storage.keys()? {
            if stale == name || !self.config.owns(&stale) {
                continue;
            }
            if self.storage.delete(&stale)? {
                info!(cache = %stale, "deleted stale offline cache");
                report.deleted.push(stale);
            }
        }

        self.set_state(CacheState::Active)?;
        info!(cache = %name, "offline cache active");
        Ok(report)
    }

    /// Installs the current version if it is not stored yet, then activates.
    pub async fn ensure_active(&self) -> Result<ActivationReport> {
        if !self.storage.has(&self.config.cache_name())? {
            self.install().await?;
        }
        self.activate().await
    }

    /// Name of the cache answering fetches right now.
    ///
    /// Once activated that is the current version. Before that, a snapshot
    /// left by a previous deployment keeps serving.
    fn serving_cache(&self) -> Result<Option<String>> {
        let current = self.config.cache_name();
        if self.state()? == CacheState::Active {
            return Ok(Some(current));
        }
        let stored = self.storage.keys()?;
        if stored.contains(&current) && self.state()? != CacheState::Failed {
            // Installed by an earlier run of this same version
            return Ok(Some(current));
        }
        Ok(stored
            .into_iter()
            .filter(|name| *name != current)
            .filter_map(|name| {
                let version = self.config.version_of(&name)?.to_string();
                Some((version, name))
            })
            .max_by(|(a, _), (b, _)| compare_versions(a, b))
            .map(|(_, name)| name))
    }

    /// Answers a request from the cache, falling through to the network on
    /// a miss. Network responses are never stored.
    pub async fn fetch(&self, url: &str) -> Result<Fetched> {
        let url = self.config.resolve(url)?;

        if let Some(name) = self.serving_cache()? {
            if let Some(response) = self.storage.lookup(&name, url.as_str())? {
                debug!(url = %url, cache = %name, "served from cache");
                return Ok(Fetched {
                    response,
                    source: FetchSource::Cache(name),
                });
            }
        }

        debug!(url = %url, "cache miss, fetching from network");
        let response = self.fetcher.fetch(&url).await?;
        Ok(Fetched {
            response,
            source: FetchSource::Network,
        })
    }

    pub fn status(&self) -> Result<CacheStatus> {
        let (state, claimed) = self.lifecycle()?;
        Ok(CacheStatus {
            state,
            cache_name: self.config.cache_name(),
            stored: self.storage.keys()?,
            claimed,
        })
    }
}

/// Orders version tags, comparing digit runs by value (`v9` < `v10`).
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = digit_run(&mut a);
                let run_b = digit_run(&mut b);
                let (na, nb) = (run_a.trim_start_matches('0'), run_b.trim_start_matches('0'));
                let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn digit_run(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}
