//! Cached Script Source

use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::fetch::{self, Download};
use super::{CachedScript, ScriptLocation};
use crate::clock::Clock;
use crate::config::ScriptConfig;
use crate::error::PacError;

/// Acquires the PAC script and caches it until it expires.
///
/// Readers always see a whole [`CachedScript`]: content and expiry are
/// swapped in together. Only one acquisition runs at a time; callers that
/// arrive while one is in flight wait for it and reuse its result.
pub struct ScriptSource {
    location: ScriptLocation,
    clock: Arc<dyn Clock>,
    client: Option<Client>,
    fallback_ttl: Option<Duration>,
    state: RwLock<Option<CachedScript>>,
    fetch_lock: Mutex<()>,
    fetches: AtomicU64,
}

impl ScriptSource {
    pub fn new(
        location: ScriptLocation,
        config: &ScriptConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PacError> {
        let client = match &location {
            ScriptLocation::Remote(_) => Some(fetch::build_client(
                config.connect_timeout,
                config.read_timeout,
            )?),
            _ => None,
        };

        Ok(Self {
            location,
            clock,
            client,
            fallback_ttl: config.fallback_ttl,
            state: RwLock::new(None),
            fetch_lock: Mutex::new(()),
            fetches: AtomicU64::new(0),
        })
    }

    /// Source backed by in-memory script text
    pub fn from_text(script: impl Into<Arc<str>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            location: ScriptLocation::inline(script),
            clock,
            client: None,
            fallback_ttl: None,
            state: RwLock::new(None),
            fetch_lock: Mutex::new(()),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn location(&self) -> &ScriptLocation {
        &self.location
    }

    /// Return the script, fetching it first when nothing is cached or the cache expired
    pub async fn load(&self) -> Result<Arc<str>, PacError> {
        if let Some(content) = self.fresh_content().await {
            debug!(location = %self.location, "Using cached PAC script");
            return Ok(content);
        }

        let _guard = self.fetch_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(content) = self.fresh_content().await {
            return Ok(content);
        }

        let now = self.now_utc();
        let fetched = self.acquire(now).await?;
        let content = fetched.content.clone();
        *self.state.write().await = Some(fetched);
        Ok(content)
    }

    /// Cached text without triggering a refresh
    pub async fn cached(&self) -> Option<Arc<str>> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|cached| cached.content.clone())
    }

    /// Full cache entry, including its timestamps
    pub async fn snapshot(&self) -> Option<CachedScript> {
        self.state.read().await.clone()
    }

    /// Drop the cached script so the next load fetches again
    pub async fn invalidate(&self) {
        let _guard = self.fetch_lock.lock().await;
        if self.state.write().await.take().is_some() {
            info!(location = %self.location, "PAC script cache invalidated");
        }
    }

    /// Number of acquisitions attempted so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fresh_content(&self) -> Option<Arc<str>> {
        let now = self.now_utc();
        self.state
            .read()
            .await
            .as_ref()
            .filter(|cached| !cached.is_expired(now))
            .map(|cached| cached.content.clone())
    }

    async fn acquire(&self, now: DateTime<Utc>) -> Result<CachedScript, PacError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let result = match &self.location {
            ScriptLocation::File(path) => {
                fetch::read_file(path).await.map(|content| Download {
                    content,
                    expires_at: None,
                })
            }
            ScriptLocation::Remote(url) => match &self.client {
                Some(client) => fetch::download(client, url, now).await,
                None => Err(PacError::Config("no HTTP client for remote source".to_string())),
            },
            ScriptLocation::Inline(script) => Ok(Download {
                content: script.to_string(),
                expires_at: None,
            }),
        };

        let download = match result {
            Ok(download) => download,
            Err(e) => {
                warn!(location = %self.location, error = %e, "Loading PAC script failed");
                return Err(e);
            }
        };

        let expires_at = download.expires_at.or_else(|| {
            self.fallback_ttl
                .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                .map(|ttl| now + ttl)
        });

        info!(
            location = %self.location,
            bytes = download.content.len(),
            expires_at = ?expires_at,
            "PAC script loaded"
        );

        Ok(CachedScript {
            content: Arc::from(download.content),
            fetched_at: now,
            expires_at,
        })
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }
}
