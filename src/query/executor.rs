use crate::error::{AnalyticsError, CacheError};
use crate::query::cache::CacheStore;
use crate::query::key::derive_cache_key;
use crate::query::options::{Metrics, QueryOptions};
use crate::query::response::ReportResponse;
use crate::transport::ReportingTransport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What to do when the cache store itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFailurePolicy {
    /// Fail the call. Silently bypassing the cache would burn API quota.
    #[default]
    Fail,
    /// Fetch directly from the transport and log the degraded state.
    Degrade,
}

impl std::str::FromStr for CacheFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "degrade" => Ok(Self::Degrade),
            other => Err(format!("unknown cache failure policy: {other}")),
        }
    }
}

/// Counters describing how queries were served since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub degraded_fetches: u64,
}

/// Caching wrapper around the remote reporting transport.
///
/// Holds no per-call state; one executor can serve any number of facades
/// concurrently.
pub struct CachedQueryExecutor {
    transport: Arc<dyn ReportingTransport>,
    cache: Arc<dyn CacheStore>,
    cache_lifetime_minutes: u64,
    failure_policy: CacheFailurePolicy,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    degraded_fetches: AtomicU64,
}

impl CachedQueryExecutor {
    /// Create an executor with caching disabled (lifetime 0).
    pub fn new(transport: Arc<dyn ReportingTransport>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            transport,
            cache,
            cache_lifetime_minutes: 0,
            failure_policy: CacheFailurePolicy::default(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            degraded_fetches: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_cache_lifetime_minutes(mut self, minutes: u64) -> Self {
        self.cache_lifetime_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the cache lifetime. A lifetime of 0 disables caching.
    pub fn set_cache_lifetime_minutes(&mut self, minutes: u64) -> &mut Self {
        self.cache_lifetime_minutes = minutes;
        self
    }

    pub const fn cache_lifetime_minutes(&self) -> u64 {
        self.cache_lifetime_minutes
    }

    pub const fn failure_policy(&self) -> CacheFailurePolicy {
        self.failure_policy
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            degraded_fetches: self.degraded_fetches.load(Ordering::Relaxed),
        }
    }

    /// Run a query, serving it from cache when a live entry exists.
    ///
    /// With a zero lifetime any existing entry is evicted first and the
    /// transport is always called; nothing is stored.
    pub fn perform_query(
        &self,
        view_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, AnalyticsError> {
        let key = derive_cache_key(view_id, start_date, end_date, metrics, options);

        if self.cache_lifetime_minutes == 0 {
            if let Err(e) = self.cache.forget(&key) {
                self.handle_cache_failure(&key, e)?;
            }
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
            return self.fetch(view_id, start_date, end_date, metrics, options);
        }

        let ttl = Duration::from_secs(self.cache_lifetime_minutes.saturating_mul(60));
        let mut fetched: Option<ReportResponse> = None;
        let outcome = self.cache.remember(&key, ttl, &mut || {
            let response = self.fetch(view_id, start_date, end_date, metrics, options)?;
            let encoded = serde_json::to_string(&response).map_err(|e| {
                AnalyticsError::CacheBackend(CacheError(format!(
                    "failed to encode report response: {e}"
                )))
            })?;
            fetched = Some(response);
            Ok(encoded)
        });

        match outcome {
            Ok(encoded) => {
                if let Some(response) = fetched {
                    self.cache_misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Cache miss, fetched from transport");
                    return Ok(response);
                }
                if let Ok(response) = serde_json::from_str(&encoded) {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Cache hit");
                    return Ok(response);
                }
                tracing::warn!(key = %key, "Discarding undecodable cache entry");
                self.refresh(&key, ttl, view_id, start_date, end_date, metrics, options)
            }
            Err(AnalyticsError::CacheBackend(e)) => {
                self.handle_cache_failure(&key, e)?;
                match fetched {
                    Some(response) => Ok(response),
                    None => self.fetch(view_id, start_date, end_date, metrics, options),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Replace a corrupt entry with a fresh fetch.
    #[allow(clippy::too_many_arguments)]
    fn refresh(
        &self,
        key: &str,
        ttl: Duration,
        view_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, AnalyticsError> {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let response = self.fetch(view_id, start_date, end_date, metrics, options)?;
        let stored = serde_json::to_string(&response)
            .map_err(|e| CacheError(format!("failed to encode report response: {e}")))
            .and_then(|encoded| self.cache.set(key, encoded, ttl));
        if let Err(e) = stored {
            self.handle_cache_failure(key, e)?;
        }
        Ok(response)
    }

    /// Apply the failure policy. Returns `Ok(())` when the call may continue
    /// without the cache.
    fn handle_cache_failure(&self, key: &str, error: CacheError) -> Result<(), AnalyticsError> {
        match self.failure_policy {
            CacheFailurePolicy::Fail => {
                tracing::error!(key = %key, error = %error, "Cache backend failed");
                Err(AnalyticsError::CacheBackend(error))
            }
            CacheFailurePolicy::Degrade => {
                self.degraded_fetches.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    key = %key,
                    error = %error,
                    "Cache backend failed; running degraded with a direct fetch"
                );
                Ok(())
            }
        }
    }

    fn fetch(
        &self,
        view_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, AnalyticsError> {
        let view = format!("ga:{view_id}");
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();

        self.transport
            .fetch(&view, &start, &end, metrics, options)
            .map_err(|e| {
                tracing::warn!(view = %view, metrics = %metrics, error = %e, "Report fetch failed");
                AnalyticsError::Transport(e)
            })
    }
}
