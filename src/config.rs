use crate::query::executor::CacheFailurePolicy;
use crate::transport::http::DEFAULT_API_BASE_URL;
use serde::Deserialize;
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Analytics view (profile) queried by default.
    #[serde(default)]
    pub view_id: String,
    /// Lifetime of cached report responses in minutes. 0 = no caching.
    #[serde(default = "default_cache_lifetime_minutes")]
    pub cache_lifetime_minutes: u64,
    /// What to do when the cache store fails (default: fail the request).
    #[serde(default)]
    pub cache_failure_policy: CacheFailurePolicy,
    /// Interval between sweeps of expired cache entries, in seconds.
    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cache_cleanup_interval_secs: u64,
    /// Reporting API endpoint.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token forwarded to the reporting API. Obtaining and refreshing
    /// it is left to the deployment.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Timeout for a single reporting API request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Dashboard origin for CORS restrictions on report routes.
    /// If not set, report routes allow any origin.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_cache_lifetime_minutes() -> u64 {
    60 * 24
}

const fn default_cache_cleanup_interval_secs() -> u64 {
    300
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            view_id: String::new(),
            cache_lifetime_minutes: default_cache_lifetime_minutes(),
            cache_failure_policy: CacheFailurePolicy::default(),
            cache_cleanup_interval_secs: default_cache_cleanup_interval_secs(),
            api_base_url: default_api_base_url(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            dashboard_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `MALLARD_HOST` → host
    /// - `MALLARD_PORT` → port
    /// - `MALLARD_VIEW_ID` → view_id
    /// - `MALLARD_CACHE_LIFETIME` → cache_lifetime_minutes
    /// - `MALLARD_CACHE_FAILURE_POLICY` → cache_failure_policy (`fail` or `degrade`)
    /// - `MALLARD_CACHE_CLEANUP_INTERVAL` → cache_cleanup_interval_secs
    /// - `MALLARD_API_BASE_URL` → api_base_url
    /// - `MALLARD_ACCESS_TOKEN` → access_token
    /// - `MALLARD_REQUEST_TIMEOUT` → request_timeout_secs
    /// - `MALLARD_DASHBOARD_ORIGIN` → dashboard_origin
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(host) = std::env::var("MALLARD_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("MALLARD_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(view_id) = std::env::var("MALLARD_VIEW_ID") {
            config.view_id = view_id;
        }
        if let Ok(val) = std::env::var("MALLARD_CACHE_LIFETIME") {
            if let Ok(m) = val.parse() {
                config.cache_lifetime_minutes = m;
            }
        }
        if let Ok(val) = std::env::var("MALLARD_CACHE_FAILURE_POLICY") {
            match val.parse() {
                Ok(policy) => config.cache_failure_policy = policy,
                Err(e) => tracing::warn!("Ignoring MALLARD_CACHE_FAILURE_POLICY: {e}"),
            }
        }
        if let Ok(val) = std::env::var("MALLARD_CACHE_CLEANUP_INTERVAL") {
            if let Ok(i) = val.parse() {
                config.cache_cleanup_interval_secs = i;
            }
        }
        if let Ok(url) = std::env::var("MALLARD_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(token) = std::env::var("MALLARD_ACCESS_TOKEN") {
            config.access_token = Some(token);
        }
        if let Ok(val) = std::env::var("MALLARD_REQUEST_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.request_timeout_secs = t;
            }
        }
        if let Ok(origin) = std::env::var("MALLARD_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }

        config
    }
}
