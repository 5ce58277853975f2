use mallard_reports::config::Config;
use mallard_reports::query::cache::QueryCache;
use mallard_reports::query::executor::CachedQueryExecutor;
use mallard_reports::reports::ReportingFacade;
use mallard_reports::server::{self, AppState};
use mallard_reports::transport::http::HttpTransport;
use std::sync::Arc;
use std::time::Duration;

// The blocking HTTP client must be created and dropped outside the async
// runtime, so the runtime is built by hand instead of with `#[tokio::main]`.
fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mallard_reports=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        api_base_url = %config.api_base_url,
        cache_lifetime_minutes = config.cache_lifetime_minutes,
        "Starting Mallard Reports"
    );
    if config.view_id.is_empty() {
        tracing::warn!("No MALLARD_VIEW_ID set; every report request must pass view_id");
    }
    if config.access_token.is_none() {
        tracing::warn!("No MALLARD_ACCESS_TOKEN set; reporting API calls will be unauthenticated");
    }

    let transport = HttpTransport::new(
        config.api_base_url.clone(),
        config.access_token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .expect("Failed to build reporting API client");

    let cache = QueryCache::new();
    let executor = CachedQueryExecutor::new(Arc::new(transport), Arc::new(cache.clone()))
        .with_cache_lifetime_minutes(config.cache_lifetime_minutes)
        .with_failure_policy(config.cache_failure_policy);

    let state = Arc::new(AppState {
        reports: ReportingFacade::new(Arc::new(executor), config.view_id.clone()),
        cache: cache.clone(),
        dashboard_origin: config.dashboard_origin.clone(),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to start async runtime");

    runtime.block_on(serve(&config, Arc::clone(&state), cache));

    // Shut the runtime down before the last reference to the client goes away.
    drop(runtime);
    drop(state);
}

async fn serve(config: &Config, state: Arc<AppState>, cache: QueryCache) {
    // Periodically sweep expired cache entries
    let cleanup_interval = config.cache_cleanup_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));
        loop {
            interval.tick().await;
            let before = cache.len();
            cache.cleanup_expired();
            let removed = before.saturating_sub(cache.len());
            if removed > 0 {
                tracing::debug!(removed, "Expired cache entries removed");
            }
        }
    });

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
    tracing::info!("Shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
