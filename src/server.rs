use crate::api::reports;
use crate::query::cache::QueryCache;
use crate::reports::ReportingFacade;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared state for the report server.
pub struct AppState {
    pub reports: ReportingFacade,
    /// Same store the executor writes to, kept for health and metrics output.
    pub cache: QueryCache,
    pub dashboard_origin: Option<String>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let report_cors = build_dashboard_cors(state.dashboard_origin.as_deref());

    let report_routes = Router::new()
        .route(
            "/reports/visitors",
            get(reports::get_visitors_and_page_views),
        )
        .route("/reports/pages", get(reports::get_most_visited_pages))
        .route("/reports/referrers", get(reports::get_top_referrers))
        .route("/reports/browsers", get(reports::get_top_browsers))
        .route("/reports/query", get(reports::get_raw_query))
        .layer(report_cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api", report_routes)
        .layer(axum::middleware::map_response(add_security_headers))
        // Upstream reporting calls carry their own timeout; this bounds the whole request.
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(60),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// Build CORS layer for report routes based on configured origin.
fn build_dashboard_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    dashboard_origin.map_or_else(
        || {
            // No dashboard origin configured — allow all origins.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any)
        },
        |origin| {
            let allowed_origin = origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*"));
            CorsLayer::new()
                .allow_origin(allowed_origin)
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        },
    )
}

/// GET /health — Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed — Detailed health check with cache info.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let executor = state.reports.executor();
    let stats = executor.stats();

    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "view_configured": !state.reports.view_id().is_empty(),
        "cache_lifetime_minutes": executor.cache_lifetime_minutes(),
        "cache_failure_policy": executor.failure_policy(),
        "cache_entries": state.cache.len(),
        "cache_hits": stats.cache_hits,
        "cache_misses": stats.cache_misses,
        "degraded_fetches": stats.degraded_fetches,
    }))
}

/// GET /metrics — Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;

    let executor = state.reports.executor();
    let stats = executor.stats();
    let cache_entries = state.cache.len();
    let lifetime = executor.cache_lifetime_minutes();

    let mut out = String::with_capacity(1024);
    let _ = writeln!(
        out,
        "# HELP mallard_report_cache_entries Number of cached report responses"
    );
    let _ = writeln!(out, "# TYPE mallard_report_cache_entries gauge");
    let _ = writeln!(out, "mallard_report_cache_entries {cache_entries}");
    let _ = writeln!(
        out,
        "# HELP mallard_report_cache_lifetime_minutes Configured cache lifetime (0 = disabled)"
    );
    let _ = writeln!(out, "# TYPE mallard_report_cache_lifetime_minutes gauge");
    let _ = writeln!(out, "mallard_report_cache_lifetime_minutes {lifetime}");
    let _ = writeln!(
        out,
        "# HELP mallard_report_cache_hits_total Queries served from cache"
    );
    let _ = writeln!(out, "# TYPE mallard_report_cache_hits_total counter");
    let _ = writeln!(out, "mallard_report_cache_hits_total {}", stats.cache_hits);
    let _ = writeln!(
        out,
        "# HELP mallard_report_cache_misses_total Queries fetched from the reporting API"
    );
    let _ = writeln!(out, "# TYPE mallard_report_cache_misses_total counter");
    let _ = writeln!(out, "mallard_report_cache_misses_total {}", stats.cache_misses);
    let _ = writeln!(
        out,
        "# HELP mallard_report_degraded_fetches_total Fetches that bypassed a failing cache"
    );
    let _ = writeln!(out, "# TYPE mallard_report_degraded_fetches_total counter");
    let _ = writeln!(
        out,
        "mallard_report_degraded_fetches_total {}",
        stats.degraded_fetches
    );

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
