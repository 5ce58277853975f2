use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mallard_reports::error::TransportError;
use mallard_reports::query::cache::QueryCache;
use mallard_reports::query::executor::CachedQueryExecutor;
use mallard_reports::query::options::{Metrics, OptionValue, QueryOptions};
use mallard_reports::query::response::{Cell, ReportResponse};
use mallard_reports::reports::ReportingFacade;
use mallard_reports::server::{build_router, AppState};
use mallard_reports::transport::ReportingTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;

/// Answers by primary dimension and records the view and options of each call.
#[derive(Default)]
struct ScriptedTransport {
    calls: Mutex<Vec<(String, String, QueryOptions)>>,
    failure: Option<TransportError>,
}

impl ReportingTransport for ScriptedTransport {
    fn fetch(
        &self,
        view: &str,
        _start_date: &str,
        _end_date: &str,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, TransportError> {
        self.calls
            .lock()
            .push((view.to_string(), metrics.to_string(), options.clone()));
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let dimensions = match options.get("dimensions") {
            Some(OptionValue::Text(d)) => d.as_str(),
            _ => "",
        };
        let rows: Vec<Vec<Cell>> = match dimensions {
            "ga:date,ga:pageTitle" => vec![vec![
                Cell::from("20240105"),
                Cell::from("Home"),
                Cell::from(7),
                Cell::from(9),
            ]],
            "ga:pagePath,ga:pageTitle" => vec![vec![
                Cell::from("/"),
                Cell::from("Home"),
                Cell::from(9),
            ]],
            "ga:fullReferrer" => vec![vec![Cell::from("google"), Cell::from(4)]],
            "ga:browser" => ["Chrome", "Firefox", "Safari", "Edge"]
                .iter()
                .zip([40, 30, 20, 10])
                .map(|(b, n)| vec![Cell::from(*b), Cell::from(n)])
                .collect(),
            _ => vec![vec![Cell::from("raw"), Cell::from(1)]],
        };
        Ok(ReportResponse::from_rows(rows))
    }
}

fn setup(view_id: &str, transport: Arc<ScriptedTransport>) -> axum::Router {
    let cache = QueryCache::new();
    let executor = CachedQueryExecutor::new(transport, Arc::new(cache.clone()))
        .with_cache_lifetime_minutes(60);
    let state = Arc::new(AppState {
        reports: ReportingFacade::new(Arc::new(executor), view_id),
        cache,
        dashboard_origin: None,
    });
    build_router(state)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_visitors_endpoint() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("42", Arc::clone(&transport));

    let (status, json) = get(
        app,
        "/api/reports/visitors?start_date=2024-01-01&end_date=2024-01-31",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["date"], "2024-01-05");
    assert_eq!(json[0]["pageTitle"], "Home");
    assert_eq!(json[0]["visitors"], 7);
    assert_eq!(json[0]["pageViews"], 9);
    assert_eq!(transport.calls.lock()[0].0, "ga:42");
}

#[tokio::test]
async fn test_pages_endpoint_passes_max_results() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("42", Arc::clone(&transport));

    let (status, json) = get(app, "/api/reports/pages?period=7d&max_results=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["url"], "/");
    assert_eq!(json[0]["pageViews"], 9);
    let calls = transport.calls.lock();
    assert_eq!(calls[0].2.get("max-results"), Some(&OptionValue::Number(5)));
}

#[tokio::test]
async fn test_referrers_endpoint() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, json) = get(app, "/api/reports/referrers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["url"], "google");
    assert_eq!(json[0]["pageViews"], 4);
}

#[tokio::test]
async fn test_browsers_endpoint_folds_others() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, json) = get(app, "/api/reports/browsers?period=30d&max_results=2").await;

    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["browser"], "Chrome");
    assert_eq!(entries[0]["sessions"], 40);
    assert_eq!(entries[1]["browser"], "Others");
    assert_eq!(entries[1]["sessions"], 60);
}

#[tokio::test]
async fn test_view_id_override() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("42", Arc::clone(&transport));

    let (status, _) = get(app, "/api/reports/referrers?view_id=777").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(transport.calls.lock()[0].0, "ga:777");
}

#[tokio::test]
async fn test_missing_view_id_is_bad_request() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("", Arc::clone(&transport));

    let (status, json) = get(app, "/api/reports/browsers").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("view_id"));
    assert!(transport.calls.lock().is_empty());
}

#[tokio::test]
async fn test_invalid_view_id_is_bad_request() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, _) = get(app, "/api/reports/browsers?view_id=ga%3A42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_period_is_bad_request() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, _) = get(app, "/api/reports/pages?period=fortnight").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inverted_dates_are_bad_request() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("42", Arc::clone(&transport));

    let (status, json) = get(
        app,
        "/api/reports/pages?start_date=2024-02-01&end_date=2024-01-01",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
    assert!(transport.calls.lock().is_empty());
}

#[tokio::test]
async fn test_max_results_out_of_range() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, _) = get(app, "/api/reports/browsers?max_results=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_raw_query_endpoint() {
    let transport = Arc::new(ScriptedTransport::default());
    let app = setup("42", Arc::clone(&transport));

    let (status, json) = get(
        app,
        "/api/reports/query?metrics=ga:sessions,ga:users&dimensions=ga:country&filters=ga:country%3D%3DGermany",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rows"][0][0], "raw");
    assert_eq!(json["rows"][0][1], 1);

    let calls = transport.calls.lock();
    assert_eq!(calls[0].1, "ga:sessions,ga:users");
    assert_eq!(
        calls[0].2,
        QueryOptions::new()
            .dimensions("ga:country")
            .with("filters", "ga:country==Germany")
    );
}

#[tokio::test]
async fn test_raw_query_requires_metrics() {
    let app = setup("42", Arc::new(ScriptedTransport::default()));
    let (status, _) = get(app, "/api/reports/query?metrics=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quota_error_maps_to_too_many_requests() {
    let transport = Arc::new(ScriptedTransport {
        failure: Some(TransportError::Quota("dailyLimitExceeded".to_string())),
        ..Default::default()
    });
    let app = setup("42", transport);

    let (status, json) = get(app, "/api/reports/browsers").await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_authentication_error_maps_to_bad_gateway() {
    let transport = Arc::new(ScriptedTransport {
        failure: Some(TransportError::Authentication("invalid_grant".to_string())),
        ..Default::default()
    });
    let app = setup("42", transport);

    let (status, _) = get(app, "/api/reports/referrers").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_repeated_requests_hit_cache() {
    let transport = Arc::new(ScriptedTransport::default());
    let cache = QueryCache::new();
    let executor = CachedQueryExecutor::new(transport.clone(), Arc::new(cache.clone()))
        .with_cache_lifetime_minutes(60);
    let state = Arc::new(AppState {
        reports: ReportingFacade::new(Arc::new(executor), "42"),
        cache,
        dashboard_origin: None,
    });

    let uri = "/api/reports/browsers?start_date=2024-01-01&end_date=2024-01-31";
    for _ in 0..3 {
        let (status, _) = get(build_router(Arc::clone(&state)), uri).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(transport.calls.lock().len(), 1);
    assert_eq!(state.cache.len(), 1);

    let (_, health) = get(build_router(state), "/health/detailed").await;
    assert_eq!(health["cache_hits"], 2);
    assert_eq!(health["cache_misses"], 1);
}
