use crate::error::TransportError;
use crate::query::options::{Metrics, QueryOptions};
use crate::query::response::ReportResponse;
use crate::transport::ReportingTransport;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/analytics/v3/data/ga";

/// Blocking HTTP client for the Core Reporting API.
///
/// Must be built and dropped outside an async context; the server runs every
/// report inside `spawn_blocking`.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mallard-reports/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Query string for a report request: the fixed parameters followed by the
/// caller's options, verbatim.
pub fn query_params(
    view: &str,
    start_date: &str,
    end_date: &str,
    metrics: &Metrics,
    options: &QueryOptions,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("ids".to_string(), view.to_string()),
        ("start-date".to_string(), start_date.to_string()),
        ("end-date".to_string(), end_date.to_string()),
        ("metrics".to_string(), metrics.to_string()),
    ];
    params.extend(options.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    params
}

/// Map a non-success HTTP status to a transport error.
pub fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::UNAUTHORIZED => TransportError::Authentication(detail),
        StatusCode::TOO_MANY_REQUESTS => TransportError::Quota(detail),
        StatusCode::FORBIDDEN => {
            let lower = body.to_ascii_lowercase();
            if lower.contains("quota") || lower.contains("ratelimit") || lower.contains("rate limit")
            {
                TransportError::Quota(detail)
            } else {
                TransportError::Authentication(detail)
            }
        }
        _ => TransportError::Network(detail),
    }
}

impl ReportingTransport for HttpTransport {
    fn fetch(
        &self,
        view: &str,
        start_date: &str,
        end_date: &str,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, TransportError> {
        let params = query_params(view, start_date, end_date, metrics, options);
        let mut request = self.client.get(&self.base_url).query(&params);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        tracing::debug!(view = %view, metrics = %metrics, "Report fetched");
        response
            .json::<ReportResponse>()
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}
