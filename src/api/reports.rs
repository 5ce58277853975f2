use crate::api::errors::ApiError;
use crate::period::Period;
use crate::query::options::QueryOptions;
use crate::query::response::ReportResponse;
use crate::reports::records::{BrowserSessions, Referrer, VisitedPage, VisitorsAndPageViews};
use crate::reports::{
    ReportingFacade, DEFAULT_MAX_BROWSERS, DEFAULT_MAX_PAGES, DEFAULT_MAX_REFERRERS,
};
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// Longest relative period accepted, in days.
const MAX_RELATIVE_DAYS: u32 = 3660;

/// Query parameters shared by every report endpoint.
#[derive(Debug, Deserialize)]
pub struct ReportParams {
    #[serde(default = "default_period")]
    pub period: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Overrides the configured view for this request.
    pub view_id: Option<String>,
    pub max_results: Option<usize>,
}

fn default_period() -> String {
    "30d".to_string()
}

/// Validate that a `view_id` parameter looks like an analytics view identifier.
pub fn validate_view_id(view_id: &str) -> Result<(), ApiError> {
    if view_id.is_empty() {
        return Err(ApiError::BadRequest(
            "view_id must not be empty".to_string(),
        ));
    }
    if view_id.len() > 64 {
        return Err(ApiError::BadRequest(
            "view_id must be at most 64 characters".to_string(),
        ));
    }
    if !view_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::BadRequest(
            "view_id may only contain alphanumeric characters and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Resolve a period from explicit dates or a relative period
/// (`today`, `<n>d`, `<n>m`, `<n>y`).
pub fn resolve_period(
    period: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    today: NaiveDate,
) -> Result<Period, ApiError> {
    match (start_date, end_date) {
        (Some(start), Some(end)) => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            return Ok(Period::new(start, end)?);
        }
        (None, None) => {}
        _ => {
            return Err(ApiError::BadRequest(
                "start_date and end_date must be provided together".to_string(),
            ));
        }
    }

    let invalid = || {
        ApiError::BadRequest(format!(
            "Invalid period: {period}. Use 'today', '<n>d', '<n>m', '<n>y', or provide start_date and end_date."
        ))
    };

    if period == "today" || period == "day" {
        return Ok(Period::days_ending(0, today));
    }
    if period.len() < 2 || !period.is_char_boundary(period.len() - 1) {
        return Err(invalid());
    }
    let (amount, unit) = period.split_at(period.len() - 1);
    let amount: u32 = amount.parse().map_err(|_| invalid())?;
    let days = match unit {
        "d" => amount,
        "m" => amount.saturating_mul(31),
        "y" => amount.saturating_mul(366),
        _ => return Err(invalid()),
    };
    if amount == 0 || days > MAX_RELATIVE_DAYS {
        return Err(invalid());
    }

    Ok(match unit {
        "d" => Period::days_ending(u64::from(amount), today),
        "m" => Period::months_ending(amount, today),
        _ => Period::months_ending(amount * 12, today),
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {raw}. Use YYYY-MM-DD.")))
}

impl ReportParams {
    pub fn period(&self) -> Result<Period, ApiError> {
        resolve_period(
            &self.period,
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            chrono::Utc::now().date_naive(),
        )
    }

    /// The configured facade, retargeted if the request names another view.
    pub fn facade(&self, reports: &ReportingFacade) -> Result<ReportingFacade, ApiError> {
        let mut facade = reports.clone();
        if let Some(view_id) = &self.view_id {
            validate_view_id(view_id)?;
            facade.set_view_id(view_id.as_str());
        }
        if facade.view_id().is_empty() {
            return Err(ApiError::BadRequest(
                "No view_id configured; pass view_id or set MALLARD_VIEW_ID".to_string(),
            ));
        }
        Ok(facade)
    }

    fn max_results(&self, default: usize) -> Result<usize, ApiError> {
        match self.max_results {
            None => Ok(default),
            Some(n) if (1..=1000).contains(&n) => Ok(n),
            Some(_) => Err(ApiError::BadRequest(
                "max_results must be between 1 and 1000".to_string(),
            )),
        }
    }
}

/// Run a blocking report call off the async executor.
async fn run_report<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, crate::error::AnalyticsError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Report task panicked: {e}")))?
        .map_err(ApiError::from)
}

/// GET /api/reports/visitors — Visitors and pageviews per day and page title.
pub async fn get_visitors_and_page_views(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<VisitorsAndPageViews>>, ApiError> {
    let period = params.period()?;
    let reports = params.facade(&state.reports)?;
    let result = run_report(move || reports.fetch_visitors_and_page_views(&period)).await?;
    Ok(Json(result))
}

/// GET /api/reports/pages — Most visited pages.
pub async fn get_most_visited_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<VisitedPage>>, ApiError> {
    let period = params.period()?;
    let reports = params.facade(&state.reports)?;
    let max_results = params.max_results(DEFAULT_MAX_PAGES)?;
    let result =
        run_report(move || reports.fetch_most_visited_pages(&period, max_results)).await?;
    Ok(Json(result))
}

/// GET /api/reports/referrers — Top referrers.
pub async fn get_top_referrers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<Referrer>>, ApiError> {
    let period = params.period()?;
    let reports = params.facade(&state.reports)?;
    let max_results = params.max_results(DEFAULT_MAX_REFERRERS)?;
    let result = run_report(move || reports.fetch_top_referrers(&period, max_results)).await?;
    Ok(Json(result))
}

/// GET /api/reports/browsers — Top browsers with an "Others" bucket.
pub async fn get_top_browsers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<BrowserSessions>>, ApiError> {
    let period = params.period()?;
    let reports = params.facade(&state.reports)?;
    let max_results = params.max_results(DEFAULT_MAX_BROWSERS)?;
    let result = run_report(move || reports.fetch_top_browsers(&period, max_results)).await?;
    Ok(Json(result))
}

/// Query parameters for the generic query endpoint.
#[derive(Debug, Deserialize)]
pub struct RawQueryParams {
    #[serde(default = "default_period")]
    pub period: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub view_id: Option<String>,
    pub max_results: Option<usize>,
    /// Comma-separated metric identifiers.
    pub metrics: String,
    pub dimensions: Option<String>,
    pub sort: Option<String>,
    pub filters: Option<String>,
    pub segment: Option<String>,
}

impl RawQueryParams {
    fn report_params(&self) -> ReportParams {
        ReportParams {
            period: self.period.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            view_id: self.view_id.clone(),
            max_results: self.max_results,
        }
    }

    fn options(&self) -> Result<QueryOptions, ApiError> {
        let mut options = QueryOptions::new();
        if let Some(dimensions) = &self.dimensions {
            options.insert("dimensions", dimensions.as_str());
        }
        if let Some(sort) = &self.sort {
            options.insert("sort", sort.as_str());
        }
        if let Some(filters) = &self.filters {
            options.insert("filters", filters.as_str());
        }
        if let Some(segment) = &self.segment {
            options.insert("segment", segment.as_str());
        }
        if self.max_results.is_some() {
            options.insert("max-results", self.report_params().max_results(0)?);
        }
        Ok(options)
    }
}

/// GET /api/reports/query — Arbitrary query, raw rows returned unmodified.
pub async fn get_raw_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RawQueryParams>,
) -> Result<Json<ReportResponse>, ApiError> {
    if params.metrics.trim().is_empty() {
        return Err(ApiError::BadRequest("metrics must not be empty".to_string()));
    }
    let report = params.report_params();
    let period = report.period()?;
    let reports = report.facade(&state.reports)?;
    let options = params.options()?;
    let metrics = params.metrics;
    let result = run_report(move || reports.perform_query(&period, metrics, &options)).await?;
    Ok(Json(result))
}
