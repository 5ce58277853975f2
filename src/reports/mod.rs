pub mod columns;
pub mod records;

use crate::error::AnalyticsError;
use crate::period::Period;
use crate::query::executor::CachedQueryExecutor;
use crate::query::options::{Metrics, QueryOptions};
use crate::query::response::ReportResponse;
use columns::{BoundRow, ColumnMap};
use records::{BrowserSessions, Referrer, VisitedPage, VisitorsAndPageViews};
use std::sync::Arc;

pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_MAX_REFERRERS: usize = 20;
pub const DEFAULT_MAX_BROWSERS: usize = 10;

/// Label of the synthetic record that absorbs browsers past the top-N cutoff.
pub const OTHERS_LABEL: &str = "Others";

/// Domain-shaped reports over a single analytics view.
///
/// Facades are cheap; several may share one executor (and thus one cache),
/// each targeting its own view.
#[derive(Clone)]
pub struct ReportingFacade {
    executor: Arc<CachedQueryExecutor>,
    view_id: String,
}

impl ReportingFacade {
    pub fn new(executor: Arc<CachedQueryExecutor>, view_id: impl Into<String>) -> Self {
        Self {
            executor,
            view_id: view_id.into(),
        }
    }

    /// Target a different view for subsequent queries.
    pub fn set_view_id(&mut self, view_id: impl Into<String>) -> &mut Self {
        self.view_id = view_id.into();
        self
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// The underlying executor, for queries this facade has no method for.
    pub const fn executor(&self) -> &Arc<CachedQueryExecutor> {
        &self.executor
    }

    /// Visitors and pageviews per day and page title.
    pub fn fetch_visitors_and_page_views(
        &self,
        period: &Period,
    ) -> Result<Vec<VisitorsAndPageViews>, AnalyticsError> {
        let response = self.perform_query(
            period,
            "ga:users,ga:pageviews",
            &QueryOptions::new().dimensions("ga:date,ga:pageTitle"),
        )?;

        map_rows(&response, columns::VISITORS_AND_PAGE_VIEWS, |row| {
            Ok(VisitorsAndPageViews {
                date: row.date("date")?,
                page_title: row.text("pageTitle")?,
                visitors: row.count("visitors")?,
                page_views: row.count("pageViews")?,
            })
        })
    }

    /// Pages ordered by pageviews, capped server-side at `max_results`.
    pub fn fetch_most_visited_pages(
        &self,
        period: &Period,
        max_results: usize,
    ) -> Result<Vec<VisitedPage>, AnalyticsError> {
        let response = self.perform_query(
            period,
            "ga:pageviews",
            &QueryOptions::new()
                .dimensions("ga:pagePath,ga:pageTitle")
                .sort("-ga:pageviews")
                .max_results(max_results),
        )?;

        map_rows(&response, columns::MOST_VISITED_PAGES, |row| {
            Ok(VisitedPage {
                url: row.text("url")?,
                page_title: row.text("pageTitle")?,
                page_views: row.count("pageViews")?,
            })
        })
    }

    /// Referrers ordered by pageviews, capped server-side at `max_results`.
    pub fn fetch_top_referrers(
        &self,
        period: &Period,
        max_results: usize,
    ) -> Result<Vec<Referrer>, AnalyticsError> {
        let response = self.perform_query(
            period,
            "ga:pageviews",
            &QueryOptions::new()
                .dimensions("ga:fullReferrer")
                .sort("-ga:pageviews")
                .max_results(max_results),
        )?;

        map_rows(&response, columns::TOP_REFERRERS, |row| {
            Ok(Referrer {
                url: row.text("url")?,
                page_views: row.count("pageViews")?,
            })
        })
    }

    /// Browsers ordered by sessions.
    ///
    /// The full breakdown is always fetched; anything past the top
    /// `max_results - 1` is folded into a single "Others" record.
    pub fn fetch_top_browsers(
        &self,
        period: &Period,
        max_results: usize,
    ) -> Result<Vec<BrowserSessions>, AnalyticsError> {
        let response = self.perform_query(
            period,
            "ga:sessions",
            &QueryOptions::new()
                .dimensions("ga:browser")
                .sort("-ga:sessions"),
        )?;

        let browsers = map_rows(&response, columns::TOP_BROWSERS, |row| {
            Ok(BrowserSessions {
                browser: row.text("browser")?,
                sessions: row.count("sessions")?,
            })
        })?;

        Ok(summarize_top_browsers(browsers, max_results))
    }

    /// Run an arbitrary query against the configured view and return the raw
    /// response.
    pub fn perform_query(
        &self,
        period: &Period,
        metrics: impl Into<Metrics>,
        options: &QueryOptions,
    ) -> Result<ReportResponse, AnalyticsError> {
        self.executor.perform_query(
            &self.view_id,
            period.start_date(),
            period.end_date(),
            &metrics.into(),
            options,
        )
    }
}

fn map_rows<T>(
    response: &ReportResponse,
    map: ColumnMap,
    f: impl Fn(&BoundRow<'_>) -> Result<T, AnalyticsError>,
) -> Result<Vec<T>, AnalyticsError> {
    response
        .rows()
        .iter()
        .map(|row| f(&map.bind(row)?))
        .collect()
}

/// Fold browsers past the cutoff into one "Others" record.
///
/// Input must already be sorted by sessions, descending. When there are more
/// than `max_results` entries the output has exactly `max_results` entries and
/// the same session total as the input. A `max_results` of 0 means no cutoff.
pub fn summarize_top_browsers(
    mut browsers: Vec<BrowserSessions>,
    max_results: usize,
) -> Vec<BrowserSessions> {
    if max_results == 0 || browsers.len() <= max_results {
        return browsers;
    }

    let others: u64 = browsers
        .drain(max_results - 1..)
        .map(|b| b.sessions)
        .sum();
    browsers.push(BrowserSessions::new(OTHERS_LABEL, others));
    browsers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browsers(entries: &[(&str, u64)]) -> Vec<BrowserSessions> {
        entries
            .iter()
            .map(|(name, sessions)| BrowserSessions::new(*name, *sessions))
            .collect()
    }

    #[test]
    fn test_summarize_folds_tail_into_others() {
        let raw = browsers(&[("A", 50), ("B", 30), ("C", 10), ("D", 5), ("E", 5)]);
        let summary = summarize_top_browsers(raw, 3);
        assert_eq!(summary, browsers(&[("A", 50), ("B", 30), ("Others", 20)]));
    }

    #[test]
    fn test_summarize_under_limit_unchanged() {
        let raw = browsers(&[("Chrome", 10), ("Safari", 4)]);
        assert_eq!(summarize_top_browsers(raw.clone(), 10), raw);
    }

    #[test]
    fn test_summarize_exactly_at_limit_unchanged() {
        let raw = browsers(&[("A", 3), ("B", 2), ("C", 1)]);
        assert_eq!(summarize_top_browsers(raw.clone(), 3), raw);
    }

    #[test]
    fn test_summarize_limit_one() {
        let raw = browsers(&[("A", 3), ("B", 2)]);
        assert_eq!(summarize_top_browsers(raw, 1), browsers(&[("Others", 5)]));
    }

    #[test]
    fn test_summarize_zero_means_no_cutoff() {
        let raw = browsers(&[("A", 3), ("B", 2)]);
        assert_eq!(summarize_top_browsers(raw.clone(), 0), raw);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize_top_browsers(Vec::new(), 10).is_empty());
    }
}
