pub mod http;

use crate::error::TransportError;
use crate::query::options::{Metrics, QueryOptions};
use crate::query::response::ReportResponse;

/// Remote reporting API.
///
/// `view` is already formatted per API convention (`ga:<id>`) and dates are
/// `YYYY-MM-DD` strings. Options are forwarded untouched.
pub trait ReportingTransport: Send + Sync {
    fn fetch(
        &self,
        view: &str,
        start_date: &str,
        end_date: &str,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, TransportError>;
}

impl<F> ReportingTransport for F
where
    F: Fn(&str, &str, &str, &Metrics, &QueryOptions) -> Result<ReportResponse, TransportError>
        + Send
        + Sync,
{
    fn fetch(
        &self,
        view: &str,
        start_date: &str,
        end_date: &str,
        metrics: &Metrics,
        options: &QueryOptions,
    ) -> Result<ReportResponse, TransportError> {
        self(view, start_date, end_date, metrics, options)
    }
}
