use crate::error::AnalyticsError;
use crate::query::response::{Cell, Row};
use chrono::NaiveDate;

/// Named column layout of one report type, in API column order.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    pub report: &'static str,
    pub columns: &'static [&'static str],
}

pub const VISITORS_AND_PAGE_VIEWS: ColumnMap = ColumnMap {
    report: "visitors and page views",
    columns: &["date", "pageTitle", "visitors", "pageViews"],
};

pub const MOST_VISITED_PAGES: ColumnMap = ColumnMap {
    report: "most visited pages",
    columns: &["url", "pageTitle", "pageViews"],
};

pub const TOP_REFERRERS: ColumnMap = ColumnMap {
    report: "top referrers",
    columns: &["url", "pageViews"],
};

pub const TOP_BROWSERS: ColumnMap = ColumnMap {
    report: "top browsers",
    columns: &["browser", "sessions"],
};

impl ColumnMap {
    /// Bind a raw row to this layout, rejecting rows of the wrong width.
    pub fn bind<'a>(&self, row: &'a Row) -> Result<BoundRow<'a>, AnalyticsError> {
        if row.len() != self.columns.len() {
            return Err(AnalyticsError::data_format(
                self.report,
                format!(
                    "expected {} columns ({}), got {}",
                    self.columns.len(),
                    self.columns.join(", "),
                    row.len()
                ),
            ));
        }
        Ok(BoundRow { map: *self, row })
    }
}

/// A row whose width has been checked against its [`ColumnMap`].
pub struct BoundRow<'a> {
    map: ColumnMap,
    row: &'a Row,
}

impl BoundRow<'_> {
    fn cell(&self, column: &str) -> Result<&Cell, AnalyticsError> {
        self.map
            .columns
            .iter()
            .position(|c| *c == column)
            .map(|i| &self.row[i])
            .ok_or_else(|| {
                AnalyticsError::data_format(self.map.report, format!("unknown column '{column}'"))
            })
    }

    pub fn text(&self, column: &str) -> Result<String, AnalyticsError> {
        Ok(self.cell(column)?.as_text().into_owned())
    }

    pub fn count(&self, column: &str) -> Result<u64, AnalyticsError> {
        let cell = self.cell(column)?;
        cell.as_count().ok_or_else(|| {
            AnalyticsError::data_format(
                self.map.report,
                format!("column '{column}' is not a count: {}", cell.as_text()),
            )
        })
    }

    /// Parse a compact `YYYYMMDD` date.
    pub fn date(&self, column: &str) -> Result<NaiveDate, AnalyticsError> {
        let raw = self.cell(column)?.as_text();
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AnalyticsError::data_format(
                self.map.report,
                format!("column '{column}' is not a YYYYMMDD date: {raw}"),
            ));
        }
        NaiveDate::parse_from_str(&raw, "%Y%m%d").map_err(|e| {
            AnalyticsError::data_format(
                self.map.report,
                format!("column '{column}' is not a valid date: {raw} ({e})"),
            )
        })
    }
}
