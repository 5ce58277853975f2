use crate::error::AnalyticsError;
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;

/// An inclusive calendar date range that reports are aggregated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl Period {
    /// Create a period, rejecting ranges whose start falls after their end.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, AnalyticsError> {
        if start_date > end_date {
            return Err(AnalyticsError::InvalidPeriod {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// The last `days` days up to and including today.
    pub fn days(days: u64) -> Self {
        Self::days_ending(days, today())
    }

    /// The last `months` calendar months up to and including today.
    pub fn months(months: u32) -> Self {
        Self::months_ending(months, today())
    }

    /// The last `years` years up to and including today.
    pub fn years(years: u32) -> Self {
        Self::months_ending(years.saturating_mul(12), today())
    }

    pub fn days_ending(days: u64, end_date: NaiveDate) -> Self {
        let start_date = end_date
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start_date,
            end_date,
        }
    }

    pub fn months_ending(months: u32, end_date: NaiveDate) -> Self {
        let start_date = end_date
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start_date,
            end_date,
        }
    }

    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
