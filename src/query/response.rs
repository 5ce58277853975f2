use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A single cell in a report row.
///
/// The reporting API encodes every cell as a string, but callers (and cached
/// payloads written by other tools) may carry plain JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Integer(n) => Cow::Owned(n.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
        }
    }

    /// Interpret the cell as a non-negative count.
    ///
    /// Fractional values are truncated toward zero. Returns `None` for
    /// negative, non-finite or non-numeric cells.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Integer(n) => u64::try_from(*n).ok(),
            Self::Float(f) => (f.is_finite() && *f >= 0.0).then(|| f.trunc() as u64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<u64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f.trunc() as u64)
                })
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

pub type Row = Vec<Cell>;

/// Raw tabular response from the reporting API.
///
/// `rows` is absent when the API found no matching data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

impl ReportResponse {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            total_results: Some(rows.len() as u64),
            rows: Some(rows),
        }
    }

    /// Rows of the response, or an empty slice when the API returned none.
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}
