use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Comma-separated list of metric identifiers, e.g. `ga:users,ga:pageviews`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(String);

impl Metrics {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Metrics {
    fn from(metrics: &str) -> Self {
        Self(metrics.to_string())
    }
}

impl From<String> for Metrics {
    fn from(metrics: String) -> Self {
        Self(metrics)
    }
}

impl From<&[&str]> for Metrics {
    fn from(metrics: &[&str]) -> Self {
        Self(metrics.join(","))
    }
}

impl<const N: usize> From<[&str; N]> for Metrics {
    fn from(metrics: [&str; N]) -> Self {
        Self(metrics.join(","))
    }
}

impl From<Vec<String>> for Metrics {
    fn from(metrics: Vec<String>) -> Self {
        Self(metrics.join(","))
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single query option value. The reporting API accepts strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Extra query parameters (dimensions, sort order, max-results, filters).
///
/// Keys are kept sorted so that the same set of options always serializes
/// identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryOptions(BTreeMap<String, OptionValue>);

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary option, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn dimensions(self, dimensions: &str) -> Self {
        self.with("dimensions", dimensions)
    }

    #[must_use]
    pub fn sort(self, sort: &str) -> Self {
        self.with("sort", sort)
    }

    #[must_use]
    pub fn max_results(self, max_results: usize) -> Self {
        self.with("max-results", max_results)
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for QueryOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
