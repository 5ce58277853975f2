use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily visitor and pageview counts for a single page title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorsAndPageViews {
    pub date: NaiveDate,
    pub page_title: String,
    pub visitors: u64,
    pub page_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedPage {
    pub url: String,
    pub page_title: String,
    pub page_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referrer {
    pub url: String,
    pub page_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSessions {
    pub browser: String,
    pub sessions: u64,
}

impl BrowserSessions {
    pub fn new(browser: impl Into<String>, sessions: u64) -> Self {
        Self {
            browser: browser.into(),
            sessions,
        }
    }
}
