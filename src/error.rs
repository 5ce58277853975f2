/// Failure raised by the remote reporting transport.
///
/// These are never retried or suppressed by the query layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Credentials were rejected by the reporting API.
    Authentication(String),
    /// The reporting API refused the call because a quota or rate limit was hit.
    Quota(String),
    /// The request could not be delivered or the API answered with an unexpected status.
    Network(String),
    /// The API answered but the body could not be decoded.
    InvalidResponse(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication(msg) => write!(f, "Authentication failed: {msg}"),
            Self::Quota(msg) => write!(f, "Quota exceeded: {msg}"),
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The cache store could not be reached or refused an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError(pub String);

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cache backend error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// Error type for every reporting operation.
#[derive(Debug)]
pub enum AnalyticsError {
    Transport(TransportError),
    CacheBackend(CacheError),
    /// A field the API guarantees to be well formed failed to parse.
    DataFormat {
        report: &'static str,
        message: String,
    },
    InvalidPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

impl AnalyticsError {
    pub fn data_format(report: &'static str, message: impl Into<String>) -> Self {
        Self::DataFormat {
            report,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {e}"),
            Self::CacheBackend(e) => write!(f, "{e}"),
            Self::DataFormat { report, message } => {
                write!(f, "Malformed {report} data: {message}")
            }
            Self::InvalidPeriod { start, end } => {
                write!(f, "Invalid period: start date {start} is after end date {end}")
            }
        }
    }
}

impl std::error::Error for AnalyticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::CacheBackend(e) => Some(e),
            Self::DataFormat { .. } | Self::InvalidPeriod { .. } => None,
        }
    }
}

impl From<TransportError> for AnalyticsError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<CacheError> for AnalyticsError {
    fn from(e: CacheError) -> Self {
        Self::CacheBackend(e)
    }
}
