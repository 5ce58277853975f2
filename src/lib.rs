//! Cached, typed reporting over a remote web analytics API.
//!
//! [`reports::ReportingFacade`] turns a [`period::Period`] into typed report
//! records. Underneath, [`query::executor::CachedQueryExecutor`] derives a
//! deterministic cache key per query and serves repeated queries from a
//! [`query::cache::CacheStore`] instead of the remote
//! [`transport::ReportingTransport`].

pub mod api;
pub mod config;
pub mod error;
pub mod period;
pub mod query;
pub mod reports;
pub mod server;
pub mod transport;

pub use error::{AnalyticsError, CacheError, TransportError};
pub use period::Period;
pub use query::executor::{CacheFailurePolicy, CachedQueryExecutor};
pub use reports::ReportingFacade;
