pub mod cache;
pub mod executor;
pub mod key;
pub mod options;
pub mod response;
