//! Utility modules supporting lookups.
//!
//! - [`HttpClient`]: shared HTTP client built from [`HttpConfig`](crate::config::HttpConfig)
//! - [`MetadataTable`]: the CSV table enriched by the journal job

mod http;
mod table;

pub use http::HttpClient;
pub use table::{MetadataTable, TableError, DOI_COLUMN, JOURNAL_COLUMN};
