//! # litlookup
//!
//! Batch lookups that support literature mining: filling in journal names
//! for DOIs, searching UMLS concepts and collecting tweets that mention drugs.
//!
//! ## Architecture
//!
//! - [`models`]: Lookup outcomes, run tallies, UMLS concepts and tweets
//! - [`sources`]: Crossref, mEDRA, doi.org, UMLS and Twitter clients
//! - [`journals`]: The journal enrichment job over a CSV table
//! - [`utils`]: HTTP client and the CSV metadata table
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output

pub mod config;
pub mod journals;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use journals::{enrich_table, run_journals, EnrichError};
pub use models::{LookupResult, RunSummary, RunTally};
pub use sources::{JournalResolver, MetadataRegistry, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
