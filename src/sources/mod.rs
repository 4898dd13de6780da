//! Remote sources queried by the lookup jobs.
//!
//! Journal resolution walks the [`MetadataRegistry`] implementations in order
//! (Crossref, then mEDRA) and falls back to the doi.org handle resolver; see
//! [`JournalResolver`]. The UMLS and Twitter clients back the other two jobs.

mod crossref;
mod doi_org;
mod medra;
pub mod mock;
mod registry;
pub mod twitter;
pub mod umls;

pub use crossref::CrossRefSource;
pub use doi_org::{classify_url, DoiResolver, HandleLookup, UrlClass, KNOWN_UNREGISTERED};
pub use medra::{extract_title_text, MedraSource, ONIX_DOI_NAMESPACE, TITLE_TEXT_ELEMENT};
pub use mock::MockRegistry;
pub use registry::JournalResolver;

use async_trait::async_trait;

/// What a metadata registry said about a DOI it knows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAnswer {
    /// Journal / container title
    Journal(String),
    /// The DOI is registered but lists no container title (usually a preprint)
    NoContainerTitle,
}

/// A metadata registry that maps a DOI to its journal.
///
/// Implementations return [`SourceError::NotFound`] when the registry does not
/// know the DOI, which lets the resolver move on to the next registry. Every
/// other error is fatal for the run.
#[async_trait]
pub trait MetadataRegistry: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this registry (e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this registry
    fn name(&self) -> &str;

    /// Look up the journal for an already percent-encoded DOI
    async fn lookup_journal(&self, encoded_doi: &str) -> Result<RegistryAnswer, SourceError>;
}

/// Percent-encode a DOI for use as a single path segment (`/` included)
pub fn encode_doi(doi: &str) -> String {
    urlencoding::encode(doi).into_owned()
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters or missing credentials
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The source does not know the requested item
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
