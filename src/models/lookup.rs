//! Outcome of resolving a single DOI to a journal name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Preprint servers recognised from a resolved article URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreprintServer {
    #[serde(rename = "bioRxiv")]
    BioRxiv,
    #[serde(rename = "medRxiv")]
    MedRxiv,
}

impl PreprintServer {
    /// Label written into the journal column
    pub fn label(&self) -> &'static str {
        match self {
            PreprintServer::BioRxiv => "bioRxiv",
            PreprintServer::MedRxiv => "medRxiv",
        }
    }
}

impl fmt::Display for PreprintServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of looking up one identifier across all sources.
///
/// Exactly one variant is produced per identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupResult {
    /// A metadata registry returned the journal title
    Found { journal: String },

    /// The work is a preprint.
    ///
    /// `server` is `None` when a registry knew the DOI but listed no
    /// container title; the row is then left without a journal name.
    Preprint { server: Option<PreprintServer> },

    /// The DOI belongs to a journal no registry indexes
    KnownUnregistered { journal: String },

    /// The DOI resolves, but to a URL that matched nothing we recognise
    NotFound { doi: String, url: String },

    /// The DOI does not exist at the resolver
    Invalid { doi: String },
}

impl LookupResult {
    /// Value to write back into the journal column, if any
    pub fn journal_name(&self) -> Option<&str> {
        match self {
            LookupResult::Found { journal } | LookupResult::KnownUnregistered { journal } => {
                Some(journal)
            }
            LookupResult::Preprint { server } => server.as_ref().map(PreprintServer::label),
            LookupResult::NotFound { .. } | LookupResult::Invalid { .. } => None,
        }
    }

    pub fn is_preprint(&self) -> bool {
        matches!(self, LookupResult::Preprint { .. })
    }
}
