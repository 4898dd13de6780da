//! Run-scoped accounting of lookup outcomes.

use serde::Serialize;
use std::fmt;

use super::LookupResult;

/// Accumulates outcomes across one enrichment run.
///
/// Owned by the run driver and handed to the resolver by `&mut`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    preprints: usize,
    not_found: Vec<(String, String)>,
    invalid: Vec<String>,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one lookup outcome into the tally
    pub fn record(&mut self, result: &LookupResult) {
        match result {
            LookupResult::Preprint { .. } => self.preprints += 1,
            LookupResult::NotFound { doi, url } => {
                self.not_found.push((doi.clone(), url.clone()));
            }
            LookupResult::Invalid { doi } => self.invalid.push(doi.clone()),
            LookupResult::Found { .. } | LookupResult::KnownUnregistered { .. } => {}
        }
    }

    pub fn preprints(&self) -> usize {
        self.preprints
    }

    /// DOIs that resolved to an unrecognised URL, with that URL
    pub fn not_found(&self) -> &[(String, String)] {
        &self.not_found
    }

    pub fn invalid(&self) -> &[String] {
        &self.invalid
    }

    /// Build the end-of-run summary for `searched` identifiers
    pub fn summarize(&self, searched: usize) -> RunSummary {
        let unresolved = self.not_found.len() + self.invalid.len() + self.preprints;
        RunSummary {
            searched,
            not_found: self.not_found.clone(),
            journals_found: searched.saturating_sub(unresolved),
            preprints: self.preprints,
            invalid: self.invalid.clone(),
        }
    }
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub searched: usize,
    pub not_found: Vec<(String, String)>,
    pub journals_found: usize,
    pub preprints: usize,
    pub invalid: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not_found = self
            .not_found
            .iter()
            .map(|(doi, url)| format!("('{}', '{}')", doi, url))
            .collect::<Vec<_>>()
            .join(", ");
        let invalid = self
            .invalid
            .iter()
            .map(|doi| format!("'{}'", doi))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "{} DOIs searched", self.searched)?;
        writeln!(
            f,
            "  -  {} Valid Journal Names NOT Found: [{}]",
            self.not_found.len(),
            not_found
        )?;
        writeln!(f, "  -  {} Valid Journal Names Found", self.journals_found)?;
        writeln!(f, "  -  {} Pre-Print Articles", self.preprints)?;
        write!(f, "  -  {} Invalid DOIs: [{}]", self.invalid.len(), invalid)
    }
}
