//! UMLS concept search models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// UMLS search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Split the term into words and match concepts containing any of them
    #[default]
    Words,
    /// Only concepts with a synonym exactly matching the term
    Exact,
    /// Apply lexical variant generation to the term
    Approximate,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Words => "words",
            SearchType::Exact => "exact",
            SearchType::Approximate => "approximate",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "words" => Ok(SearchType::Words),
            "exact" => Ok(SearchType::Exact),
            "approximate" => Ok(SearchType::Approximate),
            other => Err(format!("{} is not a valid search type!", other)),
        }
    }
}

/// A matched UMLS concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    /// Concept Unique Identifier
    pub cui: String,
}

/// Matches for one search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermResults {
    pub term: String,
    pub requested: SearchType,
    /// Differs from `requested` when the term fell back to an approximate search
    pub used: SearchType,
    pub concepts: Vec<Concept>,
}

impl TermResults {
    pub fn fell_back(&self) -> bool {
        self.used != self.requested
    }
}

impl fmt::Display for TermResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let matches = self
            .concepts
            .iter()
            .map(|c| format!("{}, {}", c.name, c.cui))
            .collect::<Vec<_>>()
            .join(" | ");

        if self.fell_back() {
            writeln!(f, "{}: No results with type {}", self.term, self.requested)?;
            write!(f, "    - Approximate results: {}", matches)
        } else {
            write!(f, "{}: {}", self.term, matches)
        }
    }
}
