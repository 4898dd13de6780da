//! Core data models for lookups and their outcomes.

mod concept;
mod lookup;
mod tally;
mod tweet;

pub use concept::{Concept, SearchType, TermResults};
pub use lookup::{LookupResult, PreprintServer};
pub use tally::{RunSummary, RunTally};
pub use tweet::Tweet;
