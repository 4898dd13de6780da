//! Tweet rows collected by drug-name searches.

use serde::{Deserialize, Serialize};

/// One tweet as written to the output CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Search term that produced this tweet
    pub drug: String,
    pub tweet_id: u64,
    pub user_id: u64,
    pub username: String,
    pub text: String,
}
