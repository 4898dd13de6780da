//! Fill in missing journal names in a metadata table.

use indicatif::ProgressBar;
use std::path::Path;

use crate::models::{RunSummary, RunTally};
use crate::sources::{JournalResolver, SourceError};
use crate::utils::{MetadataTable, TableError};

/// Errors that stop an enrichment run
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Resolve every row that has a DOI but no journal, in table order.
///
/// Returns the number of DOIs searched. Rows resolved before a fatal error
/// keep their new journal names.
pub async fn enrich_table(
    resolver: &JournalResolver,
    table: &mut MetadataTable,
    tally: &mut RunTally,
    progress: &ProgressBar,
) -> Result<usize, EnrichError> {
    let pending = table.rows_missing_journal();
    progress.set_length(pending.len() as u64);

    let mut searched = 0;
    for (row, doi) in pending {
        progress.set_message(doi.clone());
        searched += 1;

        let result = resolver.resolve(&doi, tally).await?;
        if let Some(journal) = result.journal_name() {
            tracing::info!("{} -> {}", doi, journal);
            table.set_journal(row, journal)?;
        }

        progress.inc(1);
    }

    Ok(searched)
}

/// Enrich the table at `input` and write it to `output`.
///
/// The table is written even when the run fails part-way.
pub async fn run_journals(
    resolver: &JournalResolver,
    input: &Path,
    output: &Path,
    progress: &ProgressBar,
) -> Result<RunSummary, EnrichError> {
    let mut table = MetadataTable::load(input)?;
    let mut tally = RunTally::new();

    let outcome = enrich_table(resolver, &mut table, &mut tally, progress).await;
    progress.finish_and_clear();
    table.save(output)?;

    let searched = outcome?;
    Ok(tally.summarize(searched))
}
