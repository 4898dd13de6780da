//! CSV metadata table with a `journal` and a `doi` column.

use csv::StringRecord;
use std::path::Path;

/// Column holding the journal name
pub const JOURNAL_COLUMN: &str = "journal";

/// Column holding the DOI
pub const DOI_COLUMN: &str = "doi";

/// Errors raised while reading or writing the metadata table
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),
}

/// An in-memory copy of the metadata CSV.
///
/// Rows are addressed by their zero-based position below the header.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    journal_idx: usize,
    doi_idx: usize,
}

impl MetadataTable {
    /// Read a table from a CSV file
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::from_csv_reader(reader)
    }

    /// Read a table from any CSV source
    pub fn from_reader<R: std::io::Read>(input: R) -> Result<Self, TableError> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, TableError> {
        let headers = reader.headers()?.clone();
        let journal_idx = column_index(&headers, JOURNAL_COLUMN)?;
        let doi_idx = column_index(&headers, DOI_COLUMN)?;

        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Loaded metadata table with {} rows", rows.len());

        Ok(Self {
            headers,
            rows,
            journal_idx,
            doi_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with no journal but a DOI, as `(row, doi)` in table order
    pub fn rows_missing_journal(&self) -> Vec<(usize, String)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| is_blank(row.get(self.journal_idx)))
            .filter_map(|(idx, row)| {
                let doi = row.get(self.doi_idx)?;
                (!doi.trim().is_empty()).then(|| (idx, doi.to_string()))
            })
            .collect()
    }

    pub fn journal(&self, row: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(self.journal_idx))
            .filter(|value| !value.trim().is_empty())
    }

    /// Overwrite the journal cell of `row`
    pub fn set_journal(&mut self, row: usize, journal: &str) -> Result<(), TableError> {
        let record = self
            .rows
            .get_mut(row)
            .ok_or(TableError::RowOutOfRange(row))?;

        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        if fields.len() <= self.journal_idx {
            fields.resize(self.journal_idx + 1, String::new());
        }
        fields[self.journal_idx] = journal.to_string();
        *record = StringRecord::from(fields);
        Ok(())
    }

    /// Write the table to a CSV file
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
        self.write_to(writer)
    }

    /// Write the table to any CSV sink
    pub fn write_to<W: std::io::Write>(&self, mut writer: csv::Writer<W>) -> Result<(), TableError> {
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| TableError::MissingColumn(name.to_string()))
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "title,journal,doi\n\
        A,Nature,10.1038/nature14539\n\
        B,,10.1101/001727\n\
        C,,\n\
        D,  ,10.21037/jtd.2017.01.01\n";

    #[test]
    fn test_rows_missing_journal() {
        let table = MetadataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows_missing_journal(),
            vec![
                (1, "10.1101/001727".to_string()),
                (3, "10.21037/jtd.2017.01.01".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_column() {
        let result = MetadataTable::from_reader("title,doi\nA,10.1/x\n".as_bytes());
        assert!(matches!(result, Err(TableError::MissingColumn(col)) if col == "journal"));
    }

    #[test]
    fn test_set_journal_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.csv");

        let mut table = MetadataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        table.set_journal(1, "bioRxiv").unwrap();
        assert_eq!(table.journal(1), Some("bioRxiv"));
        table.save(&path).unwrap();

        let reloaded = MetadataTable::load(&path).unwrap();
        assert_eq!(reloaded.journal(0), Some("Nature"));
        assert_eq!(reloaded.journal(1), Some("bioRxiv"));
        assert_eq!(reloaded.journal(2), None);
        assert_eq!(reloaded.rows_missing_journal().len(), 1);
    }

    #[test]
    fn test_set_journal_out_of_range() {
        let mut table = MetadataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            table.set_journal(10, "x"),
            Err(TableError::RowOutOfRange(10))
        ));
    }
}
