// ============================================================
// Layer 4 - CSV Text Loader
// ============================================================
// Loads one text column from a headered CSV file using the `csv`
// crate. Each record contributes at most one training text:
//
//   publish_date,headline_text
//   20100101,"mayor opens new bridge"      → "mayor opens new bridge"
//   20100102,                              → skipped (empty)
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::traits::TextSource;

/// Loads all non-empty values of one column from a CSV file.
/// Implements the TextSource trait from Layer 3.
pub struct CsvTextLoader {
    /// Path to the CSV file
    path: PathBuf,
    /// Header name of the column holding the text
    column: String,
}

impl CsvTextLoader {
    pub fn new(path: impl AsRef<Path>, column: impl Into<String>) -> Self {
        Self { path: path.as_ref().to_path_buf(), column: column.into() }
    }
}

impl TextSource for CsvTextLoader {
    fn load_texts(&self) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open CSV '{}'", self.path.display()))?;

        // Resolve the column index once from the header row
        let col = reader
            .headers()
            .with_context(|| format!("Cannot read CSV header of '{}'", self.path.display()))?
            .iter()
            .position(|h| h == self.column)
            .ok_or_else(|| {
                anyhow!("Column '{}' not found in '{}'", self.column, self.path.display())
            })?;

        let mut texts   = Vec::new();
        let mut skipped = 0usize;

        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Malformed CSV record {} in '{}'", row + 1, self.path.display())
            })?;

            // Short rows and empty cells carry no text
            match record.get(col) {
                Some(text) if !text.is_empty() => texts.push(text.to_string()),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!("Skipped {} records with an empty '{}' field", skipped, self.column);
        }
        tracing::info!("Loaded {} texts from '{}'", texts.len(), self.path.display());
        Ok(texts)
    }
}
