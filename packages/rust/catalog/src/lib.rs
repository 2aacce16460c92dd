//! Raw catalog table reader.
//!
//! The raw table is a CSV file with a header row. One column (the key column,
//! `Tool_Name` by default) holds the unique entry name; every other column is
//! carried through to the enriched table untouched.

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info, instrument};

use comparekit_shared::{CatalogEntry, ComparekitError, Result};

/// The loaded raw catalog, in source order.
#[derive(Debug, Clone)]
pub struct CatalogTable {
    /// Column holding the entry name.
    pub key_column: String,
    /// Header columns in file order.
    pub columns: Vec<String>,
    /// One entry per data row.
    pub entries: Vec<CatalogEntry>,
}

impl CatalogTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the raw catalog from `path`.
///
/// Fails with `SourceUnavailable` when the file is missing and with
/// `SourceMalformed` when it cannot be parsed or lacks `key_column`.
#[instrument(skip_all, fields(path = %path.display(), key_column = %key_column))]
pub fn load_catalog(path: &Path, key_column: &str) -> Result<CatalogTable> {
    if !path.exists() {
        return Err(ComparekitError::SourceUnavailable {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| ComparekitError::io(path, e))?;
    let table = read_catalog(file, key_column)
        .map_err(|message| ComparekitError::source_malformed(path, message))?;

    info!(entries = table.len(), columns = table.columns.len(), "loaded catalog");
    Ok(table)
}

/// Parse a catalog from any reader. Errors are plain messages; the caller
/// attaches the path.
pub fn read_catalog<R: std::io::Read>(
    reader: R,
    key_column: &str,
) -> std::result::Result<CatalogTable, String> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| format!("failed to read header: {e}"))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err("table has no header row".to_string());
    }

    let key_index = columns
        .iter()
        .position(|c| c == key_column)
        .ok_or_else(|| format!("missing key column '{key_column}'"))?;

    let mut entries = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        // +2: 1-indexed plus the header row
        let record = result.map_err(|e| format!("line {}: {e}", line_num + 2))?;

        let name = record.get(key_index).unwrap_or("").trim().to_string();
        let attributes = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = if i == key_index {
                    name.clone()
                } else {
                    record.get(i).unwrap_or("").to_string()
                };
                (column.clone(), value)
            })
            .collect();

        entries.push(CatalogEntry { name, attributes });
    }

    debug!(rows = entries.len(), "parsed catalog rows");

    Ok(CatalogTable {
        key_column: key_column.to_string(),
        columns,
        entries,
    })
}
