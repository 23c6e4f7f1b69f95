//! In-memory table loaded from a CSV resource.
//!
//! The whole resource is loaded before any row is mapped so the validation
//! gate can see the complete batch.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;

/// Columns every vaccination CSV must carry. Order in the file does not matter.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "location",
    "date",
    "vaccine",
    "source_url",
    "total_vaccinations",
    "people_vaccinated",
    "people_fully_vaccinated",
    "total_boosters",
];

/// Cell contents that count as "no value", the same set dataframe readers treat as NA.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Whether a raw cell holds no value.
pub fn is_null(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell.trim())
}

/// Where a CSV resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(String),
    Path(std::path::PathBuf),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(trimmed.trim_start_matches("file://").into())
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A decoded CSV: header names plus string cells, one `Vec` per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Decode CSV text with a header row. Ragged rows are an error.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, IngestError> {
        Self::from_csv_reader(text.as_bytes())
    }

    /// Fetch and decode a CSV from a local path or an `http(s)` URL.
    ///
    /// Failing to obtain the bytes is `SourceUnavailable`. Bytes that are not
    /// valid UTF-8 CSV are `Csv`, whichever way they arrived.
    pub async fn fetch(location: &str, timeout: Duration) -> Result<Self, IngestError> {
        let source = SourceLocation::parse(location);
        tracing::info!(location = %source, "Loading CSV");

        let bytes = match &source {
            SourceLocation::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| IngestError::source_unavailable(url.clone(), e))?;
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| IngestError::source_unavailable(url.clone(), e))?;
                if !response.status().is_success() {
                    return Err(IngestError::source_unavailable(
                        url.clone(),
                        format!("HTTP status {}", response.status()),
                    ));
                }
                response
                    .bytes()
                    .await
                    .map_err(|e| IngestError::source_unavailable(url.clone(), e))?
                    .to_vec()
            }
            SourceLocation::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| IngestError::source_unavailable(source.to_string(), e))?,
        };

        let table = Self::from_csv_reader(bytes.as_slice())?;
        tracing::debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            "Decoded CSV"
        );
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column in row order, or `None` if the column is absent.
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Fail with `MissingColumn` on the first required column the header lacks.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), IngestError> {
        match required.iter().find(|c| self.column_index(c).is_none()) {
            Some(missing) => Err(IngestError::MissingColumn((*missing).to_string())),
            None => Ok(()),
        }
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.rows.len()).then_some(RowView { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.rows.len()).map(move |index| RowView { table: self, index })
    }
}

/// Borrowed view of one table row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw cell for `column`; `None` when the table has no such column.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        Some(
            self.table.rows[self.index]
                .get(idx)
                .map(String::as_str)
                .unwrap_or(""),
        )
    }
}
