//! Typed vaccination record coerced from one CSV row.

use crate::error::IngestError;
use crate::table::{RowView, is_null};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format every `date` cell must follow.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One vaccination observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub location: String,
    pub date: NaiveDate,
    pub vaccine: String,
    pub source_url: String,
    pub total_vaccinations: Option<u64>,
    pub people_vaccinated: Option<u64>,
    pub people_fully_vaccinated: Option<u64>,
    pub total_boosters: Option<u64>,
}

impl VaccinationRecord {
    /// Coerce a raw row into a record.
    ///
    /// Columns are looked up by name; a column the row does not carry is
    /// treated the same as an empty cell.
    pub fn from_row(row: &RowView<'_>) -> Result<Self, IngestError> {
        let index = row.index();
        let location = row.get("location").unwrap_or("").trim().to_string();

        let text = |field: &str| -> Result<String, IngestError> {
            let raw = row.get(field).unwrap_or("");
            if is_null(raw) {
                return Err(IngestError::MissingValue {
                    row: index,
                    location: location.clone(),
                    field: field.to_string(),
                });
            }
            Ok(raw.trim().to_string())
        };
        let count = |field: &str| -> Result<Option<u64>, IngestError> {
            let raw = row.get(field).unwrap_or("");
            parse_count(raw).map_err(|()| IngestError::Type {
                row: index,
                location: location.clone(),
                field: field.to_string(),
                value: raw.to_string(),
            })
        };

        let raw_date = row.get("date").unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| IngestError::Format {
            row: index,
            location: location.clone(),
            field: "date".to_string(),
            value: raw_date.to_string(),
        })?;

        Ok(Self {
            location: text("location")?,
            date,
            vaccine: text("vaccine")?,
            source_url: text("source_url")?,
            total_vaccinations: count("total_vaccinations")?,
            people_vaccinated: count("people_vaccinated")?,
            people_fully_vaccinated: count("people_fully_vaccinated")?,
            total_boosters: count("total_boosters")?,
        })
    }
}

/// Strict `YYYY-MM-DD` parse: four-digit year, two-digit month and day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Parse an optional non-negative count.
///
/// Null cells give `Ok(None)`. Integral decimals such as `5000.0` are accepted;
/// fractions, signs and other text are rejected.
pub(crate) fn parse_count(raw: &str) -> Result<Option<u64>, ()> {
    if is_null(raw) {
        return Ok(None);
    }
    let raw = raw.trim();
    let digits = match raw.split_once('.') {
        Some((whole, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => whole,
        Some(_) => return Err(()),
        None => raw,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    digits.parse::<u64>().map(Some).map_err(|_| ())
}
