//! Expectation types and their evaluation against a table.
//!
//! Column-value expectations ignore null cells (except the not-null check) and
//! honour an optional `mostly` fraction: the expectation passes when at least
//! that share of the considered cells is as expected.

use crate::error::QualityError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vaccination_core::record::{DATE_FORMAT, parse_date};
use vaccination_core::table::{Table, is_null};
use vaccination_core::validation::ExpectationOutcome;

/// At most this many offending row indices are kept per outcome.
pub const UNEXPECTED_SAMPLE: usize = 20;

/// One data-quality rule, serialized as `{"expectation_type": ..., "kwargs": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expectation_type", content = "kwargs", rename_all = "snake_case")]
pub enum Expectation {
    ExpectColumnToExist {
        column: String,
    },
    ExpectTableColumnsToMatchSet {
        column_set: Vec<String>,
        #[serde(default = "default_true")]
        exact_match: bool,
    },
    ExpectTableRowCountToBeBetween {
        #[serde(default)]
        min_value: Option<usize>,
        #[serde(default)]
        max_value: Option<usize>,
    },
    ExpectColumnValuesToNotBeNull {
        column: String,
        #[serde(default)]
        mostly: Option<f64>,
    },
    ExpectColumnValuesToBeBetween {
        column: String,
        #[serde(default)]
        min_value: Option<f64>,
        #[serde(default)]
        max_value: Option<f64>,
        #[serde(default)]
        mostly: Option<f64>,
    },
    ExpectColumnValuesToMatchRegex {
        column: String,
        regex: String,
        #[serde(default)]
        mostly: Option<f64>,
    },
    ExpectColumnValuesToMatchStrftimeFormat {
        column: String,
        strftime_format: String,
        #[serde(default)]
        mostly: Option<f64>,
    },
    ExpectColumnValuesToBeUnique {
        column: String,
        #[serde(default)]
        mostly: Option<f64>,
    },
}

fn default_true() -> bool {
    true
}

/// Whether `value` parses under `format`. The record date format uses the
/// record model's own parser so both sides agree on zero padding.
fn matches_strftime(value: &str, format: &str) -> bool {
    if format == DATE_FORMAT {
        return parse_date(value).is_some();
    }
    NaiveDate::parse_from_str(value.trim(), format).is_ok()
        || NaiveDateTime::parse_from_str(value.trim(), format).is_ok()
}

impl Expectation {
    /// Wire name, e.g. `expect_column_values_to_not_be_null`.
    pub fn expectation_type(&self) -> &'static str {
        match self {
            Self::ExpectColumnToExist { .. } => "expect_column_to_exist",
            Self::ExpectTableColumnsToMatchSet { .. } => "expect_table_columns_to_match_set",
            Self::ExpectTableRowCountToBeBetween { .. } => "expect_table_row_count_to_be_between",
            Self::ExpectColumnValuesToNotBeNull { .. } => "expect_column_values_to_not_be_null",
            Self::ExpectColumnValuesToBeBetween { .. } => "expect_column_values_to_be_between",
            Self::ExpectColumnValuesToMatchRegex { .. } => "expect_column_values_to_match_regex",
            Self::ExpectColumnValuesToMatchStrftimeFormat { .. } => {
                "expect_column_values_to_match_strftime_format"
            }
            Self::ExpectColumnValuesToBeUnique { .. } => "expect_column_values_to_be_unique",
        }
    }

    /// Column the expectation targets, for column-level expectations.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::ExpectColumnToExist { column }
            | Self::ExpectColumnValuesToNotBeNull { column, .. }
            | Self::ExpectColumnValuesToBeBetween { column, .. }
            | Self::ExpectColumnValuesToMatchRegex { column, .. }
            | Self::ExpectColumnValuesToMatchStrftimeFormat { column, .. }
            | Self::ExpectColumnValuesToBeUnique { column, .. } => Some(column),
            Self::ExpectTableColumnsToMatchSet { .. }
            | Self::ExpectTableRowCountToBeBetween { .. } => None,
        }
    }

    fn mostly(&self) -> f64 {
        match self {
            Self::ExpectColumnValuesToNotBeNull { mostly, .. }
            | Self::ExpectColumnValuesToBeBetween { mostly, .. }
            | Self::ExpectColumnValuesToMatchRegex { mostly, .. }
            | Self::ExpectColumnValuesToMatchStrftimeFormat { mostly, .. }
            | Self::ExpectColumnValuesToBeUnique { mostly, .. } => mostly.unwrap_or(1.0),
            _ => 1.0,
        }
    }

    /// Reject kwargs no table could ever satisfy meaningfully.
    pub fn check(&self) -> Result<(), QualityError> {
        let mostly = self.mostly();
        if !(0.0..=1.0).contains(&mostly) {
            return Err(QualityError::invalid_expectation(format!(
                "{}: mostly must be within [0, 1], got {mostly}",
                self.expectation_type()
            )));
        }
        match self {
            Self::ExpectColumnValuesToMatchRegex { regex, .. } => {
                regex::Regex::new(regex).map_err(|e| {
                    QualityError::invalid_expectation(format!("bad regex {regex:?}: {e}"))
                })?;
            }
            Self::ExpectColumnValuesToBeBetween {
                min_value: Some(min),
                max_value: Some(max),
                ..
            } if min > max => {
                return Err(QualityError::invalid_expectation(format!(
                    "{}: min_value {min} exceeds max_value {max}",
                    self.expectation_type()
                )));
            }
            _ => {}
        }
        Ok(())
    }

    /// Evaluate against a whole table.
    pub fn evaluate(&self, table: &Table) -> Result<ExpectationOutcome, QualityError> {
        self.check()?;

        let outcome = match self {
            Self::ExpectColumnToExist { column } => {
                let exists = table.column_index(column).is_some();
                self.outcome(exists, Vec::new(), None)
            }
            Self::ExpectTableColumnsToMatchSet {
                column_set,
                exact_match,
            } => {
                let actual: HashSet<&str> = table.columns().iter().map(String::as_str).collect();
                let wanted: HashSet<&str> = column_set.iter().map(String::as_str).collect();
                let success = if *exact_match {
                    actual == wanted
                } else {
                    wanted.is_subset(&actual)
                };
                self.outcome(success, Vec::new(), Some(table.columns().join(",")))
            }
            Self::ExpectTableRowCountToBeBetween {
                min_value,
                max_value,
            } => {
                let n = table.row_count();
                let success = min_value.is_none_or(|min| n >= min)
                    && max_value.is_none_or(|max| n <= max);
                self.outcome(success, Vec::new(), Some(n.to_string()))
            }
            Self::ExpectColumnValuesToNotBeNull { column, .. } => {
                let Some(values) = table.column_values(column) else {
                    return Ok(self.missing_column());
                };
                let unexpected: Vec<usize> = values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| is_null(v))
                    .map(|(i, _)| i)
                    .collect();
                let success = self.meets_mostly(unexpected.len(), values.len());
                self.outcome(success, unexpected, None)
            }
            Self::ExpectColumnValuesToBeBetween {
                column,
                min_value,
                max_value,
                ..
            } => self.per_value(table, column, |v| {
                v.trim().parse::<f64>().is_ok_and(|n| {
                    min_value.is_none_or(|min| n >= min) && max_value.is_none_or(|max| n <= max)
                })
            })?,
            Self::ExpectColumnValuesToMatchRegex { column, regex, .. } => {
                let re = regex::Regex::new(regex)
                    .map_err(|e| QualityError::invalid_expectation(e.to_string()))?;
                self.per_value(table, column, |v| re.is_match(v))?
            }
            Self::ExpectColumnValuesToMatchStrftimeFormat {
                column,
                strftime_format,
                ..
            } => self.per_value(table, column, |v| matches_strftime(v, strftime_format))?,
            Self::ExpectColumnValuesToBeUnique { column, .. } => {
                let Some(values) = table.column_values(column) else {
                    return Ok(self.missing_column());
                };
                let mut seen: HashMap<&str, usize> = HashMap::new();
                for v in values.iter().filter(|v| !is_null(v)) {
                    *seen.entry(v.trim()).or_default() += 1;
                }
                let considered = seen.values().sum::<usize>();
                let unexpected: Vec<usize> = values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| !is_null(v) && seen[v.trim()] > 1)
                    .map(|(i, _)| i)
                    .collect();
                let success = self.meets_mostly(unexpected.len(), considered);
                self.outcome(success, unexpected, None)
            }
        };
        Ok(outcome)
    }

    /// Shared path for expectations that test each non-null cell on its own.
    fn per_value(
        &self,
        table: &Table,
        column: &str,
        expected: impl Fn(&str) -> bool,
    ) -> Result<ExpectationOutcome, QualityError> {
        let Some(values) = table.column_values(column) else {
            return Ok(self.missing_column());
        };
        let mut considered = 0;
        let mut unexpected = Vec::new();
        for (i, v) in values.iter().enumerate() {
            if is_null(v) {
                continue;
            }
            considered += 1;
            if !expected(v) {
                unexpected.push(i);
            }
        }
        let success = self.meets_mostly(unexpected.len(), considered);
        Ok(self.outcome(success, unexpected, None))
    }

    fn meets_mostly(&self, unexpected: usize, considered: usize) -> bool {
        if considered == 0 {
            return true;
        }
        let expected_share = 1.0 - unexpected as f64 / considered as f64;
        expected_share >= self.mostly()
    }

    fn outcome(
        &self,
        success: bool,
        unexpected: Vec<usize>,
        observed: Option<String>,
    ) -> ExpectationOutcome {
        ExpectationOutcome {
            expectation_type: self.expectation_type().to_string(),
            column: self.column().map(str::to_string),
            success,
            unexpected_count: unexpected.len(),
            unexpected_rows: unexpected.into_iter().take(UNEXPECTED_SAMPLE).collect(),
            observed,
        }
    }

    fn missing_column(&self) -> ExpectationOutcome {
        self.outcome(false, Vec::new(), Some("column not found".to_string()))
    }
}
