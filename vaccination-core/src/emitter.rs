//! Emission driver: a pull-based stream of metadata units over a loaded table.

use crate::error::IngestError;
use crate::mapper::map_record;
use crate::record::VaccinationRecord;
use crate::report::SourceReport;
use crate::table::Table;
use crate::workunit::MetadataWorkUnit;

/// Lazily maps rows to units in input order.
///
/// Rows that fail to coerce end the stream: the error is yielded once and
/// every later call to `next` returns `None`. Rows that coerce but fail to
/// map are recorded in the report and skipped.
#[derive(Debug)]
pub struct WorkUnitStream<'a> {
    table: Table,
    env: String,
    cursor: usize,
    aborted: bool,
    report: &'a mut SourceReport,
}

impl<'a> WorkUnitStream<'a> {
    pub fn new(table: Table, env: impl Into<String>, report: &'a mut SourceReport) -> Self {
        Self {
            table,
            env: env.into(),
            cursor: 0,
            aborted: false,
            report,
        }
    }

    /// The report of the run in progress.
    pub fn report(&self) -> &SourceReport {
        self.report
    }

    /// Rows not yet pulled.
    pub fn remaining(&self) -> usize {
        if self.aborted {
            0
        } else {
            self.table.row_count() - self.cursor
        }
    }
}

impl Iterator for WorkUnitStream<'_> {
    type Item = Result<MetadataWorkUnit, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.aborted {
            let row = self.table.row(self.cursor)?;
            self.cursor += 1;

            let record = match VaccinationRecord::from_row(&row) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(row = row.index(), error = %e, "Aborting emission on bad row");
                    self.report
                        .report_failure(format!("row {}", row.index()), e.to_string());
                    self.aborted = true;
                    return Some(Err(e));
                }
            };

            match map_record(&record, &self.env) {
                Ok(wu) => {
                    self.report.report_workunit(&wu.id);
                    tracing::debug!(id = %wu.id, urn = %wu.urn(), "Emitting work unit");
                    return Some(Ok(wu));
                }
                Err(e) => {
                    tracing::warn!(row = row.index(), error = %e, "Skipping unmappable record");
                    self.report
                        .report_failure(format!("row {}", row.index()), e.to_string());
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl std::iter::FusedIterator for WorkUnitStream<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "location,date,vaccine,source_url,total_vaccinations,people_vaccinated,people_fully_vaccinated,total_boosters";

    fn table(lines: &[&str]) -> Table {
        Table::from_csv_str(&format!("{HEADER}\n{}\n", lines.join("\n"))).unwrap()
    }

    #[test]
    fn test_stream_preserves_order_and_counts() {
        let mut report = SourceReport::default();
        let t = table(&[
            "Chile,2021-01-03,Sinovac,http://a,1,1,,",
            "Chile,2021-01-01,Sinovac,http://a,2,2,,",
            "Chile,2021-01-02,Sinovac,http://a,3,3,,",
        ]);
        let mut stream = WorkUnitStream::new(t, "PROD", &mut report);

        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.id, "2021-01-03");
        assert_eq!(stream.report().workunits_produced, 1);
        assert_eq!(stream.remaining(), 2);

        let rest: Vec<String> = stream.by_ref().map(|r| r.unwrap().id).collect();
        assert_eq!(rest, vec!["2021-01-01", "2021-01-02"]);
        assert!(stream.next().is_none());
        drop(stream);

        assert_eq!(report.workunits_produced, 3);
    }

    #[test]
    fn test_bad_row_aborts_stream() {
        let mut report = SourceReport::default();
        let t = table(&[
            "Chile,2021-01-01,Sinovac,http://a,1,1,,",
            "Chile,13-01-2021,Sinovac,http://a,1,1,,",
            "Chile,2021-01-03,Sinovac,http://a,1,1,,",
        ]);
        let mut stream = WorkUnitStream::new(t, "PROD", &mut report);

        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(err, IngestError::Format { row: 1, .. }));
        assert!(stream.next().is_none());
        assert_eq!(stream.remaining(), 0);
        drop(stream);

        assert_eq!(report.workunits_produced, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "row 1");
    }

    #[test]
    fn test_locations_with_reserved_characters_are_emitted() {
        let mut report = SourceReport::default();
        let t = table(&[
            "Micronesia (country),2021-01-01,Pfizer,http://a,1,1,,",
            "\"Korea, South\",2021-01-02,Pfizer,http://a,1,1,,",
            "Chile,2021-01-03,Sinovac,http://a,1,1,,",
        ]);
        let ids: Vec<String> = WorkUnitStream::new(t, "PROD", &mut report)
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["2021-01-01", "2021-01-02", "2021-01-03"]);
        assert_eq!(report.workunits_produced, 3);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_unmappable_rows_are_skipped() {
        let mut report = SourceReport::default();
        let t = table(&[
            "Chile,2021-01-01,Sinovac,http://a,1,1,,",
            "Chile,2021-01-02,Sinovac,http://a,1,1,,",
        ]);
        let produced = WorkUnitStream::new(t, "", &mut report).count();
        assert_eq!(produced, 0);
        assert_eq!(report.workunits_produced, 0);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].key, "row 0");
    }
}
