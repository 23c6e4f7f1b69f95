//! Record → metadata unit mapping.

use crate::error::IngestError;
use crate::record::VaccinationRecord;
use crate::urn::{DatasetUrn, PLATFORM};
use crate::workunit::{
    Aspect, DatasetProperties, DatasetSnapshot, MetadataChangeEvent, MetadataWorkUnit,
};
use std::collections::BTreeMap;

/// Rendering of an absent count. Downstream consumers match on this literal.
pub const NO_VALUE: &str = "None";

/// Stringify an optional count, `None` → [`NO_VALUE`].
pub fn render_count(value: Option<u64>) -> String {
    value.map_or_else(|| NO_VALUE.to_string(), |v| v.to_string())
}

/// Build the unit for one record.
///
/// The unit id is the record's ISO date, so two records for the same day
/// produce the same id.
pub fn map_record(record: &VaccinationRecord, env: &str) -> Result<MetadataWorkUnit, IngestError> {
    let urn = DatasetUrn::new(PLATFORM, &record.location, env)?;

    let custom_properties = BTreeMap::from([
        ("vaccine".to_string(), record.vaccine.clone()),
        (
            "total_vaccinations".to_string(),
            render_count(record.total_vaccinations),
        ),
        (
            "people_vaccinated".to_string(),
            render_count(record.people_vaccinated),
        ),
        (
            "people_fully_vaccinated".to_string(),
            render_count(record.people_fully_vaccinated),
        ),
        (
            "total_boosters".to_string(),
            render_count(record.total_boosters),
        ),
        ("source_url".to_string(), record.source_url.clone()),
    ]);

    let properties = DatasetProperties {
        description: format!(
            "Vaccination data for {} on {}",
            record.location, record.date
        ),
        custom_properties,
    };

    let snapshot = DatasetSnapshot {
        urn,
        aspects: vec![Aspect::DatasetProperties(properties)],
    };

    Ok(MetadataWorkUnit::new(
        record.date.to_string(),
        MetadataChangeEvent {
            proposed_snapshot: snapshot,
        },
    ))
}
