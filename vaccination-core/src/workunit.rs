//! Metadata units handed to the cataloging system.
//!
//! Field names serialize in camelCase to match the catalog's change-event JSON.

use crate::urn::DatasetUrn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One emitted unit: an identifier plus the change event it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataWorkUnit {
    pub id: String,
    pub mce: MetadataChangeEvent,
}

impl MetadataWorkUnit {
    pub fn new(id: impl Into<String>, mce: MetadataChangeEvent) -> Self {
        Self { id: id.into(), mce }
    }

    pub fn urn(&self) -> &DatasetUrn {
        &self.mce.proposed_snapshot.urn
    }

    /// The dataset-properties aspect, if the snapshot carries one.
    pub fn properties(&self) -> Option<&DatasetProperties> {
        self.mce
            .proposed_snapshot
            .aspects
            .iter()
            .find_map(|aspect| match aspect {
                Aspect::DatasetProperties(props) => Some(props),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataChangeEvent {
    pub proposed_snapshot: DatasetSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub urn: DatasetUrn,
    pub aspects: Vec<Aspect>,
}

/// Aspects a dataset snapshot can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aspect {
    DatasetProperties(DatasetProperties),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProperties {
    pub description: String,
    pub custom_properties: BTreeMap<String, String>,
}
