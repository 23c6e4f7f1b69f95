//! Dataset entity references.
//!
//! Shape: `urn:li:dataset:(urn:li:dataPlatform:<platform>,<name>,<env>)`.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};

/// Platform token every vaccination dataset is filed under.
pub const PLATFORM: &str = "vaccination_data";

/// Characters the reference syntax reserves, with their percent-encodings.
const RESERVED: [(char, &str); 3] = [(',', "%2C"), ('(', "%28"), (')', "%29")];

/// A validated dataset reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetUrn(String);

impl DatasetUrn {
    /// Build a reference from a free-text dataset name.
    ///
    /// Whitespace in `name` becomes `_` and reserved characters are
    /// percent-encoded. `platform` and `env` are tags: they must be non-empty
    /// and free of reserved characters and whitespace.
    pub fn new(platform: &str, name: &str, env: &str) -> Result<Self, IngestError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(IngestError::Mapping("dataset name is empty".to_string()));
        }
        for (part, value) in [("platform", platform), ("env", env)] {
            if value.is_empty() {
                return Err(IngestError::Mapping(format!("dataset {part} is empty")));
            }
            if value.contains(|c: char| is_reserved(c) || c.is_whitespace()) {
                return Err(IngestError::Mapping(format!(
                    "dataset {part} {value:?} contains a reserved character"
                )));
            }
        }
        Ok(Self(format!(
            "urn:li:dataset:(urn:li:dataPlatform:{platform},{name},{env})"
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetUrn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_reserved(c: char) -> bool {
    RESERVED.iter().any(|(r, _)| *r == c)
}

/// Replace every whitespace character with `_` and percent-encode `,()`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match RESERVED.iter().find(|(r, _)| *r == c) {
            Some((_, encoded)) => out.push_str(encoded),
            None if c.is_whitespace() => out.push('_'),
            None => out.push(c),
        }
    }
    out
}
