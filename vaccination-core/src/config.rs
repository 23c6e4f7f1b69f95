//! Configuration for the vaccination source and the pipeline recipe.
//!
//! Uses `figment` for layered configuration: defaults -> recipe file ->
//! environment (`VACCINATION_`, `__` nesting) -> explicit overrides.

use crate::error::IngestError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config accepted by the vaccination source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaccinationSourceConfig {
    /// Environment tag embedded in every dataset reference.
    #[serde(default = "default_env")]
    pub env: String,
    /// Local path or `http(s)` URL of the CSV.
    pub csv_file_url: String,
    /// Timeout for fetching the CSV over HTTP.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Optional data-quality gate. Omitted means no validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
}

impl VaccinationSourceConfig {
    pub fn new(csv_file_url: impl Into<String>) -> Self {
        Self {
            env: default_env(),
            csv_file_url: csv_file_url.into(),
            fetch_timeout_secs: default_fetch_timeout(),
            validation: None,
        }
    }

    /// Parse from a loosely typed config value, e.g. the `source.config` table of a recipe.
    pub fn from_value(value: serde_json::Value) -> Result<Self, IngestError> {
        serde_json::from_value(value)
            .map_err(|e| IngestError::config(format!("invalid vaccination source config: {e}")))
    }
}

fn default_env() -> String {
    "PROD".to_string()
}

fn default_fetch_timeout() -> u64 {
    60
}

/// What a failed expectation suite does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Emit every row; the result only lands in the report.
    #[default]
    Annotate,
    /// Abort before the first unit when any expectation fails.
    Block,
}

/// Validation gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Root directory of the expectation store.
    #[serde(default = "default_context_root")]
    pub context_root: PathBuf,
    #[serde(default = "default_suite_name")]
    pub expectation_suite_name: String,
    #[serde(default)]
    pub policy: ValidationPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            context_root: default_context_root(),
            expectation_suite_name: default_suite_name(),
            policy: ValidationPolicy::default(),
        }
    }
}

fn default_context_root() -> PathBuf {
    PathBuf::from("great_expectations")
}

fn default_suite_name() -> String {
    "vaccination_expectations".to_string()
}

/// Source section of a recipe: a type tag plus its untyped config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecipe {
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Default for SourceRecipe {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            config: serde_json::Value::Object(Default::default()),
        }
    }
}

fn default_source_type() -> String {
    "vaccination".to_string()
}

/// Where produced units are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// One JSON object per line.
    File { filename: PathBuf },
    /// JSON lines on stdout.
    #[default]
    Console,
}

/// A full ingestion recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    #[serde(default)]
    pub source: SourceRecipe,
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Recipe {
    /// Typed view of the source config.
    pub fn source_config(&self) -> Result<VaccinationSourceConfig, IngestError> {
        VaccinationSourceConfig::from_value(self.source.config.clone())
    }
}

/// Load a recipe from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (a partial recipe, merged key by key)
/// 2. Environment variables (`VACCINATION_SOURCE__CONFIG__ENV=DEV`, ...)
/// 3. The recipe file, if given
/// 4. Built-in defaults
pub fn load_recipe(
    path: Option<&Path>,
    overrides: Option<serde_json::Value>,
) -> Result<Recipe, IngestError> {
    let mut figment = Figment::from(Serialized::defaults(Recipe::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(IngestError::config(format!(
                "recipe file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("VACCINATION_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment
        .extract()
        .map_err(|e| IngestError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_defaults() {
        let config =
            VaccinationSourceConfig::from_value(serde_json::json!({"csv_file_url": "a.csv"}))
                .unwrap();
        assert_eq!(config.env, "PROD");
        assert_eq!(config.csv_file_url, "a.csv");
        assert_eq!(config.fetch_timeout_secs, 60);
        assert!(config.validation.is_none());
    }

    #[test]
    fn test_source_config_requires_csv_file_url() {
        let err = VaccinationSourceConfig::from_value(serde_json::json!({"env": "DEV"}))
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(ref m) if m.contains("csv_file_url")));
    }

    #[test]
    fn test_source_config_rejects_unknown_keys() {
        let result = VaccinationSourceConfig::from_value(
            serde_json::json!({"csv_file_url": "a.csv", "csv_path": "b.csv"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_config_defaults() {
        let config = VaccinationSourceConfig::from_value(
            serde_json::json!({"csv_file_url": "a.csv", "validation": {}}),
        )
        .unwrap();
        let validation = config.validation.unwrap();
        assert_eq!(validation.expectation_suite_name, "vaccination_expectations");
        assert_eq!(validation.context_root, PathBuf::from("great_expectations"));
        assert_eq!(validation.policy, ValidationPolicy::Annotate);
    }

    #[test]
    fn test_load_recipe_from_file_with_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recipe.toml");
        std::fs::write(
            &path,
            r#"
pipeline_name = "vaccination_us"

[source]
type = "vaccination"

[source.config]
csv_file_url = "data/us.csv"

[source.config.validation]
policy = "block"

[sink]
type = "file"
filename = "out.jsonl"
"#,
        )
        .unwrap();

        let recipe = load_recipe(
            Some(&path),
            Some(serde_json::json!({"source": {"config": {"env": "DEV"}}})),
        )
        .unwrap();

        assert_eq!(recipe.pipeline_name.as_deref(), Some("vaccination_us"));
        assert_eq!(
            recipe.sink,
            SinkConfig::File {
                filename: "out.jsonl".into()
            }
        );
        let source = recipe.source_config().unwrap();
        assert_eq!(source.env, "DEV");
        assert_eq!(source.csv_file_url, "data/us.csv");
        assert_eq!(source.validation.unwrap().policy, ValidationPolicy::Block);
    }

    #[test]
    fn test_load_recipe_missing_file() {
        let err = load_recipe(Some(Path::new("/no/such/recipe.toml")), None).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
