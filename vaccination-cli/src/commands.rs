//! CLI subcommand handlers.

use crate::Commands;
use crate::RecipeAction;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vaccination_core::config::{SourceRecipe, load_recipe};
use vaccination_core::validation::RuntimeBatchRequest;
use vaccination_core::{
    Pipeline, PipelineSummary, Recipe, SinkConfig, Table, ValidationConfig, ValidationEngine,
    VaccinationSourceConfig,
};
use vaccination_quality::{Checkpoint, CheckpointResult, DataContext};

const DEFAULT_CSV_URL: &str = "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/vaccinations/country_data/United%20States.csv";
const DEFAULT_CHECKPOINT: &str = "vaccination_checkpoint";

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ingest {
            recipe,
            env,
            csv_file_url,
            no_validate,
        } => {
            let recipe = load_recipe(Some(recipe.as_path()), ingest_overrides(env, csv_file_url))
                .map_err(|e| anyhow::anyhow!("Failed to load recipe: {}", e))?;
            let summary = run_ingest(&recipe, no_validate).await?;
            let summary = serde_json::to_string_pretty(&summary)?;
            if summary_to_stderr(&recipe.sink) {
                eprintln!("{summary}");
            } else {
                println!("{summary}");
            }
            Ok(())
        }
        Commands::Validate {
            csv_file_url,
            context_root,
            checkpoint,
            suite,
            fetch_timeout_secs,
        } => {
            let result = run_validate(
                &csv_file_url,
                &context_root,
                checkpoint,
                suite,
                Duration::from_secs(fetch_timeout_secs),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!("Checkpoint '{}' failed", result.checkpoint_name);
            }
            Ok(())
        }
        Commands::Recipe { action } => handle_recipe(action),
    }
}

/// Partial recipe carrying the command-line overrides, if any were given.
fn ingest_overrides(env: Option<String>, csv_file_url: Option<String>) -> Option<serde_json::Value> {
    let mut config = serde_json::Map::new();
    if let Some(env) = env {
        config.insert("env".into(), env.into());
    }
    if let Some(url) = csv_file_url {
        config.insert("csv_file_url".into(), url.into());
    }
    (!config.is_empty()).then(|| serde_json::json!({ "source": { "config": config } }))
}

/// Console sinks own stdout, so the run summary must go elsewhere.
fn summary_to_stderr(sink: &SinkConfig) -> bool {
    matches!(sink, SinkConfig::Console)
}

/// The data context named by the recipe's validation section, if it has one.
fn validation_engine(recipe: &Recipe) -> anyhow::Result<Option<Box<dyn ValidationEngine>>> {
    let config = recipe.source_config()?;
    let Some(validation) = config.validation else {
        return Ok(None);
    };
    let context = DataContext::open(&validation.context_root).map_err(|e| {
        anyhow::anyhow!(
            "Failed to open data context {}: {}",
            validation.context_root.display(),
            e
        )
    })?;
    let engine: Box<dyn ValidationEngine> = Box::new(context);
    Ok(Some(engine))
}

async fn run_ingest(recipe: &Recipe, no_validate: bool) -> anyhow::Result<PipelineSummary> {
    let engine = if no_validate {
        tracing::info!("Validation disabled from the command line");
        None
    } else {
        validation_engine(recipe)?
    };

    let mut pipeline = Pipeline::create(recipe, engine)?;
    match pipeline.run().await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            tracing::error!(run_id = %pipeline.context().run_id, error = %e, "Ingestion aborted");
            eprintln!("{}", serde_json::to_string_pretty(pipeline.source_report())?);
            Err(e.into())
        }
    }
}

async fn run_validate(
    csv_file_url: &str,
    context_root: &Path,
    checkpoint: Option<String>,
    suite: Option<String>,
    timeout: Duration,
) -> anyhow::Result<CheckpointResult> {
    let context = DataContext::open(context_root)?;
    let checkpoint = match (checkpoint, suite) {
        (_, Some(suite)) => Checkpoint::new(format!("{suite}_checkpoint"), [suite]),
        (Some(name), None) => context.get_checkpoint(&name)?,
        (None, None) => context.get_checkpoint(DEFAULT_CHECKPOINT)?,
    };

    let table = Table::fetch(csv_file_url, timeout).await?;
    let first_suite = checkpoint.suite_names().next().unwrap_or_default().to_string();
    let request = RuntimeBatchRequest::new(&table, first_suite);
    Ok(context.run_checkpoint(&checkpoint, &request)?)
}

/// Recipe written by `recipe init`.
fn starter_recipe() -> anyhow::Result<Recipe> {
    let config = VaccinationSourceConfig {
        validation: Some(ValidationConfig::default()),
        ..VaccinationSourceConfig::new(DEFAULT_CSV_URL)
    };
    Ok(Recipe {
        pipeline_name: Some("vaccination_us".into()),
        source: SourceRecipe {
            source_type: "vaccination".into(),
            config: serde_json::to_value(config)?,
        },
        sink: SinkConfig::File {
            filename: PathBuf::from("vaccination_mces.jsonl"),
        },
    })
}

fn handle_recipe(action: RecipeAction) -> anyhow::Result<()> {
    match action {
        RecipeAction::Init { path } => {
            if path.exists() {
                println!("Recipe already exists at: {}", path.display());
                return Ok(());
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let toml_str = toml::to_string_pretty(&starter_recipe()?)?;
            std::fs::write(&path, &toml_str)?;
            println!("Created starter recipe at: {}", path.display());
            Ok(())
        }
        RecipeAction::Show { recipe } => {
            let recipe = load_recipe(Some(recipe.as_path()), None)
                .map_err(|e| anyhow::anyhow!("Failed to load recipe: {}", e))?;
            println!("{}", toml::to_string_pretty(&recipe)?);
            Ok(())
        }
    }
}
