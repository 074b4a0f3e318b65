//! Command-line interface for the semrepo selection engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use semrepo_core::config::env_vars;
use semrepo_core::{EngineConfig, FilterCriteria, SharedStore};
use semrepo_selection::{AspectUsageFilter, SelectionService};
use semrepo_storage::{Catalog, MemoryStore, RedbStore};

/// semrepo - Semantic device type selection over an aspect catalog.
#[derive(Parser, Debug)]
#[command(name = "semrepo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// JSON catalog file.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// redb database file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON engine config, applied over environment defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List aspect nodes with their hierarchy.
    Aspects {
        /// Only aspects used by device type output variables.
        #[arg(long)]
        used: bool,
        /// Only count variables bound to a measuring function (implies --used).
        #[arg(long)]
        measuring_only: bool,
        /// Also list aspects whose ancestor is used (implies --used).
        #[arg(long)]
        ancestors: bool,
        /// Also list aspects whose descendant is used (implies --used).
        #[arg(long)]
        descendants: bool,
    },
    /// List measuring functions used on an aspect.
    AspectFunctions {
        /// Aspect node id.
        aspect: String,
        /// Include the aspect's ancestors.
        #[arg(long)]
        ancestors: bool,
        /// Include the aspect's descendants.
        #[arg(long)]
        descendants: bool,
    },
    /// Device types with at least one service matching any criterion.
    Selectables {
        /// JSON file with a list of filter criteria.
        #[arg(long)]
        criteria: PathBuf,
        /// Only inspect variables below this path.
        #[arg(long, default_value = "")]
        path_prefix: String,
        /// Service interaction allow-list (event, request, event+request).
        #[arg(long = "interaction")]
        interactions: Vec<String>,
        /// Add one selectable per matching service group.
        #[arg(long)]
        include_modified: bool,
        /// Attach full device types.
        #[arg(long)]
        include_device_types: bool,
    },
    /// Selectables with optional all-criteria matching per service.
    SelectablesV2 {
        /// JSON file with a list of filter criteria.
        #[arg(long)]
        criteria: PathBuf,
        /// Only inspect variables below this path.
        #[arg(long, default_value = "")]
        path_prefix: String,
        /// Add one selectable per matching service group.
        #[arg(long)]
        include_modified: bool,
        /// Services must match every criterion on distinct variables.
        #[arg(long)]
        all_criteria: bool,
        /// Attach full device types.
        #[arg(long)]
        include_device_types: bool,
    },
    /// Drop criteria that generalize other listed criteria.
    Dedup {
        /// JSON file with a list of filter criteria.
        #[arg(long)]
        criteria: PathBuf,
    },
    /// Copy a catalog file into a redb database.
    Import,
}

#[derive(Serialize)]
struct ImportSummary {
    aspect_nodes: usize,
    functions: usize,
    device_types: usize,
}

/// Where the catalog is read from.
struct Source {
    catalog: Option<PathBuf>,
    db: Option<PathBuf>,
}

impl Source {
    async fn connect(&self, config: EngineConfig) -> Result<SelectionService> {
        let store = open_store(self.catalog.as_deref(), self.db.as_deref())?;
        Ok(SelectionService::new(store, config).await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        command,
        catalog,
        db,
        config,
        verbose,
    } = Args::parse();
    init_logging(verbose);

    let engine_config = load_config(config.as_deref())?;
    let source = Source { catalog, db };

    match command {
        Command::Aspects {
            used,
            measuring_only,
            ancestors,
            descendants,
        } => {
            let service = source.connect(engine_config).await?;
            let filter = (used || measuring_only || ancestors || descendants).then_some(
                AspectUsageFilter {
                    measuring_function_only: measuring_only,
                    include_ancestors: ancestors,
                    include_descendants: descendants,
                },
            );
            print_json(&service.list_aspect_nodes(filter).await?)
        }
        Command::AspectFunctions {
            aspect,
            ancestors,
            descendants,
        } => {
            let service = source.connect(engine_config).await?;
            print_json(
                &service
                    .list_aspect_node_measuring_functions(&aspect, ancestors, descendants)
                    .await?,
            )
        }
        Command::Selectables {
            criteria,
            path_prefix,
            interactions,
            include_modified,
            include_device_types,
        } => {
            let criteria = read_criteria(&criteria)?;
            let service = source.connect(engine_config).await?;
            print_json(
                &service
                    .query_device_type_selectables(
                        criteria,
                        &path_prefix,
                        &interactions,
                        include_modified,
                        include_device_types,
                    )
                    .await?,
            )
        }
        Command::SelectablesV2 {
            criteria,
            path_prefix,
            include_modified,
            all_criteria,
            include_device_types,
        } => {
            let criteria = read_criteria(&criteria)?;
            let service = source.connect(engine_config).await?;
            print_json(
                &service
                    .query_device_type_selectables_v2(
                        criteria,
                        &path_prefix,
                        include_modified,
                        all_criteria,
                        include_device_types,
                    )
                    .await?,
            )
        }
        Command::Dedup { criteria } => {
            let criteria = read_criteria(&criteria)?;
            let service = source.connect(engine_config).await?;
            print_json(&service.filter_generic_duplicate_criteria(&criteria))
        }
        Command::Import => run_import(source.catalog.as_deref(), source.db.as_deref()).await,
    }
}

fn init_logging(verbose: bool) {
    // Check if JSON logging is requested (for production/container environments)
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose { "semrepo=debug" } else { "semrepo=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // Logs go to stderr; stdout carries the JSON result.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Environment defaults, with keys from the config file taking precedence.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let base = EngineConfig::from_env();
    let Some(path) = path else {
        base.validate()?;
        return Ok(base);
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let overrides: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in config {}", path.display()))?;
    let mut merged = serde_json::to_value(&base)?;
    if let (Some(merged), Some(overrides)) = (merged.as_object_mut(), overrides.as_object()) {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    } else {
        anyhow::bail!("Config {} must be a JSON object", path.display());
    }
    Ok(EngineConfig::from_json(&merged.to_string())?)
}

fn open_store(catalog: Option<&Path>, db: Option<&Path>) -> Result<SharedStore> {
    match (catalog, db) {
        (Some(catalog), None) => {
            let catalog = Catalog::from_file(catalog)?;
            Ok(Arc::new(MemoryStore::from_catalog(catalog)))
        }
        (None, Some(db)) => Ok(Arc::new(RedbStore::open(db)?)),
        (Some(_), Some(_)) => anyhow::bail!("Use either --catalog or --db, not both"),
        (None, None) => anyhow::bail!("No catalog source: pass --catalog FILE or --db FILE"),
    }
}

async fn run_import(catalog: Option<&Path>, db: Option<&Path>) -> Result<()> {
    let (Some(catalog_path), Some(db)) = (catalog, db) else {
        anyhow::bail!("import needs both --catalog FILE and --db FILE");
    };
    let catalog = Catalog::from_file(catalog_path)?;
    let store = RedbStore::open(db)?;
    catalog.load_into(&store).await?;
    tracing::info!("Imported {} into {}", catalog_path.display(), db.display());

    print_json(&ImportSummary {
        aspect_nodes: catalog.aspect_nodes.len(),
        functions: catalog.functions.len(),
        device_types: catalog.device_types.len(),
    })
}

fn read_criteria(path: &Path) -> Result<Vec<FilterCriteria>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read criteria {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid criteria in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
