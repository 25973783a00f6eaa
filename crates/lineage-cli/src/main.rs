//! CLI entry point for the lineage knowledge graph.
//!
//! Every command writes its result as JSON to stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use lineage_core::catalog::cmapss_feature_set;
use lineage_core::config::Settings;
use lineage_core::{FeatureSet, StorageDescriptor};
use lineage_graph::{FilterValue, GraphClient, GraphConfig, NodeFilter};
use lineage_nas::{MockEvaluator, SearchScheduler};

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Dataset lineage and NAS provenance knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: lineage).
    #[arg(short, long, default_value = "lineage", global = true)]
    config: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create the uniqueness constraints.
    InitSchema,
    /// Merge the layer catalog, reference dataset and hardware, and the baseline architecture.
    SeedNas,
    /// Ingest a data file and its features.
    IngestFile {
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        file: String,
        /// File type, e.g. train or test.
        #[arg(long = "type")]
        file_type: String,
        /// JSON feature set; the N-CMAPSS catalog when omitted.
        #[arg(long)]
        features: Option<PathBuf>,
    },
    /// Ingest a remaining-useful-life label file.
    IngestRul {
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        file: String,
    },
    /// Associate a RUL label file with the data file it labels.
    AssociateRul {
        #[arg(long)]
        rul_file: String,
        #[arg(long)]
        file: String,
    },
    /// Link an asset to a data file.
    LinkAsset {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        file: String,
        #[arg(long)]
        asset_type: Option<String>,
    },
    /// Link a storage location to a data file.
    LinkStorage {
        #[arg(long)]
        file: String,
        #[arg(long = "type")]
        storage_type: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        name: String,
    },
    /// List datasets and their files.
    ListDatasets,
    /// List the features of a file.
    Features {
        #[arg(long)]
        file: String,
    },
    /// List files of a given type.
    FilesByType {
        #[arg(long = "type")]
        file_type: String,
    },
    /// List units of measure.
    Units,
    /// List storage locations of a file.
    Storage {
        #[arg(long)]
        file: String,
    },
    /// List data files associated with a RUL label file.
    AssociatedFiles {
        #[arg(long)]
        rul_file: String,
    },
    /// List assets linked from a file.
    Assets {
        #[arg(long)]
        file: String,
    },
    /// Architectures with an accurate and fast enough experiment.
    ValidArchitectures {
        #[arg(long, default_value_t = 0.85)]
        min_accuracy: f64,
        #[arg(long, default_value_t = 20.0)]
        max_latency_ms: f64,
    },
    /// Count nodes that a cleanup would touch.
    DryCount {
        #[arg(long)]
        label: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Delete nodes of a label in batches.
    DeleteLabel {
        #[arg(long)]
        label: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Delete nodes without relationships in batches.
    DeleteOrphans {
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Clear a property on nodes of a label in batches.
    RemoveProperty {
        #[arg(long)]
        label: String,
        #[arg(long)]
        property: String,
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Drop a constraint if it exists.
    DropConstraint {
        #[arg(long)]
        name: String,
    },
    /// Drop an index if it exists.
    DropIndex {
        #[arg(long)]
        name: String,
    },
    /// Delete all dataset lineage nodes in batches.
    CleanMetadata {
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Drop the uniqueness constraints.
    DropSchema,
    /// Run the architecture search loop.
    Search {
        #[arg(long)]
        iterations: Option<u32>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        latency_threshold_ms: Option<f64>,
        #[arg(long)]
        dataset: Option<String>,
        #[arg(long)]
        hardware: Option<String>,
        #[arg(long)]
        journal_dir: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only nodes whose property equals a value. Numbers and true/false are
    /// matched as such; quote the value ("4") to match a string.
    #[arg(long, value_name = "PROP=VALUE", conflicts_with = "missing")]
    equals: Option<String>,

    /// Only nodes that lack a property.
    #[arg(long, value_name = "PROP")]
    missing: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> anyhow::Result<Option<NodeFilter>> {
        if let Some(pair) = &self.equals {
            let (property, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("--equals expects PROP=VALUE, got {pair}"))?;
            return Ok(Some(NodeFilter::equals(property, FilterValue::parse(value))?));
        }
        match &self.missing {
            Some(property) => Ok(Some(NodeFilter::missing(property)?)),
            None => Ok(None),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut settings = Settings::load(&cli.config)?;
    tracing::info!(
        config = %cli.config,
        uri = %settings.neo4j.uri,
        batch_size = settings.cleanup.batch_size,
        "Settings loaded"
    );
    let graph = GraphClient::connect(&GraphConfig::from(&settings.neo4j)).await?;
    let default_batch = settings.cleanup.batch_size;
    let batch = |size: Option<u64>| size.unwrap_or(default_batch);

    match cli.command {
        Command::InitSchema => {
            graph.ensure_schema().await?;
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
        Command::SeedNas => {
            graph.seed_nas_reference_data().await?;
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
        Command::IngestFile {
            dataset,
            file,
            file_type,
            features,
        } => {
            let feature_set = match features {
                Some(path) => FeatureSet::from_json_file(path)?,
                None => cmapss_feature_set(),
            };
            let summary = graph
                .ingest_file_metadata(&dataset, &file, &file_type, &feature_set)
                .await?;
            print_json(&summary)?;
        }
        Command::IngestRul { dataset, file } => {
            print_json(&graph.ingest_rul_metadata(&dataset, &file).await?)?;
        }
        Command::AssociateRul { rul_file, file } => {
            graph.associate_rul_file(&rul_file, &file).await?;
            print_json(&serde_json::json!({ "rul_file": rul_file, "file": file }))?;
        }
        Command::LinkAsset {
            asset,
            file,
            asset_type,
        } => {
            let asset_id = match asset_type {
                Some(t) => graph.link_asset_with_type(&asset, &file, &t).await?,
                None => graph.link_asset(&asset, &file).await?,
            };
            print_json(&serde_json::json!({ "asset": asset, "asset_id": asset_id }))?;
        }
        Command::LinkStorage {
            file,
            storage_type,
            path,
            url,
            name,
        } => {
            let storage = StorageDescriptor {
                storage_type,
                path,
                url,
                name,
            };
            graph.link_storage(&file, &storage).await?;
            print_json(&storage)?;
        }
        Command::ListDatasets => print_json(&graph.list_datasets_and_files().await?)?,
        Command::Features { file } => print_json(&graph.features_for_file(&file).await?)?,
        Command::FilesByType { file_type } => {
            print_json(&graph.files_by_type(&file_type).await?)?
        }
        Command::Units => print_json(&graph.list_units().await?)?,
        Command::Storage { file } => print_json(&graph.storage_for_file(&file).await?)?,
        Command::AssociatedFiles { rul_file } => {
            print_json(&graph.associated_files_for_rul(&rul_file).await?)?
        }
        Command::Assets { file } => print_json(&graph.assets_for_file(&file).await?)?,
        Command::ValidArchitectures {
            min_accuracy,
            max_latency_ms,
        } => print_json(&graph.valid_architectures(min_accuracy, max_latency_ms).await?)?,
        Command::DryCount { label, filter } => {
            let filter = filter.to_filter()?;
            let count = graph.dry_count(label.as_deref(), filter.as_ref()).await?;
            print_json(&serde_json::json!({ "count": count }))?;
        }
        Command::DeleteLabel {
            label,
            filter,
            batch_size,
        } => {
            let report = graph
                .delete_label(&label, filter.to_filter()?, batch(batch_size))
                .await?;
            print_json(&report)?;
        }
        Command::DeleteOrphans { batch_size } => {
            print_json(&graph.delete_orphans(batch(batch_size)).await?)?
        }
        Command::RemoveProperty {
            label,
            property,
            batch_size,
        } => {
            let report = graph
                .remove_property(&label, &property, batch(batch_size))
                .await?;
            print_json(&report)?;
        }
        Command::DropConstraint { name } => {
            graph.drop_constraint(&name).await?;
            print_json(&serde_json::json!({ "dropped": name }))?;
        }
        Command::DropIndex { name } => {
            graph.drop_index(&name).await?;
            print_json(&serde_json::json!({ "dropped": name }))?;
        }
        Command::CleanMetadata { batch_size } => {
            print_json(&graph.clean_lineage_metadata(batch(batch_size)).await?)?
        }
        Command::DropSchema => {
            graph.drop_schema_constraints().await?;
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
        Command::Search {
            iterations,
            workers,
            seed,
            latency_threshold_ms,
            dataset,
            hardware,
            journal_dir,
        } => {
            let search = &mut settings.search;
            search.iterations = iterations.unwrap_or(search.iterations);
            search.workers = workers.unwrap_or(search.workers);
            search.seed = seed.or(search.seed);
            search.latency_threshold_ms =
                latency_threshold_ms.unwrap_or(search.latency_threshold_ms);
            search.dataset = dataset.or(search.dataset.take());
            search.hardware = hardware.or(search.hardware.take());
            search.journal_dir = journal_dir.or(search.journal_dir.take());

            graph.ensure_schema().await?;
            graph.seed_nas_reference_data().await?;
            tracing::info!(
                iterations = search.iterations,
                workers = search.workers,
                seed = ?search.seed,
                "Starting architecture search"
            );

            let results = SearchScheduler::new(graph, MockEvaluator, search.clone())
                .run()
                .await?;
            let stored: u32 = results.iter().map(|r| r.report.stored).sum();
            let pruned: u32 = results.iter().map(|r| r.report.pruned).sum();
            tracing::info!(stored, pruned, "Architecture search finished");
            print_json(&results)?;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
