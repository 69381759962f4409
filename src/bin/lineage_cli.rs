//! Field lineage CLI
//!
//! Usage:
//!   lineage_cli graph --input demos/graph.json --expand staff,partner
//!   lineage_cli enrich --records demos/records.json \
//!     --snapshots demos/snapshots.json --mappings demos/mappings.json \
//!     --request demos/request.json
//!
//! Config is read from `--config`, else `LINEAGE_CONFIG`, else
//! `config/lineage.yaml` if present.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::Value;

use field_lineage::config::{ConfigLoader, LineageConfig};
use field_lineage::graph::{parse_expanded, GraphBuilder};
use field_lineage::lineage_types::{DirectorySnapshot, GraphDocument, StaffMapping, StaffRecord};
use field_lineage::telemetry::init_tracing;
use field_lineage::{
    EnrichmentReport, EnrichmentRun, InMemoryEntityStore, InMemoryLineageSink, LineageRecorder,
};

#[derive(Parser)]
#[command(name = "lineage_cli")]
#[command(version = "0.1.0")]
#[command(about = "Build field-lineage flow graphs and run snapshot enrichment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (overrides LINEAGE_CONFIG)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the flow graph for a mapping document
    Graph {
        /// Graph document JSON
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Comma-separated entity types to expand (e.g. "partner,staff")
        #[arg(long, short = 'e', default_value = "")]
        expand: String,
    },

    /// Enrich staff records from directory snapshots (in-memory)
    Enrich {
        /// Staff records JSON array
        #[arg(long)]
        records: PathBuf,

        /// Directory snapshots JSON array
        #[arg(long)]
        snapshots: PathBuf,

        /// Entity ↔ external id mappings JSON array
        #[arg(long)]
        mappings: PathBuf,

        /// Request body with `fields`; omitted or invalid means default selection
        #[arg(long)]
        request: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Graph { input, expand } => cmd_graph(&config, &input, &expand),
        Commands::Enrich {
            records,
            snapshots,
            mappings,
            request,
        } => cmd_enrich(&config, &records, &snapshots, &mappings, request.as_deref()),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LineageConfig> {
    match path {
        Some(path) => ConfigLoader::new(path).load(),
        None => ConfigLoader::from_env().load(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn cmd_graph(config: &LineageConfig, input: &Path, expand: &str) -> Result<()> {
    let document: GraphDocument = read_json(input)?;
    let expanded = parse_expanded(expand);

    let graph = GraphBuilder::from_config(config).build(&document, &expanded);
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

fn cmd_enrich(
    config: &LineageConfig,
    records: &Path,
    snapshots: &Path,
    mappings: &Path,
    request: Option<&Path>,
) -> Result<()> {
    let records: Vec<StaffRecord> = read_json(records)?;
    let snapshots: Vec<DirectorySnapshot> = read_json(snapshots)?;
    let mappings: Vec<StaffMapping> = read_json(mappings)?;
    let request: Option<Value> = request.map(read_json::<Value>).transpose()?;

    let snapshots: HashMap<String, DirectorySnapshot> = snapshots
        .into_iter()
        .map(|snap| (snap.external_id.clone(), snap))
        .collect();
    let mut store = InMemoryEntityStore::new(records, mappings);
    let mut recorder = LineageRecorder::new(
        InMemoryLineageSink::new(),
        config.enrichment.entity_type,
        config.enrichment.source_type,
    );

    let run = EnrichmentRun::from_request(request.as_ref(), &config.enrichment);
    let report = run.execute(&mut store, &snapshots, &mut recorder)?;

    let output = enrich_output(&report, &recorder, &store);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn enrich_output(
    report: &EnrichmentReport,
    recorder: &LineageRecorder<InMemoryLineageSink>,
    store: &InMemoryEntityStore,
) -> Value {
    serde_json::json!({
        "summary": report.summary,
        "skip_reasons": report.skip_reasons,
        "lineage": report.lineage,
        "recorder_stats": recorder.stats(),
        "lineage_rows": recorder.sink().rows(),
        "records": store.records().collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_lineage::lineage_types::{EntityType, LineageSourceType};
    use serde_json::json;
    use uuid::Uuid;

    fn run_one(sink: InMemoryLineageSink) -> Value {
        let id = Uuid::new_v4();
        let mut store = InMemoryEntityStore::new(
            [StaffRecord::new(id)],
            vec![StaffMapping {
                entity_id: id,
                external_id: "dir-1".into(),
            }],
        );
        let snapshots = HashMap::from([(
            "dir-1".to_string(),
            DirectorySnapshot {
                external_id: "dir-1".into(),
                title: Some("Engineer".into()),
                ..DirectorySnapshot::default()
            },
        )]);
        let mut recorder = LineageRecorder::new(sink, EntityType::Staff, LineageSourceType::Api);
        let config = LineageConfig::default();
        let report = EnrichmentRun::from_request(Some(&json!({"fields": ["title"]})), &config.enrichment)
            .execute(&mut store, &snapshots, &mut recorder)
            .unwrap();
        enrich_output(&report, &recorder, &store)
    }

    #[test]
    fn enrich_output_reports_recorder_stats() {
        let output = run_one(InMemoryLineageSink::new());
        assert_eq!(
            output["recorder_stats"],
            json!({"batches": 1, "rows_written": 1, "failures": 0, "rows_lost": 0})
        );
        assert_eq!(output["lineage_rows"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn enrich_output_surfaces_lost_lineage() {
        let output = run_one(InMemoryLineageSink::failing("audit db down"));
        assert_eq!(output["recorder_stats"]["failures"], 1);
        assert_eq!(output["recorder_stats"]["rows_lost"], 1);
        assert_eq!(output["lineage"]["status"], "failed");
    }
}
