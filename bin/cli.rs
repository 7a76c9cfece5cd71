//! CLI - Command Line Interface
//!
//! Available Commands:
//! - kbridge demo      - Encode sample facts and show similarity and retrieval
//! - kbridge query     - Rank facts against a (partial) cue
//! - kbridge save      - Store the sample facts and write a bridge snapshot
//! - kbridge inspect   - Show a snapshot header without loading it

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use kbridge_cognition::{Encoder, MemoryBridge};
use kbridge_core::{Assembly, Confidence, Cue, KbridgeConfig, Triple};
use kbridge_persistence::SnapshotFile;

/// Facts used by `demo`, `save` and a stateless `query`
const SAMPLE_FACTS: &[(&str, &str, &str, f32)] = &[
    ("Paris", "capitalOf", "France", 0.95),
    ("London", "capitalOf", "UK", 0.95),
    ("Tokyo", "capitalOf", "Japan", 0.9),
    ("Water", "boilsAt", "100C", 0.99),
    ("Iron", "meltsAt", "1538C", 0.85),
];

/// kbridge CLI
#[derive(Parser, Debug)]
#[command(name = "kbridge")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Encode the sample facts and show sizes, decoding, similarity and a cue query
    Demo,

    /// Rank stored facts against a cue
    Query(QueryArgs),

    /// Store the sample facts and save the bridge state
    Save(SaveArgs),

    /// Show a snapshot's header
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub(crate) struct QueryArgs {
    #[arg(short, long)]
    pub subject: Option<String>,

    #[arg(short, long)]
    pub predicate: Option<String>,

    #[arg(short, long)]
    pub object: Option<String>,

    /// Number of results (defaults to the configured top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Bridge snapshot to query instead of the sample facts
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SaveArgs {
    /// Snapshot file to write
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct InspectArgs {
    /// Snapshot file
    pub path: PathBuf,
}

/// Parse CLI arguments and execute commands
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt::init();
    }

    match cli.command {
        Commands::Demo => {
            cmd_demo(cli.config.as_deref());
            Ok(())
        }
        Commands::Query(args) => cmd_query(args, load_config(cli.config.as_deref())?),
        Commands::Save(args) => cmd_save(args, load_config(cli.config.as_deref())?),
        Commands::Inspect(args) => cmd_inspect(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<KbridgeConfig> {
    match path {
        Some(path) => KbridgeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let mut config = KbridgeConfig::default();
            config.apply_env().context("invalid environment override")?;
            Ok(config)
        }
    }
}

fn sample_triples() -> Vec<Triple> {
    SAMPLE_FACTS
        .iter()
        .map(|&(s, p, o, c)| Triple::new(s, p, o).with_confidence(c))
        .collect()
}

fn new_bridge(config: KbridgeConfig) -> Result<MemoryBridge> {
    let encoder = Encoder::new(config.encoder).context("invalid encoder configuration")?;
    Ok(MemoryBridge::with_config(encoder, config.bridge))
}

fn sample_bridge(config: KbridgeConfig) -> Result<MemoryBridge> {
    let mut bridge = new_bridge(config)?;
    for triple in sample_triples() {
        bridge
            .store_knowledge(&triple)
            .with_context(|| format!("failed to store {triple}"))?;
    }
    Ok(bridge)
}

/// Never fails the process; problems are reported inline.
fn cmd_demo(config_path: Option<&Path>) {
    if let Err(e) = demo(demo_config(config_path)) {
        println!("demo stopped: {e:#}");
    }
}

/// Configuration for the demo, falling back to defaults when it cannot be loaded.
fn demo_config(path: Option<&Path>) -> KbridgeConfig {
    load_config(path).unwrap_or_else(|e| {
        println!("using default configuration: {e:#}");
        KbridgeConfig::default()
    })
}

fn demo(config: KbridgeConfig) -> Result<()> {
    let mut encoder =
        Encoder::new(config.encoder.clone()).context("invalid encoder configuration")?;
    println!(
        "Encoder: width={} sparsity={} k={}",
        encoder.width(),
        encoder.config().sparsity,
        encoder.k()
    );

    println!("\n== Encoding ==");
    let mut assemblies = Vec::new();
    for triple in sample_triples() {
        let confidence = triple.confidence.map(Confidence::new);
        let assembly = encoder.encode_triple(&triple, confidence.as_ref())?;
        let decoded = encoder
            .decode_assembly(&assembly)
            .map(|t| t.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        println!(
            "{:<32} size={:<3} mean_weight={:.2} decoded={}",
            triple.to_string(),
            assembly.size(),
            assembly.mean_weight(),
            decoded
        );
        assemblies.push(assembly);
    }

    println!("\n== Similarity ==");
    for (i, j) in [(0, 1), (0, 2), (0, 3), (3, 4)] {
        if let (Some(a), Some(b)) = (assemblies.get(i), assemblies.get(j)) {
            let name = |x: &Assembly| x.triple().map(|t| t.subject.clone()).unwrap_or_default();
            println!(
                "{} ~ {}: {:.3}",
                name(a),
                name(b),
                encoder.assembly_similarity(a, b)
            );
        }
    }

    println!("\n== Cue query ==");
    let mut bridge = sample_bridge(config)?;
    let cue = Cue::any()
        .subject("Berlin")
        .predicate("capitalOf")
        .object("Germany");
    println!("cue: Berlin capitalOf Germany (top 3)");
    for (triple, score) in bridge.retrieve_by_cue(&cue, 3)? {
        println!("  {score:.3}  {triple}");
    }

    let hit = bridge.retrieve_exact("Paris", "capitalOf", "France");
    let miss = bridge.retrieve_exact("Paris", "capitalOf", "Germany");
    println!("\nexact (Paris, capitalOf, France): {}", found(hit));
    println!("exact (Paris, capitalOf, Germany): {}", found(miss));

    let stats = bridge.get_stats();
    println!(
        "\nfacts={} entities={} relations={} triples_encoded={} errors={}",
        stats.total_knowledge,
        stats.entities,
        stats.relations,
        stats.encoder.triples_encoded,
        stats.encoder.encoding_errors
    );
    Ok(())
}

fn found(triple: Option<Triple>) -> String {
    triple
        .map(|t| format!("found {t}"))
        .unwrap_or_else(|| "not found".to_string())
}

fn cmd_query(args: QueryArgs, config: KbridgeConfig) -> Result<()> {
    let top_k = args.top_k.unwrap_or(config.bridge.default_top_k);
    let mut bridge = match args.state.as_ref() {
        Some(path) => {
            let mut bridge = new_bridge(config)?;
            bridge
                .load(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            bridge
        }
        None => sample_bridge(config)?,
    };

    let cue = Cue {
        subject: args.subject,
        predicate: args.predicate,
        object: args.object,
    };
    info!("Querying {} facts, {} cue fields", bridge.len(), cue.known_fields());

    let results = bridge.retrieve_by_cue(&cue, top_k)?;
    if results.is_empty() {
        println!("No facts stored");
    }
    for (triple, score) in results {
        println!("{score:.3}  {triple}");
    }
    Ok(())
}

fn cmd_save(args: SaveArgs, config: KbridgeConfig) -> Result<()> {
    let bridge = sample_bridge(config)?;
    bridge
        .save(&args.out)
        .with_context(|| format!("failed to save {}", args.out.display()))?;
    println!("Saved {} facts to {}", bridge.len(), args.out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let info = SnapshotFile::new(&args.path)
        .inspect()
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    println!("kind:     {}", info.kind);
    println!("version:  {}", info.version);
    println!("saved_at: {}", info.saved_at.to_rfc3339());
    println!("checksum: {}", info.checksum);
    println!("payload:  {} bytes", info.payload_bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "kbridge", "query", "--subject", "Berlin", "--predicate", "capitalOf", "-k", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.subject.as_deref(), Some("Berlin"));
                assert_eq!(args.object, None);
                assert_eq!(args.top_k, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_demo_runs() {
        demo(KbridgeConfig::default()).unwrap();
    }

    #[test]
    fn test_demo_falls_back_on_bad_config() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(load_config(Some(missing.as_path())).is_err());
        assert_eq!(demo_config(Some(missing.as_path())), KbridgeConfig::default());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "encoder: [not, a, map]\n").unwrap();
        assert_eq!(demo_config(Some(broken.as_path())), KbridgeConfig::default());

        // Reaches the demo and returns normally
        cmd_demo(Some(missing.as_path()));
    }

    #[test]
    fn test_demo_reports_invalid_encoder_config() {
        let config = KbridgeConfig {
            encoder: kbridge_core::EncoderConfig::default().with_width(0),
            ..KbridgeConfig::default()
        };
        assert!(demo(config).is_err());
    }

    #[test]
    fn test_save_then_query_state() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("bridge.json");
        cmd_save(SaveArgs { out: out.clone() }, KbridgeConfig::default()).unwrap();
        assert!(out.exists());

        cmd_query(
            QueryArgs {
                subject: None,
                predicate: Some("capitalOf".to_string()),
                object: None,
                top_k: Some(3),
                state: Some(out.clone()),
            },
            KbridgeConfig::default(),
        )
        .unwrap();
        cmd_inspect(InspectArgs { path: out }).unwrap();
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kbridge.yaml");
        std::fs::write(&path, "bridge:\n  source_tag: cli\n").unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.bridge.source_tag, "cli");
    }
}
