use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use quire::config::QuireConfig;
use quire::drive::actions as drive_actions;
use quire::drive::populate::{ensure_drive, populate, PopulateCandidate};
use quire::drive::types::{DriveState, NodeKind};
use quire::model::types::DocumentId;
use quire::oplog::replay::verify_document;
use quire::registry::Registry;
use quire::storage::DocumentStore;

/// Event-sourced document maintenance
///
/// quire keeps every document as an append-only log of operations; the
/// current state is derived by replay. This binary is the maintenance
/// surface over a document store:
///
///   quire populate   # seed the drive with one document per configured type
///   quire verify ID  # replay a document and check hashes and state caches
///   quire ls         # print the drive tree and the manifest index
///
/// Configuration is read from quire.toml (or --config / QUIRE_CONFIG).
/// Population is idempotent: candidates whose name already exists in the
/// drive are skipped, so re-running is always safe.
#[derive(Parser)]
#[command(name = "quire")]
#[command(version, about)]
#[command(after_help = "See 'quire <command> --help' for more information on a specific command.")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, env = "QUIRE_CONFIG", default_value = "quire.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the drive with one document per configured candidate type.
    Populate,

    /// Replay a document's operation logs and verify integrity.
    Verify {
        /// The document id to verify.
        id: String,
    },

    /// Print the drive tree and the manifest index.
    Ls,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = QuireConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let mut registry = Registry::new();
    drive_actions::register(&mut registry).context("registering the drive document type")?;

    let store = DocumentStore::open(&config.storage.root)
        .with_context(|| format!("opening store at {}", config.storage.root.display()))?;

    match cli.command {
        Commands::Populate => cmd_populate(&store, &registry, &config),
        Commands::Verify { id } => cmd_verify(&store, &registry, &id),
        Commands::Ls => cmd_ls(&store, &config),
    }
}

fn drive_id(config: &QuireConfig) -> Result<DocumentId> {
    DocumentId::new(&config.drive.id)
        .with_context(|| format!("invalid drive id '{}'", config.drive.id))
}

fn cmd_populate(store: &DocumentStore, registry: &Registry, config: &QuireConfig) -> Result<()> {
    let drive_id = drive_id(config)?;
    ensure_drive(store, registry, &drive_id, &config.drive.slug)?;

    let candidates: Vec<PopulateCandidate> = config
        .populate
        .documents
        .iter()
        .map(|d| PopulateCandidate {
            name: d.name.clone(),
            document_type: d.document_type.clone(),
        })
        .collect();

    let report = populate(store, registry, &drive_id, &candidates)?;
    for created in &report.created {
        println!("created  {}  ({})", created.name, created.document_id);
    }
    for name in &report.skipped {
        println!("skipped  {name}");
    }
    if report.is_noop() {
        println!("drive is up to date ({} candidate(s) checked)", candidates.len());
    }
    Ok(())
}

fn cmd_verify(store: &DocumentStore, registry: &Registry, id: &str) -> Result<()> {
    let id = DocumentId::new(id).with_context(|| format!("invalid document id '{id}'"))?;
    let document = store.load(&id)?;
    match verify_document(registry, &document) {
        Ok(()) => {
            println!(
                "ok: {} ({}, revision {})",
                id, document.header.document_type, document.header.revision
            );
            Ok(())
        }
        Err(e) => bail!("integrity check failed for '{id}': {e}"),
    }
}

fn cmd_ls(store: &DocumentStore, config: &QuireConfig) -> Result<()> {
    let drive_id = drive_id(config)?;
    let document = store
        .load(&drive_id)
        .with_context(|| format!("no drive '{drive_id}'; run 'quire populate' first"))?;
    let state: DriveState = serde_json::from_value(document.state.global.clone())
        .context("drive global state is malformed")?;

    println!("drive '{drive_id}' ({} node(s))", state.nodes.len());
    print_subtree(&state, None, 1);

    let manifest = store.load_manifest()?;
    println!("manifest ({} document(s))", manifest.len());
    for id in &manifest.document_ids {
        println!("  {id}");
    }
    Ok(())
}

fn print_subtree(state: &DriveState, parent: Option<&quire::model::types::NodeId>, depth: usize) {
    for node in state.nodes.iter().filter(|n| n.parent_folder.as_ref() == parent) {
        let marker = match node.kind {
            NodeKind::Folder => "/",
            NodeKind::File => "",
        };
        let doc_type = node
            .document_type
            .as_deref()
            .map(|t| format!("  [{t}]"))
            .unwrap_or_default();
        println!("{}{}{marker}{doc_type}", "  ".repeat(depth), node.name);
        if node.kind == NodeKind::Folder {
            print_subtree(state, Some(&node.id), depth + 1);
        }
    }
}
