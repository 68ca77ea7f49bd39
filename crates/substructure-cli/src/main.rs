//! Substructure CLI
//!
//! Drives a conversation's substructure from the command line:
//! - Inspecting a data specification (JSON catalog or OWL ontology)
//! - Creating a conversation and merging each turn's item mappings
//! - Managing property selections and the suggested message
//! - Compiling the current substructure to SPARQL
//!
//! Conversations are JSON files; query text goes to stdout, everything else
//! to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use substructure_model::{InMemoryCatalog, SubstructureGraph};
use substructure_sync::{Conversation, Merger};

mod config;
mod input;

use config::SubstructureConfig;
use input::{read_json, write_json, PhraseMapping, SelectionRequest};

#[derive(Parser)]
#[command(name = "substructure")]
#[command(
    author,
    version,
    about = "Substructure: grow a query subgraph from a conversation and compile it to SPARQL"
)]
struct Cli {
    /// JSON config file (merge policy, query formatting)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a data specification.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Create conversations and merge turns into their substructure.
    Conversation {
        #[command(subcommand)]
        command: ConversationCommands,
    },

    /// Compile a substructure to SPARQL (stdout).
    Compile {
        /// Conversation file whose substructure is compiled
        #[arg(long, conflicts_with = "graph", required_unless_present = "graph")]
        conversation: Option<PathBuf>,
        /// Bare substructure graph file
        #[arg(long)]
        graph: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Print the welcome text with class and property counts.
    Summary {
        /// Catalog file (`.json`, or `.ttl`/`.nt`/`.owl`/`.rdf`)
        #[arg(long)]
        catalog: PathBuf,
    },
    /// Write a catalog (e.g. loaded from OWL) as JSON.
    Export {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConversationCommands {
    /// Start an empty conversation.
    New {
        #[arg(long)]
        title: String,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Record a user turn and merge its mappings.
    Turn {
        #[arg(long)]
        conversation: PathBuf,
        #[arg(long)]
        catalog: PathBuf,
        /// The user's message
        #[arg(long)]
        text: String,
        /// JSON array of `{item_iri, mapped_words, span?}` for this turn
        #[arg(long)]
        mappings: Option<PathBuf>,
    },
    /// Replace the selected properties (JSON `{selected, selections}`).
    Select {
        #[arg(long)]
        conversation: PathBuf,
        #[arg(long)]
        selections: PathBuf,
    },
    /// Store the suggested message for the current selections.
    Suggest {
        #[arg(long)]
        conversation: PathBuf,
        #[arg(long)]
        message: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = SubstructureConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Catalog { command } => match command {
            CatalogCommands::Summary { catalog } => cmd_catalog_summary(&catalog),
            CatalogCommands::Export { catalog, out } => cmd_catalog_export(&catalog, &out),
        },
        Commands::Conversation { command } => match command {
            ConversationCommands::New { title, out } => cmd_conversation_new(&title, &out),
            ConversationCommands::Turn {
                conversation,
                catalog,
                text,
                mappings,
            } => cmd_conversation_turn(&config, &conversation, &catalog, &text, mappings.as_deref()),
            ConversationCommands::Select {
                conversation,
                selections,
            } => cmd_conversation_select(&conversation, &selections),
            ConversationCommands::Suggest {
                conversation,
                message,
            } => cmd_conversation_suggest(&conversation, &message),
        },
        Commands::Compile {
            conversation,
            graph,
        } => cmd_compile(&config, conversation.as_deref(), graph.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default = [
        "substructure",
        "substructure_model",
        "substructure_sparql",
        "substructure_sync",
        "substructure_ingest_owl",
    ]
    .map(|target| format!("{target}={level}"))
    .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// Catalog
// ============================================================================

fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        InMemoryCatalog::from_json_file(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))
    } else {
        substructure_ingest_owl::catalog_from_file(path)
            .with_context(|| format!("failed to load data specification {}", path.display()))
    }
}

fn cmd_catalog_summary(path: &Path) -> Result<()> {
    let catalog = load_catalog(path)?;
    println!("{}", catalog.summary().welcome_text());
    Ok(())
}

fn cmd_catalog_export(path: &Path, out: &Path) -> Result<()> {
    let catalog = load_catalog(path)?;
    std::fs::write(out, catalog.to_json_string()?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    eprintln!(
        "{} {} ({} items)",
        "wrote".green().bold(),
        out.display().to_string().bold(),
        catalog.len()
    );
    Ok(())
}

// ============================================================================
// Conversation
// ============================================================================

fn cmd_conversation_new(title: &str, out: &Path) -> Result<()> {
    let conversation = Conversation::new(title);
    write_json(out, &conversation)?;
    eprintln!(
        "{} conversation {} → {}",
        "created".green().bold(),
        conversation.id,
        out.display().to_string().bold()
    );
    println!("{}", conversation.id);
    Ok(())
}

fn cmd_conversation_turn(
    config: &SubstructureConfig,
    conversation_path: &Path,
    catalog_path: &Path,
    text: &str,
    mappings_path: Option<&Path>,
) -> Result<()> {
    let mut conversation: Conversation = read_json(conversation_path)?;
    let merger = Merger::with_config(load_catalog(catalog_path)?, config.merge.clone());
    let phrases: Vec<PhraseMapping> = match mappings_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let turn_id = conversation.start_turn(text);
    let mappings = phrases
        .into_iter()
        .map(|phrase| phrase.into_mapping(turn_id))
        .collect();
    let outcome = conversation
        .merge_turn(&merger, turn_id, mappings)
        .context("failed to merge turn")?;
    let query = conversation.query_for_turn(&config.compiler(), turn_id)?;
    write_json(conversation_path, &conversation)?;

    eprintln!(
        "{} turn {}: {} mappings ({} implicit), {} new classes, {} new properties",
        "merged".green().bold(),
        turn_id,
        outcome.mappings.len(),
        outcome.synthesized,
        outcome.created_classes.len(),
        outcome.attached_properties.len()
    );
    for dropped in &outcome.unresolved {
        eprintln!(
            "  {} {} is not in the data specification",
            "→".yellow(),
            dropped.item_iri
        );
    }
    match query {
        Some(query) => print!("{query}"),
        None => eprintln!("  {} no items mapped; no query", "info:".yellow().bold()),
    }
    Ok(())
}

fn cmd_conversation_select(conversation_path: &Path, selections_path: &Path) -> Result<()> {
    let mut conversation: Conversation = read_json(conversation_path)?;
    let request: SelectionRequest = read_json(selections_path)?;
    let stored = conversation.replace_selections(&request.selected, request.selections);
    write_json(conversation_path, &conversation)?;

    eprintln!("{} {} properties selected", "ok".green().bold(), stored.len());
    for selection in &stored {
        let mut flags = Vec::new();
        if selection.is_optional {
            flags.push("optional".to_string());
        }
        if let Some(filter) = &selection.filter_expression {
            flags.push(format!("filter {filter}"));
        }
        eprintln!("  {} {} {}", "→".yellow(), selection.property_iri, flags.join(", "));
    }
    Ok(())
}

fn cmd_conversation_suggest(conversation_path: &Path, message: &str) -> Result<()> {
    let mut conversation: Conversation = read_json(conversation_path)?;
    conversation
        .record_suggestion(message)
        .context("failed to record suggested message")?;
    write_json(conversation_path, &conversation)?;
    eprintln!("{} suggested message stored", "ok".green().bold());
    Ok(())
}

// ============================================================================
// Compile
// ============================================================================

fn cmd_compile(
    config: &SubstructureConfig,
    conversation_path: Option<&Path>,
    graph_path: Option<&Path>,
) -> Result<()> {
    let graph: SubstructureGraph = match (conversation_path, graph_path) {
        (Some(path), _) => read_json::<Conversation>(path)?.graph().clone(),
        (None, Some(path)) => read_json(path)?,
        (None, None) => anyhow::bail!("either --conversation or --graph is required"),
    };
    let query = config.compiler().compile(&graph)?;
    print!("{query}");
    Ok(())
}
