//! ingot: Ingest paginated API collections into SQLite
//!
//! Usage:
//!   # Import every class from the built-in endpoint
//!   ingot run --kind classes --db ./sql_database/class_imports.db
//!
//!   # Import a custom kind described in a JSON file, continuing an interrupted run
//!   ingot run --definition spells.json --db ./imports.db --resume
//!
//!   # Print the description of every stored monster action
//!   ingot inspect --db ./imports.db --table mob_imports --column actions --key desc

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ingot::catalog;
use ingot::logging::init_logging;
use ingot::{DecodePolicy, EntityKind, HttpPageSource, IngestConfig, SqliteWriter};
use serde_json::Value;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ingot")]
#[command(about = "Ingest paginated API collections into SQLite", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every page of an entity kind and append it to the database
    Run(RunArgs),
    /// Print the stored values of a nested column
    Inspect(InspectArgs),
    /// List the built-in entity kinds
    Kinds,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Built-in entity kind (see `ingot kinds`)
    #[arg(long, conflicts_with = "definition", required_unless_present = "definition")]
    kind: Option<String>,

    /// JSON file describing a custom entity kind
    #[arg(long, value_name = "FILE")]
    definition: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Start from this URL instead of the kind's endpoint
    #[arg(long)]
    url: Option<String>,

    /// Continue from the last committed page of a previous run
    #[arg(long)]
    resume: bool,

    /// Skip records that fail to decode instead of aborting the run
    #[arg(long)]
    skip_bad_records: bool,

    /// Record key carrying pagination metadata (default: "page_no")
    #[arg(long)]
    pagination_key: Option<String>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Table to read
    #[arg(long)]
    table: String,

    /// Nested column to decode
    #[arg(long)]
    column: String,

    /// Print only this string member of each object element
    #[arg(long)]
    key: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Inspect(args) => inspect(args),
        Command::Kinds => {
            for name in catalog::KIND_NAMES {
                let kind = catalog::builtin(name)?;
                println!("{:<10} {:<14} {}", kind.name(), kind.table(), kind.initial_url());
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = ingest_config(&args);
    let mut kind = load_kind(&args)?;
    if let Some(url) = args.url {
        kind = kind.with_initial_url(url);
    }

    let mut writer = SqliteWriter::open(&args.db)
        .with_context(|| format!("Failed to open SQLite database: {}", args.db.display()))?;
    let mut source = HttpPageSource::new();

    let summary = ingot::ingest(&kind, &config, &mut source, &mut writer)
        .with_context(|| format!("Ingestion of '{}' failed", kind.name()))?;

    eprintln!(
        "✓ {}: {} rows from {} pages into {} ({} unknown fields, {} skipped records)",
        kind.name(),
        summary.rows,
        summary.pages,
        kind.table(),
        summary.diagnostics,
        summary.skipped
    );
    Ok(())
}

fn ingest_config(args: &RunArgs) -> IngestConfig {
    let defaults = IngestConfig::default();
    IngestConfig {
        pagination_key: args.pagination_key.clone().unwrap_or(defaults.pagination_key),
        on_decode_error: if args.skip_bad_records {
            DecodePolicy::SkipRecord
        } else {
            defaults.on_decode_error
        },
        resume: args.resume,
    }
}

fn load_kind(args: &RunArgs) -> Result<EntityKind> {
    match (&args.kind, &args.definition) {
        (Some(name), None) => Ok(catalog::builtin(name)?),
        (None, Some(path)) => EntityKind::from_definition_file(path)
            .with_context(|| format!("Failed to load definition: {}", path.display())),
        _ => bail!("exactly one of --kind or --definition is required"),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let writer = SqliteWriter::open(&args.db)
        .with_context(|| format!("Failed to open SQLite database: {}", args.db.display()))?;
    let values = writer
        .read_nested_column(&args.table, &args.column)
        .with_context(|| format!("Failed to read {}.{}", args.table, args.column))?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for value in values {
        match &args.key {
            Some(key) => {
                let Value::Array(items) = value else {
                    bail!("{} holds a non-list value; --key needs lists of objects", args.column);
                };
                for (i, item) in items.iter().enumerate() {
                    let text = item
                        .get(key)
                        .and_then(Value::as_str)
                        .with_context(|| format!("element {i} has no string member '{key}'"))?;
                    writeln!(out, "{text}")?;
                }
            }
            None => writeln!(out, "{}", serde_json::to_string(&value)?)?,
        }
    }

    out.flush()?;
    Ok(())
}
