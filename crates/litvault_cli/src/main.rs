//! `litvault` command-line entry point.
//!
//! # Responsibility
//! - Parse commands, load configuration once and wire the core services.
//! - Map outcomes to exit codes: 0 success, 1 user or runtime error, 2 configuration error.

use clap::{Args, Parser, Subcommand};
use litvault_core::config::load_dotenv;
use litvault_core::db::open_db;
use litvault_core::service::ingest_service::ImportSummary;
use litvault_core::{
    core_version, default_log_level, init_logging, logging_status, AnswerSynthesizer, AppConfig,
    CollectionStore, ContextBuilder, ImportOutcome, IngestService, LiteratureRecord,
    MetadataExtractor, OpenAiClient, PdfTextReader, QueryService, SqliteCollectionStore,
};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "litvault", version, about = "Import papers into collections and ask questions about them")]
struct Cli {
    /// SQLite database file (overrides LITVAULT_DB).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import PDF documents into a collection.
    Import(ImportArgs),
    /// List collections, or the records of one collection.
    List {
        #[arg(long)]
        collection: Option<String>,
    },
    /// Ask a question about one collection.
    Search {
        #[arg(long)]
        collection: String,
        question: String,
    },
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["dir", "file"])))]
struct ImportArgs {
    #[arg(long)]
    collection: String,
    /// Directory scanned (non-recursively) for `.pdf` files.
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Single document to import.
    #[arg(long)]
    file: Option<PathBuf>,
}

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    load_dotenv();
    ExitCode::from(execute(Cli::parse(), |key| std::env::var(key).ok()))
}

/// Runs one parsed command with configuration read through `lookup`; returns the exit status.
fn execute(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> u8 {
    let config = match AppConfig::from_lookup(lookup) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return EXIT_CONFIG;
        }
    };
    let config = match cli.db.clone() {
        Some(db) => config.with_db_path(db),
        None => config,
    };

    start_logging(&config);
    if let Some((level, log_dir)) = logging_status() {
        info!(
            "event=cli_start module=cli status=ok core_version={} level={} log_dir={}",
            core_version(),
            level,
            log_dir.display()
        );
    }

    match run(cli.command, &config) {
        Ok(()) => 0,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            EXIT_FAILURE
        }
    }
}

fn start_logging(config: &AppConfig) {
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    let result = config
        .resolved_log_dir()
        .map_err(|err| err.to_string())
        .and_then(|dir| init_logging(level, &dir).map_err(|err| err.to_string()));
    if let Err(message) = result {
        eprintln!("warning: file logging disabled: {message}");
    }
}

fn run(command: Command, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.db_path)?;
    let store = SqliteCollectionStore::try_new(&conn)?;

    match command {
        Command::Import(args) => import(&store, config, args),
        Command::List { collection: None } => list_collections(&store),
        Command::List {
            collection: Some(name),
        } => list_records(&store, &name),
        Command::Search {
            collection,
            question,
        } => search(&store, config, &collection, &question),
    }
}

fn import(
    store: &SqliteCollectionStore<'_>,
    config: &AppConfig,
    args: ImportArgs,
) -> Result<(), Box<dyn Error>> {
    let client = OpenAiClient::new(&config.oracle)?;
    info!(
        "event=cli_import module=cli status=start model={}",
        client.model()
    );
    let extractor = MetadataExtractor::new(client, config.max_document_chars);
    let service = IngestService::new(store, PdfTextReader, extractor);

    let summary = match (&args.dir, &args.file) {
        (Some(dir), _) => service.import_directory(&args.collection, dir)?,
        (None, Some(file)) => service.import_file(&args.collection, file)?,
        (None, None) => return Err("either --dir or --file is required".into()),
    };
    print_import_summary(&args.collection, &summary);
    Ok(())
}

fn print_import_summary(collection: &str, summary: &ImportSummary) {
    for outcome in &summary.outcomes {
        let name = outcome
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match outcome {
            ImportOutcome::Imported {
                record_id, title, ..
            } => println!("imported  {name} -> #{record_id} {title}"),
            ImportOutcome::SkippedDuplicate {
                existing_record,
                existing_collection,
                ..
            } => {
                let record = existing_record.map_or_else(String::new, |id| format!(" as #{id}"));
                let owner = existing_collection
                    .as_deref()
                    .map_or_else(String::new, |name| format!(" in `{name}`"));
                println!("skipped   {name} (already imported{record}{owner})");
            }
            ImportOutcome::Failed { reason, .. } => println!("failed    {name}: {reason}"),
        }
    }
    println!(
        "collection `{collection}`: {} imported, {} duplicates, {} failed",
        summary.imported, summary.duplicates, summary.failed
    );
}

fn list_collections(store: &SqliteCollectionStore<'_>) -> Result<(), Box<dyn Error>> {
    let collections = store.list_collections()?;
    if collections.is_empty() {
        println!("no collections yet");
        return Ok(());
    }
    for collection in collections {
        println!("{}\t{} records", collection.name, collection.record_count);
    }
    Ok(())
}

fn list_records(store: &SqliteCollectionStore<'_>, name: &str) -> Result<(), Box<dyn Error>> {
    let records = store.list_records(name)?;
    if records.is_empty() {
        println!("collection `{name}` is empty");
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn search(
    store: &SqliteCollectionStore<'_>,
    config: &AppConfig,
    collection: &str,
    question: &str,
) -> Result<(), Box<dyn Error>> {
    let client = OpenAiClient::new(&config.oracle)?;
    let service = QueryService::new(
        store,
        AnswerSynthesizer::new(client),
        ContextBuilder::new(config.max_context_chars),
    );

    let answer = service.search(collection, question)?;
    println!("{}", answer.answer);
    if answer.context_truncated {
        println!(
            "\n(note: {} records did not fit the context and were not consulted)",
            answer.omitted_records
        );
    }
    if !answer.cited_records.is_empty() {
        println!("\nCited records:");
        for record in &answer.cited_records {
            print_record(record);
        }
    }
    Ok(())
}

fn print_record(record: &LiteratureRecord) {
    println!("#{} {}", record.id, record.title);
    println!(
        "    {} | {} | {}",
        record.year_label(),
        record.journal,
        record.authors
    );
    println!("    {}", record.file_path);
}
