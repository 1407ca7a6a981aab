//! Gazetteer CLI: import a gazetteer export into SQLite, or scan it.
//!
//! Usage:
//!   gazetteer import <input.json> [--db path] [--dry-run] [--skip N] [--limit N] [--flags LETTERS]
//!   gazetteer scan <input.json> <output-dir>

use clap::{Parser, Subcommand};
use gazetteer::writer::DEFAULT_BATCH_SIZE;
use gazetteer::{
    scan, BarProgress, CancellationToken, ChildFlags, ImportOptions, ImportReport, Importer,
    NullSink, OpenStore, PlaceReader, ProgressSink, SqliteStore,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "gazetteer",
    version,
    about = "Streaming gazetteer graph importer"
)]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log errors only and hide the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import places into a SQLite database
    Import {
        /// Gazetteer JSON export
        input: PathBuf,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Read, adapt and resolve without writing
        #[arg(long)]
        dry_run: bool,
        /// Records to skip before importing
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Maximum records to import (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
        /// Child kinds to export: F C O L E A R N M T, 0 clears
        #[arg(long)]
        flags: Option<String>,
        /// Places per write transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Collect string metrics and lookups without importing
    Scan {
        /// Gazetteer JSON export
        input: PathBuf,
        /// Directory for the report file
        output: PathBuf,
    },
}

/// Get the default database path (~/.local/share/gazetteer/gazetteer.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("gazetteer").join("gazetteer.db")
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: cannot install logger: {}", e);
    }
}

fn open_reader(input: &Path) -> Result<PlaceReader, i32> {
    PlaceReader::open(input).map_err(|e| {
        eprintln!("Error: cannot read '{}': {}", input.display(), e);
        1
    })
}

fn print_report(report: &ImportReport, json: bool) -> i32 {
    if !json {
        print!("{}", report);
        return 0;
    }
    match serde_json::to_string_pretty(report) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_import(
    input: &Path,
    db: Option<PathBuf>,
    options: ImportOptions,
    json: bool,
    quiet: bool,
) -> i32 {
    let reader = match open_reader(input) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let mut bar = (!quiet).then(|| BarProgress::new(reader.length()));
    let progress = bar.as_mut().map(|b| b as &mut dyn ProgressSink);
    let cancel = CancellationToken::new();
    let dry_run = options.dry_run;
    let mut importer = Importer::new(reader, options);

    let result = if dry_run {
        importer.import(&NullSink, &cancel, progress)
    } else {
        let db_path = db.unwrap_or_else(default_db_path);
        let store = match SqliteStore::open(&db_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: failed to open database '{}': {}", db_path.display(), e);
                return 1;
            }
        };
        if let Err(e) = store.clear() {
            eprintln!("Error: failed to clear database: {}", e);
            return 1;
        }
        info!(db = %db_path.display(), "importing");
        importer.import(&store, &cancel, progress)
    };

    match result {
        Ok(report) => {
            if let Some(bar) = &bar {
                bar.finish(format!("{} places imported", report.places_imported));
            }
            print_report(&report, json)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_scan(input: &Path, output: &Path, quiet: bool) -> i32 {
    let mut reader = match open_reader(input) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let mut bar = (!quiet).then(|| BarProgress::new(reader.length()));
    let progress = bar.as_mut().map(|b| b as &mut dyn ProgressSink);
    let report = scan(&mut reader, progress);
    if let Some(bar) = &bar {
        bar.finish(format!("{} places read", report.places));
    }

    match report.save(output) {
        Ok(path) => {
            println!("Places read: {}", report.places);
            println!("Report written to {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: cannot write report: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match cli.command {
        Commands::Import {
            input,
            db,
            dry_run,
            skip,
            limit,
            flags,
            batch_size,
            json,
        } => {
            let options = ImportOptions {
                skip,
                limit,
                dry_run,
                flags: flags.as_deref().map_or(ChildFlags::ALL, ChildFlags::from_letters),
                batch_size,
            };
            cmd_import(&input, db, options, json, cli.quiet)
        }
        Commands::Scan { input, output } => cmd_scan(&input, &output, cli.quiet),
    };
    std::process::exit(code);
}
