use clap::{Parser, Subcommand};
use plp_bookstore::books::generate_books;
use plp_bookstore::client::Client;
use plp_bookstore::config::{AppConfig, CliOverrides, load_config};
use plp_bookstore::errors::DbError;
use plp_bookstore::import::ImportOptions;
use plp_bookstore::{logger, run_queries};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "plp-bookstore", version, about = "Bookstore query runner", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Path to a config file (TOML)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Connection URI: memory://, file://<dir> or a directory")]
    uri: Option<String>,
    #[arg(long, global = true, help = "Database name")]
    db: Option<String>,
    #[arg(long, global = true, help = "Collection name")]
    collection: Option<String>,
    #[arg(long, global = true, help = "Directory for log files")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run the bookstore queries (default)")]
    Run {
        #[arg(long, help = "Seed file loaded when the collection is empty")]
        seed: Option<PathBuf>,
    },
    #[command(about = "Load books into the collection from a file or the generator")]
    Seed {
        #[arg(help = "NDJSON file or JSON array of books")]
        file: Option<PathBuf>,
        #[arg(long, conflicts_with = "file", help = "Insert N generated books instead of a file")]
        generate: Option<usize>,
        #[arg(long, help = "RNG seed for --generate")]
        rng_seed: Option<u64>,
        #[arg(long, help = "Drop the collection first")]
        replace: bool,
        #[arg(long, help = "Skip malformed records instead of failing")]
        skip_errors: bool,
    },
    #[command(about = "Write generated books as NDJSON")]
    Generate {
        #[arg(long, default_value_t = 50)]
        count: usize,
        #[arg(long, help = "RNG seed for reproducible output")]
        seed: Option<u64>,
        #[arg(long, help = "Output file; stdout when omitted")]
        out: Option<PathBuf>,
    },
    #[command(about = "List the collection's indexes")]
    Indexes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match real_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn real_main(cli: Cli) -> Result<(), DbError> {
    let seed_override = match &cli.command {
        Some(Commands::Run { seed }) => seed.clone(),
        _ => None,
    };
    let overrides = CliOverrides {
        uri: cli.uri,
        database: cli.db,
        collection: cli.collection,
        seed_file: seed_override,
        log_dir: cli.log_dir,
        log_level: cli.log_level,
    };
    let cfg = load_config(cli.config.as_deref(), overrides)?;
    if let Err(e) = logger::configure_logging(&cfg.log, logger::dev_log_from_env()) {
        eprintln!("warning: logging disabled: {e}");
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command.unwrap_or(Commands::Run { seed: None }) {
        Commands::Run { .. } => run_queries(&cfg, &mut out).map(|_| ()),
        Commands::Seed { file, generate, rng_seed, replace, skip_errors } => {
            seed(&cfg, file, generate, rng_seed, replace, skip_errors, &mut out)
        }
        Commands::Generate { count, seed, out: path } => {
            let books = generate_books(count, seed);
            let mut sink: Box<dyn Write> = match path {
                Some(p) => Box::new(std::io::BufWriter::new(std::fs::File::create(p)?)),
                None => Box::new(out),
            };
            for b in &books {
                writeln!(sink, "{}", serde_json::to_string(b)?)?;
            }
            sink.flush()?;
            Ok(())
        }
        Commands::Indexes => {
            let client = Client::connect(&cfg.uri)?;
            let books = client.database(&cfg.database).collection(&cfg.collection);
            for ix in books.list_indexes()? {
                writeln!(
                    out,
                    "{} {} keys={} entries={}",
                    ix.name,
                    serde_json::to_string(&ix.key)?,
                    ix.stats.keys,
                    ix.stats.entries
                )?;
            }
            client.close()
        }
    }
}

fn seed<W: Write>(
    cfg: &AppConfig,
    file: Option<PathBuf>,
    generate: Option<usize>,
    rng_seed: Option<u64>,
    replace: bool,
    skip_errors: bool,
    out: &mut W,
) -> Result<(), DbError> {
    let client = Client::connect(&cfg.uri)?;
    let db = client.database(&cfg.database);
    if replace && db.drop_collection(&cfg.collection)? {
        writeln!(out, "Dropped {}.{}", cfg.database, cfg.collection)?;
    }
    let books = db.collection(&cfg.collection);
    let inserted = match (file.or_else(|| cfg.seed_file.clone()), generate) {
        (_, Some(n)) => {
            let docs = generate_books(n, rng_seed).iter().map(|b| b.to_document()).collect::<Vec<_>>();
            books.insert_many(docs)?.len()
        }
        (Some(path), None) => {
            let opts = ImportOptions { skip_errors, ..ImportOptions::default() };
            let report = books.import_file(&path, &opts)?;
            if report.skipped > 0 {
                writeln!(out, "Skipped {} malformed records", report.skipped)?;
            }
            usize::try_from(report.inserted).unwrap_or(usize::MAX)
        }
        (None, None) => {
            return Err(DbError::Config("seed needs a file, --generate N or seed_file".into()));
        }
    };
    writeln!(out, "Inserted {inserted} books into {}", books.namespace())?;
    client.close()
}
