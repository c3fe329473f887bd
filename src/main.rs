use std::{
    io::{stdin, stdout},
    path::PathBuf,
    process,
};

use clap::{Parser, Subcommand};
use colpack::{
    catalog::{CatalogLookup, InMemoryCatalog, PostgresCatalog},
    cli::CliApp,
    core::PackError,
    sql::{session::context::PackContext, Session},
    util::{parse_level_filter, SimpleLogger},
};
use log::{info, LevelFilter};

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser)]
#[command(
    name = "colpack",
    about = "Reorder PostgreSQL table columns to minimize alignment padding"
)]
struct Cli {
    /// Log packing decisions
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite the CREATE TABLE blocks of a plain-format pg_dump file in place
    Dump {
        path: PathBuf,

        /// Database the dump was taken from
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Read CREATE TABLE statements and print them with packed columns
    Repl {
        /// Database used to resolve non-builtin types
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = std::env::var("COLPACK_LOG")
        .ok()
        .and_then(|value| parse_level_filter(&value))
        .unwrap_or(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    if let Err(e) = log::set_logger(&LOGGER).map(|()| log::set_max_level(level)) {
        eprintln!("Error installing logger: {e}");
        process::exit(2);
    }

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), PackError> {
    match command {
        Command::Dump { path, database_url } => {
            let Some(url) = database_url else {
                eprintln!("dump needs --database-url or DATABASE_URL");
                process::exit(2);
            };
            let session = Session::new(PackContext::new(PostgresCatalog::connect(&url)?));
            session.rewrite_dump_file(&path)?;
            info!("Packed {}", path.display());
            Ok(())
        }
        Command::Repl { database_url } => {
            let catalog: Box<dyn CatalogLookup> = match database_url {
                Some(url) => Box::new(PostgresCatalog::connect(&url)?),
                None => Box::new(InMemoryCatalog::new()),
            };
            let session = Session::new(PackContext::new(catalog));
            CliApp::new(session, stdin().lock(), stdout()).run()
        }
    }
}
