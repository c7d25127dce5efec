use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

use tsql_lineage::{analyze_file, ParseResult, SqlVersion};

#[derive(Parser)]
#[command(name = "tsql-lineage")]
#[command(author, version, about = "Table and procedure lineage for T-SQL scripts")]
struct Cli {
    /// SQL files, or directories to search for *.sql files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// SQL Server grammar version (80, 90, 100, 110, 120, 130, 140)
    #[arg(short, long, default_value = "120")]
    sql_version: SqlVersion,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// JSON document written for each analyzed file
#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    result: &'a ParseResult,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let files = collect_sql_files(&cli.paths)?;
    tracing::debug!(files = files.len(), version = %cli.sql_version, "analyzing scripts");

    let outcomes: Vec<_> = files
        .par_iter()
        .map(|path| (path, analyze_file(path, cli.sql_version)))
        .collect();

    let mut failed = false;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => print_result(path, &result, cli.format)?,
            Err(e) => {
                eprintln!("Error: {:#}", anyhow::Error::new(e));
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Expand directories into their `*.sql` files, sorted by path.
fn collect_sql_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry =
                entry.with_context(|| format!("Failed to read directory {}", path.display()))?;
            let is_sql = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
            if entry.file_type().is_file() && is_sql {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn print_result(path: &Path, result: &ParseResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("== {} ==", path.display());
            print!("{}", result);
            for error in result.parse_errors() {
                println!("\tParsing error :: {}", error);
            }
            println!();
        }
        OutputFormat::Json => {
            let report = FileReport { path, result };
            let json = serde_json::to_string_pretty(&report)
                .with_context(|| format!("Failed to serialize result for {}", path.display()))?;
            println!("{}", json);
        }
    }
    Ok(())
}
