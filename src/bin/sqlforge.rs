//! sqlforge — the sqlforge CLI
//!
//! Compile tabular datasets into SQL artifacts and run query files against a
//! database.
//!
//! # Usage
//!
//! ```bash
//! # Generate DDL and seed DML from a JSON dataset
//! sqlforge schema users.json --out sql/schema.sql
//! sqlforge seed users.json --out sql/seed_data.sql
//!
//! # Run a query file transactionally
//! sqlforge exec sql/schema.sql --no-fetch
//!
//! # Read-only fetch, rendered as a table
//! sqlforge fetch sql/queries/001_view_tables.sql
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlforge::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlforge")]
#[command(version)]
#[command(about = "Compile tabular data to SQL artifacts and run query files", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlforge schema users.json --out sql/schema.sql
    sqlforge seed users.json --out sql/seed_data.sql
    sqlforge exec sql/seed_data.sql --no-fetch
    sqlforge fetch sql/queries/001_view_tables.sql")]
struct Cli {
    /// Database connection URL (overrides the config file)
    #[arg(long, env = "SQLFORGE_DATABASE_URL")]
    database_url: Option<String>,

    /// Path to a TOML config file with dbname/user/password/host/port
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for fetched rows
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a CREATE TABLE artifact from a JSON dataset
    Schema {
        /// Dataset file: {"table": ..., "columns": [...], "rows": [[...]]}
        dataset: PathBuf,
        /// Artifact path (parent directories are created)
        #[arg(short, long, default_value = "sql/schema.sql")]
        out: PathBuf,
    },
    /// Generate INSERT seed statements from a JSON dataset
    Seed {
        /// Dataset file: {"table": ..., "columns": [...], "rows": [[...]]}
        dataset: PathBuf,
        /// Artifact path (parent directories are created)
        #[arg(short, long, default_value = "sql/seed_data.sql")]
        out: PathBuf,
    },
    /// Execute a query file inside a single transaction
    Exec {
        /// SQL file, passed to the driver as one opaque batch
        file: PathBuf,
        /// Don't fetch result rows even if the statement produces them
        #[arg(long)]
        no_fetch: bool,
    },
    /// Fetch a read-only query file as a dataframe
    Fetch {
        /// SQL file, passed to the driver as one opaque batch
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Schema { dataset, out } => {
            let (table, _rows) = load_dataset(dataset)?;
            let sql = generate_schema(&table, out)?;
            println!("{} Wrote schema to {}", "✓".green(), out.display().to_string().cyan());
            println!("{}", sql.white());
        }
        Commands::Seed { dataset, out } => {
            let (table, rows) = load_dataset(dataset)?;
            let sql = generate_seed(&table, &rows, out)?;
            println!(
                "{} Wrote {} insert(s) to {}",
                "✓".green(),
                rows.len(),
                out.display().to_string().cyan()
            );
            println!("{}", sql.white());
        }
        Commands::Exec { file, no_fetch } => {
            let mut manager = ConnectionManager::new(resolve_url(&cli)?);
            let outcome = execute_query_file(&mut manager, file, !no_fetch).await?;
            match outcome {
                ExecOutcome::Committed { rows } => {
                    println!("{} Committed", "✓".green());
                    if let Some(rows) = rows {
                        let df = DataFrame {
                            columns: (1..=rows.first().map_or(0, Vec::len))
                                .map(|i| format!("col{}", i))
                                .collect(),
                            rows,
                        };
                        print_dataframe(&df, &cli.format);
                    }
                }
                ExecOutcome::RolledBack { reason } => {
                    println!("{} Rolled back: {}", "✗".red().bold(), reason);
                    std::process::exit(1);
                }
            }
        }
        Commands::Fetch { file } => {
            let mut manager = ConnectionManager::new(resolve_url(&cli)?);
            let df = fetch_dataframe(&mut manager, file).await?;
            print_dataframe(&df, &cli.format);
        }
    }
    Ok(())
}

fn load_dataset(path: &PathBuf) -> Result<(Table, Vec<Row>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading dataset {}", path.display()))?;
    let dataset = Dataset::from_json(&text)
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    Ok(dataset.into_table()?)
}

fn resolve_url(cli: &Cli) -> Result<String> {
    if let Some(url) = &cli.database_url {
        return Ok(url.clone());
    }
    let config = DbConfig::load(cli.config.as_deref()).context(
        "no database URL; use --database-url, SQLFORGE_DATABASE_URL, or a config file",
    )?;
    Ok(config.url())
}

fn print_dataframe(df: &DataFrame, format: &OutputFormat) {
    if df.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            let out: Vec<serde_json::Map<String, serde_json::Value>> = df
                .rows
                .iter()
                .map(|row| {
                    df.columns
                        .iter()
                        .zip(row)
                        .map(|(name, value)| (name.clone(), cell_to_json(value)))
                        .collect()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Column widths sized to the widest cell.
            let mut widths: Vec<usize> = df.columns.iter().map(String::len).collect();
            for row in &df.rows {
                for (i, value) in row.iter().enumerate() {
                    if let Some(w) = widths.get_mut(i) {
                        *w = (*w).max(cell_to_string(value).len());
                    }
                }
            }

            let header: Vec<String> = df
                .columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in &df.rows {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(v, w)| format!("{:width$}", cell_to_string(v), width = w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", df.len().to_string().cyan());
        }
    }
}

fn cell_to_string(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Text(s) => s.clone(),
        ScalarValue::Timestamp(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.to_string(),
    }
}

fn cell_to_json(value: &ScalarValue) -> serde_json::Value {
    match value {
        ScalarValue::Null => serde_json::Value::Null,
        ScalarValue::Boolean(b) => serde_json::Value::Bool(*b),
        ScalarValue::Integer(n) => serde_json::Value::Number((*n).into()),
        ScalarValue::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ScalarValue::Timestamp(t) => {
            serde_json::Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        ScalarValue::Text(s) => serde_json::Value::String(s.clone()),
    }
}
