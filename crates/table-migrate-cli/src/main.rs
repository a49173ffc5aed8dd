//! table-migrate CLI - single-table migration between relational databases.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use table_migrate::{
    map_type, Config, ConnectionDescriptor, Dialect, MigrateError, MigrationSettings, Orchestrator,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "table-migrate")]
#[command(about = "Copy one table between MySQL, PostgreSQL, SQL Server, Oracle and SAP HANA")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the configured table from source to target
    Run {
        /// Override source table
        #[arg(long)]
        source_table: Option<String>,

        /// Override target table
        #[arg(long)]
        target_table: Option<String>,

        /// Override rows per committed batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override row filter (native WHERE expression)
        #[arg(long)]
        filter: Option<String>,

        /// Comma-separated columns to copy, in order
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Create the target table from the source definition
        #[arg(long)]
        create_target_table: bool,

        /// Empty the target table before copying
        #[arg(long)]
        truncate_target_table: bool,
    },

    /// Test database connections
    HealthCheck,

    /// List tables in the source (or target) schema
    ListTables {
        /// Inspect the target database instead of the source
        #[arg(long)]
        target: bool,
    },

    /// Show column metadata for a table
    Describe {
        /// Table name
        table: String,

        /// Inspect the target database instead of the source
        #[arg(long)]
        target: bool,
    },

    /// Count rows in a table
    Count {
        /// Table name [default: the configured migration table]
        #[arg(long)]
        table: Option<String>,

        /// Native WHERE expression
        #[arg(long)]
        filter: Option<String>,

        /// Count in the target database instead of the source
        #[arg(long)]
        target: bool,
    },

    /// Show how a column type maps between two dialects
    MapType {
        /// Source column type, e.g. "DECIMAL(10,2)"
        data_type: String,

        /// Source dialect
        #[arg(long)]
        from: String,

        /// Target dialect
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    // Type mapping is offline and does not need a config file
    if let Commands::MapType {
        data_type,
        from,
        to,
    } = &cli.command
    {
        let source: Dialect = from.parse()?;
        let target: Dialect = to.parse()?;
        let mapping = map_type(source, target, data_type);
        if cli.output_json {
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        } else {
            println!("{}", mapping.target_type);
            if let Some(warning) = &mapping.warning {
                eprintln!("warning: {}", warning);
            }
        }
        return Ok(0);
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let orchestrator = Orchestrator::new();

    match cli.command {
        Commands::MapType { .. } => unreachable!(), // Handled above

        Commands::Run {
            source_table,
            target_table,
            batch_size,
            filter,
            columns,
            create_target_table,
            truncate_target_table,
        } => {
            let mut config = config;

            // Apply overrides
            let mut migration = match (config.migration.take(), source_table) {
                (Some(mut m), Some(table)) => {
                    m.source_table = table;
                    m
                }
                (Some(m), None) => m,
                (None, Some(table)) => MigrationSettings::new(table),
                (None, None) => {
                    return Err(MigrateError::Config(
                        "migration section or --source-table is required".to_string(),
                    ))
                }
            };
            if let Some(table) = target_table {
                migration.target_table = Some(table);
            }
            if let Some(size) = batch_size {
                migration.batch_size = size;
            }
            if let Some(f) = filter {
                migration.filter = Some(f);
            }
            if let Some(cols) = columns {
                migration.columns = cols.into_iter().map(|c| c.trim().to_string()).collect();
            }
            migration.create_target_table |= create_target_table;
            migration.truncate_target_table |= truncate_target_table;
            config.migration = Some(migration);

            let request = config.into_request()?;
            let result = orchestrator.migrate(&request).await;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!(
                    "\n{}",
                    if result.success { "Migration completed!" } else { "Migration failed!" }
                );
                println!("  Table: {} -> {}", result.source_table, result.target_table);
                println!("  Duration: {:.2}s", result.elapsed_ms as f64 / 1000.0);
                println!("  Rows read: {}", result.total);
                println!("  Rows migrated: {}", result.migrated);
                println!("  Rows failed: {}", result.failed);
                println!("  Batches committed: {}", result.batches_committed);
                if let Some(ref err) = result.error {
                    println!("  Error: {}", err);
                }
            }

            Ok(result.exit_code())
        }

        Commands::HealthCheck => {
            let source = check(&orchestrator, &config.source).await;
            let target = check(&orchestrator, &config.target).await;

            if cli.output_json {
                let report = serde_json::json!({
                    "healthy": source.is_ok() && target.is_ok(),
                    "source": check_report(&config.source, &source),
                    "target": check_report(&config.target, &target),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                print_check("Source", &config.source, &source);
                print_check("Target", &config.target, &target);
                println!(
                    "\n  Overall: {}",
                    if source.is_ok() && target.is_ok() { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            source?;
            target?;
            Ok(0)
        }

        Commands::ListTables { target } => {
            let descriptor = pick(&config, target);
            let tables = orchestrator.list_tables(descriptor).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
            }
            Ok(0)
        }

        Commands::Describe { table, target } => {
            let descriptor = pick(&config, target);
            let described = orchestrator.describe_table(descriptor, &table).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&described)?);
            } else {
                println!("{} ({} columns)", described.name, described.columns.len());
                for col in &described.columns {
                    println!(
                        "  {:<30} {:<24} {}{}",
                        col.name,
                        col.data_type,
                        if col.is_nullable { "NULL" } else { "NOT NULL" },
                        if col.is_primary_key { "  PK" } else { "" }
                    );
                }
            }
            Ok(0)
        }

        Commands::Count {
            table,
            filter,
            target,
        } => {
            let migration = config.migration.as_ref();
            let table = match table {
                Some(t) => t,
                None => migration
                    .map(|m| {
                        if target {
                            m.target_table.clone().unwrap_or_else(|| m.source_table.clone())
                        } else {
                            m.source_table.clone()
                        }
                    })
                    .ok_or_else(|| {
                        MigrateError::Config(
                            "--table is required without a migration section".to_string(),
                        )
                    })?,
            };
            let filter = filter.or_else(|| migration.and_then(|m| m.filter.clone()));

            let descriptor = pick(&config, target);
            let count = orchestrator
                .count_records(descriptor, &table, filter.as_deref())
                .await?;

            if cli.output_json {
                let report = serde_json::json!({ "table": table, "count": count });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}: {} rows", table, count);
            }
            Ok(0)
        }
    }
}

fn pick(config: &Config, target: bool) -> &ConnectionDescriptor {
    if target {
        &config.target
    } else {
        &config.source
    }
}

async fn check(
    orchestrator: &Orchestrator,
    descriptor: &ConnectionDescriptor,
) -> Result<u64, MigrateError> {
    let start = std::time::Instant::now();
    orchestrator.test_connection(descriptor).await?;
    Ok(start.elapsed().as_millis() as u64)
}

fn check_report(
    descriptor: &ConnectionDescriptor,
    result: &Result<u64, MigrateError>,
) -> serde_json::Value {
    match result {
        Ok(latency_ms) => serde_json::json!({
            "dialect": descriptor.dialect,
            "connected": true,
            "latency_ms": latency_ms,
        }),
        Err(e) => serde_json::json!({
            "dialect": descriptor.dialect,
            "connected": false,
            "error": e.to_string(),
        }),
    }
}

fn print_check(label: &str, descriptor: &ConnectionDescriptor, result: &Result<u64, MigrateError>) {
    match result {
        Ok(latency_ms) => println!("  {} ({}): OK ({}ms)", label, descriptor.dialect, latency_ms),
        Err(e) => {
            println!("  {} ({}): FAILED", label, descriptor.dialect);
            println!("    Error: {}", e);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries results only
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
