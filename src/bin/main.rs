//! sqlsage CLI - Ask questions of a database in plain English
//!
//! Usage:
//!   sqlsage ask "how many orders were placed last month?"
//!   sqlsage schema --connection dev
//!   sqlsage profile --connection dev
//!   sqlsage models
//!   sqlsage exec "SELECT COUNT(*) FROM orders"
//!   sqlsage serve --port 8000        (requires the `ui` feature)

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sqlsage::config::{ConnectionConfig, Settings};
use sqlsage::profile::ProfileValues;
use sqlsage::service::{QueryResult, QueryService};

#[derive(Parser)]
#[command(name = "sqlsage")]
#[command(about = "Ask questions of a PostgreSQL or MySQL database in plain English")]
#[command(version)]
struct Cli {
    /// Named connection from the config file (defaults to "default" or
    /// the first one defined)
    #[arg(short, long, global = true)]
    connection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a natural-language question and run the generated SQL
    Ask {
        /// The question
        question: String,

        /// Model to use (overrides the configured default)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print the extracted schema of the configured database
    Schema,

    /// Print column value profiles of the configured database
    Profile,

    /// List models installed on the generation backend
    Models,

    /// Validate and execute a read-only SQL statement
    Exec {
        /// The SQL statement
        sql: String,
    },

    /// Fetch sample rows from one table
    Sample {
        /// Table name
        table: String,

        /// Row limit
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: i64,
    },

    /// Start the HTTP API server
    #[cfg(feature = "ui")]
    Serve {
        /// Listen port (overrides the configured default)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Ask { question, model } => {
            cmd_ask(settings, cli.connection, question, model).await
        }
        Commands::Schema => cmd_schema(settings, cli.connection).await,
        Commands::Profile => cmd_profile(settings, cli.connection).await,
        Commands::Models => cmd_models(settings).await,
        Commands::Exec { sql } => cmd_exec(settings, cli.connection, sql).await,
        Commands::Sample { table, limit } => {
            cmd_sample(settings, cli.connection, table, limit).await
        }
        #[cfg(feature = "ui")]
        Commands::Serve { port } => cmd_serve(settings, port).await,
    }
}

/// Resolve the connection to use from the flag or the config defaults.
fn resolve_connection(
    settings: &Settings,
    name: Option<&str>,
) -> Result<ConnectionConfig, String> {
    match name {
        Some(name) => settings
            .get_connection(name)
            .and_then(|c| c.resolve())
            .map_err(|e| e.to_string()),
        None => match settings.default_connection() {
            Some((_, conn)) => conn.resolve().map_err(|e| e.to_string()),
            // Fall back to SQLSAGE_DB_* environment variables
            None => ConnectionConfig::from_env().map_err(|e| {
                format!(
                    "no connections configured ({}); add a [connections.<name>] \
                     section to sqlsage.toml or set the SQLSAGE_DB_* variables",
                    e
                )
            }),
        },
    }
}

fn build_service(settings: Settings) -> Result<QueryService, String> {
    QueryService::new(settings).map_err(|e| e.to_string())
}

async fn cmd_ask(
    settings: Settings,
    connection: Option<String>,
    question: String,
    model: Option<String>,
) -> ExitCode {
    let config = match resolve_connection(&settings, connection.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = service.answer_question(&config, &question, model.as_deref()).await;
    print_result(&result)
}

async fn cmd_schema(settings: Settings, connection: Option<String>) -> ExitCode {
    let config = match resolve_connection(&settings, connection.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.load_context(&config).await {
        Ok(entry) => {
            println!("Database: {}", entry.database);
            println!("Tables: {}", entry.schema.table_count());
            for table in &entry.schema.tables {
                println!();
                println!("TABLE {}", table.name);
                for column in &table.columns {
                    let pk = if table.primary_keys.contains(&column.name) {
                        " [PK]"
                    } else {
                        ""
                    };
                    let null = if column.nullable { "" } else { " NOT NULL" };
                    println!("  {} {}{}{}", column.name, column.declared_type, null, pk);
                }
                for fk in &table.foreign_keys {
                    println!(
                        "  FK {} -> {}.{}",
                        fk.local_column, fk.referenced_table, fk.referenced_column
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_profile(settings: Settings, connection: Option<String>) -> ExitCode {
    let config = match resolve_connection(&settings, connection.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.load_context(&config).await {
        Ok(entry) => {
            for (table, profile) in &entry.profile.tables {
                println!("{} ({} rows)", table, profile.row_count);
                for (column, cp) in &profile.columns {
                    match &cp.values {
                        ProfileValues::Enumeration(values) => {
                            let rendered: Vec<String> = values
                                .iter()
                                .map(|v| format!("{} ({})", v.value, v.count))
                                .collect();
                            println!("  {}: {}", column, rendered.join(", "));
                        }
                        ProfileValues::Samples(samples) => {
                            println!(
                                "  {}: {} distinct, e.g. {}",
                                column,
                                cp.distinct_count,
                                samples.join(", ")
                            );
                        }
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_models(settings: Settings) -> ExitCode {
    let default_model = settings.generator.model.clone();
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.list_models().await {
        Ok(models) => {
            if models.is_empty() {
                println!("No models installed.");
            }
            for model in models {
                let marker = if model.name == default_model { " (default)" } else { "" };
                println!("{}  {}{}", model.name, model.human_size(), marker);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_exec(settings: Settings, connection: Option<String>, sql: String) -> ExitCode {
    let config = match resolve_connection(&settings, connection.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = service.execute_query(&config, &sql).await;
    print_result(&result)
}

async fn cmd_sample(
    settings: Settings,
    connection: Option<String>,
    table: String,
    limit: i64,
) -> ExitCode {
    let config = match resolve_connection(&settings, connection.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = match build_service(settings) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = service.sample_rows(&config, &table, limit).await;
    print_result(&result)
}

#[cfg(feature = "ui")]
async fn cmd_serve(mut settings: Settings, port: Option<u16>) -> ExitCode {
    if let Some(port) = port {
        settings.server.port = port;
    }
    match sqlsage::web::serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print a result envelope in a terminal-friendly form.
fn print_result(result: &QueryResult) -> ExitCode {
    if let Some(sql) = &result.sql_query {
        println!("SQL: {}", sql);
    }
    if let Some(explanation) = &result.explanation {
        println!("-- {}", explanation);
    }

    if !result.success {
        if let Some(error) = &result.error {
            let kind = result.error_kind.unwrap_or("error");
            eprintln!("[{}] {}", kind, error);
        }
        return ExitCode::FAILURE;
    }

    if !result.columns.is_empty() {
        println!();
        println!("{}", result.columns.join(" | "));
    }
    if let Some(rows) = &result.data {
        for row in rows {
            let rendered: Vec<String> = result
                .columns
                .iter()
                .map(|c| match &row[c.as_str()] {
                    serde_json::Value::Null => "NULL".to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            println!("{}", rendered.join(" | "));
        }
    }
    println!();
    println!("{} row(s)", result.row_count);
    ExitCode::SUCCESS
}
