//! Schema introspection binary
//!
//! Introspects a live database and writes a models.json catalog config.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Configuration error or connection failure

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uniquery::config::ModelConfig;
use uniquery::introspect::mongo::DEFAULT_SAMPLE_SIZE;
use uniquery::introspect::{MongoIntrospector, PgIntrospector};

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate models.json from a live database")]
struct Cli {
    /// Database type: postgres or mongodb
    #[arg(long, default_value = "postgres", env = "DB_TYPE")]
    db_type: String,
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI")]
    mongodb_uri: Option<String>,
    /// MongoDB database name
    #[arg(long, env = "MONGODB_DATABASE")]
    mongodb_database: Option<String>,
    /// Output path for the generated config
    #[arg(long, default_value = "configs/models.json")]
    output: PathBuf,
    /// Comma-separated table names (postgres; default: all tables)
    #[arg(long)]
    tables: Option<String>,
    /// Comma-separated collection names (mongodb; default: all collections)
    #[arg(long)]
    collections: Option<String>,
    /// Documents to sample per collection (mongodb)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match cli.db_type.as_str() {
        "postgres" => generate_postgres(&cli).await,
        "mongodb" => generate_mongodb(&cli).await,
        other => {
            eprintln!("ERROR: Unsupported database type: {}", other);
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&config) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("ERROR: Failed to serialize models: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("ERROR: Failed to create output directory: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = std::fs::write(&cli.output, json) {
        eprintln!("ERROR: Failed to write models file: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        models = config.models.len(),
        output = %cli.output.display(),
        "models generated"
    );
    println!("Models generated successfully at: {}", cli.output.display());
}

async fn generate_postgres(cli: &Cli) -> ModelConfig {
    let url = match &cli.database_url {
        Some(url) => url.clone(),
        None => {
            eprintln!("ERROR: Database URL not provided");
            eprintln!("Pass --database-url or set the DATABASE_URL environment variable");
            std::process::exit(1);
        }
    };

    tracing::info!("connecting to PostgreSQL");
    let introspector = match PgIntrospector::connect(&url).await {
        Ok(i) => i,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("introspecting database schema");
    match introspector.introspect(split_names(&cli.tables)).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: Failed to generate models: {}", e);
            std::process::exit(1);
        }
    }
}

async fn generate_mongodb(cli: &Cli) -> ModelConfig {
    let uri = match &cli.mongodb_uri {
        Some(uri) => uri.clone(),
        None => {
            eprintln!("ERROR: MongoDB URI not provided");
            eprintln!("Pass --mongodb-uri or set the MONGODB_URI environment variable");
            std::process::exit(1);
        }
    };
    let db_name = match &cli.mongodb_database {
        Some(name) => name.clone(),
        None => {
            eprintln!("ERROR: MongoDB database name not provided");
            eprintln!("Pass --mongodb-database or set the MONGODB_DATABASE environment variable");
            std::process::exit(1);
        }
    };

    tracing::info!("connecting to MongoDB");
    let introspector = match MongoIntrospector::connect(&uri, &db_name).await {
        Ok(i) => i,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(sample_size = cli.sample_size, "sampling collections");
    match introspector
        .introspect(split_names(&cli.collections), cli.sample_size)
        .await
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: Failed to generate models: {}", e);
            std::process::exit(1);
        }
    }
}

fn split_names(names: &Option<String>) -> Option<Vec<String>> {
    names.as_ref().map(|s| {
        s.split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    })
}
