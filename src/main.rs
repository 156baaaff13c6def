//! uniquery server binary

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uniquery::backend::{
    CommandBuilder, Executor, MongoExecutor, PgExecutor, QueryBuilder, SqlBuilder,
};
use uniquery::catalog::Registry;
use uniquery::config;
use uniquery::server::{router, AppState, DatabaseKind};

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schema-driven universal query engine")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    listen: SocketAddr,
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, env = "CONFIG_PATH")]
    config: PathBuf,
    #[arg(long, default_value = "postgres", env = "DB_TYPE")]
    db_type: String,
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, env = "MONGODB_URI")]
    mongodb_uri: Option<String>,
    #[arg(long, env = "MONGODB_DATABASE")]
    mongodb_database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load the catalog; an invalid catalog is fatal.
    let model_config = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(models = model_config.models.len(), "loaded model config");
    for model in &model_config.models {
        tracing::info!(
            name = %model.name,
            table = %model.table,
            primary_key = %model.primary_key,
            "registered model"
        );
    }

    let registry = match Registry::load(model_config) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("ERROR: Failed to initialize schema registry: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(models = registry.list_models().len(), "schema registry initialized");

    // Wire the backend selected by DB_TYPE.
    let (builder, executor, database): (
        Arc<dyn QueryBuilder>,
        Option<Arc<dyn Executor>>,
        DatabaseKind,
    ) = match cli.db_type.as_str() {
        "mongodb" => {
            let uri = cli.mongodb_uri.unwrap_or_else(|| {
                eprintln!("ERROR: MONGODB_URI not set");
                std::process::exit(1);
            });
            let db_name = cli.mongodb_database.unwrap_or_else(|| {
                eprintln!("ERROR: MONGODB_DATABASE not set");
                std::process::exit(1);
            });

            let executor = match MongoExecutor::connect(&uri, &db_name).await {
                Ok(executor) => executor,
                Err(e) => {
                    eprintln!("ERROR: Failed to connect to MongoDB: {}", e);
                    std::process::exit(1);
                }
            };
            tracing::info!("MongoDB connection established");

            (
                Arc::new(CommandBuilder::new()),
                Some(Arc::new(executor) as Arc<dyn Executor>),
                DatabaseKind::Mongo,
            )
        }
        "postgres" => {
            let executor = match &cli.database_url {
                Some(url) => match PgExecutor::connect(url).await {
                    Ok(executor) => {
                        tracing::info!("PostgreSQL connection established");
                        Some(Arc::new(executor) as Arc<dyn Executor>)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "could not connect to PostgreSQL, running in SQL-generation-only mode");
                        None
                    }
                },
                None => {
                    tracing::info!("DATABASE_URL not set, running in SQL-generation-only mode");
                    None
                }
            };

            (
                Arc::new(SqlBuilder::new()),
                executor,
                DatabaseKind::Postgres,
            )
        }
        other => {
            eprintln!("ERROR: Unsupported DB_TYPE: {}", other);
            std::process::exit(1);
        }
    };

    let state = AppState::new(registry, builder, executor, database);
    let app = router(state);

    tracing::info!(addr = %cli.listen, "server starting");
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
