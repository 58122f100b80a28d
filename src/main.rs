//! Turnstile - bearer-token gated account and file service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::{auth::SystemClock, config::Args, db::Database, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("turnstile={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Turnstile");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {:?}", args.database_path);
    info!("Token TTL: {}s", args.token_ttl_seconds);
    info!(
        "Password hashing: argon2id m={} KiB t={} p={}",
        args.hash_memory_kib, args.hash_iterations, args.hash_parallelism
    );
    info!("Max upload: {} bytes", args.max_upload_bytes);
    info!("======================================");

    let db = match Database::open(&args.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::new(args, db, Arc::new(SystemClock)) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
