//! Promitto - connection level service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promitto::{
    config::Args,
    db::{MemoryStore, MongoClient, MongoStore, Store},
    server::{self, AppState},
    services::LevelService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("promitto={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Promitto - connection levels");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
    match args.day_utc_offset_minutes {
        Some(minutes) => info!("Day boundary: UTC{:+} minutes", minutes),
        None => info!("Day boundary: server local time"),
    }
    info!("======================================");

    // MongoDB is optional in dev mode
    let (store, storage): (Arc<dyn Store>, &'static str) =
        match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                (Arc::new(MongoStore::new(&client).await?) as Arc<dyn Store>, "mongodb")
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                    (Arc::new(MemoryStore::new()) as Arc<dyn Store>, "memory")
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    let jwt = args.jwt_validator()?;
    let service = LevelService::new(store, Arc::new(args.day_clock()))
        .with_save_retries(args.save_retries);

    let state = Arc::new(AppState::new(args, service, jwt, storage));
    server::run(state).await?;

    Ok(())
}
