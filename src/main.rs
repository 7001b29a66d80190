//! Gatehouse - user account service

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gatehouse::{
    auth::JwtValidator,
    config::Args,
    db::MongoClient,
    server,
    store::{CredentialStore, MemoryCredentialStore, MongoCredentialStore},
    AccountService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gatehouse={},info", args.log_level).into());
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

    args.validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Configuration error")?;

    info!("======================================");
    info!("  Gatehouse - user account service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Token expiry: {}s", args.jwt_expiry_seconds);
    info!("======================================");

    let secret = args
        .jwt_secret()
        .context("JWT_SECRET is required in production mode")?;
    if args.jwt_secret.is_none() {
        warn!("JWT_SECRET not set, using the development signing secret");
    }

    let tokens = JwtValidator::new(&secret, args.jwt_expiry_seconds)
        .context("Invalid token configuration")?;

    // Connect to MongoDB (memory fallback in dev mode)
    let store: Arc<dyn CredentialStore> = match connect_store(&args).await {
        Ok(store) => {
            info!("MongoDB connected successfully");
            store
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryCredentialStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                return Err(e).context("MongoDB connection failed");
            }
        }
    };

    let accounts = AccountService::new(store, tokens);
    let state = Arc::new(server::AppState::new(args, accounts));

    server::run(state).await.context("Server error")?;

    Ok(())
}

async fn connect_store(args: &Args) -> gatehouse::Result<Arc<dyn CredentialStore>> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    let store = MongoCredentialStore::new(client).await?;
    Ok(Arc::new(store))
}
