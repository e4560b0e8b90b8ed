//! MicroShell Backend - authentication and user management API

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use microshell_backend::{
    api::{create_router, AppState},
    auth::{JwtHandler, UserStore},
    config::AppConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::parse();
    info!("🚀 MicroShell backend starting");

    let db_path = config.db_path();
    let store = Arc::new(UserStore::open(&db_path)?);
    info!("🔐 Credential store initialized at: {}", db_path);

    let jwt = Arc::new(
        JwtHandler::new(
            &config.signing_secret()?,
            config.access_ttl()?,
            config.refresh_ttl()?,
        )
        .context("token codec configuration")?,
    );
    let state = AppState::new(store, config.hasher(), jwt)?;
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "microshell_backend=debug,microshell=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the crate-root .env when launched from elsewhere
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../.env")];

    for p in candidates {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}
