//! Abyss HTTP server
//!
//! Serves public profiles, posts and the sitemap, plus an authenticated
//! dashboard API for authors.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ABYSS_CONFIG`: Path to config file (default: ~/.config/abyss/config.yaml)
//! - `ABYSS_PORT`: Port to listen on (default: 8080)
//! - `ABYSS_DATABASE_PATH`: SQLite database (default: ~/.local/share/abyss/abyss.db)
//! - `ABYSS_BASE_URL`: Public site root used in the sitemap
//!
//! # Config File Format
//!
//! ```yaml
//! base_url: "https://blog.example"
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "user1"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use abyss::config::Config;
use abyss::db::init_db;
use abyss::server::{router, ApiKeyStore, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abyss=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("ABYSS_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path)?;

    match &config.config_file {
        Some(path) => tracing::info!("Config file: {}", path.display()),
        None => tracing::info!("No config file found, using defaults"),
    }
    tracing::info!("Database: {}", config.database_path.value.display());

    let repo = init_db(&config.database_path.value).await?;
    let api_keys = ApiKeyStore::from_entries(&config.api_keys);

    let state = AppState {
        repo: Arc::new(repo),
        api_keys: Arc::new(api_keys),
        base_url: config.base_url.value.clone(),
    };

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port.value));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
