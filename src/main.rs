//! Forms API - Main Entry Point

use forms_api::store::SqliteStore;
use forms_api::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Forms API v{}", env!("CARGO_PKG_VERSION"));

    let db_path = std::env::var("FORMS_DB").unwrap_or_else(|_| "forms.db".into());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let store = SqliteStore::open(&db_path)?;
    tracing::info!("store opened at {db_path}");

    let router = build_router(AppState { store });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
