// =============================================================================
// Orrery API - Server Entry Point
// =============================================================================

use orrery_api::{create_router, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables, current directory first then the crate
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_filename("crates/api/.env");
    }

    let config = Config::from_env()?;
    let bind_addr = config.bind_address.clone();
    let state = AppState::new(config)?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Orrery API server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
