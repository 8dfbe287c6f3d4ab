// =============================================================================
// Orrery API - Library Root
// =============================================================================
// Table of Contents:
// 1. Modules
// 2. Application State
// 3. Router Setup
// =============================================================================

pub mod bodies;
pub mod config;
pub mod error;
pub mod extract;
pub mod handle;
pub mod integrate;
pub mod simulations;
pub mod store;
pub mod trajectory;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::config::{Config, ConfigError};
pub use crate::error::ApiError;
pub use crate::store::SimulationStore;

// -----------------------------------------------------------------------------
// 2. Application State
// -----------------------------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SimulationStore>,
}

impl AppState {
    /// Open the store under `config.data_dir`.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let store = SimulationStore::open(&config.data_dir)?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
        })
    }
}

// -----------------------------------------------------------------------------
// 3. Router Setup
// -----------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Simulation lifecycle
        .route("/simulations", get(simulations::list_simulations))
        .route("/simulation", post(simulations::create_simulation))
        .route("/simulation/:id", get(simulations::get_simulation))
        // Bodies
        .route("/simulation/:id/primary", post(simulations::add_primary))
        .route(
            "/simulation/:id/body",
            post(simulations::add_body).patch(simulations::update_body),
        )
        .route(
            "/simulation/:id/body/elements",
            post(simulations::add_body_from_elements),
        )
        // Time evolution
        .route("/simulation/:id/integrate", post(simulations::integrate))
        .route("/simulation/:id/prediction", get(simulations::get_prediction))
        .route("/simulation/:id/trajectory", get(simulations::get_trajectory))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
