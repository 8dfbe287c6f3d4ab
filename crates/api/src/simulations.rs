// =============================================================================
// Orrery API - Simulation Endpoints
// =============================================================================
// One handler per operation. Each one is a single store call wrapping a body
// builder, integrator or sampler function; engine work runs on the blocking
// pool under the simulation's lock.
// =============================================================================

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use orrery_engine::{IntegratorKind, ParticleRef, SimulationConfig};
use serde::{Deserialize, Serialize};

use crate::bodies::{self, ElementsInput};
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidQuery};
use crate::handle::{parse_body_ref, BodyRef, SystemState};
use crate::integrate::{self, Prediction};
use crate::store::SimulationSummary;
use crate::trajectory::{self, Sample};
use crate::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSimulationRequest {
    pub name: Option<String>,
    #[serde(rename = "G")]
    pub g: Option<f64>,
    pub dt: Option<f64>,
    pub integrator: Option<IntegratorKind>,
    pub exit_max_distance: Option<f64>,
    pub exit_min_distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AddPrimaryRequest {
    pub mass: f64,
    pub radius: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddBodyRequest {
    pub mass: f64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub radius: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElementsRequest {
    pub primary_id: Option<ParticleRef>,
    pub mass: f64,
    #[serde(flatten)]
    pub elements: ElementsInput,
    pub radius: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBodyRequest {
    pub body: ParticleRef,
    pub mass: Option<f64>,
    pub position: Option<[f64; 3]>,
    pub velocity: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
pub struct IntegrateRequest {
    pub time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryQuery {
    pub start_time: Option<f64>,
    pub end_time: f64,
    pub steps: i64,
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    pub time: f64,
    pub target: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryResponse {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub steps: i64,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub simulations: Vec<SimulationSummary>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List stored simulations.
pub async fn list_simulations(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let simulations = state.store.list().await?;
    Ok(Json(ListResponse { simulations }))
}

/// Create an empty simulation. An empty request body means all defaults.
pub async fn create_simulation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SystemState>), ApiError> {
    let req: CreateSimulationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSimulationRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid(format!("Failed to parse the request body as JSON: {}", e)))?
    };

    let mut config = SimulationConfig::default()
        .with_g(req.g.unwrap_or(state.config.gravitational_constant))
        .with_dt(req.dt.unwrap_or(state.config.default_timestep))
        .with_integrator(req.integrator.unwrap_or_default());
    if let Some(distance) = req.exit_max_distance {
        config = config.with_exit_max_distance(distance);
    }
    if let Some(distance) = req.exit_min_distance {
        config = config.with_exit_min_distance(distance);
    }

    let handle = state.store.create(req.name, config).await?;
    Ok((StatusCode::CREATED, Json(handle.state())))
}

/// Load the last saved state.
pub async fn get_simulation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SystemState>, ApiError> {
    let handle = state.store.load(&id).await?;
    Ok(Json(handle.state()))
}

pub async fn add_primary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AddPrimaryRequest>,
) -> Result<(StatusCode, Json<BodyRef>), ApiError> {
    let body = state
        .store
        .with_simulation(&id, move |h| bodies::add_primary(h, req.mass, req.radius, req.name))
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn add_body(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AddBodyRequest>,
) -> Result<(StatusCode, Json<BodyRef>), ApiError> {
    let body = state
        .store
        .with_simulation(&id, move |h| {
            bodies::add_body(h, req.mass, req.position, req.velocity, req.radius, req.name)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn add_body_from_elements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AddElementsRequest>,
) -> Result<(StatusCode, Json<BodyRef>), ApiError> {
    let body = state
        .store
        .with_simulation(&id, move |h| {
            bodies::add_from_elements(h, req.primary_id, req.mass, &req.elements, req.radius, req.name)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn update_body(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateBodyRequest>,
) -> Result<Json<BodyRef>, ApiError> {
    let body = state
        .store
        .with_simulation(&id, move |h| {
            bodies::update_body(h, &req.body, req.mass, req.position, req.velocity)
        })
        .await?;
    Ok(Json(body))
}

/// Integrate forward and persist the result.
pub async fn integrate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<IntegrateRequest>,
) -> Result<Json<SystemState>, ApiError> {
    let time = req.time;
    let system = state
        .store
        .with_simulation(&id, move |h| integrate::integrate(h, time))
        .await?;
    Ok(Json(system))
}

/// Predicted state at a later time. The stored simulation is not advanced.
pub async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidQuery(query): ValidQuery<PredictionQuery>,
) -> Result<Json<Prediction>, ApiError> {
    let target = query.target.as_deref().map(parse_body_ref);
    let prediction = state
        .store
        .read_simulation(&id, move |h| integrate::predict(h, query.time, target.as_ref()))
        .await?;
    Ok(Json(prediction))
}

/// Sample a trajectory. The stored simulation is not advanced.
pub async fn get_trajectory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidQuery(query): ValidQuery<TrajectoryQuery>,
) -> Result<Json<TrajectoryResponse>, ApiError> {
    let max = state.config.max_trajectory_steps;
    if query.steps > 0 && query.steps as u64 > max as u64 {
        return Err(ApiError::invalid(format!(
            "steps must be at most {}, got {}",
            max, query.steps
        )));
    }

    let target = query.target.as_deref().map(parse_body_ref);
    let response = state
        .store
        .read_simulation(&id, move |h| {
            let start_time = query.start_time.unwrap_or_else(|| h.time());
            let samples = trajectory::sample(
                h,
                Some(start_time),
                query.end_time,
                query.steps,
                target.as_ref(),
            )?;
            Ok(TrajectoryResponse {
                id: h.id().to_string(),
                start_time,
                end_time: query.end_time,
                steps: query.steps,
                samples,
            })
        })
        .await?;
    Ok(Json(response))
}
