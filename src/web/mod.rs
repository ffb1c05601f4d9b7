use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    config::{Profile, RegionProfile, SeedPackaging},
    estimator::{self, CalculationRequest, CalculationResult, EstimateError, RoundingPolicy},
};

pub struct WebServerConfig {
    pub profile: Profile,
    pub host: String,
    pub port: u16,
}

struct AppState {
    profile: Profile,
}

#[derive(Serialize)]
pub struct ProfileSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub germination_rate: f64,
    pub packet_rounding: RoundingPolicy,
    pub regions: RegionProfile,
    pub seed_types: SeedPackaging,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Failures share one JSON body shape. Calculation errors are 422; body
/// rejections keep axum's status.
pub enum ApiError {
    Estimate(EstimateError),
    Body(JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Estimate(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: err.kind(),
                    message: err.to_string(),
                },
            ),
            ApiError::Body(rejection) => (
                rejection.status(),
                ErrorBody {
                    error: "invalid_request",
                    message: rejection.body_text(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(profile: Profile) -> Router {
    let state = Arc::new(AppState { profile });
    Router::new()
        .route("/api/profile", get(profile_summary))
        .route("/api/calculate", post(calculate))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        profile,
        host,
        port,
    } = config;

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(profile = %profile.name, "plantpop API listening on http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, router(profile))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down API server");
}

async fn profile_summary(State(state): State<Arc<AppState>>) -> Json<ProfileSummary> {
    let profile = &state.profile;
    Json(ProfileSummary {
        name: profile.name.clone(),
        description: profile.description.clone(),
        germination_rate: profile.germination_rate,
        packet_rounding: profile.packet_rounding,
        regions: profile.regions.clone(),
        seed_types: profile.seed_types.clone(),
    })
}

async fn calculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<CalculationResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("rejected request body: {rejection}");
        ApiError::Body(rejection)
    })?;
    match estimator::calculate(&state.profile, &request) {
        Ok(result) => {
            info!(
                region = %request.region,
                seed_type = %request.seed_type,
                required_packets = result.required_packets,
                gap_packets = result.gap_packets,
                "calculated seed requirement"
            );
            Ok(Json(result))
        }
        Err(err) => {
            warn!(kind = err.kind(), "rejected calculation: {err}");
            Err(ApiError::Estimate(err))
        }
    }
}
