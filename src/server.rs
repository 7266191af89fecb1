use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::AppError;
use crate::sensor::read_detection;
use crate::soil::SoilReading;
use crate::state::AppState;

const SENSOR_FIELDS: [&str; 3] = ["ph", "humidite", "salinite"];

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ZoneNotFound(_)
            | AppError::SoilNotFound(_)
            | AppError::CropNotFound(_)
            | AppError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AiProviderError(_)
            | AppError::UnparsableModelResponse(_)
            | AppError::EmptyPlanSet => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/sols/sensor", get(read_sensor).post(receive_sensor))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "agroplan-studio",
    }))
}

/// Pull a reading out of a sensor payload. Numbers may arrive as strings.
fn parse_sensor_payload(body: &[u8]) -> Result<SoilReading, AppError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("body is not JSON: {}", e)))?;

    let mut values = [0.0; 3];
    for (slot, field) in values.iter_mut().zip(SENSOR_FIELDS) {
        let raw = payload.get(field).filter(|v| !v.is_null()).ok_or_else(|| {
            AppError::InvalidInput("Missing required fields: ph, humidite, salinite".into())
        })?;
        let number = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        *slot = number.filter(|n| n.is_finite()).ok_or_else(|| {
            AppError::InvalidInput(format!("{} must be a number, got {}", field, raw))
        })?;
    }
    Ok(SoilReading::new(values[0], values[1], values[2]))
}

async fn receive_sensor(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let reading = parse_sensor_payload(&body)?;
    let seq = state.mailbox.post(reading);
    tracing::info!(
        seq,
        ph = reading.ph,
        humidite = reading.humidity,
        salinite = reading.salinity,
        "sensor reading received"
    );
    Ok(Json(json!({ "message": "Reading received" })))
}

async fn read_sensor(State(state): State<Arc<AppState>>) -> Response {
    match read_detection(&state.mailbox, state.store.as_ref()).await {
        Ok(Some(detection)) => Json(detection).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No recent reading available" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "sensor detection failed; reading retained");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to process sensor reading",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
