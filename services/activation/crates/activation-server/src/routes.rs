//! HTTP surface of the activation endpoint.
//!
//! | route                      | result                                   |
//! |----------------------------|------------------------------------------|
//! | `GET  /health`             | 200 with the last known power state      |
//! | `POST /start`              | activate the configured instance         |
//! | `POST /start/{instance}`   | activate a named instance (scope-checked)|
//!
//! Accepted activations answer 202 and denials 403. An instance that is still
//! stopping answers 409 so callers retry, timeouts answer 504 and platform
//! failures 502.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use campfire_common::{ActivationError, ActivationOutcome, DenialReason, InstanceId};
use serde_json::json;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/start", post(start_configured))
        .route("/start/{instance_id}", post(start_named))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.gateway.machine().snapshot();
    Json(json!({
        "status": "ok",
        "instance": state.gateway.scope(),
        "power": snapshot,
    }))
}

async fn start_configured(State(state): State<Arc<AppState>>) -> Response {
    let target = state.gateway.scope().clone();
    activate(&state, &target).await
}

async fn start_named(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Response {
    match InstanceId::parse(&instance_id) {
        Ok(target) => activate(&state, &target).await,
        Err(e) => {
            tracing::warn!(requested = %instance_id, error = %e, "activation denied: malformed instance id");
            outcome_response(&ActivationOutcome::Denied {
                reason: DenialReason::OutOfScope {
                    requested: instance_id,
                },
            })
        }
    }
}

async fn activate(state: &AppState, target: &InstanceId) -> Response {
    match state.gateway.activate(target).await {
        Ok(outcome) => outcome_response(&outcome),
        Err(e @ ActivationError::Timeout { .. }) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, "timeout", &e)
        }
        Err(e @ ActivationError::Platform { .. }) => {
            tracing::error!(error = %e, "platform rejected activation");
            error_response(StatusCode::BAD_GATEWAY, "platform_error", &e)
        }
    }
}

fn outcome_response(outcome: &ActivationOutcome) -> Response {
    let status = match outcome {
        ActivationOutcome::Accepted { .. } => StatusCode::ACCEPTED,
        ActivationOutcome::Denied {
            reason: DenialReason::Stopping,
        } => StatusCode::CONFLICT,
        ActivationOutcome::Denied { .. } => StatusCode::FORBIDDEN,
    };
    (status, Json(outcome.clone())).into_response()
}

fn error_response(status: StatusCode, code: &str, err: &ActivationError) -> Response {
    let body = json!({
        "error": true,
        "code": code,
        "message": err.to_string(),
    });
    (status, Json(body)).into_response()
}
