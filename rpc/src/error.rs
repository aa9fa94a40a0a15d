//! Mapping from service outcomes to HTTP responses.
//!
//! Every error body is a JSON object with an `error` code. Policy
//! rejections add their context fields next to it. Internal failures are
//! logged here and reach the client only as `server_error` or
//! `integrity_error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

use faceguard_node::{PolicyRejection, ServiceError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The body could not be decoded into the expected request.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The blocking worker running the operation did not complete.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Service(e) => match e {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Policy(p) => policy_status(p),
                ServiceError::Integrity(_)
                | ServiceError::Config(_)
                | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The JSON body sent to the client.
    pub fn body(&self) -> Value {
        match self {
            ApiError::InvalidPayload(_) => json!({ "error": "invalid_payload" }),
            ApiError::Worker(_) => json!({ "error": "server_error" }),
            ApiError::Service(e) => match e {
                ServiceError::Validation(code) | ServiceError::NotFound(code) => {
                    json!({ "error": code })
                }
                ServiceError::Policy(p) => policy_body(p),
                ServiceError::Integrity(_) => json!({ "error": "integrity_error" }),
                ServiceError::Config(_) | ServiceError::Internal(_) => {
                    json!({ "error": "server_error" })
                }
            },
        }
    }
}

fn policy_status(p: &PolicyRejection) -> StatusCode {
    match p {
        PolicyRejection::RiskBlock { .. } | PolicyRejection::ChallengeLocked { .. } => {
            StatusCode::LOCKED
        }
        PolicyRejection::LivenessRequired { .. } => StatusCode::FORBIDDEN,
        PolicyRejection::NoMatch { .. } | PolicyRejection::ChallengeFailed { .. } => {
            StatusCode::UNAUTHORIZED
        }
        PolicyRejection::ChallengeCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
        PolicyRejection::AlreadyResolved { .. } => StatusCode::CONFLICT,
    }
}

fn policy_body(p: &PolicyRejection) -> Value {
    let mut body = Map::new();
    body.insert("error".into(), p.code().into());
    let mut put = |key: &str, value: Value| {
        body.insert(key.to_string(), value);
    };
    match p {
        PolicyRejection::RiskBlock { risk, alert_id } => {
            put("risk", json!(risk));
            put("alert_id", json!(alert_id));
        }
        PolicyRejection::LivenessRequired {
            challenge,
            risk,
            action,
        } => {
            put("challenge", json!(challenge));
            if let Some(risk) = risk {
                put("risk", json!(risk));
            }
            if let Some(action) = action {
                put("action", json!(action));
            }
        }
        PolicyRejection::NoMatch { combined, risk } => {
            put("combined", json!(combined));
            put("risk", json!(risk));
        }
        PolicyRejection::ChallengeCooldown { cooldown_ms }
        | PolicyRejection::ChallengeLocked { cooldown_ms } => {
            put("cooldown_ms", json!(cooldown_ms));
        }
        PolicyRejection::ChallengeFailed { attempt, order } => {
            put("attempt", json!(attempt));
            put("order", json!(order));
        }
        PolicyRejection::AlreadyResolved { alert_id, status } => {
            put("alert_id", json!(alert_id));
            put("status", json!(status));
        }
    }
    Value::Object(body)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
