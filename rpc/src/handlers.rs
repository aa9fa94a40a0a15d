//! Request handlers.
//!
//! Service operations do blocking file I/O and, on a cold cache, generate a
//! projection basis, so each one runs on the blocking pool.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use faceguard_node::{
    ConsentRequest, ConsentResponse, ConsentStatusResponse, DsarEraseResponse,
    DsarExportResponse, DsarStatusResponse, EnrollRequest, EnrollResponse, FaceService,
    HealthResponse, IdentifyRequest, IdentifyResponse, ModerationActionRequest,
    ModerationActionResponse, ProtectedAction, ProtectedActionRequest, ProtectedActionResponse,
    QueueResponse, RecheckRequest, RecheckResponse, ServiceError, UserRef, VerifyRequest,
    VerifyResponse,
};

use crate::error::ApiError;
use crate::server::ADMIN_USER_HEADER;

pub type AppState = Arc<FaceService>;
type ApiResult<T> = Result<Json<T>, ApiError>;

async fn run<T, F>(service: AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&FaceService) -> Result<T, ServiceError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?;
    Ok(Json(result?))
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(req)| req)
        .map_err(|e| ApiError::InvalidPayload(e.body_text()))
}

// ── Face ─────────────────────────────────────────────────────────────────

pub async fn enroll(
    State(service): State<AppState>,
    body: Result<Json<EnrollRequest>, JsonRejection>,
) -> ApiResult<EnrollResponse> {
    let req = payload(body)?;
    run(service, move |s| s.enroll(&req)).await
}

pub async fn verify(
    State(service): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<VerifyResponse> {
    let req = payload(body)?;
    run(service, move |s| s.verify(&req)).await
}

pub async fn identify(
    State(service): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ApiResult<IdentifyResponse> {
    let req = payload(body)?;
    run(service, move |s| s.identify(&req)).await
}

pub async fn recheck(
    State(service): State<AppState>,
    body: Result<Json<RecheckRequest>, JsonRejection>,
) -> ApiResult<RecheckResponse> {
    let req = payload(body)?;
    run(service, move |s| s.recheck(&req)).await
}

// ── Protected actions ────────────────────────────────────────────────────

async fn protected(
    service: AppState,
    action: ProtectedAction,
    body: Result<Json<ProtectedActionRequest>, JsonRejection>,
) -> ApiResult<ProtectedActionResponse> {
    let req = payload(body)?;
    run(service, move |s| s.protected_action(action, &req)).await
}

pub async fn send_message(
    State(service): State<AppState>,
    body: Result<Json<ProtectedActionRequest>, JsonRejection>,
) -> ApiResult<ProtectedActionResponse> {
    protected(service, ProtectedAction::SendMessage, body).await
}

pub async fn mass_like(
    State(service): State<AppState>,
    body: Result<Json<ProtectedActionRequest>, JsonRejection>,
) -> ApiResult<ProtectedActionResponse> {
    protected(service, ProtectedAction::MassLike, body).await
}

pub async fn login_new_device(
    State(service): State<AppState>,
    body: Result<Json<ProtectedActionRequest>, JsonRejection>,
) -> ApiResult<ProtectedActionResponse> {
    protected(service, ProtectedAction::LoginNewDevice, body).await
}

// ── Moderation ───────────────────────────────────────────────────────────

pub async fn moderation_queue(State(service): State<AppState>) -> ApiResult<QueueResponse> {
    run(service, |s| s.moderation_queue()).await
}

fn admin_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ADMIN_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn moderation_action(
    State(service): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ModerationActionRequest>, JsonRejection>,
) -> ApiResult<ModerationActionResponse> {
    let req = payload(body)?;
    let actor = admin_user(&headers);
    run(service, move |s| s.moderation_action(&req, actor.as_deref())).await
}

// ── Consent & DSAR ───────────────────────────────────────────────────────

pub async fn consent_status(
    State(service): State<AppState>,
    Query(user): Query<UserRef>,
) -> ApiResult<ConsentStatusResponse> {
    run(service, move |s| s.consent_status(user.user_id.as_deref())).await
}

pub async fn set_consent(
    State(service): State<AppState>,
    body: Result<Json<ConsentRequest>, JsonRejection>,
) -> ApiResult<ConsentResponse> {
    let req = payload(body)?;
    run(service, move |s| s.set_consent(&req)).await
}

pub async fn dsar_status(
    State(service): State<AppState>,
    Query(user): Query<UserRef>,
) -> ApiResult<DsarStatusResponse> {
    run(service, move |s| s.dsar_status(user.user_id.as_deref())).await
}

pub async fn dsar_export(
    State(service): State<AppState>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<DsarExportResponse> {
    let req = payload(body)?;
    run(service, move |s| s.dsar_export(&req)).await
}

pub async fn dsar_erase(
    State(service): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<DsarEraseResponse> {
    let req = payload(body)?;
    let actor = admin_user(&headers);
    run(service, move |s| s.dsar_erase(&req, actor.as_deref())).await
}

pub async fn health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(service.health())
}
