//! Axum router and server.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue};
use axum::routing::{delete, get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use faceguard_node::FaceService;

use crate::handlers;

/// Header naming the operator behind a moderation action.
pub const ADMIN_USER_HEADER: &str = "x-admin-user";

/// Embeddings arrive as JSON number arrays; leave room for large batches.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self'; \
    style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; \
    frame-ancestors 'none'; object-src 'none'; base-uri 'self'";
const STRICT_TRANSPORT_SECURITY: &str = "max-age=63072000; includeSubDomains; preload";
const PERMISSIONS_POLICY: &str =
    "camera=(), microphone=(), geolocation=(), display-capture=(self)";

/// Build the full API router over a shared service.
pub fn router(service: Arc<FaceService>) -> Router {
    Router::new()
        .route("/v1/face/enroll", post(handlers::enroll))
        .route("/v1/face/verify", post(handlers::verify))
        .route("/v1/face/identify", post(handlers::identify))
        .route("/v1/face/recheck", post(handlers::recheck))
        .route("/v1/protected/send-message", post(handlers::send_message))
        .route("/v1/protected/mass-like", post(handlers::mass_like))
        .route("/v1/protected/login", post(handlers::login_new_device))
        .route("/admin/api/queue", get(handlers::moderation_queue))
        .route("/admin/api/queue/action", post(handlers::moderation_action))
        .route(
            "/v1/legal/consent",
            get(handlers::consent_status).post(handlers::set_consent),
        )
        .route("/v1/dsar/status", get(handlers::dsar_status))
        .route("/v1/dsar/export", post(handlers::dsar_export))
        .route("/v1/dsar/erase", delete(handlers::dsar_erase))
        .route("/api/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY),
        ))
        .with_state(service)
}

/// The HTTP server, configured with a bind address and the shared service.
pub struct RpcServer {
    pub addr: SocketAddr,
    pub service: Arc<FaceService>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, service: Arc<FaceService>) -> Self {
        Self { addr, service }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %listener.local_addr()?, "FaceGuard API listening");
        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(shutdown)
            .await
    }
}
