//! HTTP API for the FaceGuard service.
//!
//! Provides endpoints for:
//! - Enrollment, verification and identification (`/v1/face/*`)
//! - Step-up rechecks and protected actions (`/v1/protected/*`)
//! - The moderation queue (`/admin/api/queue`)
//! - Consent and data-subject requests (`/v1/legal/*`, `/v1/dsar/*`)
//! - Health (`/api/health`)

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{router, RpcServer, ADMIN_USER_HEADER};
