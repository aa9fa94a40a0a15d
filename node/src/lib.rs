//! FaceGuard service: orchestrates every engine behind one façade.
//!
//! [`FaceService`] is the central coordinator that:
//! - Enrolls users by biohashing their embedding and indexing the template
//! - Verifies users against their own templates with liveness fusion
//! - Identifies users within a tenant/region partition
//! - Scores request risk and routes blocked requests to moderation
//! - Runs step-up challenges that gate protected actions
//! - Handles consent and data-subject requests, including erasure
//!
//! Background jobs (retention purge, bias monitor, challenge sweep) are
//! spawned by [`jobs::spawn_jobs`] and stop on [`ShutdownController`].

pub mod bias;
pub mod config;
pub mod error;
pub mod jobs;
pub mod legal;
pub mod logging;
pub mod requests;
pub mod responses;
pub mod service;
pub mod shutdown;
pub mod users;

pub use bias::{BiasDocument, BiasTracker, DisparityReport, GroupStats, Outcome, BIAS_BLOB};
pub use config::{FaceConfig, JobsConfig};
pub use error::{PolicyRejection, ServiceError};
pub use legal::{
    make_receipt, open_receipt, should_show_consent_banner, ConsentRegistry, ConsentUpdate,
    DsarReceipt, DsarRegistry, JsonConsentRegistry, JsonDsarRegistry, CONSENT_BLOB, DSAR_BLOB,
};
pub use logging::{init_logging, LogFormat};
pub use requests::{
    ConsentRequest, EnrollRequest, IdentifyRequest, ModerationActionRequest, ProtectedAction,
    ProtectedActionRequest, RecheckRequest, UserRef, VerifyRequest,
};
pub use responses::{
    ConsentResponse, ConsentStatusResponse, DsarEraseResponse, DsarExport, DsarExportResponse,
    DsarStatusResponse, DsarStatusView, EnrollResponse, ExportedUser, HealthResponse,
    IdentifyResponse, ModerationActionResponse, ProtectedActionResponse, QueueResponse,
    RecheckResponse, VerifyResponse,
};
pub use service::FaceService;
pub use shutdown::ShutdownController;
pub use users::{UserDocument, UserStore, USERS_BLOB};
