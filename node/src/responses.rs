//! Response payloads returned by [`FaceService`](crate::FaceService).

use serde::{Deserialize, Serialize};

use faceguard_index::Match;
use faceguard_ledger::AuditEntry;
use faceguard_moderation::ModerationAlert;
use faceguard_types::{
    BiohashTemplate, ConsentRecord, DsarRecord, DsarStatus, RiskAssessment, TrustedDevice,
};
use faceguard_verification::{Challenge, ChallengeKind};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrollResponse {
    pub ok: bool,
    pub consent: ConsentRecord,
    pub trusted_devices: Vec<TrustedDevice>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub similarity: f64,
    pub combined: f64,
    pub risk: RiskAssessment,
    pub trusted_devices: Vec<TrustedDevice>,
    /// Issued when the accepted request still scored in the step-up band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentifyResponse {
    pub matches: Vec<Match>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecheckResponse {
    pub ok: bool,
    pub challenge_id: String,
    pub active_score: f64,
    pub order: [ChallengeKind; 2],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtectedActionResponse {
    pub ok: bool,
    pub action: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueResponse {
    /// Pending cases only.
    pub alerts: Vec<ModerationAlert>,
    /// The latest audit entries, newest first.
    pub audits: Vec<AuditEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModerationActionResponse {
    pub ok: bool,
    pub alert: ModerationAlert,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsentStatusResponse {
    pub consent: Option<ConsentRecord>,
    pub show_banner: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsentResponse {
    pub ok: bool,
    pub consent: ConsentRecord,
}

/// A stored request, or `{"status": "none"}` when there is none.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DsarStatusView {
    Record(DsarRecord),
    Empty { status: DsarStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DsarStatusResponse {
    pub record: DsarStatusView,
}

/// The user fields included in an export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedUser {
    pub user_id: String,
    pub tenant_id: String,
    pub region: String,
    pub biohashes: Vec<BiohashTemplate>,
    pub trusted_devices: Vec<TrustedDevice>,
    pub consent: Option<ConsentRecord>,
}

/// Contents of an export file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DsarExport {
    pub user: ExportedUser,
    pub consent: Option<ConsentRecord>,
    pub dsar: Option<DsarRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DsarExportResponse {
    pub ok: bool,
    pub export_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DsarEraseResponse {
    pub ok: bool,
    pub receipt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub vector_index_mode: &'static str,
    pub consent_version: String,
}
