//! The FaceGuard service façade.
//!
//! [`FaceService`] owns every engine and store and implements each HTTP
//! operation as a plain method. Stores serialize their own read-modify-write
//! cycles, so the service is shared behind an `Arc` without further locking.
//!
//! Inputs are validated before any side effect. Side effects of one
//! operation (user store, index, audit, webhook) are applied in a fixed
//! order and are not transactional across stores.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use faceguard_crypto::{cosine_similarity, BiohashEngine, SealingKey};
use faceguard_index::VectorIndex;
use faceguard_ledger::{AuditLog, CompactionGrant};
use faceguard_moderation::{ModerationAction, ModerationQueue};
use faceguard_risk::{RiskContext, RiskEngine};
use faceguard_store::BlobStore;
use faceguard_store_fs::FileBlobStore;
use faceguard_types::{
    ActiveChallengeResult, BiohashTemplate, Clock, DsarRecord, DsarStatus, FaceParams,
    RiskHistoryEntry, SystemClock, UserRecord, DEFAULT_REGION,
};
use faceguard_verification::{
    ChallengePolicy, ChallengeRegistry, FusionWeights, GateDecision, LivenessEvaluator,
    RecheckOutcome,
};
use faceguard_webhook::{EventKind, WebhookNotifier};

use crate::bias::{BiasTracker, DisparityReport, Outcome};
use crate::legal::{
    make_receipt, should_show_consent_banner, ConsentRegistry, ConsentUpdate, DsarRegistry,
    JsonConsentRegistry, JsonDsarRegistry,
};
use crate::requests::{
    ConsentRequest, EnrollRequest, IdentifyRequest, ModerationActionRequest, ProtectedAction,
    ProtectedActionRequest, RecheckRequest, UserRef, VerifyRequest,
};
use crate::responses::{
    ConsentResponse, ConsentStatusResponse, DsarEraseResponse, DsarExport, DsarExportResponse,
    DsarStatusResponse, DsarStatusView, EnrollResponse, ExportedUser, HealthResponse,
    IdentifyResponse, ModerationActionResponse, ProtectedActionResponse, QueueResponse,
    RecheckResponse, VerifyResponse,
};
use crate::users::UserStore;
use crate::{FaceConfig, PolicyRejection, ServiceError};

/// Audit entries shown alongside the moderation queue.
const ADMIN_AUDIT_WINDOW: usize = 50;
/// Grant actor for an erasure the data subject requested themselves.
const SELF_SERVICE_ACTOR: &str = "data_subject";

/// Resolver recorded when the admin request names nobody.
pub const DEFAULT_ADMIN: &str = "admin";

/// Directory (blob prefix) for data exports.
pub const EXPORT_DIR: &str = "dsar";


pub struct FaceService {
    params: FaceParams,
    clock: Arc<dyn Clock>,
    blobs: Arc<dyn BlobStore>,
    biohash: BiohashEngine,
    liveness: LivenessEvaluator,
    risk: RiskEngine,
    index: VectorIndex,
    challenges: ChallengeRegistry,
    users: UserStore,
    audit: Arc<AuditLog>,
    webhooks: Arc<WebhookNotifier>,
    moderation: ModerationQueue,
    consent: Arc<dyn ConsentRegistry>,
    dsar: Arc<dyn DsarRegistry>,
    bias: BiasTracker,
    receipt_secret: Vec<u8>,
}

impl FaceService {
    /// Wire every component over one blob store.
    pub fn new(
        config: &FaceConfig,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let key = SealingKey::from_secret(&config.vector_key)
            .map_err(|e| ServiceError::Config(format!("vector_key: {e}")))?;
        let webhooks = WebhookNotifier::new(&config.webhook, blobs.clone(), clock.clone())
            .map_err(|e| ServiceError::Config(format!("webhook: {e}")))?;
        let webhooks = Arc::new(webhooks);
        let audit = Arc::new(AuditLog::new(blobs.clone(), clock.clone()));
        let params = config.params.clone();

        Ok(Self {
            biohash: BiohashEngine::new(),
            liveness: LivenessEvaluator::new(FusionWeights {
                alpha: params.alpha,
                beta: params.beta,
            }),
            risk: RiskEngine::new(config.risk.clone()),
            index: VectorIndex::new(blobs.clone(), key, clock.clone()),
            challenges: ChallengeRegistry::new(ChallengePolicy::from_params(&params), clock.clone()),
            users: UserStore::new(blobs.clone()),
            moderation: ModerationQueue::new(
                blobs.clone(),
                audit.clone(),
                webhooks.clone(),
                clock.clone(),
            ),
            consent: Arc::new(JsonConsentRegistry::new(blobs.clone(), clock.clone())),
            dsar: Arc::new(JsonDsarRegistry::new(blobs.clone())),
            bias: BiasTracker::new(blobs.clone()),
            receipt_secret: config.dsar_receipt_secret.as_bytes().to_vec(),
            audit,
            webhooks,
            params,
            clock,
            blobs,
        })
    }

    /// Open the service over `config.data_dir` with the system clock.
    pub fn open(config: &FaceConfig) -> Result<Self, ServiceError> {
        let blobs = FileBlobStore::open(config.data_dir.clone())?;
        info!(data_dir = %config.data_dir.display(), "opened data directory");
        Self::new(config, Arc::new(blobs), Arc::new(SystemClock::new()))
    }

    /// Replace the built-in JSON consent and DSAR registries.
    pub fn with_legal_registries(
        mut self,
        consent: Arc<dyn ConsentRegistry>,
        dsar: Arc<dyn DsarRegistry>,
    ) -> Self {
        self.consent = consent;
        self.dsar = dsar;
        self
    }

    // ── Face operations ──────────────────────────────────────────────────

    pub fn enroll(&self, req: &EnrollRequest) -> Result<EnrollResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        let hashed = self.biohash.apply(&req.embedding, &req.user_seed)?;
        let passive_score = self.liveness.evaluate_passive_signals(&req.passive_signals);

        let version = req
            .consent_version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.params.consent_version.clone());
        let consent = self.consent.set_consent(
            user_id,
            ConsentUpdate {
                version,
                analytics: req.analytics_opt_in,
                biometrics: true,
            },
        )?;

        let now = self.clock.now();
        let opt_in = req.identification_opt_in;
        let fingerprint = req.device_fingerprint.as_deref();
        let hardware = req.secure_hardware.as_deref();
        // A returning user keeps the partition chosen at first enrollment.
        let (tenant_id, region, trusted_devices) = self.users.upsert_with(
            user_id,
            || {
                UserRecord::new(
                    user_id,
                    req.tenant_id.as_deref().unwrap_or_default(),
                    req.region.as_deref().unwrap_or_default(),
                    self.params.retention_days,
                    now,
                )
            },
            |user| {
                user.consent = Some(consent.clone());
                user.identification_opt_in = opt_in;
                user.biohashes.push(BiohashTemplate {
                    vector: hashed.clone(),
                    created_at: now,
                    passive_score,
                    device_fingerprint: req.device_fingerprint.clone(),
                    secure_hardware: req.secure_hardware.clone(),
                    consent_version: consent.version.clone(),
                });
                user.bind_device(fingerprint, hardware, now);
                (
                    user.tenant_id.clone(),
                    user.region.clone(),
                    user.trusted_devices.clone(),
                )
            },
        )?;

        self.index
            .upsert(&tenant_id, &region, user_id, &hashed, opt_in)?;
        self.audit.append(
            "face_enroll",
            Some(user_id),
            format!("Enrollment with passive score {passive_score:.2}"),
        )?;
        self.webhooks.notify(
            EventKind::FaceEnrolled,
            json!({ "user_id": user_id, "tenant_id": tenant_id, "region": region }),
        )?;

        info!(user_id, %tenant_id, %region, opt_in, "user enrolled");
        Ok(EnrollResponse {
            ok: true,
            consent,
            trusted_devices,
        })
    }

    /// One-to-one verification against the user's own templates.
    ///
    /// Decision order: risk block, then match and liveness, then accept.
    pub fn verify(&self, req: &VerifyRequest) -> Result<VerifyResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        let hashed = self.biohash.apply(&req.embedding, &req.user_seed)?;
        let user = self
            .users
            .get(user_id)?
            .ok_or(ServiceError::NotFound("user_not_found"))?;

        let best = user
            .biohashes
            .iter()
            .map(|t| cosine_similarity(&t.vector, &hashed))
            .max_by(|a, b| a.total_cmp(b));
        let passive_score = self.liveness.evaluate_passive_signals(&req.passive_signals);
        let active_score = self.liveness.evaluate_active_challenge(&req.active_challenge);
        let combined =
            self.liveness
                .combine_scores(best.unwrap_or(0.0), passive_score, active_score);

        let fingerprint = req.device_fingerprint.as_deref();
        let risk = self.risk.evaluate(&RiskContext {
            ip: req.ip.clone(),
            asn: req.asn.clone(),
            geo: req.geo.clone(),
            device_fingerprint: req.device_fingerprint.clone(),
            new_device: !user.is_trusted_device(fingerprint),
            velocity: req.velocity_counters,
            abuse_flags: req.abuse_flags.clone(),
        });

        if risk.block {
            let alert = self.moderation.enqueue(user_id, &risk)?;
            return Err(PolicyRejection::RiskBlock {
                risk,
                alert_id: alert.id,
            }
            .into());
        }

        let matched = best.filter(|s| *s >= self.params.similarity_threshold);
        let Some(similarity) = matched.filter(|_| combined >= self.params.liveness_threshold)
        else {
            self.record_outcome(&user.region, Outcome::FalseReject);
            self.webhooks.notify(
                EventKind::LivenessFailed,
                json!({
                    "user_id": user_id,
                    "combined": combined,
                    "passive_score": passive_score,
                    "active_score": active_score,
                }),
            )?;
            debug!(user_id, combined, risk_score = risk.risk_score, "verification rejected");
            if risk.require_liveness {
                let challenge = self.challenges.create(user_id);
                return Err(PolicyRejection::LivenessRequired {
                    challenge,
                    risk: Some(risk),
                    action: None,
                }
                .into());
            }
            return Err(PolicyRejection::NoMatch { combined, risk }.into());
        };

        self.record_outcome(&user.region, Outcome::TrueAccept);
        let now = self.clock.now();
        let trusted_devices = self
            .users
            .update_user(user_id, |user| {
                user.risk_history.push(RiskHistoryEntry {
                    ts: now,
                    risk: risk.clone(),
                });
                user.bind_device(fingerprint, req.secure_hardware.as_deref(), now);
                user.trusted_devices.clone()
            })?
            .ok_or(ServiceError::NotFound("user_not_found"))?;
        self.audit.append(
            "face_verify",
            Some(user_id),
            format!("Verification with similarity {similarity:.2}, combined {combined:.2}"),
        )?;

        let challenge = risk
            .require_liveness
            .then(|| self.challenges.create(user_id));
        info!(user_id, risk_score = risk.risk_score, step_up = challenge.is_some(), "user verified");
        Ok(VerifyResponse {
            ok: true,
            similarity,
            combined,
            risk,
            trusted_devices,
            challenge,
        })
    }

    /// One-to-many search within a tenant/region partition.
    pub fn identify(&self, req: &IdentifyRequest) -> Result<IdentifyResponse, ServiceError> {
        let hashed = self.biohash.apply(&req.embedding, &req.user_seed)?;
        let matches = self.index.query(
            req.tenant_id.as_deref().unwrap_or_default(),
            req.region.as_deref().unwrap_or_default(),
            &hashed,
            self.params.identification_limit,
        )?;
        debug!(candidates = matches.len(), "identification query");
        Ok(IdentifyResponse { matches })
    }

    pub fn recheck(&self, req: &RecheckRequest) -> Result<RecheckResponse, ServiceError> {
        let challenge_id = req
            .challenge_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ServiceError::Validation("missing_challenge"))?;
        let outcome = self
            .challenges
            .recheck(challenge_id, &ActiveChallengeResult::new(req.blink, req.yaw))?;
        let group = self.bias_group(outcome.user_id());

        match outcome {
            RecheckOutcome::Passed {
                user_id,
                active_score,
                order,
            } => {
                self.audit.append(
                    "liveness_pass",
                    Some(&user_id),
                    format!("Challenge {challenge_id} passed"),
                )?;
                self.record_outcome(&group, Outcome::TrueAccept);
                Ok(RecheckResponse {
                    ok: true,
                    challenge_id: challenge_id.to_string(),
                    active_score,
                    order,
                })
            }
            RecheckOutcome::Locked {
                user_id,
                active_score,
                cooldown_ms,
            } => {
                self.webhooks.notify(
                    EventKind::LivenessFailed,
                    json!({
                        "user_id": user_id,
                        "challenge_id": challenge_id,
                        "active_score": active_score,
                    }),
                )?;
                self.record_outcome(&group, Outcome::FalseReject);
                Err(PolicyRejection::ChallengeLocked { cooldown_ms }.into())
            }
            RecheckOutcome::Failed { attempt, order, .. } => {
                Err(PolicyRejection::ChallengeFailed { attempt, order }.into())
            }
        }
    }

    /// Run a protected action if the user holds a passed challenge.
    pub fn protected_action(
        &self,
        action: ProtectedAction,
        req: &ProtectedActionRequest,
    ) -> Result<ProtectedActionResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        if self.users.get(user_id)?.is_none() {
            return Err(ServiceError::NotFound("user_not_found"));
        }

        match self.challenges.consume(user_id, req.challenge_id.as_deref()) {
            GateDecision::Open => {
                self.audit.append(
                    &format!("protected_{}", action.as_str()),
                    Some(user_id),
                    format!("Completed protected action {}", action.as_str()),
                )?;
                Ok(ProtectedActionResponse {
                    ok: true,
                    action: action.as_str(),
                })
            }
            GateDecision::ChallengeRequired(challenge) => Err(PolicyRejection::LivenessRequired {
                challenge,
                risk: None,
                action: Some(action.as_str().to_string()),
            }
            .into()),
        }
    }

    // ── Moderation ───────────────────────────────────────────────────────

    pub fn moderation_queue(&self) -> Result<QueueResponse, ServiceError> {
        Ok(QueueResponse {
            alerts: self.moderation.pending()?,
            audits: self.audit.recent(ADMIN_AUDIT_WINDOW)?,
        })
    }

    pub fn moderation_action(
        &self,
        req: &ModerationActionRequest,
        actor: Option<&str>,
    ) -> Result<ModerationActionResponse, ServiceError> {
        let (Some(alert_id), Some(action)) = (non_empty(&req.alert_id), non_empty(&req.action))
        else {
            return Err(ServiceError::Validation("invalid_payload"));
        };
        let action: ModerationAction = action.parse()?;
        let actor = actor
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ADMIN);
        let alert = self.moderation.resolve(alert_id, action, actor)?;
        Ok(ModerationActionResponse { ok: true, alert })
    }

    // ── Consent & data-subject requests ──────────────────────────────────

    pub fn consent_status(&self, user_id: Option<&str>) -> Result<ConsentStatusResponse, ServiceError> {
        let user_id = require_user(user_id)?;
        let consent = self.consent.get_consent(user_id)?;
        let show_banner = should_show_consent_banner(consent.as_ref(), &self.params.consent_version);
        Ok(ConsentStatusResponse {
            consent,
            show_banner,
        })
    }

    pub fn set_consent(&self, req: &ConsentRequest) -> Result<ConsentResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        let version = req
            .version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.params.consent_version.clone());
        let consent = self.consent.set_consent(
            user_id,
            ConsentUpdate {
                version,
                analytics: req.analytics,
                biometrics: req.biometrics,
            },
        )?;
        info!(user_id, version = %consent.version, "consent recorded");
        Ok(ConsentResponse { ok: true, consent })
    }

    pub fn dsar_status(&self, user_id: Option<&str>) -> Result<DsarStatusResponse, ServiceError> {
        let user_id = require_user(user_id)?;
        let record = match self.dsar.get_dsar(user_id)? {
            Some(record) => DsarStatusView::Record(record),
            None => DsarStatusView::Empty {
                status: DsarStatus::None,
            },
        };
        Ok(DsarStatusResponse { record })
    }

    /// Write the user's data to `dsar/<user>-<millis>.json`.
    pub fn dsar_export(&self, req: &UserRef) -> Result<DsarExportResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        let user = self
            .users
            .get(user_id)?
            .ok_or(ServiceError::NotFound("user_not_found"))?;

        let export = DsarExport {
            consent: self.consent.get_consent(user_id)?,
            dsar: self.dsar.get_dsar(user_id)?,
            user: ExportedUser {
                user_id: user.user_id,
                tenant_id: user.tenant_id,
                region: user.region,
                biohashes: user.biohashes,
                trusted_devices: user.trusted_devices,
                consent: user.consent,
            },
        };
        let now = self.clock.now();
        let export_path = format!("{EXPORT_DIR}/{}-{}.json", file_safe(user_id), now.as_millis());
        let bytes = serde_json::to_vec_pretty(&export)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.blobs.write(&export_path, &bytes)?;

        self.dsar.set_dsar(DsarRecord {
            user_id: user_id.to_string(),
            status: DsarStatus::ExportReady,
            requested_at: now,
            completed_at: Some(now),
            export_path: Some(export_path.clone()),
            receipt: None,
        })?;
        self.audit.append(
            "dsar_export",
            Some(user_id),
            format!("Export written to {export_path}"),
        )?;

        info!(user_id, %export_path, "data export ready");
        Ok(DsarExportResponse {
            ok: true,
            export_path,
        })
    }

    /// Erase every trace of a user and issue a signed receipt.
    ///
    /// `actor` is the operator authorizing the erasure; without one the data
    /// subject is acting on their own record. The subject's id never appears
    /// in the grant.
    pub fn dsar_erase(
        &self,
        req: &UserRef,
        actor: Option<&str>,
    ) -> Result<DsarEraseResponse, ServiceError> {
        let user_id = require_user(req.user_id.as_deref())?;
        let actor = actor.unwrap_or(SELF_SERVICE_ACTOR).trim();
        let grant = CompactionGrant::new(actor, "dsar_erase");
        grant.validate()?;
        let user = self
            .users
            .get(user_id)?
            .ok_or(ServiceError::NotFound("user_not_found"))?;
        // Refuse before deleting anything if the chain cannot be compacted.
        self.audit.verify_chain()?;

        let vectors = self
            .index
            .remove_user(&user.tenant_id, &user.region, user_id)?;
        self.users.remove(user_id)?;
        self.consent.delete_consent(user_id)?;
        let compaction = self
            .audit
            .compact_subject(user_id, &grant)?;

        let now = self.clock.now();
        let receipt = make_receipt(&self.receipt_secret, user_id, "erase", now);
        self.dsar.set_dsar(DsarRecord {
            user_id: user_id.to_string(),
            status: DsarStatus::Erased,
            requested_at: now,
            completed_at: Some(now),
            export_path: None,
            receipt: Some(receipt.clone()),
        })?;
        self.webhooks.notify(
            EventKind::FaceRevoked,
            json!({ "user_id": user_id, "reason": "dsar_erase" }),
        )?;

        warn!(
            user_id,
            actor = %grant.actor,
            vectors,
            audit_entries = compaction.removed,
            "user erased"
        );
        Ok(DsarEraseResponse { ok: true, receipt })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            ok: true,
            vector_index_mode: self.index.mode(),
            consent_version: self.params.consent_version.clone(),
        }
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Delete users past their retention window together with their vectors.
    pub fn purge_expired(&self) -> Result<usize, ServiceError> {
        let purged = self.users.purge_expired(self.clock.now())?;
        for user in &purged {
            warn!(
                user_id = %user.user_id,
                purge_at = %user.retention.purge_at,
                "removing user due to retention policy"
            );
            self.index
                .remove_user(&user.tenant_id, &user.region, &user.user_id)?;
        }
        Ok(purged.len())
    }

    pub fn check_bias(&self, threshold: f64) -> Result<Option<DisparityReport>, ServiceError> {
        Ok(self.bias.check_disparity(threshold)?)
    }

    pub fn sweep_challenges(&self, max_age: Duration) -> usize {
        self.challenges.sweep_expired(max_age)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn params(&self) -> &FaceParams {
        &self.params
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn moderation(&self) -> &ModerationQueue {
        &self.moderation
    }

    pub fn webhooks(&self) -> &WebhookNotifier {
        &self.webhooks
    }

    pub fn challenges(&self) -> &ChallengeRegistry {
        &self.challenges
    }

    pub fn bias(&self) -> &BiasTracker {
        &self.bias
    }

    pub fn consent_registry(&self) -> &dyn ConsentRegistry {
        self.consent.as_ref()
    }

    pub fn dsar_registry(&self) -> &dyn DsarRegistry {
        self.dsar.as_ref()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    fn bias_group(&self, user_id: &str) -> String {
        match self.users.get(user_id) {
            Ok(Some(user)) => user.region,
            _ => DEFAULT_REGION.to_string(),
        }
    }

    /// Metrics never fail a request.
    fn record_outcome(&self, group: &str, outcome: Outcome) {
        if let Err(e) = self.bias.record(group, outcome) {
            warn!(group, ?outcome, error = %e, "failed to record bias outcome");
        }
    }
}

fn require_user(user_id: Option<&str>) -> Result<&str, ServiceError> {
    user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ServiceError::Validation("missing_user"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Restrict a user id to characters safe in a file name.
fn file_safe(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
