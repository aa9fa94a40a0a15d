//! The moderation queue.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use faceguard_ledger::AuditLog;
use faceguard_store::{BlobStore, DocumentStore};
use faceguard_types::{Clock, RiskAssessment};
use faceguard_webhook::{EventKind, WebhookError, WebhookNotifier};

use crate::alert::{AlertStatus, ModerationAction, ModerationAlert, ModerationDocument};
use crate::ModerationError;

/// Blob name of the moderation store.
pub const MODERATION_BLOB: &str = "moderation.json";

pub struct ModerationQueue {
    doc: DocumentStore<ModerationDocument>,
    audit: Arc<AuditLog>,
    webhooks: Arc<WebhookNotifier>,
    clock: Arc<dyn Clock>,
}

impl ModerationQueue {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        audit: Arc<AuditLog>,
        webhooks: Arc<WebhookNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            doc: DocumentStore::new(blobs, MODERATION_BLOB),
            audit,
            webhooks,
            clock,
        }
    }

    /// Open a pending case for a blocked request.
    pub fn enqueue(
        &self,
        user_id: &str,
        risk: &RiskAssessment,
    ) -> Result<ModerationAlert, ModerationError> {
        let alert = ModerationAlert {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            score: risk.risk_score,
            reasons: risk.reasons.clone(),
            created_at: self.clock.now(),
            status: AlertStatus::Pending,
            resolved_by: None,
            resolved_at: None,
        };
        self.doc.update(|doc| doc.alerts.push(alert.clone()))?;

        self.audit.append(
            "risk_alert",
            Some(user_id),
            format!("Queued moderation case {}", alert.id),
        )?;
        let payload = serde_json::to_value(&alert).map_err(WebhookError::from)?;
        self.webhooks.notify(EventKind::RiskAlert, payload)?;

        warn!(alert_id = %alert.id, user_id, score = alert.score, "moderation case opened");
        Ok(alert)
    }

    /// Resolve a pending case. Resolved cases cannot be changed.
    pub fn resolve(
        &self,
        alert_id: &str,
        action: ModerationAction,
        actor: &str,
    ) -> Result<ModerationAlert, ModerationError> {
        let status = action.resulting_status();
        let now = self.clock.now();

        let alert = self.doc.try_modify(|doc| {
            let alert = doc
                .alerts
                .iter_mut()
                .find(|a| a.id == alert_id)
                .ok_or_else(|| ModerationError::NotFound(alert_id.to_string()))?;
            if alert.status != AlertStatus::Pending {
                return Err(ModerationError::AlreadyResolved {
                    id: alert.id.clone(),
                    status: alert.status,
                });
            }
            alert.status = status;
            alert.resolved_by = Some(actor.to_string());
            alert.resolved_at = Some(now);
            Ok((alert.clone(), true))
        })?;

        self.audit.append(
            &format!("moderation_{status}"),
            Some(&alert.user_id),
            format!("Case {} marked {status} by {actor}", alert.id),
        )?;
        if status.revokes_enrollment() {
            self.webhooks.notify(
                EventKind::FaceRevoked,
                json!({ "user_id": alert.user_id, "reason": alert.reasons }),
            )?;
        }

        info!(alert_id, status = %status, actor, "moderation case resolved");
        Ok(alert)
    }

    pub fn get(&self, alert_id: &str) -> Result<Option<ModerationAlert>, ModerationError> {
        Ok(self
            .doc
            .load()?
            .alerts
            .into_iter()
            .find(|a| a.id == alert_id))
    }

    /// Cases awaiting review, oldest first.
    pub fn pending(&self) -> Result<Vec<ModerationAlert>, ModerationError> {
        Ok(self
            .doc
            .load()?
            .alerts
            .into_iter()
            .filter(|a| a.status == AlertStatus::Pending)
            .collect())
    }

    pub fn all(&self) -> Result<Vec<ModerationAlert>, ModerationError> {
        Ok(self.doc.load()?.alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceguard_nullables::{NullBlobStore, NullClock};
    use faceguard_webhook::WebhookConfig;

    struct Harness {
        audit: Arc<AuditLog>,
        webhooks: Arc<WebhookNotifier>,
        queue: ModerationQueue,
    }

    fn harness() -> Harness {
        let blobs: Arc<NullBlobStore> = Arc::new(NullBlobStore::new());
        let clock: Arc<NullClock> = Arc::new(NullClock::default());
        let audit = Arc::new(AuditLog::new(blobs.clone(), clock.clone()));
        let webhooks = Arc::new(
            WebhookNotifier::new(&WebhookConfig::default(), blobs.clone(), clock.clone()).unwrap(),
        );
        let queue = ModerationQueue::new(blobs, audit.clone(), webhooks.clone(), clock);
        Harness {
            audit,
            webhooks,
            queue,
        }
    }

    fn blocked() -> RiskAssessment {
        RiskAssessment {
            risk_score: 90,
            reasons: vec!["abuse_history".into(), "high_risk_asn".into()],
            require_liveness: true,
            block: true,
        }
    }

    #[test]
    fn enqueue_records_audit_and_webhook() {
        let h = harness();
        let alert = h.queue.enqueue("u1", &blocked()).unwrap();

        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.score, 90);
        assert_eq!(h.queue.pending().unwrap(), vec![alert.clone()]);

        let audit = h.audit.entries().unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "risk_alert");
        assert!(audit[0].detail.contains(&alert.id));

        let events = h.webhooks.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "risk.alert");
        assert_eq!(events[0].payload["id"], alert.id.as_str());
    }

    #[test]
    fn approve_does_not_revoke() {
        let h = harness();
        let alert = h.queue.enqueue("u1", &blocked()).unwrap();
        let resolved = h
            .queue
            .resolve(&alert.id, ModerationAction::Approve, "ops")
            .unwrap();

        assert_eq!(resolved.status, AlertStatus::Approved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("ops"));
        assert!(resolved.resolved_at.is_some());
        assert!(h.queue.pending().unwrap().is_empty());
        assert_eq!(h.audit.entries().unwrap()[1].action, "moderation_approved");
        assert_eq!(h.webhooks.events().unwrap().len(), 1);
    }

    #[test]
    fn ban_revokes_enrollment() {
        let h = harness();
        let alert = h.queue.enqueue("u1", &blocked()).unwrap();
        h.queue.resolve(&alert.id, ModerationAction::Ban, "ops").unwrap();

        assert_eq!(h.audit.entries().unwrap()[1].action, "moderation_ban");
        let events = h.webhooks.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event, "face.revoked");
        assert_eq!(events[1].payload["user_id"], "u1");
        assert_eq!(events[1].payload["reason"][0], "abuse_history");
    }

    #[test]
    fn deny_revokes_enrollment() {
        let h = harness();
        let alert = h.queue.enqueue("u1", &blocked()).unwrap();
        h.queue.resolve(&alert.id, ModerationAction::Deny, "ops").unwrap();
        assert_eq!(h.audit.entries().unwrap()[1].action, "moderation_denied");
        assert_eq!(h.webhooks.events().unwrap()[1].event, "face.revoked");
    }

    #[test]
    fn resolved_alerts_are_terminal() {
        let h = harness();
        let alert = h.queue.enqueue("u1", &blocked()).unwrap();
        h.queue.resolve(&alert.id, ModerationAction::Deny, "ops").unwrap();

        assert!(matches!(
            h.queue.resolve(&alert.id, ModerationAction::Approve, "ops"),
            Err(ModerationError::AlreadyResolved {
                status: AlertStatus::Denied,
                ..
            })
        ));
        assert_eq!(
            h.queue.get(&alert.id).unwrap().unwrap().status,
            AlertStatus::Denied
        );
        assert_eq!(h.audit.len().unwrap(), 2);
    }

    #[test]
    fn unknown_alert_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.queue.resolve("missing", ModerationAction::Ban, "ops"),
            Err(ModerationError::NotFound(_))
        ));
        assert!(h.audit.is_empty().unwrap());
    }
}
