//! Step-up challenge state machine.
//!
//! ```text
//! create ──► pending ──recheck(pass)──► passed+locked ──consume──► removed
//!               │
//!               └─recheck(fail)──► pending (attempt n) ──n = max──► locked
//! ```
//!
//! Locks are measured on the clock's monotonic reading. A locked challenge
//! refuses rechecks without counting them. Challenges live in memory for the
//! lifetime of the process.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use faceguard_types::{ActiveChallengeResult, Clock, FaceParams, Timestamp};

use crate::error::ChallengeError;
use crate::liveness::{LivenessEvaluator, ACTIVE_PASS_SCORE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Blink,
    Yaw,
}

/// A live step-up challenge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge_id: String,
    pub user_id: String,
    /// The order in which the user is asked to perform the actions.
    pub order: [ChallengeKind; 2],
    pub attempts: u32,
    pub created_at: Timestamp,
    /// Monotonic instant until which rechecks are refused.
    #[serde(skip)]
    pub locked_until: Option<Duration>,
    /// Milliseconds left on the lock when this copy was handed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_for_ms: Option<u64>,
    #[serde(default)]
    pub passed: bool,
}

impl Challenge {
    fn is_locked_at(&self, now: Duration) -> Option<Duration> {
        self.locked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    fn snapshot_at(&self, now: Duration) -> Challenge {
        Challenge {
            locked_for_ms: self.is_locked_at(now).map(|d| d.as_millis() as u64),
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePolicy {
    /// Failed rechecks allowed before the challenge locks.
    pub max_attempts: u32,
    pub cooldown_ms: u64,
}

impl ChallengePolicy {
    pub fn from_params(params: &FaceParams) -> Self {
        Self {
            max_attempts: params.challenge_max_attempts.max(1),
            cooldown_ms: params.challenge_cooldown_ms,
        }
    }
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self::from_params(&FaceParams::default())
    }
}

/// Result of a counted recheck.
#[derive(Clone, Debug, PartialEq)]
pub enum RecheckOutcome {
    /// Both actions performed. The challenge can now unlock one protected
    /// action and is itself locked for the cooldown.
    Passed {
        user_id: String,
        active_score: f64,
        order: [ChallengeKind; 2],
    },
    /// Not enough actions; attempts remain.
    Failed {
        user_id: String,
        active_score: f64,
        attempt: u32,
        order: [ChallengeKind; 2],
    },
    /// The last allowed attempt failed; the challenge is now locked.
    Locked {
        user_id: String,
        active_score: f64,
        cooldown_ms: u64,
    },
}

impl RecheckOutcome {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Passed { user_id, .. }
            | Self::Failed { user_id, .. }
            | Self::Locked { user_id, .. } => user_id,
        }
    }

    pub fn active_score(&self) -> f64 {
        match self {
            Self::Passed { active_score, .. }
            | Self::Failed { active_score, .. }
            | Self::Locked { active_score, .. } => *active_score,
        }
    }
}

/// Whether a protected action may proceed.
#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
    /// A passed challenge was consumed.
    Open,
    /// The user must complete this challenge first.
    ChallengeRequired(Challenge),
}

/// Owns every live challenge.
pub struct ChallengeRegistry {
    policy: ChallengePolicy,
    clock: Arc<dyn Clock>,
    evaluator: LivenessEvaluator,
    challenges: Mutex<HashMap<String, Challenge>>,
}

impl ChallengeRegistry {
    pub fn new(policy: ChallengePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            evaluator: LivenessEvaluator::default(),
            challenges: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> ChallengePolicy {
        self.policy
    }

    /// Issue a new challenge with a shuffled action order.
    pub fn create(&self, user_id: &str) -> Challenge {
        let order = if rand::thread_rng().gen_bool(0.5) {
            [ChallengeKind::Blink, ChallengeKind::Yaw]
        } else {
            [ChallengeKind::Yaw, ChallengeKind::Blink]
        };
        let challenge = Challenge {
            challenge_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            order,
            attempts: 0,
            created_at: self.clock.now(),
            locked_until: None,
            locked_for_ms: None,
            passed: false,
        };
        self.lock()
            .insert(challenge.challenge_id.clone(), challenge.clone());
        debug!(challenge_id = %challenge.challenge_id, user_id, "challenge created");
        challenge
    }

    pub fn get(&self, challenge_id: &str) -> Option<Challenge> {
        let now = self.clock.monotonic();
        self.lock().get(challenge_id).map(|c| c.snapshot_at(now))
    }

    /// Record one attempt at a challenge.
    pub fn recheck(
        &self,
        challenge_id: &str,
        result: &ActiveChallengeResult,
    ) -> Result<RecheckOutcome, ChallengeError> {
        let now = self.clock.monotonic();
        let cooldown = Duration::from_millis(self.policy.cooldown_ms);

        let mut challenges = self.lock();
        let challenge = challenges
            .get_mut(challenge_id)
            .ok_or_else(|| ChallengeError::NotFound(challenge_id.to_string()))?;

        if let Some(remaining) = challenge.is_locked_at(now) {
            return Err(ChallengeError::Cooldown {
                remaining_ms: remaining.as_millis() as u64,
            });
        }

        challenge.attempts += 1;
        let active_score = self.evaluator.evaluate_active_challenge(result);

        if active_score >= ACTIVE_PASS_SCORE {
            challenge.passed = true;
            challenge.locked_until = Some(now + cooldown);
            info!(challenge_id, user_id = %challenge.user_id, "challenge passed");
            return Ok(RecheckOutcome::Passed {
                user_id: challenge.user_id.clone(),
                active_score,
                order: challenge.order,
            });
        }

        if challenge.attempts >= self.policy.max_attempts {
            challenge.locked_until = Some(now + cooldown);
            info!(
                challenge_id,
                user_id = %challenge.user_id,
                attempts = challenge.attempts,
                "challenge locked"
            );
            // The next window starts with a fresh attempt budget.
            challenge.attempts = 0;
            return Ok(RecheckOutcome::Locked {
                user_id: challenge.user_id.clone(),
                active_score,
                cooldown_ms: self.policy.cooldown_ms,
            });
        }

        Ok(RecheckOutcome::Failed {
            user_id: challenge.user_id.clone(),
            active_score,
            attempt: challenge.attempts,
            order: challenge.order,
        })
    }

    /// Spend a passed challenge on a protected action.
    ///
    /// A passed challenge owned by `user_id` is removed and the gate opens.
    /// Otherwise the caller gets a challenge to complete: the referenced one
    /// if it is still pending for this user, else a new one.
    pub fn consume(&self, user_id: &str, challenge_id: Option<&str>) -> GateDecision {
        let Some(challenge_id) = challenge_id.filter(|id| !id.is_empty()) else {
            return GateDecision::ChallengeRequired(self.create(user_id));
        };

        let now = self.clock.monotonic();
        {
            let mut challenges = self.lock();
            match challenges.get(challenge_id) {
                Some(c) if c.user_id == user_id && c.passed => {
                    challenges.remove(challenge_id);
                    debug!(challenge_id, user_id, "challenge consumed");
                    return GateDecision::Open;
                }
                Some(c) if c.user_id == user_id => {
                    return GateDecision::ChallengeRequired(c.snapshot_at(now));
                }
                _ => {}
            }
        }
        GateDecision::ChallengeRequired(self.create(user_id))
    }

    /// Drop challenges created more than `max_age` ago. Returns how many.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let max_age_ms = max_age.as_millis() as u64;
        let mut challenges = self.lock();
        let before = challenges.len();
        challenges.retain(|_, c| !c.created_at.has_expired(max_age_ms, now));
        before - challenges.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        self.challenges.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceguard_nullables::NullClock;

    const COOLDOWN: u64 = 180_000;

    fn setup() -> (Arc<NullClock>, ChallengeRegistry) {
        let clock = Arc::new(NullClock::default());
        let registry = ChallengeRegistry::new(
            ChallengePolicy {
                max_attempts: 3,
                cooldown_ms: COOLDOWN,
            },
            clock.clone(),
        );
        (clock, registry)
    }

    fn fail() -> ActiveChallengeResult {
        ActiveChallengeResult::new(false, false)
    }

    fn pass() -> ActiveChallengeResult {
        ActiveChallengeResult::new(true, true)
    }

    #[test]
    fn create_issues_fresh_challenge() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        assert_eq!(c.attempts, 0);
        assert!(!c.passed);
        assert!(c.locked_until.is_none());
        assert_ne!(c.order[0], c.order[1]);
        assert_eq!(registry.get(&c.challenge_id), Some(c));
    }

    #[test]
    fn unknown_challenge_is_not_found() {
        let (_, registry) = setup();
        assert_eq!(
            registry.recheck("nope", &pass()),
            Err(ChallengeError::NotFound("nope".into()))
        );
    }

    #[test]
    fn failures_count_up_then_lock() {
        let (_, registry) = setup();
        let c = registry.create("u1");

        for attempt in 1..=2 {
            match registry.recheck(&c.challenge_id, &fail()).unwrap() {
                RecheckOutcome::Failed { attempt: a, order, .. } => {
                    assert_eq!(a, attempt);
                    assert_eq!(order, c.order);
                }
                other => panic!("expected failure, got {other:?}"),
            }
        }
        assert!(matches!(
            registry.recheck(&c.challenge_id, &fail()).unwrap(),
            RecheckOutcome::Locked { cooldown_ms: COOLDOWN, .. }
        ));
    }

    #[test]
    fn locked_challenge_refuses_without_consuming_attempts() {
        let (clock, registry) = setup();
        let c = registry.create("u1");
        for _ in 0..3 {
            registry.recheck(&c.challenge_id, &fail()).unwrap();
        }
        clock.advance(1_000);
        assert_eq!(
            registry.recheck(&c.challenge_id, &pass()),
            Err(ChallengeError::Cooldown {
                remaining_ms: COOLDOWN - 1_000
            })
        );
        assert_eq!(registry.get(&c.challenge_id).unwrap().attempts, 0);

        clock.advance(COOLDOWN);
        assert!(matches!(
            registry.recheck(&c.challenge_id, &pass()).unwrap(),
            RecheckOutcome::Passed { .. }
        ));
    }

    #[test]
    fn wall_clock_jump_does_not_shorten_lock() {
        let (clock, registry) = setup();
        let c = registry.create("u1");
        for _ in 0..3 {
            registry.recheck(&c.challenge_id, &fail()).unwrap();
        }
        clock.set(u64::MAX / 2);
        assert!(matches!(
            registry.recheck(&c.challenge_id, &pass()),
            Err(ChallengeError::Cooldown { .. })
        ));
    }

    #[test]
    fn single_action_is_not_enough() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        let outcome = registry
            .recheck(&c.challenge_id, &ActiveChallengeResult::new(true, false))
            .unwrap();
        assert!(matches!(outcome, RecheckOutcome::Failed { attempt: 1, .. }));
        assert_eq!(outcome.active_score(), 0.5);
    }

    #[test]
    fn passing_also_locks_for_the_cooldown() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        let outcome = registry.recheck(&c.challenge_id, &pass()).unwrap();
        assert_eq!(outcome.user_id(), "u1");
        assert!(matches!(outcome, RecheckOutcome::Passed { .. }));

        assert!(matches!(
            registry.recheck(&c.challenge_id, &pass()),
            Err(ChallengeError::Cooldown { remaining_ms: COOLDOWN })
        ));
    }

    #[test]
    fn passed_challenge_opens_gate_once() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        registry.recheck(&c.challenge_id, &pass()).unwrap();

        assert_eq!(registry.consume("u1", Some(&c.challenge_id)), GateDecision::Open);
        assert!(registry.get(&c.challenge_id).is_none());

        match registry.consume("u1", Some(&c.challenge_id)) {
            GateDecision::ChallengeRequired(fresh) => {
                assert_ne!(fresh.challenge_id, c.challenge_id)
            }
            GateDecision::Open => panic!("challenge reused"),
        }
    }

    #[test]
    fn pending_challenge_is_returned_to_its_owner() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        assert_eq!(
            registry.consume("u1", Some(&c.challenge_id)),
            GateDecision::ChallengeRequired(c)
        );
    }

    #[test]
    fn locked_pending_challenge_reports_remaining_lock() {
        let (clock, registry) = setup();
        let c = registry.create("u1");
        for _ in 0..3 {
            registry.recheck(&c.challenge_id, &fail()).unwrap();
        }
        clock.advance(30_000);

        let GateDecision::ChallengeRequired(pending) =
            registry.consume("u1", Some(&c.challenge_id))
        else {
            panic!("locked challenge opened the gate");
        };
        assert_eq!(pending.challenge_id, c.challenge_id);
        assert_eq!(pending.locked_for_ms, Some(COOLDOWN - 30_000));
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["locked_for_ms"], COOLDOWN - 30_000);

        clock.advance(COOLDOWN);
        let GateDecision::ChallengeRequired(unlocked) =
            registry.consume("u1", Some(&c.challenge_id))
        else {
            panic!("locked challenge opened the gate");
        };
        assert_eq!(unlocked.locked_for_ms, None);
        assert!(serde_json::to_value(&unlocked)
            .unwrap()
            .get("locked_for_ms")
            .is_none());
    }

    #[test]
    fn another_users_challenge_is_never_echoed() {
        let (_, registry) = setup();
        let theirs = registry.create("u1");
        registry.recheck(&theirs.challenge_id, &pass()).unwrap();

        match registry.consume("u2", Some(&theirs.challenge_id)) {
            GateDecision::ChallengeRequired(c) => {
                assert_eq!(c.user_id, "u2");
                assert_ne!(c.challenge_id, theirs.challenge_id);
            }
            GateDecision::Open => panic!("gate opened for the wrong user"),
        }
        assert!(registry.get(&theirs.challenge_id).unwrap().passed);
    }

    #[test]
    fn missing_id_creates_challenge() {
        let (_, registry) = setup();
        assert!(matches!(
            registry.consume("u1", None),
            GateDecision::ChallengeRequired(_)
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn sweep_drops_old_challenges() {
        let (clock, registry) = setup();
        registry.create("u1");
        clock.advance(10_000);
        let recent = registry.create("u2");

        assert_eq!(registry.sweep_expired(Duration::from_millis(5_000)), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&recent.challenge_id).is_some());
    }

    #[test]
    fn locked_until_is_not_serialized() {
        let (_, registry) = setup();
        let c = registry.create("u1");
        registry.recheck(&c.challenge_id, &pass()).unwrap();
        let json = serde_json::to_value(registry.get(&c.challenge_id).unwrap()).unwrap();
        assert!(json.get("locked_until").is_none());
        assert_eq!(json["locked_for_ms"], COOLDOWN);
        assert_eq!(json["passed"], true);
    }
}
