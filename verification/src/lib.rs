//! Liveness verification.
//!
//! Two parts:
//! 1. **Liveness scoring**: passive anti-spoof signals and active challenge
//!    results are reduced to scores in `[0, 1]` and fused with the identity
//!    match into one combined score.
//! 2. **Step-up challenges**: when risk demands it, the user must complete a
//!    short action sequence (blink, head turn). Challenges allow a bounded
//!    number of attempts, lock for a cooldown and are consumed exactly once by
//!    the protected action they unlock.

pub mod challenge;
pub mod error;
pub mod liveness;

pub use challenge::{
    Challenge, ChallengeKind, ChallengePolicy, ChallengeRegistry, GateDecision, RecheckOutcome,
};
pub use error::ChallengeError;
pub use liveness::{combine_scores, FusionWeights, LivenessEvaluator, ACTIVE_PASS_SCORE};
