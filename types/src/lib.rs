//! Fundamental types for the FaceGuard authentication engine.
//!
//! This crate defines the data model shared across every other crate in the
//! workspace: timestamps and clocks, biometric templates, user records,
//! request signals, risk assessments and service parameters.

pub mod legal;
pub mod params;
pub mod risk;
pub mod signals;
pub mod template;
pub mod time;
pub mod user;

pub use legal::{ConsentRecord, DsarRecord, DsarStatus};
pub use params::{FaceParams, DEFAULT_REGION, DEFAULT_TENANT};
pub use risk::RiskAssessment;
pub use signals::{ActiveChallengeResult, GeoInfo, PassiveSignals, VelocityCounters};
pub use template::{BiohashTemplate, EMBEDDING_DIM};
pub use time::{Clock, SystemClock, Timestamp, MILLIS_PER_DAY};
pub use user::{RetentionPolicy, RiskHistoryEntry, TrustedDevice, UserRecord};
