//! Rule-based risk scoring.
//!
//! A request's network origin, device and recent activity are scored against
//! a table of rules. Points add up to a score clamped to `[0, 100]`; two
//! thresholds on that score decide whether a liveness step-up is required and
//! whether the request is blocked outright. Every table, point value and
//! threshold comes from a [`RiskPolicy`] so deployments can tune them without
//! code changes.

pub mod cidr;
pub mod engine;
pub mod error;
pub mod policy;

pub use cidr::Cidr;
pub use engine::{Asn, RiskContext, RiskEngine};
pub use error::RiskError;
pub use policy::RiskPolicy;
