use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("invalid CIDR range {0:?}")]
    InvalidCidr(String),
}
