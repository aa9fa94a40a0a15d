//! Cryptographic primitives for FaceGuard.
//!
//! - **Biohash** seeded orthonormal projection that turns a raw face embedding
//!   into a revocable template
//! - **Cosine similarity** for template matching
//! - **SHA-256** for audit-chain hashing and key derivation
//! - **HMAC-SHA256** for webhook and receipt signatures
//! - **AES-256-GCM** for sealing data at rest

pub mod biohash;
pub mod encryption;
pub mod error;
pub mod hash;
pub mod sign;
pub mod similarity;

pub use biohash::{BiohashEngine, Projection, DEFAULT_CACHE_CAPACITY};
pub use encryption::{open, seal, SealingKey};
pub use error::CryptoError;
pub use hash::{sha256, sha256_hex, sha256_multi};
pub use sign::{hmac_sha256, sign_hex, verify_hex};
pub use similarity::{cosine_similarity, l2_norm};
