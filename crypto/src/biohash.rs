//! Biohash: seeded orthonormal projection of face embeddings.
//!
//! A raw embedding is multiplied by a random orthonormal basis derived from a
//! per-user seed and the result is L2-normalized. Without the seed the template
//! cannot be related back to the embedding, and rotating the seed revokes every
//! template produced under the old one.
//!
//! Stored templates must be reproducible across restarts and upgrades, so the
//! basis is drawn from ChaCha20 keyed by a digest of `(seed, dim)`. Its output
//! stream is fixed by the cipher, unlike `StdRng`.
//!
//! Basis generation costs O(dim³), so bases are cached per engine, keyed by the
//! same digest. The seed itself is never retained.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, PoisonError};

use faceguard_types::EMBEDDING_DIM;

use crate::error::CryptoError;
use crate::hash::sha256_multi;

/// Number of bases an engine keeps before evicting the oldest.
///
/// A 512-dimension basis occupies 1 MiB.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

const BIOHASH_DOMAIN: &[u8] = b"faceguard-biohash-v1";

type CacheKey = [u8; 32];

/// A square orthonormal matrix stored row-major.
pub struct Projection {
    dim: usize,
    basis: Vec<f32>,
}

impl Projection {
    /// Generate the basis for a derived key.
    ///
    /// Entries are standard-normal samples from ChaCha20 keyed with `key`;
    /// rows are then orthonormalized with modified Gram–Schmidt.
    pub fn generate(key: CacheKey, dim: usize) -> Self {
        let mut rng = ChaCha20Rng::from_seed(key);
        let mut rows: Vec<f64> = (0..dim * dim).map(|_| standard_normal(&mut rng)).collect();

        for i in 0..dim {
            let (done, rest) = rows.split_at_mut(i * dim);
            let row = &mut rest[..dim];
            for prev in done.chunks_exact(dim) {
                let dot: f64 = row.iter().zip(prev).map(|(a, b)| a * b).sum();
                row.iter_mut().zip(prev).for_each(|(a, b)| *a -= dot * b);
            }
            let norm = row.iter().map(|a| a * a).sum::<f64>().sqrt();
            let norm = if norm == 0.0 { 1.0 } else { norm };
            row.iter_mut().for_each(|a| *a /= norm);
        }

        Self {
            dim,
            basis: rows.into_iter().map(|a| a as f32).collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.basis[i * self.dim..(i + 1) * self.dim]
    }

    /// Multiply `v` by the basis and return the unit-norm result, or `None`
    /// when the projection has zero length.
    ///
    /// `v` must have `dim` components; callers validate first.
    fn project_normalized(&self, v: &[f32]) -> Option<Vec<f32>> {
        let projected: Vec<f64> = self
            .basis
            .chunks_exact(self.dim)
            .map(|row| {
                row.iter()
                    .zip(v)
                    .map(|(&r, &x)| f64::from(r) * f64::from(x))
                    .sum()
            })
            .collect();
        let norm = projected.iter().map(|a| a * a).sum::<f64>().sqrt();
        if !norm.is_normal() {
            return None;
        }
        Some(projected.into_iter().map(|a| (a / norm) as f32).collect())
    }
}

/// Box–Muller transform of two uniforms into one standard-normal sample.
fn standard_normal(rng: &mut ChaCha20Rng) -> f64 {
    // gen::<f64>() is in [0, 1); shift to (0, 1] so ln() stays finite.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn derive_key(seed: &str, dim: usize) -> CacheKey {
    sha256_multi(&[BIOHASH_DOMAIN, &(dim as u64).to_le_bytes(), seed.as_bytes()])
}

#[derive(Default)]
struct ProjectionCache {
    entries: HashMap<CacheKey, Arc<Projection>>,
    insertion_order: VecDeque<CacheKey>,
}

/// Produces biohash templates and caches the bases it derives.
pub struct BiohashEngine {
    capacity: usize,
    cache: Mutex<ProjectionCache>,
}

impl BiohashEngine {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            cache: Mutex::new(ProjectionCache::default()),
        }
    }

    /// Return the basis for `(seed, dim)`, generating it on first use.
    pub fn project(&self, seed: &str, dim: usize) -> Result<Arc<Projection>, CryptoError> {
        if seed.is_empty() {
            return Err(CryptoError::MissingSeed);
        }
        let key = derive_key(seed, dim);
        if let Some(hit) = self.lock_cache().entries.get(&key) {
            return Ok(Arc::clone(hit));
        }

        // Generated outside the lock; a concurrent miss on the same key
        // produces an identical basis, so either copy may win.
        let projection = Arc::new(Projection::generate(key, dim));

        let mut cache = self.lock_cache();
        if let Some(existing) = cache.entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        while cache.entries.len() >= self.capacity {
            match cache.insertion_order.pop_front() {
                Some(oldest) => {
                    cache.entries.remove(&oldest);
                }
                None => break,
            }
        }
        cache.entries.insert(key, Arc::clone(&projection));
        cache.insertion_order.push_back(key);
        Ok(projection)
    }

    /// Transform a raw 512-dimension embedding into a unit-norm template.
    pub fn apply(&self, embedding: &[f32], seed: &str) -> Result<Vec<f32>, CryptoError> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(CryptoError::InvalidEmbedding {
                expected: EMBEDDING_DIM,
                got: embedding.len(),
            });
        }
        if seed.is_empty() {
            return Err(CryptoError::MissingSeed);
        }
        if let Some(index) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(CryptoError::NonFiniteEmbedding(index));
        }
        if embedding.iter().all(|&x| x == 0.0) {
            return Err(CryptoError::DegenerateEmbedding);
        }
        let projection = self.project(seed, EMBEDDING_DIM)?;
        projection
            .project_normalized(embedding)
            .ok_or(CryptoError::DegenerateEmbedding)
    }

    pub fn clear_cache(&self) {
        let mut cache = self.lock_cache();
        cache.entries.clear();
        cache.insertion_order.clear();
    }

    pub fn cached_projections(&self) -> usize {
        self.lock_cache().entries.len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ProjectionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BiohashEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{cosine_similarity, l2_norm};
    use std::sync::OnceLock;

    fn engine() -> &'static BiohashEngine {
        static ENGINE: OnceLock<BiohashEngine> = OnceLock::new();
        ENGINE.get_or_init(BiohashEngine::new)
    }

    fn embedding(phase: f32) -> Vec<f32> {
        (0..EMBEDDING_DIM)
            .map(|i| (i as f32 * 0.37 + phase).sin())
            .collect()
    }

    #[test]
    fn small_basis_is_orthonormal() {
        let p = Projection::generate(derive_key("ortho", 16), 16);
        for i in 0..16 {
            for j in 0..16 {
                let dot: f64 = p
                    .row(i)
                    .iter()
                    .zip(p.row(j))
                    .map(|(&a, &b)| f64::from(a) * f64::from(b))
                    .sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "row {i}·{j} = {dot}");
            }
        }
    }

    #[test]
    fn template_has_unit_norm() {
        let t = engine().apply(&embedding(0.0), "seed-a").unwrap();
        assert_eq!(t.len(), EMBEDDING_DIM);
        assert!((l2_norm(&t) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn apply_is_deterministic() {
        let a = engine().apply(&embedding(0.5), "seed-a").unwrap();
        let fresh = BiohashEngine::with_capacity(1);
        let b = fresh.apply(&embedding(0.5), "seed-a").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn self_similarity_is_one() {
        let t = engine().apply(&embedding(1.0), "seed-a").unwrap();
        assert!((cosine_similarity(&t, &t) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn different_seeds_are_unrelated() {
        let a = engine().apply(&embedding(0.0), "seed-a").unwrap();
        let b = engine().apply(&embedding(0.0), "seed-b").unwrap();
        assert!(cosine_similarity(&a, &b).abs() < 0.25);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = engine().apply(&[0.1; 128], "seed-a").unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidEmbedding {
                expected: 512,
                got: 128
            }
        ));
    }

    #[test]
    fn rejects_empty_seed() {
        assert!(matches!(
            engine().apply(&embedding(0.0), ""),
            Err(CryptoError::MissingSeed)
        ));
    }

    #[test]
    fn rejects_non_finite_components() {
        let mut e = embedding(0.0);
        e[7] = f32::NAN;
        assert!(matches!(
            engine().apply(&e, "seed-a"),
            Err(CryptoError::NonFiniteEmbedding(7))
        ));
    }

    #[test]
    fn rejects_zero_embedding() {
        assert!(matches!(
            engine().apply(&[0.0; EMBEDDING_DIM], "seed-a"),
            Err(CryptoError::DegenerateEmbedding)
        ));
        let mut e = vec![0.0f32; EMBEDDING_DIM];
        e[0] = -0.0;
        assert!(matches!(
            engine().apply(&e, "seed-a"),
            Err(CryptoError::DegenerateEmbedding)
        ));
    }

    #[test]
    fn tiny_embedding_still_has_unit_norm() {
        let mut e = vec![0.0f32; EMBEDDING_DIM];
        e[3] = 1e-30;
        let t = engine().apply(&e, "seed-a").unwrap();
        assert!((l2_norm(&t) - 1.0).abs() < 1e-4);
    }

    /// Templates persist across releases, so the projection stream is pinned.
    #[test]
    fn projection_stream_is_pinned() {
        let e: Vec<f32> = (0..EMBEDDING_DIM).map(|i| (i % 7) as f32 - 3.0).collect();
        let t = BiohashEngine::with_capacity(1).apply(&e, "seed").unwrap();
        let expected = [-0.0083556f32, -0.0667772, -0.0653364, -0.0208979];
        for (i, (&got, &want)) in t.iter().zip(&expected).enumerate() {
            assert!((got - want).abs() < 1e-5, "component {i}: {got} != {want}");
        }
    }

    #[test]
    fn cache_reuses_and_evicts() {
        let engine = BiohashEngine::with_capacity(2);
        let first = engine.project("s1", 8).unwrap();
        let again = engine.project("s1", 8).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        engine.project("s2", 8).unwrap();
        engine.project("s3", 8).unwrap();
        assert_eq!(engine.cached_projections(), 2);

        let regenerated = engine.project("s1", 8).unwrap();
        assert!(!Arc::ptr_eq(&first, &regenerated));
        assert_eq!(first.row(3), regenerated.row(3));

        engine.clear_cache();
        assert_eq!(engine.cached_projections(), 0);
    }

    #[test]
    fn dimension_is_part_of_the_key() {
        let engine = BiohashEngine::new();
        let a = engine.project("s1", 4).unwrap();
        let b = engine.project("s1", 6).unwrap();
        assert_eq!(a.dim(), 4);
        assert_eq!(b.dim(), 6);
        assert_eq!(engine.cached_projections(), 2);
    }
}
