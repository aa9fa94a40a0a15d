use criterion::{black_box, criterion_group, criterion_main, Criterion};
use faceguard_crypto::{BiohashEngine, Projection, SealingKey};

fn embedding() -> Vec<f32> {
    (0..512).map(|i| (i as f32 * 0.37).sin()).collect()
}

fn biohash_apply_cached_bench(c: &mut Criterion) {
    let engine = BiohashEngine::new();
    let e = embedding();
    engine.apply(&e, "bench-seed").unwrap();

    c.bench_function("biohash_apply_cached_512", |b| {
        b.iter(|| engine.apply(black_box(&e), "bench-seed"))
    });
}

fn projection_generate_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_generate");
    group.sample_size(10);
    group.bench_function("512", |b| {
        b.iter(|| Projection::generate(black_box([7u8; 32]), 512))
    });
    group.finish();
}

fn sha256_1kb_bench(c: &mut Criterion) {
    let data = vec![0xCDu8; 1024];

    c.bench_function("sha256_1KB", |b| {
        b.iter(|| faceguard_crypto::sha256(black_box(&data)))
    });
}

fn hmac_sign_bench(c: &mut Criterion) {
    let body = vec![0x42u8; 512];

    c.bench_function("hmac_sign_hex_512B", |b| {
        b.iter(|| faceguard_crypto::sign_hex(b"webhook-secret", black_box(&body)))
    });
}

fn seal_bench(c: &mut Criterion) {
    let key = SealingKey::from_secret("bench-key").unwrap();
    let blob = vec![0u8; 64 * 1024];

    c.bench_function("aes_gcm_seal_64KB", |b| {
        b.iter(|| faceguard_crypto::seal(&key, black_box(&blob)))
    });
}

criterion_group!(
    benches,
    biohash_apply_cached_bench,
    projection_generate_bench,
    sha256_1kb_bench,
    hmac_sign_bench,
    seal_bench,
);
criterion_main!(benches);
