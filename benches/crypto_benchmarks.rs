use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use facelock::{
    aead::{self, AeadVault, KeySize},
    envelope::{open_hybrid, seal_hybrid, ElGamalKeyPair, RsaKeyPair, UnwrapKey, WrapKey},
};

fn aead_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead");

    for size in [KeySize::Aes128, KeySize::Aes256] {
        let key = aead::generate_key(size);
        let vault = AeadVault::new(key.as_bytes()).unwrap();
        // A 128-float face encoding
        let plaintext = vec![0x5au8; 1024];
        let sealed = vault.seal(&plaintext, None).unwrap();

        group.bench_with_input(
            BenchmarkId::new("seal", size.len() * 8),
            &plaintext,
            |b, plaintext| b.iter(|| vault.seal(plaintext, None)),
        );
        group.bench_with_input(BenchmarkId::new("open", size.len() * 8), &sealed, |b, sealed| {
            b.iter(|| vault.open(sealed, None))
        });
    }

    group.finish();
}

fn elgamal_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("elgamal");
    group.sample_size(10);

    let pair = ElGamalKeyPair::generate(512).unwrap();
    let key = aead::generate_key(KeySize::Aes256);
    let wrapped = pair.public_key().wrap_key(key.as_bytes()).unwrap();

    group.bench_function("key_generation_512", |b| {
        b.iter(|| ElGamalKeyPair::generate(512))
    });
    group.bench_function("wrap", |b| {
        b.iter(|| pair.public_key().wrap_key(key.as_bytes()))
    });
    group.bench_function("unwrap", |b| {
        b.iter(|| pair.private_key().unwrap_key(&wrapped, 32))
    });

    group.finish();
}

fn rsa_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsa_oaep");
    group.sample_size(10);

    let pair = RsaKeyPair::generate(2048).unwrap();
    let key = aead::generate_key(KeySize::Aes128);
    let wrapped = pair.public_key().wrap_key(key.as_bytes()).unwrap();

    group.bench_function("wrap", |b| {
        b.iter(|| pair.public_key().wrap_key(key.as_bytes()))
    });
    group.bench_function("unwrap", |b| {
        b.iter(|| pair.private_key().unwrap_key(&wrapped, 16))
    });

    group.finish();
}

fn hybrid_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid");
    group.sample_size(20);

    let pair = RsaKeyPair::generate(2048).unwrap();
    let template = vec![0x11u8; 1024];
    let identity: &[u8] = b"alice";
    let envelope =
        seal_hybrid(pair.public_key(), KeySize::Aes128, &template, Some(identity)).unwrap();

    group.bench_function("seal_template", |b| {
        b.iter(|| seal_hybrid(pair.public_key(), KeySize::Aes128, &template, Some(identity)))
    });
    group.bench_function("open_template", |b| {
        b.iter(|| open_hybrid(pair.private_key(), KeySize::Aes128, &envelope, Some(identity)))
    });

    group.finish();
}

criterion_group!(
    benches,
    aead_benchmarks,
    elgamal_benchmarks,
    rsa_benchmarks,
    hybrid_benchmarks
);
criterion_main!(benches);
