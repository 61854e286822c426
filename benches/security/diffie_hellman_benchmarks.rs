use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modp_dh::{KeyAgreement, KeyAgreementConfig, ModpGroup, Rfc3526Group};

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    for modp in [
        Rfc3526Group::Modp2048,
        Rfc3526Group::Modp4096,
        Rfc3526Group::Modp6144,
    ] {
        let config = KeyAgreementConfig::with_group(ModpGroup::rfc3526(modp));
        group.bench_with_input(BenchmarkId::from_parameter(modp.bits()), &config, |b, config| {
            b.iter(|| KeyAgreement::new(black_box(config)).unwrap())
        });
    }
    group.finish();
}

fn bench_shared_secret(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_secret");
    group.sample_size(20);
    for modp in [
        Rfc3526Group::Modp2048,
        Rfc3526Group::Modp4096,
        Rfc3526Group::Modp6144,
    ] {
        let config = KeyAgreementConfig::with_group(ModpGroup::rfc3526(modp));
        let alice = KeyAgreement::new(&config).unwrap();
        let bob = KeyAgreement::new(&config).unwrap();
        let peer = bob.public_value().clone();
        group.bench_with_input(BenchmarkId::from_parameter(modp.bits()), &peer, |b, peer| {
            b.iter(|| alice.derive_shared_secret(black_box(peer)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_key_generation, bench_shared_secret);
criterion_main!(benches);
