use criterion::{criterion_group, criterion_main, Criterion};

use lattice_kem::{Kem, KemKey, ParamSet, RngSource, ShakeRng};

fn kem_for(params: ParamSet, seed: &[u8]) -> Kem<'static> {
    Kem::new(params, RngSource::Owned(Box::new(ShakeRng::new(seed))))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let sets = [
        #[cfg(feature = "ring-lwe")]
        ParamSet::RlweQ12289N1024,
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K2,
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K3,
        #[cfg(feature = "module-lwe")]
        ParamSet::MlweQ7681N256K4,
    ];

    for params in sets {
        let mut keygen = kem_for(params, b"bench keygen");
        let (pk, sk) = keygen.generate().unwrap();

        let mut encryptor = kem_for(params, b"bench encaps");
        encryptor.initialize(KemKey::Public(pk)).unwrap();
        let (ct, _) = encryptor.encapsulate(32).unwrap();

        let mut decryptor = kem_for(params, b"bench decaps");
        decryptor.initialize(KemKey::Private(sk)).unwrap();

        c.bench_function(&format!("{params} Generate"), |b| {
            b.iter(|| keygen.generate())
        });
        c.bench_function(&format!("{params} Encapsulate"), |b| {
            b.iter(|| encryptor.encapsulate(32))
        });
        c.bench_function(&format!("{params} Decapsulate"), |b| {
            b.iter(|| decryptor.decapsulate(&ct, 32))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
