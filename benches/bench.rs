use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use snowshoe_gls::scalar::secret_gen;
use snowshoe_gls::{Scalar, mul, mul_gen, simul, simul_gen};

fn seeded_scalar(seed: u8) -> Scalar {
    secret_gen([seed; 32])
}

pub fn scalar_mul(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_mul");

    group.bench_function("mul_gen", |b| {
        b.iter_batched(
            || seeded_scalar(0x11),
            |k| mul_gen(&k, false).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("mul", |b| {
        b.iter_batched(
            || {
                let k = seeded_scalar(0x22);
                let p = mul_gen(&seeded_scalar(0x33), false).unwrap();
                (k, p)
            },
            |(k, p)| mul(&k, &p).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("simul", |b| {
        b.iter_batched(
            || {
                let a = seeded_scalar(0x44);
                let b = seeded_scalar(0x55);
                let p = mul_gen(&seeded_scalar(0x66), false).unwrap();
                let q = mul_gen(&seeded_scalar(0x77), false).unwrap();
                (a, p, b, q)
            },
            |(a, p, b, q)| simul(&a, &p, &b, &q).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("simul_gen", |b| {
        b.iter_batched(
            || {
                let a = seeded_scalar(0x88);
                let b = seeded_scalar(0x99);
                let q = mul_gen(&seeded_scalar(0xaa), false).unwrap();
                (a, b, q)
            },
            |(a, b, q)| simul_gen(&a, &b, &q).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, scalar_mul);
criterion_main!(benches);
