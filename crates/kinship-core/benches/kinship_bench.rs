//! # Kinship Benchmarks
//!
//! Run with: `cargo bench -p kinship-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kinship_core::{
    Gender, KinshipEngine, MemoryStore, Profile, ProfileId, RelationshipType, TransplantMode,
};
use std::hint::black_box;

fn pid(i: usize) -> ProfileId {
    ProfileId::new(format!("p{i}"))
}

/// Register `size` males and chain them father to son.
fn build_lineage(size: usize) -> KinshipEngine<MemoryStore> {
    let engine = KinshipEngine::in_memory();
    for i in 0..size {
        let _ = engine.register_profile(Profile::new(pid(i), Gender::Male));
    }
    for i in 1..size {
        let _ = engine.create_relationship(&pid(i - 1), &pid(i), RelationshipType::Father, &[]);
    }
    engine
}

/// One father with `size` children, each added with the siblings cascade.
fn build_sibship(size: usize) -> KinshipEngine<MemoryStore> {
    let engine = KinshipEngine::in_memory();
    let _ = engine.register_profile(Profile::new("dad", Gender::Male));
    for i in 0..size {
        let _ = engine.register_profile(Profile::new(pid(i), Gender::Female));
        let _ = engine.create_relationship(
            &ProfileId::from("dad"),
            &pid(i),
            RelationshipType::Father,
            &["siblings"],
        );
    }
    engine
}

fn bench_related_profiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("related_profiles");

    for size in [10, 100, 500] {
        let engine = build_lineage(size);
        let start = pid(size / 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(engine.related_profiles(&start, Some(3))));
        });
    }

    group.finish();
}

fn bench_sibling_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("sibling_cascade");
    group.sample_size(20);

    for size in [5, 20, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(build_sibship(size)));
        });
    }

    group.finish();
}

fn bench_transplant(c: &mut Criterion) {
    let mut group = c.benchmark_group("transplant_replace");
    group.sample_size(20);

    for size in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let engine = build_sibship(size);
                let _ = engine.register_profile(Profile::new("dup", Gender::Male));
                black_box(engine.transplant_node(
                    &ProfileId::from("dad"),
                    &ProfileId::from("dup"),
                    TransplantMode::Replace,
                ))
            });
        });
    }

    group.finish();
}

fn bench_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit");

    for size in [10, 100, 500] {
        let engine = build_lineage(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(engine.audit()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_related_profiles,
    bench_sibling_cascade,
    bench_transplant,
    bench_audit
);
criterion_main!(benches);
