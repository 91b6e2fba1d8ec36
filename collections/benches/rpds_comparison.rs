use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trie_collections::{Map, Vector};

pub fn collect(c: &mut Criterion) {
    let input = vec![0; 10000];
    let mut group = c.benchmark_group("collect");

    group.bench_function("ours vector 10000", |b| {
        b.iter(|| black_box(input.iter().copied().collect::<Vector<i32>>()))
    });

    group.bench_function("rpds vector 10000", |b| {
        b.iter(|| black_box(input.iter().copied().collect::<rpds::Vector<i32>>()))
    });

    group.bench_function("ours map 10000", |b| {
        b.iter(|| black_box((0..10000u32).map(|i| (i, i)).collect::<Map<_, _>>()))
    });

    group.bench_function("rpds map 10000", |b| {
        b.iter(|| {
            black_box(
                (0..10000u32)
                    .map(|i| (i, i))
                    .collect::<rpds::HashTrieMapSync<_, _>>(),
            )
        })
    });
}

pub fn get(c: &mut Criterion) {
    let ours: Vector<u32> = (0..10000).collect();
    let rpds: rpds::Vector<u32> = (0..10000).collect();
    let ours_map: Map<u32, u32> = (0..10000).map(|i| (i, i)).collect();
    let rpds_map: rpds::HashTrieMapSync<u32, u32> = (0..10000).map(|i| (i, i)).collect();
    let mut group = c.benchmark_group("get");

    group.bench_function("ours vector 10000", |b| {
        b.iter(|| {
            for i in 0..10000 {
                black_box(ours.get(i));
            }
        });
    });

    group.bench_function("rpds vector 10000", |b| {
        b.iter(|| {
            for i in 0..10000 {
                black_box(rpds.get(i));
            }
        });
    });

    group.bench_function("ours map 10000", |b| {
        b.iter(|| {
            for i in 0..10000 {
                black_box(ours_map.get(&i));
            }
        });
    });

    group.bench_function("rpds map 10000", |b| {
        b.iter(|| {
            for i in 0..10000 {
                black_box(rpds_map.get(&i));
            }
        });
    });
}

pub fn count(c: &mut Criterion) {
    let ours: Vector<u32> = (0..10000).collect();
    let rpds: rpds::Vector<u32> = (0..10000).collect();
    let mut group = c.benchmark_group("iter");

    group.bench_function("ours 10000", |b| {
        b.iter(|| black_box(ours.iter().count()));
    });

    group.bench_function("rpds 10000", |b| {
        b.iter(|| black_box(rpds.iter().count()));
    });
}

criterion_group!(benches, collect, get, count);
criterion_main!(benches);
