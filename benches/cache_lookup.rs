//! Cache key derivation and lookup throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use recipe_forge::cache::{CacheKey, CacheStore, RecipeCache};
use recipe_forge::types::GeneratedRecipe;
use recipe_forge::GenerationRequest;

fn request(i: usize, ingredients: usize) -> GenerationRequest {
    GenerationRequest::new(format!("Kue Nusantara {}", i), "kue", 12)
        .with_preferred((0..ingredients).map(|n| format!("bahan {}", n)))
        .with_target_price(15_000.0)
}

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");
    for ingredients in [3, 12, 48] {
        let req = request(0, ingredients);
        group.bench_with_input(
            BenchmarkId::from_parameter(ingredients),
            &req,
            |b, req| b.iter(|| CacheKey::for_request(black_box(req))),
        );
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");
    for entries in [16usize, 256, 4096] {
        let cache = RecipeCache::new(entries, None);
        let keys: Vec<CacheKey> = (0..entries)
            .map(|i| {
                let key = CacheKey::for_request(&request(i, 5));
                cache.put(key, GeneratedRecipe::new(format!("Kue Nusantara {}", i)));
                key
            })
            .collect();
        let probe = keys[entries / 2];
        group.bench_with_input(BenchmarkId::new("hit", entries), &probe, |b, key| {
            b.iter(|| cache.get(black_box(key)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_key_derivation, bench_lookup);
criterion_main!(benches);
