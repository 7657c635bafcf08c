// Venue cascade selection over large candidate sets.
//
// The cascade runs on the decision loop after every vector search, so its
// cost must stay negligible next to the search itself.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use longmem::retrieval::select_venue_biased;
use longmem::types::SopHit;

fn candidates(n: usize) -> Vec<SopHit> {
    (0..n)
        .map(|i| SopHit {
            regime: format!("REGIME_{i}"),
            narrative: "lesson".to_string(),
            venue: match i % 7 {
                0 => "ALL".to_string(),
                1 => "KRAKEN".to_string(),
                _ => format!("VENUE_{}", i % 23),
            },
            distance: i as f32 * 0.001,
        })
        .collect()
}

fn bench_select(c: &mut Criterion) {
    let ranked = candidates(5_000);

    c.bench_function("select_exact_venue_5k", |b| {
        b.iter(|| select_venue_biased(black_box(&ranked), black_box("KRAKEN")))
    });

    c.bench_function("select_universal_fallback_5k", |b| {
        b.iter(|| select_venue_biased(black_box(&ranked), black_box("UNSEEN_VENUE")))
    });

    c.bench_function("select_all_request_5k", |b| {
        b.iter(|| select_venue_biased(black_box(&ranked), black_box("ALL")))
    });
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
