//! # Mainnet Watcher Benchmarks
//!
//! Hot paths that run once per epoch close:
//!
//! | Path | Work | Target |
//! |------|------|--------|
//! | Epoch folding | 2016 blocks, one nomination each | < 1ms |
//! | Canonical sort | Up to 2016 distinct validators | < 1ms |
//! | Window reclaim | Backward sweep of one epoch of blocks | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mainnet_watcher::algorithms::reclaim_memory;
use mainnet_watcher::{
    build_epoch, sort_epoch_nominations, ConfirmedBlock, Epoch, FinalizedBlockWindow, Height,
    Nomination,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const EPOCH: Height = 2016;

fn window_with(blocks: Height, validators: u32, seed: u64) -> FinalizedBlockWindow {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut window = FinalizedBlockWindow::new();
    for height in 1..=blocks {
        let mut pubkey = [0u8; 32];
        pubkey[..4].copy_from_slice(&rng.gen_range(0..validators).to_be_bytes());
        window.put(ConfirmedBlock::new(
            height,
            1_600_000_000 + height * 600 + rng.gen_range(-900..900),
            vec![Nomination::new(pubkey, 1)],
        ));
    }
    window
}

// ============================================================================
// Epoch folding
// ============================================================================

fn bench_build_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("epoch-builder");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(EPOCH as u64));

    for validators in [10u32, 100, 1000] {
        let window = window_with(EPOCH, validators, 42);
        group.bench_with_input(
            BenchmarkId::new("build_epoch_2016", validators),
            &window,
            |b, window| b.iter(|| black_box(build_epoch(window, 1, EPOCH).is_ok())),
        );
    }

    group.finish();
}

// ============================================================================
// Canonical sort
// ============================================================================

fn bench_sort_nominations(c: &mut Criterion) {
    let mut group = c.benchmark_group("nomination-sort");
    let mut rng = StdRng::seed_from_u64(7);

    for size in [10usize, 100, 2016] {
        let nominations: Vec<Nomination> = (0..size)
            .map(|_| Nomination::new(rng.gen(), rng.gen_range(1..50)))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("sort_epoch_nominations", size),
            &nominations,
            |b, nominations| {
                b.iter(|| {
                    let mut sorted = nominations.clone();
                    sort_epoch_nominations(&mut sorted);
                    black_box(sorted)
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Window reclaim
// ============================================================================

fn bench_reclaim(c: &mut Criterion) {
    let mut group = c.benchmark_group("window-reclaim");

    // Seven epochs buffered; closing the seventh evicts the first
    let blocks = 7 * EPOCH;
    let template = window_with(blocks, 100, 3);
    let newest = Epoch {
        number: 7,
        start_height: 6 * EPOCH + 1,
        end_time: 1,
        nominations: vec![],
    };

    group.bench_function("reclaim_one_epoch", |b| {
        b.iter_batched(
            || (template.clone(), vec![newest.clone()]),
            |(mut window, mut epochs)| {
                let stats = reclaim_memory(&mut window, &mut epochs, &mut Vec::new(), EPOCH, 7);
                black_box(stats.blocks_evicted)
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_build_epoch, bench_sort_nominations, bench_reclaim);
criterion_main!(benches);
