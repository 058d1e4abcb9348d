//! Criterion benchmarks for structural analysis and scheduling.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use fell_bench::{cut_bases, forest_profile, tall_column_profile, unthrottled_config};
use fell_core::{SpaceId, SystemClock};
use fell_engine::{
    Dispatcher, Engine, FellConfig, Job, Scheduler, SpaceLimits, StepContext, StepStatus,
    TickBudget,
};
use fell_test_utils::{FakeClock, RecordingSink};

/// Benchmark: analyse an intact tree down to its standing verdict.
fn bench_standing_tree(c: &mut Criterion) {
    let config = unthrottled_config();
    let (mut world, origins) = forest_profile(1, 12, 3);
    let origin = origins[0];
    let clock = FakeClock::new();
    let mut engine = Engine::new();
    let mut sink = RecordingSink::new();

    c.bench_function("standing_tree", |b| {
        b.iter(|| {
            engine.begin(&Job::new(origin, None, None, 0));
            let mut deadline = TickBudget::unlimited();
            let mut budget = u32::MAX;
            let mut limits = SpaceLimits::unlimited(&config);
            loop {
                let mut ctx = StepContext::new(
                    &mut world,
                    &mut sink,
                    &clock,
                    &config,
                    &mut deadline,
                    &mut budget,
                    &mut limits,
                );
                if engine.step(&mut ctx) == StepStatus::Complete {
                    break;
                }
            }
            black_box(engine.outcome());
        });
    });
}

/// Benchmark: fell one 200-voxel floating column end to end.
fn bench_tall_column(c: &mut Criterion) {
    let config = Arc::new(unthrottled_config());
    let clock = FakeClock::new();

    c.bench_function("tall_column_200", |b| {
        b.iter_batched(
            || tall_column_profile(200),
            |(mut world, origin)| {
                let mut scheduler = match Scheduler::new(Arc::clone(&config)) {
                    Ok(s) => s,
                    Err(e) => panic!("invalid config: {e}"),
                };
                let mut sink = RecordingSink::new();
                scheduler.submit(origin, None, None).ok();
                while !scheduler.is_idle() {
                    black_box(scheduler.tick(&mut world, &mut sink, &clock));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: fell a 4x4 forest through the dispatcher under default
/// limits, real clock.
fn bench_forest_default_limits(c: &mut Criterion) {
    let space = SpaceId(0);

    c.bench_function("forest_16_default_limits", |b| {
        b.iter_batched(
            || {
                let (mut world, origins) = forest_profile(4, 8, 2);
                cut_bases(&mut world, &origins);
                (world, origins)
            },
            |(mut world, origins)| {
                let mut dispatcher = match Dispatcher::with_clock(
                    FellConfig::default(),
                    Box::new(SystemClock::new()),
                ) {
                    Ok(d) => d,
                    Err(e) => panic!("invalid config: {e}"),
                };
                let mut sink = RecordingSink::new();
                for origin in origins {
                    dispatcher.submit(space, origin, None, None).ok();
                }
                while let Some(metrics) = dispatcher.route_tick(space, &mut world, &mut sink) {
                    black_box(&metrics);
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_standing_tree,
    bench_tall_column,
    bench_forest_default_limits
);
criterion_main!(benches);
