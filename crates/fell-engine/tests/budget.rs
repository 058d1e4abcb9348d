//! Time, break-rate, and falling-body budgets under a fake clock.

use std::time::Duration;

use fell_core::{Clock, SpaceId, VoxelPos};
use fell_engine::{Dispatcher, FallMode, FellConfig, JobOutcome, TickMetrics};
use fell_test_utils::fixtures::column;
use fell_test_utils::{FakeClock, MockWorld, RecordingSink, TRUNK_ITEM};

const SPACE: SpaceId = SpaceId(0);
const PROBE_COST: Duration = Duration::from_micros(100);

fn dispatcher_with(config: FellConfig, clock: FakeClock) -> Dispatcher {
    match Dispatcher::with_clock(config, Box::new(clock)) {
        Ok(d) => d,
        Err(e) => panic!("invalid config: {e}"),
    }
}

/// 20 Hz with 2% of each tick available: a 1 ms budget, checked on
/// every work unit.
fn one_millisecond() -> FellConfig {
    FellConfig {
        tick_rate_hz: 20.0,
        tick_time_fraction: 0.02,
        clock_check_interval: 1,
        ..FellConfig::default()
    }
}

fn tick(d: &mut Dispatcher, world: &mut MockWorld, sink: &mut RecordingSink) -> TickMetrics {
    match d.route_tick(SPACE, world, sink) {
        Some(m) => m,
        None => panic!("space unexpectedly idle"),
    }
}

#[test]
fn work_stops_at_the_tick_deadline() {
    let clock = FakeClock::new();
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    world.charge_probes(clock.clone(), PROBE_COST);
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 80);
    let mut d = dispatcher_with(one_millisecond(), clock.clone());
    d.submit(SPACE, origin, None, None).ok();

    let metrics = tick(&mut d, &mut world, &mut sink);
    assert!(metrics.deadline_hit);
    // Ten probes fill the budget; at most one more may start before the
    // deadline is observed.
    assert!(world.probes() >= 10);
    assert!(world.probes() <= 11);
    assert!(clock.now() <= Duration::from_micros(1_100));
    assert_eq!(d.pending_jobs(SPACE), 1);

    let before = world.probes();
    let metrics = tick(&mut d, &mut world, &mut sink);
    assert!(metrics.deadline_hit);
    assert!(world.probes() - before <= 11);
    assert!(metrics.total_us <= 1_100);
    assert_eq!(world.trunk_count(), 80);
}

#[test]
fn overdue_job_finishes_within_bounded_ticks() {
    let clock = FakeClock::new();
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    world.charge_probes(clock.clone(), PROBE_COST);
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 80);
    let config = FellConfig {
        max_job_age_ticks: 3,
        ..one_millisecond()
    };
    let mut d = dispatcher_with(config, clock);
    d.submit(SPACE, origin, None, None).ok();

    let mut ticks = 0;
    let mut outcome = None;
    while let Some(metrics) = d.route_tick(SPACE, &mut world, &mut sink) {
        ticks += 1;
        if let Some(done) = metrics.completed.first() {
            outcome = Some(done.outcome);
        }
        assert!(ticks <= 4, "job outlived its age limit");
    }
    assert_eq!(ticks, 4);
    assert_eq!(
        outcome,
        Some(JobOutcome::TimedOut {
            trunk: 0,
            foliage: 0
        })
    );
    assert_eq!(world.trunk_count(), 80);
    assert_eq!(d.stats(SPACE).map(|s| s.timed_out), Some(1));
}

#[test]
fn break_rate_caps_destruction_per_tick() {
    let mut config = FellConfig {
        breaks_per_second: 40.0,
        ..FellConfig::default()
    };
    config.foliage.enabled = false;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 10);
    d.submit(SPACE, origin, None, None).ok();

    for t in 1..=5 {
        let metrics = tick(&mut d, &mut world, &mut sink);
        assert_eq!(metrics.breaks_used, 2);
        assert_eq!(world.broken.len(), 2 * t);
    }
    assert_eq!(d.pending_jobs(SPACE), 0);
    assert_eq!(sink.count(TRUNK_ITEM), 10);
}

#[test]
fn falling_body_cap_defers_spawns() {
    let mut config = FellConfig::default();
    config.foliage.enabled = false;
    config.fall.mode = FallMode::Intact;
    config.fall.max_falling_bodies = 2;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 5);
    d.submit(SPACE, origin, None, None).ok();

    tick(&mut d, &mut world, &mut sink);
    assert_eq!(world.lifted.len(), 5);
    assert_eq!(world.spawned.len(), 2);

    // Nothing lands, nothing spawns.
    tick(&mut d, &mut world, &mut sink);
    assert_eq!(world.spawned.len(), 2);

    world.land_all();
    tick(&mut d, &mut world, &mut sink);
    assert_eq!(world.spawned.len(), 4);

    world.land_all();
    let metrics = tick(&mut d, &mut world, &mut sink);
    assert_eq!(world.spawned.len(), 5);
    assert!(matches!(
        metrics.completed.first().map(|c| c.outcome),
        Some(JobOutcome::Felled { trunk: 5, .. })
    ));
    assert!(sink.batches.is_empty());
}

#[test]
fn spawning_continues_once_the_share_is_spent() {
    // Half a break per tick: every lift spends the job's whole share.
    let mut config = FellConfig {
        breaks_per_second: 10.0,
        ..FellConfig::default()
    };
    config.foliage.enabled = false;
    config.fall.mode = FallMode::Intact;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 2);
    d.submit(SPACE, origin, None, None).ok();

    let mut lifted_all = false;
    while let Some(metrics) = d.route_tick(SPACE, &mut world, &mut sink) {
        if !lifted_all && world.lifted.len() == 2 {
            lifted_all = true;
            assert!(metrics.breaks_used > 0);
            assert_eq!(world.spawned.len(), 2);
        }
    }
    assert!(lifted_all);
    assert_eq!(world.spawned.len(), 2);
}

#[test]
fn rejected_spawns_become_drops() {
    let mut config = FellConfig::default();
    config.foliage.enabled = false;
    config.fall.mode = FallMode::Intact;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    world.reject_spawns = true;
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 5);
    d.submit(SPACE, origin, None, None).ok();

    while d.route_tick(SPACE, &mut world, &mut sink).is_some() {}

    assert!(world.spawned.is_empty());
    assert_eq!(world.trunk_count(), 0);
    assert_eq!(sink.count(TRUNK_ITEM), 5);
}

#[test]
fn jobs_share_the_space_allowance() {
    let mut config = FellConfig {
        breaks_per_second: 40.0,
        ..FellConfig::default()
    };
    config.foliage.enabled = false;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let a = VoxelPos::new(0, 10, 0);
    let b = VoxelPos::new(30, 10, 0);
    column(&mut world, a, 4);
    column(&mut world, b, 4);
    d.submit(SPACE, a, None, None).ok();
    d.submit(SPACE, b, None, None).ok();

    let metrics = tick(&mut d, &mut world, &mut sink);
    assert_eq!(metrics.breaks_used, 2);
    let from_a = world.broken.iter().filter(|p| p.x == a.x).count();
    let from_b = world.broken.iter().filter(|p| p.x == b.x).count();
    assert_eq!((from_a, from_b), (1, 1));
}

#[test]
fn break_effects_spread_from_the_first_tick() {
    let mut config = FellConfig::default();
    config.foliage.enabled = false;
    let mut d = dispatcher_with(config, FakeClock::new());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 40);
    d.submit(SPACE, origin, None, None).ok();

    // 16 effects across 40 breaks, 8 breaks a tick: the search finishes
    // and the clear starts within the first tick, which gets no more than
    // its share.
    let mut per_tick = Vec::new();
    while let Some(metrics) = d.route_tick(SPACE, &mut world, &mut sink) {
        if metrics.breaks_used > 0 {
            per_tick.push((metrics.breaks_used, metrics.effects_emitted));
        }
    }
    assert_eq!(per_tick.len(), 5);
    for (breaks, effects) in &per_tick {
        assert_eq!(*breaks, 8);
        assert!((2..=4).contains(effects), "uneven spread: {per_tick:?}");
    }
    assert!(world.feedback.len() <= 16);
}
