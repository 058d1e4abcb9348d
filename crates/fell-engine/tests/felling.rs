//! End-to-end felling through the dispatcher.
//!
//! Each test builds a small world, submits the voxel above a freshly
//! broken trunk voxel, and ticks the space until it goes idle.

use fell_core::{ActorId, Implement, ItemId, SpaceId, VoxelPos};
use fell_engine::{CompletedJob, Dispatcher, FellConfig, JobOutcome, Submission};
use fell_test_utils::fixtures::{column, crowned_tree, diagonal_link, ground_plane, leaf};
use fell_test_utils::{FakeClock, MockWorld, RecordingSink, FOLIAGE_ITEM, TRUNK_ITEM};

const SPACE: SpaceId = SpaceId(3);

fn dispatcher(config: FellConfig) -> Dispatcher {
    match Dispatcher::with_clock(config, Box::new(FakeClock::new())) {
        Ok(d) => d,
        Err(e) => panic!("invalid config: {e}"),
    }
}

/// Tick until the space goes idle, returning every completed job.
fn run(d: &mut Dispatcher, world: &mut MockWorld, sink: &mut RecordingSink) -> Vec<CompletedJob> {
    let mut done = Vec::new();
    for _ in 0..1_000 {
        match d.route_tick(SPACE, world, sink) {
            Some(metrics) => done.extend(metrics.completed),
            None => return done,
        }
    }
    panic!("space did not go idle");
}

#[test]
fn intact_tree_is_left_standing() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    ground_plane(&mut world, VoxelPos::new(0, 0, 0), 4);
    crowned_tree(&mut world, VoxelPos::new(0, 1, 0), 6, 2);
    let leaves = world.foliage_count();

    d.submit(SPACE, VoxelPos::new(0, 2, 0), None, None).ok();
    let done = run(&mut d, &mut world, &mut sink);

    assert_eq!(done.len(), 1);
    assert_eq!(done[0].outcome, JobOutcome::Standing);
    assert_eq!(world.trunk_count(), 6);
    assert_eq!(world.foliage_count(), leaves);
    assert!(sink.batches.is_empty());
    assert_eq!(d.stats(SPACE).map(|s| s.standing), Some(1));
}

#[test]
fn cut_tree_falls_with_its_crown() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    ground_plane(&mut world, VoxelPos::new(0, 0, 0), 4);
    crowned_tree(&mut world, VoxelPos::new(0, 1, 0), 6, 2);
    let leaves = world.foliage_count();
    world.remove(VoxelPos::new(0, 1, 0));

    d.submit(SPACE, VoxelPos::new(0, 2, 0), None, None).ok();
    let done = run(&mut d, &mut world, &mut sink);

    assert_eq!(done.len(), 1);
    match done[0].outcome {
        JobOutcome::Felled {
            trunk,
            foliage,
            truncated,
        } => {
            assert_eq!(trunk, 5);
            assert_eq!(foliage, leaves);
            assert_eq!(truncated, 0);
        }
        other => panic!("expected Felled, got {other:?}"),
    }
    assert_eq!(world.trunk_count(), 0);
    assert_eq!(world.foliage_count(), 0);
    assert_eq!(sink.count(TRUNK_ITEM), 5);
    assert_eq!(sink.count(FOLIAGE_ITEM), leaves as u64);
    // One effect window never elapses on a frozen clock.
    assert!(!world.feedback.is_empty());
    assert!(world.feedback.len() <= 16);
}

#[test]
fn neighbouring_crown_is_spared() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    ground_plane(&mut world, VoxelPos::new(0, 0, 0), 12);
    crowned_tree(&mut world, VoxelPos::new(0, 1, 0), 6, 2);
    crowned_tree(&mut world, VoxelPos::new(8, 1, 0), 6, 2);
    let per_tree = world.foliage_count() / 2;
    world.remove(VoxelPos::new(0, 1, 0));

    d.submit(SPACE, VoxelPos::new(0, 2, 0), None, None).ok();
    run(&mut d, &mut world, &mut sink);

    assert_eq!(world.trunk_count(), 6);
    assert_eq!(world.foliage_count(), per_tree);
}

#[test]
fn diagonal_link_to_grounded_stack_survives() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = diagonal_link(&mut world, true);

    d.submit(SPACE, origin, None, None).ok();
    let done = run(&mut d, &mut world, &mut sink);

    assert!(matches!(
        done[0].outcome,
        JobOutcome::Felled { trunk: 4, .. }
    ));
    assert_eq!(world.trunk_count(), 5);
    assert_eq!(world.get(VoxelPos::new(1, 5, 1)), Some(fell_test_utils::MockVoxel::Trunk));
}

#[test]
fn diagonal_link_without_ground_falls_entirely() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = diagonal_link(&mut world, false);

    d.submit(SPACE, origin, None, None).ok();
    run(&mut d, &mut world, &mut sink);

    assert_eq!(world.trunk_count(), 0);
    assert_eq!(sink.count(TRUNK_ITEM), 9);
}

#[test]
fn worn_out_implement_stops_the_clear() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    column(&mut world, VoxelPos::new(0, 10, 0), 5);
    world.durability = Some(3);
    let axe = Implement {
        item: ItemId(40),
        tier: 1,
        felling_level: 0,
    };

    d.submit(SPACE, VoxelPos::new(0, 10, 0), Some(ActorId(7)), Some(axe))
        .ok();
    let done = run(&mut d, &mut world, &mut sink);

    assert_eq!(done[0].outcome, JobOutcome::ImplementExhausted { trunk: 3 });
    assert_eq!(world.wear, 3);
    assert_eq!(world.trunk_count(), 2);
    assert_eq!(sink.count(TRUNK_ITEM), 3);
}

#[test]
fn consolidated_drops_go_to_the_actor() {
    let mut config = FellConfig::default();
    config.drops.consolidate = true;
    config.drops.deliver_to_actor = true;
    let mut d = dispatcher(config);
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 4);

    d.submit(SPACE, origin, Some(ActorId(9)), None).ok();
    run(&mut d, &mut world, &mut sink);

    assert_eq!(sink.batches.len(), 1);
    let batch = &sink.batches[0];
    assert_eq!(batch.pos, origin);
    assert_eq!(batch.receiver, Some(ActorId(9)));
    assert_eq!(sink.count(TRUNK_ITEM), 4);
}

#[test]
fn consolidated_trunk_drops_arrive_before_the_crown_is_cleared() {
    let mut config = FellConfig {
        breaks_per_second: 20.0,
        ..FellConfig::default()
    };
    config.drops.consolidate = true;
    let mut d = dispatcher(config);
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 2);
    for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        leaf(&mut world, VoxelPos::new(dx, 11, dz), 1);
    }
    d.submit(SPACE, origin, None, None).ok();

    let mut trunk_batch_while_crown_stood = false;
    while d.route_tick(SPACE, &mut world, &mut sink).is_some() {
        if world.trunk_count() == 0 && world.foliage_count() > 0 && sink.count(TRUNK_ITEM) == 2 {
            trunk_batch_while_crown_stood = true;
            assert_eq!(sink.batches.len(), 1);
            assert_eq!(sink.count(FOLIAGE_ITEM), 0);
        }
    }
    assert!(trunk_batch_while_crown_stood);
    assert_eq!(world.foliage_count(), 0);
    assert_eq!(sink.batches.len(), 2);
    assert_eq!(sink.count(FOLIAGE_ITEM), 4);
}

#[test]
fn origin_can_be_resubmitted_after_completion() {
    let mut d = dispatcher(FellConfig::default());
    let mut world = MockWorld::new();
    let mut sink = RecordingSink::new();
    let origin = VoxelPos::new(0, 10, 0);
    column(&mut world, origin, 2);

    assert!(matches!(
        d.submit(SPACE, origin, None, None),
        Ok(Submission::Queued { .. })
    ));
    run(&mut d, &mut world, &mut sink);

    assert!(matches!(
        d.submit(SPACE, origin, None, None),
        Ok(Submission::Queued { .. })
    ));
    let done = run(&mut d, &mut world, &mut sink);
    assert_eq!(done[0].outcome, JobOutcome::NoTrunk);
}
