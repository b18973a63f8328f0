use kirinuki_core::game::{DIR_LEFT, DIR_RIGHT, ROTATION_STEP_DEG_DEFAULT};
use kirinuki_core::geometry::{ring_self_crosses, ring_signed_area};
use kirinuki_core::propagate::drag;
use kirinuki_core::{
    is_adjacent, BoundaryPathGenerator, Bounds, GridPathPlanner, GridSpec, JoinOutcome,
    MergeTracker, ParamSource, PieceTransform, Seeded, ShapeFamily, ToleranceConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn grid_2x2() -> GridSpec {
    GridSpec::new(2, 2, 100.0, 100.0, (0.0, 0.0)).unwrap()
}

fn far_apart(total: usize) -> Vec<PieceTransform> {
    (0..total)
        .map(|id| PieceTransform::at((1000.0 + id as f32 * 500.0, 1000.0)))
        .collect()
}

fn assert_rigid(grid: &GridSpec, tracker: &MergeTracker, transforms: &[PieceTransform]) {
    for (_, members) in tracker.groups() {
        let lead = transforms[members[0]];
        for &member in members {
            let expected = kirinuki_core::expected_position(grid, members[0], member, &lead);
            let actual = transforms[member];
            assert_eq!(actual.rotation, lead.rotation);
            assert!((actual.position.0 - expected.0).abs() < 0.05);
            assert!((actual.position.1 - expected.1).abs() < 0.05);
        }
    }
}

fn assert_partition(tracker: &MergeTracker) {
    let mut seen = vec![false; tracker.total()];
    for (group, members) in tracker.groups() {
        assert!(members.len() >= 2);
        for &piece in members {
            assert!(!seen[piece], "piece {} in two groups", piece);
            seen[piece] = true;
            assert_eq!(tracker.group_of(piece), Some(group));
        }
    }
    for (piece, listed) in seen.iter().enumerate() {
        if !listed {
            assert_eq!(tracker.group_of(piece), None);
        }
    }
}

#[test]
fn scenario_a_first_pair_merges() {
    let grid = grid_2x2();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut transforms = far_apart(4);
    transforms[0] = PieceTransform::at((300.0, 300.0));
    transforms[1] = PieceTransform::at((403.0, 302.0));

    let report = tracker.settle(&grid, &mut transforms, 1, &ToleranceConfig::default());
    assert_eq!(report.snaps.len(), 1);
    assert_eq!(report.snaps[0].outcome, JoinOutcome::Created(0));
    assert!(!report.won);
    assert_eq!(tracker.to_partition(), vec![vec![0, 1]]);
    assert_eq!(transforms[1].position, (400.0, 300.0));
    assert_eq!(transforms[0].position, (300.0, 300.0));
    assert!(!tracker.is_solved());
}

#[test]
fn scenario_b_full_assembly_wins_once() {
    let grid = grid_2x2();
    let tolerance = ToleranceConfig::default();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut transforms = far_apart(4);
    transforms[0] = PieceTransform::at((300.0, 300.0));
    transforms[1] = PieceTransform::at((403.0, 302.0));
    let mut wins = 0;

    wins += tracker.settle(&grid, &mut transforms, 1, &tolerance).won as u32;
    transforms[2] = PieceTransform::at((301.0, 398.0));
    wins += tracker.settle(&grid, &mut transforms, 2, &tolerance).won as u32;
    assert_eq!(tracker.to_partition(), vec![vec![0, 1, 2]]);
    assert_eq!(wins, 0);

    transforms[3] = PieceTransform::at((402.0, 401.0));
    let report = tracker.settle(&grid, &mut transforms, 3, &tolerance);
    assert!(report.won);
    wins += report.won as u32;
    assert_eq!(tracker.to_partition(), vec![vec![0, 1, 2, 3]]);
    assert!(tracker.is_solved());
    assert_eq!(transforms[3].position, (400.0, 400.0));

    for piece in 0..4 {
        wins += tracker.settle(&grid, &mut transforms, piece, &tolerance).won as u32;
    }
    assert_eq!(wins, 1);
}

#[test]
fn scenario_c_drag_moves_whole_group() {
    let grid = grid_2x2();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut transforms = far_apart(4);
    transforms[0] = PieceTransform::at((300.0, 300.0));
    transforms[1] = PieceTransform::at((400.0, 300.0));
    tracker.join(0, 1);
    let before = transforms[1].position;

    let moved = drag(&tracker, &mut transforms, 0, (10.0, -4.0));
    assert_eq!(moved.len(), 2);
    assert_eq!(transforms[1].position, (before.0 + 10.0, before.1 - 4.0));
    assert_eq!(transforms[0].position, (310.0, 296.0));
    assert_eq!(transforms[2].position, (2000.0, 1000.0));
}

/// Every draw lands far outside its range.
struct Hostile {
    attempts: usize,
}

impl ParamSource for Hostile {
    fn range(&mut self, _min: f32, max: f32) -> f32 {
        max.abs().max(1.0) * 50.0
    }

    fn coin(&mut self) -> bool {
        self.attempts += 1;
        true
    }
}

#[test]
fn scenario_d_hostile_source_falls_back_to_straight_seam() {
    let bounds = Bounds::new(100.0, 0.0, 200.0, 100.0);
    let mut source = Hostile { attempts: 0 };
    let seam = BoundaryPathGenerator::default().generate(
        (150.0, 0.0),
        (150.0, 100.0),
        &bounds,
        &ShapeFamily::Standard,
        &mut source,
        &[],
    );
    assert!(!seam.success);
    assert_eq!(seam.attempts, 30);
    assert_eq!(source.attempts, 30);
    assert!(seam.curve.fallback);
    assert_eq!(seam.curve.points, vec![(150.0, 0.0), (150.0, 100.0)]);
    assert!(bounds.contains(&seam.curve.bounds));
}

#[test]
fn hostile_plan_uses_fallbacks_everywhere() {
    let grid = GridSpec::new(2, 3, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let mut source = Hostile { attempts: 0 };
    let paths = GridPathPlanner::default().plan(&grid, &ShapeFamily::StandardFunny, &mut source);
    assert_eq!(paths.fallback_count(), paths.internal_seam_count());
    for outline in paths.outlines() {
        assert_eq!(outline.local_points.len(), 4);
    }
}

#[test]
fn generated_seams_stay_in_their_rectangles() {
    let grid = GridSpec::new(4, 5, 90.0, 70.0, (20.0, 10.0)).unwrap();
    let mut source = Seeded::new(StdRng::seed_from_u64(42));
    for index in 0..ShapeFamily::COUNT {
        let family = ShapeFamily::from_index(index).unwrap();
        let paths = GridPathPlanner::default().plan(&grid, &family, &mut source);
        for seam in paths.seams() {
            assert!(
                seam.limits.contains(&seam.curve.bounds),
                "{} seam {} escaped",
                family.name(),
                seam.id
            );
        }
        for outline in paths.outlines() {
            assert!(!ring_self_crosses(&outline.local_points));
            assert!(ring_signed_area(&outline.local_points) > 0.0);
        }
    }
}

#[test]
fn internal_seams_are_shared_in_opposite_directions() {
    let grid = GridSpec::new(3, 3, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let mut source = Seeded::new(StdRng::seed_from_u64(5));
    let paths = GridPathPlanner::default().plan(&grid, &ShapeFamily::Standard, &mut source);
    for seam in paths.seams() {
        let users: Vec<bool> = paths
            .outlines()
            .iter()
            .flat_map(|outline| outline.edges.iter())
            .filter(|edge| edge.seam == seam.id)
            .map(|edge| edge.reversed)
            .collect();
        if seam.is_border() {
            assert_eq!(users.len(), 1);
        } else {
            assert_eq!(users.len(), 2);
            assert_ne!(users[0], users[1]);
        }
    }
    // the right edge of piece 0 is the left edge of piece 1, walked backwards
    let right = paths.edge_points(paths.outline(0).unwrap().edges[DIR_RIGHT]);
    let mut left = paths.edge_points(paths.outline(1).unwrap().edges[DIR_LEFT]);
    left.reverse();
    assert_eq!(right, left);
}

#[test]
fn adjacency_is_symmetric() {
    let grid = GridSpec::new(3, 3, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let tracker = MergeTracker::for_grid(&grid);
    let tolerance = ToleranceConfig::default();
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..200 {
        let a = rng.random_range(0..grid.total());
        let Some(b) = grid.neighbor(a, rng.random_range(0..4)) else {
            continue;
        };
        let rotation = rng.random_range(0..36) as f32 * ROTATION_STEP_DEG_DEFAULT;
        let mut transforms = far_apart(grid.total());
        transforms[a] = PieceTransform::new((500.0, 500.0), rotation);
        let expected = kirinuki_core::expected_position(&grid, a, b, &transforms[a]);
        let offset = [0.0, 2.0, 40.0][rng.random_range(0..3)];
        transforms[b] = PieceTransform::new((expected.0 + offset, expected.1), rotation);
        assert_eq!(
            is_adjacent(&grid, &tracker, a, Some(b), &transforms, &tolerance),
            is_adjacent(&grid, &tracker, b, Some(a), &transforms, &tolerance)
        );
    }
}

#[test]
fn settle_is_idempotent() {
    let grid = grid_2x2();
    let tolerance = ToleranceConfig::default();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut transforms = far_apart(4);
    transforms[0] = PieceTransform::at((300.0, 300.0));
    transforms[1] = PieceTransform::at((401.0, 301.0));
    tracker.settle(&grid, &mut transforms, 1, &tolerance);
    let partition = tracker.to_partition();
    let positions = transforms.clone();

    let again = tracker.settle(&grid, &mut transforms, 1, &tolerance);
    assert!(!again.snapped());
    assert_eq!(tracker.to_partition(), partition);
    assert_eq!(transforms, positions);
}

#[test]
fn cascade_pulls_in_neighbours_of_the_whole_group() {
    // 1x3: dropping 0 next to 1 must cascade through 1 and catch 2 as well
    let grid = GridSpec::new(1, 3, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let tolerance = ToleranceConfig::default();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut transforms = vec![
        PieceTransform::at((50.0, 50.0)),
        PieceTransform::at((152.0, 51.0)),
        PieceTransform::at((251.0, 48.0)),
    ];
    let report = tracker.settle(&grid, &mut transforms, 0, &tolerance);
    assert_eq!(tracker.to_partition(), vec![vec![0, 1, 2]]);
    assert!(report.won);
    // the moving body is aligned to whichever piece it snaps onto last
    assert_eq!(transforms[2].position, (251.0, 48.0));
    assert_eq!(transforms[1].position, (151.0, 48.0));
    assert_eq!(transforms[0].position, (51.0, 48.0));
}

#[test]
fn cascade_rechecks_members_after_the_group_moves() {
    // 1x4: {1, 2} is just out of reach of 0 until snapping onto 3 shifts it over
    let grid = GridSpec::new(1, 4, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let tolerance = ToleranceConfig::default();
    let mut tracker = MergeTracker::for_grid(&grid);
    tracker.join(1, 2);
    let mut transforms = vec![
        PieceTransform::at((52.0, 50.0)),
        PieceTransform::at((146.0, 50.0)),
        PieceTransform::at((246.0, 50.0)),
        PieceTransform::at((350.0, 50.0)),
    ];

    let report = tracker.settle(&grid, &mut transforms, 1, &tolerance);
    assert_eq!(tracker.to_partition(), vec![vec![0, 1, 2, 3]]);
    assert_eq!(report.snaps.len(), 2);
    assert!(report.won);
    assert_partition(&tracker);
    assert_rigid(&grid, &tracker, &transforms);

    let positions = transforms.clone();
    let again = tracker.settle(&grid, &mut transforms, 1, &tolerance);
    assert!(!again.snapped());
    assert!(!again.won);
    assert_eq!(transforms, positions);
}

#[test]
fn random_play_keeps_partition_and_rigidity() {
    let grid = GridSpec::new(3, 4, 60.0, 60.0, (0.0, 0.0)).unwrap();
    let tolerance = ToleranceConfig::default();
    let mut tracker = MergeTracker::for_grid(&grid);
    let mut rng = StdRng::seed_from_u64(2024);
    let mut transforms: Vec<PieceTransform> = (0..grid.total())
        .map(|id| {
            let anchor = grid.anchor(id);
            PieceTransform::at((anchor.0 + 400.0, anchor.1 + 400.0))
        })
        .collect();
    let mut wins = 0;
    for _ in 0..400 {
        let piece = rng.random_range(0..grid.total());
        // pull the piece near a random neighbour's slot, sometimes close enough
        let dir = rng.random_range(0..4);
        if let Some(neighbor) = grid.neighbor(piece, dir) {
            let target =
                kirinuki_core::expected_position(&grid, neighbor, piece, &transforms[neighbor]);
            let jitter = rng.random_range(-6.0..6.0);
            let delta = (
                target.0 - transforms[piece].position.0 + jitter,
                target.1 - transforms[piece].position.1,
            );
            drag(&tracker, &mut transforms, piece, delta);
        }
        let report = tracker.settle(&grid, &mut transforms, piece, &tolerance);
        wins += report.won as u32;
        assert_partition(&tracker);
        assert_rigid(&grid, &tracker, &transforms);
        if tracker.is_solved() {
            assert_eq!(tracker.group_count(), 1);
        }
    }
    assert!(wins <= 1);
    assert_eq!(wins == 1, tracker.is_solved());
}

#[test]
fn win_requires_every_piece() {
    let grid = GridSpec::new(1, 3, 100.0, 100.0, (0.0, 0.0)).unwrap();
    let mut tracker = MergeTracker::for_grid(&grid);
    tracker.join(0, 1);
    assert!(!tracker.is_solved());
    assert!(!tracker.take_win());
    tracker.join(1, 2);
    assert!(tracker.is_solved());
    assert!(tracker.take_win());
    assert!(!is_adjacent(
        &grid,
        &tracker,
        0,
        grid.neighbor(0, DIR_RIGHT),
        &far_apart(3),
        &ToleranceConfig::default()
    ));
}
