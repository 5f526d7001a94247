//! End-to-end ambiguity removal: small hand-built scenes and a seeded noisy swath.


use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rand_distr::{Distribution, Normal};
use scatdir::{
    Angle, AmbiguitySelector, CellFlags, ConsensusFilter, FilterConfig, FilterMode, NudgeConfig,
    Selection, Stage, StagingPolicy, SwathGrid, TruthGrid, WindVector,
};
use test_data::{peaked_curves, Peak};

/// 3×3 swath: every border cell has a single 45° ambiguity; the rainy centre
/// cell slightly prefers 225° and its prior points there too.
fn three_by_three() -> SwathGrid {
    let selector = AmbiguitySelector::default();
    let mut grid = SwathGrid::with_size(3, 3).unwrap();
    for ati in 0..3 {
        for cti in 0..3 {
            let cell = if (cti, ati) == (1, 1) {
                selector
                    .build_solutions(peaked_curves(
                        &[Peak::new(45.0, -1.1, 8.0), Peak::new(225.0, -1.0, 8.0)],
                        10.0,
                    ))
                    .with_prior(WindVector::from_degrees(8.0, 225.0))
                    .with_flags(CellFlags::RAIN)
            } else {
                selector
                    .build_solutions(peaked_curves(&[Peak::new(45.0, -1.0, 8.0)], 10.0))
                    .with_prior(WindVector::from_degrees(8.0, 45.0))
            };
            assert!(grid.add(cti, ati, cell).is_added());
        }
    }
    grid
}

#[test]
fn test_center_defers_to_neighbours() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let mut grid = three_by_three();
    assert_eq!(grid.thresh_nudge(&NudgeConfig::default()), 9);

    let center = grid.get(1, 1).unwrap();
    assert_eq!(center.num_ambiguities(), 2);
    assert!((center.selected().unwrap().direction.degrees() - 225.0).abs() < 1e-3);

    let filter = ConsensusFilter::with_policy(FilterConfig::default(), &StagingPolicy::default());
    let report = filter.run(&mut grid).unwrap();
    assert!(report.converged());
    assert_eq!(report.stages.len(), 4);

    // The centre is rain-flagged, so it only moves in the low-wind stage
    assert_eq!(report.stages[0].flips, vec![0]);
    assert_eq!(report.stages[1].flips, vec![1, 0]);

    let center = grid.get(1, 1).unwrap();
    let selected = center.selected().unwrap();
    assert!(
        selected.direction.separation(Angle::from_degrees(45.0)) < 1e-3,
        "centre ended at {}",
        selected.direction
    );
    assert!(matches!(center.selection(), Selection::Synthesized { .. }));
    let source = center.selected_index().unwrap();
    assert!((center.ambiguities()[source].direction.degrees() - 45.0).abs() < 1e-3);
}

#[test]
fn test_thresh_nudge_rank_one_picks_best() {
    let mut grid = SwathGrid::with_size(1, 1).unwrap();
    let cell = AmbiguitySelector::default()
        .build_solutions(peaked_curves(
            &[
                Peak::new(10.0, -1.0, 7.0),
                Peak::new(130.0, -5.0, 7.0),
                Peak::new(250.0, -20.0, 7.0),
            ],
            30.0,
        ))
        .with_prior(WindVector::from_degrees(7.0, 125.0));
    assert_eq!(cell.nudge_rank(1.0), 1);
    grid.add(0, 0, cell);

    grid.thresh_nudge(&NudgeConfig {
        threshold: 1.0,
        ..Default::default()
    });
    let c = grid.get(0, 0).unwrap();
    assert_eq!(c.selected_index(), Some(0));
    assert_eq!(c.selected().unwrap().objective, -1.0);
}

// ── Seeded synthetic swath ──────────────────────────────────────────────────

const CT: usize = 20;
const AT: usize = 30;

fn truth_at(cti: usize, ati: usize) -> WindVector {
    WindVector::from_degrees(6.0 + 0.1 * cti as f32, 30.0 + 0.5 * cti as f32 + 0.3 * ati as f32)
}

/// Every cell has the true direction and its 180° alias with near-equal
/// objectives. 15% of priors point at the alias, 10% of cells are rain-flagged.
fn synthetic_swath(seed: u64) -> (SwathGrid, TruthGrid) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dir_noise = Normal::new(0.0_f32, 4.0).unwrap();
    let obj_noise = Normal::new(0.0_f32, 0.3).unwrap();
    let prior_noise = Normal::new(0.0_f32, 10.0).unwrap();

    let selector = AmbiguitySelector::default();
    let mut grid = SwathGrid::with_size(CT, AT).unwrap();
    let mut truth = TruthGrid::new(CT, AT);
    for ati in 0..AT {
        for cti in 0..CT {
            let t = truth_at(cti, ati);
            truth.set(cti, ati, t);

            let dir = t.direction.degrees() + dir_noise.sample(&mut rng);
            let peaks = [
                Peak::new(dir, -1.0 + obj_noise.sample(&mut rng), t.speed),
                Peak::new(dir + 180.0, -1.0 + obj_noise.sample(&mut rng), t.speed),
            ];
            let mut prior_dir = t.direction.degrees() + prior_noise.sample(&mut rng);
            if rng.random::<f32>() < 0.15 {
                prior_dir += 180.0;
            }
            let mut flags = CellFlags::NONE;
            if rng.random::<f32>() < 0.10 {
                flags.insert(CellFlags::RAIN);
            }
            let cell = selector
                .build_solutions(peaked_curves(&peaks, 10.0))
                .with_prior(WindVector::from_degrees(t.speed, prior_dir))
                .with_flags(flags);
            assert!(grid.add(cti, ati, cell).is_added());
        }
    }
    (grid, truth)
}

#[test]
fn test_synthetic_swath_invariants() {
    let (mut grid, _) = synthetic_swath(7);
    assert_eq!(grid.valid_cells(), CT * AT);
    assert!(grid.max_ambiguity_count() <= 4);
    for (_, _, cell) in grid.iter() {
        let ambs = cell.ambiguities();
        assert_eq!(ambs.len(), 2);
        for (k, a) in ambs.iter().enumerate() {
            let r = a.direction_range;
            assert!((0.0..std::f32::consts::TAU).contains(&r.left.radians()));
            assert!((0.0..std::f32::consts::TAU).contains(&r.right.radians()));
            assert!(r.contains(a.direction));
            for b in &ambs[k + 1..] {
                assert!(!r.overlaps(&b.direction_range), "{} overlaps {}", r, b.direction_range);
            }
        }
    }

    grid.thresh_nudge(&NudgeConfig::default());
    for (_, _, cell) in grid.iter() {
        let i = cell.selected_index().expect("every cell has a prior");
        assert!(i < cell.num_ambiguities());
    }
}

#[test]
fn test_synthetic_swath_filtering_improves_skill() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let (mut grid, truth) = synthetic_swath(42);
    grid.thresh_nudge(&NudgeConfig::default());
    let nudge_skill = grid.skill(&truth).unwrap();
    assert!(nudge_skill < 0.95, "nudge alone already at {nudge_skill}");

    let policy = StagingPolicy::default();
    let mut stages = policy.stages();
    let dirth = stages.pop().unwrap();
    let filter = ConsensusFilter::new(FilterConfig::default(), stages);
    let report = filter.run(&mut grid).unwrap();
    println!("standard stages: {} passes", report.total_passes());

    let filtered_skill = grid.skill(&truth).unwrap();
    println!("skill: nudge {nudge_skill:.3} -> filtered {filtered_skill:.3}");
    assert!(filtered_skill > nudge_skill);
    assert!(filtered_skill >= 0.95, "filtered skill {filtered_skill}");

    let rms_before = grid.rms_direction_error(&truth).unwrap();
    let dirth_report = filter.run_stage(&dirth, &mut grid).unwrap();
    assert!(dirth_report.converged);
    let rms_after = grid.rms_direction_error(&truth).unwrap();
    println!(
        "rms direction error: {:.2}° -> {:.2}° after DIRTH",
        rms_before.to_degrees(),
        rms_after.to_degrees()
    );
    assert!(rms_after < rms_before);
    // DIRTH never leaves the selected ambiguity
    assert_eq!(grid.skill(&truth).unwrap(), filtered_skill);
}

#[test]
fn test_extra_pass_after_convergence_changes_nothing() {
    let (mut grid, _) = synthetic_swath(3);
    grid.thresh_nudge(&NudgeConfig::default());

    let filter = ConsensusFilter::new(FilterConfig::default(), vec![]);
    let stage = Stage::all("all", FilterMode::Standard);
    let first = filter.run_stage(&stage, &mut grid).unwrap();
    assert!(first.converged);

    let before = grid.clone();
    let again = filter.run_stage(&stage, &mut grid).unwrap();
    assert_eq!(again.flips, vec![0]);
    assert_eq!(grid, before);
}

#[test]
fn test_min_neighbor_speed_excludes_calm_cells() {
    // A single fast cell, surrounded by calm cells pointing the other way
    let selector = AmbiguitySelector::default();
    let mut grid = SwathGrid::with_size(3, 1).unwrap();
    for cti in 0..3 {
        let (speed, prior) = if cti == 1 { (9.0, 90.0) } else { (1.0, 270.0) };
        let cell = selector
            .build_solutions(peaked_curves(
                &[Peak::new(90.0, -1.0, speed), Peak::new(270.0, -1.0, speed)],
                10.0,
            ))
            .with_prior(WindVector::from_degrees(speed, prior));
        grid.add(cti, 0, cell);
    }
    grid.init_with_nudge();

    let config = FilterConfig {
        half_window: 1,
        min_neighbor_speed: 2.0,
        ..Default::default()
    };
    let filter = ConsensusFilter::new(config, vec![Stage::all("all", FilterMode::Standard)]);
    filter.run(&mut grid).unwrap();

    // Calm cells follow the fast one; the fast one only sees itself
    for cti in 0..3 {
        let dir = grid.get(cti, 0).unwrap().selected().unwrap().direction;
        assert!(dir.separation(Angle::from_degrees(90.0)) < 1e-3, "cell {cti} at {dir}");
    }
}
