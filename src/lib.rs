//! # scatdir
//!
//! Wind-direction **ambiguity removal** for scatterometer and radiometer swaths.
//!
//! A wind retrieval evaluates, for every ground cell, how well each wind
//! direction explains the measurements. The resulting objective curve usually
//! has several local optima ("ambiguities"). `scatdir` extracts and bounds
//! those ambiguities, seeds a first choice from a prior wind field, and then
//! relaxes the swath until neighbouring cells agree.
//!
//! ## Features
//!
//! - **Ambiguity extraction**: circular peak search with non-overlapping
//!   confidence intervals grown by probability mass
//! - **Threshold nudging**: prior-guided initial selection restricted to
//!   likely ambiguities
//! - **Staged consensus filter**: vector-distance median filtering keyed to
//!   ocean/land/ice and wind-speed classes, followed by DIRTH direction smoothing
//! - **Deterministic passes**: every pass scans a read-only snapshot and commits afterwards
//! - **Persistence**: flat binary curve files, [rkyv](https://docs.rs/rkyv)
//!   swath snapshots and CSV export
//!
//! ## Example
//!
//! ```no_run
//! use scatdir::{
//!     AmbiguitySelector, ConsensusFilter, FilterConfig, NudgeConfig, PriorTruth,
//!     SolutionCurves, StagingPolicy, SwathGrid,
//! };
//!
//! let curves = SolutionCurves::load_all_from_file("data/curves.bin").unwrap();
//! let selector = AmbiguitySelector::default();
//!
//! let mut swath = SwathGrid::with_size(76, 1624).unwrap();
//! for (k, c) in curves.into_iter().enumerate() {
//!     swath.add(k % 76, k / 76, selector.build_solutions(c));
//! }
//! swath.load_priors_csv("data/priors.csv").unwrap();
//!
//! swath.thresh_nudge(&NudgeConfig::default());
//! let filter = ConsensusFilter::with_policy(FilterConfig::default(), &StagingPolicy::default());
//! let report = filter.run(&mut swath).unwrap();
//!
//! println!("{} passes, skill {:?}", report.total_passes(), swath.skill(&PriorTruth));
//! swath.export_selected_csv("data/selected.csv").unwrap();
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Peak search**: local maxima of the 360-bin objective curve, best four kept
//! 2. **Interval growth**: each peak claims neighbouring bins until 99% of
//!    `Σ exp(objective)` is covered
//! 3. **Nudge**: pick the ambiguity nearest the prior among those whose
//!    likelihood ratio to the best passes a threshold
//! 4. **Consensus**: per stage, repeatedly replace each cell's choice with the
//!    ambiguity closest to its neighbours until nothing flips
//! 5. **DIRTH**: move each direction toward the component-wise median of its
//!    neighbours without leaving the selected ambiguity's interval
//!

pub mod angle;
pub mod cell;
pub mod curves;
pub mod filter;
pub mod selector;
pub mod swath;
pub mod wind;

pub use angle::{Angle, AngleInterval};
pub use cell::{CellFlags, Selection, WindVectorCell};
pub use curves::{CurveSample, SolutionCurves, DIRECTION_BINS};
pub use filter::{
    CellClass, CellRoles, ConsensusFilter, DirthCenter, FilterConfig, FilterMode, FilterReport,
    Stage, StageReport, StagingPolicy,
};
pub use selector::{AmbiguitySelector, GrowthReport, SelectorConfig};
pub use swath::{AddOutcome, NudgeConfig, PriorTruth, SwathGrid, TruthField, TruthGrid};
pub use wind::{AmbiguityCandidate, WindVector};

/// Orthogonal wind components `(u, v)` in m/s.
pub type Vector2 = nalgebra::Vector2<f32>;
