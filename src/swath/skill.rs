//! Skill diagnostics of a selected wind field against a reference ("truth") field.

use super::SwathGrid;
use crate::cell::WindVectorCell;
use crate::wind::WindVector;

/// A reference wind field that can be looked up per swath location.
pub trait TruthField {
    fn truth_at(&self, cti: usize, ati: usize, cell: &WindVectorCell) -> Option<WindVector>;
}

/// Uses each cell's own prior as truth.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorTruth;

impl TruthField for PriorTruth {
    fn truth_at(&self, _cti: usize, _ati: usize, cell: &WindVectorCell) -> Option<WindVector> {
        cell.prior
    }
}

/// Dense truth field with the same layout as the swath.
#[derive(Debug, Clone)]
pub struct TruthGrid {
    cross_track_bins: usize,
    along_track_bins: usize,
    vectors: Vec<Option<WindVector>>,
}

impl TruthGrid {
    pub fn new(cross_track_bins: usize, along_track_bins: usize) -> Self {
        Self {
            cross_track_bins,
            along_track_bins,
            vectors: vec![None; cross_track_bins * along_track_bins],
        }
    }

    /// Set the truth at `(cti, ati)`. Returns `false` if outside the grid.
    pub fn set(&mut self, cti: usize, ati: usize, truth: WindVector) -> bool {
        if cti >= self.cross_track_bins || ati >= self.along_track_bins {
            return false;
        }
        self.vectors[ati * self.cross_track_bins + cti] = Some(truth);
        true
    }

    pub fn get(&self, cti: usize, ati: usize) -> Option<WindVector> {
        if cti >= self.cross_track_bins || ati >= self.along_track_bins {
            return None;
        }
        self.vectors[ati * self.cross_track_bins + cti]
    }
}

impl TruthField for TruthGrid {
    fn truth_at(&self, cti: usize, ati: usize, _cell: &WindVectorCell) -> Option<WindVector> {
        self.get(cti, ati)
    }
}

impl SwathGrid {
    /// Fraction of selected cells (with a truth value) whose selected
    /// ambiguity is the one nearest the truth direction. `None` when no cell
    /// could be scored.
    pub fn skill<T: TruthField>(&self, truth: &T) -> Option<f32> {
        let mut scored = 0usize;
        let mut right = 0usize;
        for (cti, ati, cell) in self.iter() {
            let (Some(selected), Some(t)) = (cell.selected_index(), truth.truth_at(cti, ati, cell))
            else {
                continue;
            };
            scored += 1;
            if cell.nearest_to_direction(t.direction, None) == Some(selected) {
                right += 1;
            }
        }
        (scored > 0).then(|| right as f32 / scored as f32)
    }

    /// Root-mean-square angular separation in radians between selected and
    /// truth directions. `None` when no cell could be scored.
    pub fn rms_direction_error<T: TruthField>(&self, truth: &T) -> Option<f32> {
        let mut n = 0usize;
        let mut sum_sq = 0.0f64;
        for (cti, ati, cell) in self.iter() {
            let (Some(selected), Some(t)) = (cell.selected(), truth.truth_at(cti, ati, cell)) else {
                continue;
            };
            let d = selected.direction.separation(t.direction) as f64;
            sum_sq += d * d;
            n += 1;
        }
        (n > 0).then(|| (sum_sq / n as f64).sqrt() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Angle;
    use crate::curves::SolutionCurves;
    use crate::wind::AmbiguityCandidate;

    fn cell() -> WindVectorCell {
        let curves = SolutionCurves::from_fn(|_| (0.0, 5.0, 0.0)).unwrap();
        WindVectorCell::new(
            curves,
            vec![
                AmbiguityCandidate::point(5.0, Angle::from_degrees(0.0), 0.0, -1.0),
                AmbiguityCandidate::point(5.0, Angle::from_degrees(180.0), 0.0, -2.0),
            ],
        )
    }

    #[test]
    fn test_skill_against_priors() {
        let mut g = SwathGrid::with_size(3, 1).unwrap();
        for cti in 0..3 {
            g.add(cti, 0, cell().with_prior(WindVector::from_degrees(5.0, 10.0)));
        }
        assert_eq!(g.skill(&PriorTruth), None);
        g.get_mut(0, 0).unwrap().select(0);
        g.get_mut(1, 0).unwrap().select(1);
        assert_eq!(g.skill(&PriorTruth), Some(0.5));

        let rms = g.rms_direction_error(&PriorTruth).unwrap();
        let expected = ((10f32.to_radians().powi(2) + 170f32.to_radians().powi(2)) / 2.0).sqrt();
        assert!((rms - expected).abs() < 1e-4, "rms {rms} vs {expected}");
    }

    #[test]
    fn test_truth_grid_lookup() {
        let mut truth = TruthGrid::new(2, 2);
        assert!(truth.set(1, 1, WindVector::from_degrees(4.0, 185.0)));
        assert!(!truth.set(2, 0, WindVector::default()));

        let mut g = SwathGrid::with_size(2, 2).unwrap();
        g.add(1, 1, cell());
        g.add(0, 0, cell());
        g.get_mut(1, 1).unwrap().select(1);
        g.get_mut(0, 0).unwrap().select(0);
        // (0, 0) has no truth and is not scored
        assert_eq!(g.skill(&truth), Some(1.0));
    }
}
