//! Swath grid: the cross-track × along-track array of wind vector cells.
//!
//! The grid owns every cell. Slots without a valid retrieval are `None`.
//! Initial selection (nudging), persistence and skill diagnostics live in the
//! submodules as further `impl SwathGrid` blocks.

pub mod io;
pub mod nudge;
pub mod skill;

use anyhow::{ensure, Context};
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cell::WindVectorCell;

pub use nudge::NudgeConfig;
pub use skill::{PriorTruth, TruthField, TruthGrid};

/// Result of [`SwathGrid::add`].
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The grid took ownership of the cell.
    Added,
    /// Coordinates outside the grid (or grid not allocated); the cell was dropped.
    OutOfRange,
    /// The cell had no ambiguities; it was dropped.
    NoAmbiguities,
    /// The slot was taken. The existing cell is untouched and the rejected one is handed back.
    Occupied(Box<WindVectorCell>),
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize)]
pub struct SwathGrid {
    cross_track_bins: usize,
    along_track_bins: usize,
    /// Row-major over along-track: index `ati * cross_track_bins + cti`.
    cells: Vec<Option<WindVectorCell>>,
}

impl SwathGrid {
    /// An unallocated grid. Call [`allocate`](Self::allocate) before adding cells.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for [`new`](Self::new) followed by [`allocate`](Self::allocate).
    pub fn with_size(cross_track_bins: usize, along_track_bins: usize) -> anyhow::Result<Self> {
        let mut grid = Self::new();
        grid.allocate(cross_track_bins, along_track_bins)?;
        Ok(grid)
    }

    /// Allocate an empty `cross_track_bins × along_track_bins` grid.
    pub fn allocate(&mut self, cross_track_bins: usize, along_track_bins: usize) -> anyhow::Result<()> {
        ensure!(
            !self.is_allocated(),
            "swath already allocated ({} x {})",
            self.cross_track_bins,
            self.along_track_bins
        );
        ensure!(
            cross_track_bins > 0 && along_track_bins > 0,
            "swath dimensions must be non-zero, got {} x {}",
            cross_track_bins,
            along_track_bins
        );
        self.cross_track_bins = cross_track_bins;
        self.along_track_bins = along_track_bins;
        self.cells = std::iter::repeat_with(|| None)
            .take(cross_track_bins * along_track_bins)
            .collect();
        debug!("Allocated swath {} x {}", cross_track_bins, along_track_bins);
        Ok(())
    }

    pub fn is_allocated(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn cross_track_bins(&self) -> usize {
        self.cross_track_bins
    }

    pub fn along_track_bins(&self) -> usize {
        self.along_track_bins
    }

    #[inline]
    fn index(&self, cti: usize, ati: usize) -> Option<usize> {
        (cti < self.cross_track_bins && ati < self.along_track_bins)
            .then(|| ati * self.cross_track_bins + cti)
    }

    /// Insert `cell` at `(cti, ati)`.
    pub fn add(&mut self, cti: usize, ati: usize, cell: WindVectorCell) -> AddOutcome {
        let Some(idx) = self.index(cti, ati) else {
            debug!(
                "Dropping cell at ({}, {}): outside {} x {} swath",
                cti, ati, self.cross_track_bins, self.along_track_bins
            );
            return AddOutcome::OutOfRange;
        };
        if cell.num_ambiguities() == 0 {
            return AddOutcome::NoAmbiguities;
        }
        let slot = &mut self.cells[idx];
        if slot.is_some() {
            warn!("Swath slot ({}, {}) already occupied, rejecting cell", cti, ati);
            return AddOutcome::Occupied(Box::new(cell));
        }
        *slot = Some(cell);
        AddOutcome::Added
    }

    /// Take the cell out of `(cti, ati)`.
    pub fn remove(&mut self, cti: usize, ati: usize) -> Option<WindVectorCell> {
        let idx = self.index(cti, ati)?;
        self.cells[idx].take()
    }

    pub fn get(&self, cti: usize, ati: usize) -> Option<&WindVectorCell> {
        self.index(cti, ati).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, cti: usize, ati: usize) -> Option<&mut WindVectorCell> {
        self.index(cti, ati).and_then(|i| self.cells[i].as_mut())
    }

    /// Drop every cell and release the array. The grid can be allocated again.
    pub fn delete_all(&mut self) {
        self.cells = Vec::new();
        self.cross_track_bins = 0;
        self.along_track_bins = 0;
    }

    /// Check that the slot array matches the dimensions and that every cell is consistent.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.cells.len() == self.cross_track_bins * self.along_track_bins,
            "swath {} x {} holds {} slots",
            self.cross_track_bins,
            self.along_track_bins,
            self.cells.len()
        );
        for (cti, ati, cell) in self.iter() {
            cell.validate()
                .with_context(|| format!("cell ({}, {})", cti, ati))?;
        }
        Ok(())
    }

    // ── Iteration and counts ────────────────────────────────────────────────

    /// Occupied slots as `(cti, ati, cell)`, along-track row by row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &WindVectorCell)> + '_ {
        let ct = self.cross_track_bins;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, c)| c.as_ref().map(|c| (i % ct, i / ct, c)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut WindVectorCell)> + '_ {
        let ct = self.cross_track_bins;
        self.cells
            .iter_mut()
            .enumerate()
            .filter_map(move |(i, c)| c.as_mut().map(|c| (i % ct, i / ct, c)))
    }

    /// Number of occupied slots.
    pub fn valid_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Number of occupied slots holding a selection.
    pub fn selected_cells(&self) -> usize {
        self.iter().filter(|(_, _, c)| c.has_selection()).count()
    }

    /// Largest ambiguity count over all cells (0 for an empty grid).
    pub fn max_ambiguity_count(&self) -> usize {
        self.iter().map(|(_, _, c)| c.num_ambiguities()).max().unwrap_or(0)
    }

    /// Reduce every selected cell to its selected ambiguity. Returns the
    /// number of cells reduced; unselected cells are left as they are.
    pub fn discard_unselected(&mut self) -> usize {
        self.iter_mut()
            .map(|(_, _, c)| c.retain_selected())
            .filter(|&reduced| reduced)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Angle;
    use crate::curves::SolutionCurves;
    use crate::wind::AmbiguityCandidate;

    fn cell(dirs: &[f32]) -> WindVectorCell {
        let curves = SolutionCurves::from_fn(|_| (0.0, 6.0, 0.0)).unwrap();
        let ambs = dirs
            .iter()
            .enumerate()
            .map(|(k, &d)| AmbiguityCandidate::point(6.0, Angle::from_degrees(d), 0.0, -(k as f32)))
            .collect();
        WindVectorCell::new(curves, ambs)
    }

    #[test]
    fn test_allocate_rejects_zero_and_double() {
        let mut g = SwathGrid::new();
        assert!(g.allocate(0, 5).is_err());
        assert!(g.allocate(3, 5).is_ok());
        assert!(g.allocate(3, 5).is_err());
        g.delete_all();
        g.delete_all();
        assert!(!g.is_allocated());
        assert!(g.allocate(2, 2).is_ok());
    }

    #[test]
    fn test_add_outcomes() {
        let mut g = SwathGrid::with_size(3, 4).unwrap();
        assert_eq!(g.add(3, 0, cell(&[10.0])), AddOutcome::OutOfRange);
        assert_eq!(g.add(0, 4, cell(&[10.0])), AddOutcome::OutOfRange);
        assert_eq!(g.add(1, 1, cell(&[])), AddOutcome::NoAmbiguities);
        assert!(g.add(1, 1, cell(&[10.0])).is_added());

        match g.add(1, 1, cell(&[99.0, 200.0])) {
            AddOutcome::Occupied(rejected) => assert_eq!(rejected.num_ambiguities(), 2),
            other => panic!("expected Occupied, got {other:?}"),
        }
        // The first occupant is untouched
        assert_eq!(g.get(1, 1).unwrap().num_ambiguities(), 1);
        assert_eq!(g.valid_cells(), 1);
    }

    #[test]
    fn test_validate_slot_count() {
        let mut g = SwathGrid::with_size(2, 2).unwrap();
        g.add(1, 1, cell(&[10.0]));
        assert!(g.validate().is_ok());
        assert!(SwathGrid::new().validate().is_ok());
        g.cells.pop();
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_unallocated_grid_refuses_cells() {
        let mut g = SwathGrid::new();
        assert_eq!(g.add(0, 0, cell(&[10.0])), AddOutcome::OutOfRange);
    }

    #[test]
    fn test_iteration_coordinates_and_counts() {
        let mut g = SwathGrid::with_size(4, 3).unwrap();
        g.add(3, 0, cell(&[1.0]));
        g.add(0, 2, cell(&[1.0, 2.0, 3.0]));
        let coords: Vec<(usize, usize)> = g.iter().map(|(c, a, _)| (c, a)).collect();
        assert_eq!(coords, vec![(3, 0), (0, 2)]);
        assert_eq!(g.max_ambiguity_count(), 3);
        assert!(g.remove(3, 0).is_some());
        assert!(g.remove(3, 0).is_none());
        assert_eq!(g.valid_cells(), 1);
    }

    #[test]
    fn test_discard_unselected() {
        let mut g = SwathGrid::with_size(2, 1).unwrap();
        g.add(0, 0, cell(&[10.0, 190.0]));
        g.add(1, 0, cell(&[20.0, 200.0]));
        g.get_mut(0, 0).unwrap().select(1);
        assert_eq!(g.discard_unselected(), 1);
        let c = g.get(0, 0).unwrap();
        assert_eq!(c.num_ambiguities(), 1);
        assert_eq!(c.selected().unwrap().direction, Angle::from_degrees(190.0));
        assert_eq!(g.get(1, 0).unwrap().num_ambiguities(), 2);
        assert_eq!(g.selected_cells(), 1);
    }
}
