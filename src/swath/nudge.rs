//! Initial selection of one ambiguity per cell before spatial filtering.

use tracing::debug;

use super::SwathGrid;
use crate::cell::{CellFlags, WindVectorCell};

/// Configuration for [`SwathGrid::thresh_nudge`].
#[derive(Debug, Clone)]
pub struct NudgeConfig {
    /// Minimum likelihood ratio `exp(0.5 · (objective − best))` an ambiguity
    /// needs to be eligible for nudging. Default: 0.05.
    pub threshold: f32,
    /// Threshold used instead of `threshold` within `edge_bins` of either
    /// cross-track edge. Default: `None` (same threshold everywhere).
    pub edge_threshold: Option<f32>,
    /// Width of the cross-track edge band. Default: 0.
    pub edge_bins: usize,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            edge_threshold: None,
            edge_bins: 0,
        }
    }
}

impl NudgeConfig {
    /// Threshold that applies at cross-track index `cti` of a `cross_track_bins` wide swath.
    pub fn threshold_at(&self, cti: usize, cross_track_bins: usize) -> f32 {
        match self.edge_threshold {
            Some(edge)
                if cti < self.edge_bins || cti + self.edge_bins >= cross_track_bins =>
            {
                edge
            }
            _ => self.threshold,
        }
    }
}

/// Nudge one cell. Returns the clamped rank index, or `None` if the cell was skipped.
fn nudge_cell(cell: &mut WindVectorCell, threshold: f32) -> Option<usize> {
    let prior = match cell.prior {
        Some(prior) if cell.num_ambiguities() > 0 => prior,
        _ => {
            cell.flags.remove(CellFlags::ALL_AMBIGUITIES_NUDGED);
            return None;
        }
    };
    let rank = cell.nudge_rank(threshold).max(1);
    let nearest = cell.nearest_to_direction(prior.direction, Some(rank))?;
    cell.select(nearest);
    let all = rank == cell.num_ambiguities();
    cell.flags.set(CellFlags::ALL_AMBIGUITIES_NUDGED, all);
    Some(rank)
}

impl SwathGrid {
    /// Select, in every cell with a prior, the ambiguity nearest the prior
    /// direction among those whose likelihood ratio to the best ambiguity
    /// reaches the threshold. The best ambiguity is always eligible.
    ///
    /// Cells without a prior are left unselected. Returns the number of cells nudged.
    pub fn thresh_nudge(&mut self, config: &NudgeConfig) -> usize {
        let ct = self.cross_track_bins();
        let mut count = 0;
        let mut all_nudged = 0;
        for (cti, _ati, cell) in self.iter_mut() {
            let threshold = config.threshold_at(cti, ct);
            if let Some(rank) = nudge_cell(cell, threshold) {
                count += 1;
                if rank == cell.num_ambiguities() {
                    all_nudged += 1;
                }
            }
        }
        debug!(
            "Threshold nudge: {} cells nudged, {} with every ambiguity eligible",
            count, all_nudged
        );
        count
    }

    /// Select the ambiguity nearest the prior in every cell with a prior,
    /// regardless of objective. Single-ambiguity cells always take that ambiguity.
    pub fn init_with_nudge(&mut self) -> usize {
        let mut count = 0;
        for (_, _, cell) in self.iter_mut() {
            let choice = if cell.num_ambiguities() == 1 {
                Some(0)
            } else {
                cell.prior
                    .and_then(|p| cell.nearest_to_direction(p.direction, None))
            };
            if let Some(i) = choice {
                cell.select(i);
                count += 1;
            }
        }
        debug!("Nudge initialisation: {} cells", count);
        count
    }

    /// Select the `rank`-th best ambiguity (1-based) in every cell. Cells with
    /// fewer ambiguities end up unselected. Returns the number of cells selected.
    pub fn init_with_rank(&mut self, rank: usize) -> usize {
        let mut count = 0;
        for (_, _, cell) in self.iter_mut() {
            let choice = rank
                .checked_sub(1)
                .and_then(|r| cell.ranked_indices().get(r).copied());
            match choice {
                Some(i) => {
                    cell.select(i);
                    count += 1;
                }
                None => cell.clear_selection(),
            }
        }
        debug!("Rank {} initialisation: {} cells", rank, count);
        count
    }
}
