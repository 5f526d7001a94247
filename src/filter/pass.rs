//! One filter pass: a read-only scan producing tentative selections, and a
//! commit step applying them.

use std::ops::Range;

use super::median::{component_mean, component_median};
use super::{CellRoles, DirthCenter, FilterConfig, FilterMode, Stage};
use crate::angle::Angle;
use crate::cell::{Selection, WindVectorCell};
use crate::swath::SwathGrid;
use crate::wind::AmbiguityCandidate;
use crate::Vector2;

/// Roles of every slot for the duration of one stage. Empty slots are `None`.
pub(crate) struct RoleMap {
    cross_track_bins: usize,
    roles: Vec<Option<CellRoles>>,
}

impl RoleMap {
    pub(crate) fn evaluate(grid: &SwathGrid, stage: &Stage) -> Self {
        let ct = grid.cross_track_bins();
        let mut roles = vec![None; ct * grid.along_track_bins()];
        for (cti, ati, cell) in grid.iter() {
            roles[ati * ct + cti] = Some(stage.roles_of(cell));
        }
        Self {
            cross_track_bins: ct,
            roles,
        }
    }

    #[inline]
    fn index(&self, cti: usize, ati: usize) -> usize {
        ati * self.cross_track_bins + cti
    }

    #[inline]
    fn get(&self, cti: usize, ati: usize) -> CellRoles {
        self.roles[self.index(cti, ati)].unwrap_or(CellRoles::INERT)
    }

    /// Active set of the first pass: every changeable cell.
    pub(crate) fn initially_active(&self) -> Vec<bool> {
        self.roles
            .iter()
            .map(|r| r.is_some_and(|r| r.changeable))
            .collect()
    }
}

/// Index ranges `(cross_track, along_track)` of the window around `(cti, ati)`.
fn window(grid: &SwathGrid, cti: usize, ati: usize, config: &FilterConfig) -> (Range<usize>, Range<usize>) {
    let hw = config.half_window;
    let ct_lo = cti.saturating_sub(hw).max(config.cross_track_bound);
    let ct_hi = (cti + hw + 1).min(
        grid.cross_track_bins()
            .saturating_sub(config.cross_track_bound),
    );
    let at_lo = ati.saturating_sub(hw);
    let at_hi = (ati + hw + 1).min(grid.along_track_bins());
    (ct_lo..ct_hi, at_lo..at_hi)
}

fn window_slots(ct: Range<usize>, at: Range<usize>) -> impl Iterator<Item = (usize, usize)> {
    at.flat_map(move |j| ct.clone().map(move |i| (i, j)))
}

/// Compute tentative selections from the current grid state.
pub(crate) fn scan(
    grid: &SwathGrid,
    roles: &RoleMap,
    active: &[bool],
    mode: FilterMode,
    config: &FilterConfig,
) -> Vec<(usize, usize, Selection)> {
    let mut tentatives = Vec::new();
    for (cti, ati, cell) in grid.iter() {
        if !roles.get(cti, ati).updatable() || cell.num_ambiguities() == 0 {
            continue;
        }
        let (ct_range, at_range) = window(grid, cti, ati, config);
        let slots = || window_slots(ct_range.clone(), at_range.clone());

        if !slots().any(|(i, j)| active[roles.index(i, j)]) {
            continue;
        }
        if !slots().any(|(i, j)| roles.get(i, j).influential) {
            continue;
        }

        let neighbors: Vec<Vector2> = slots()
            .filter(|&(i, j)| config.include_center || (i, j) != (cti, ati))
            .filter(|&(i, j)| roles.get(i, j).influential)
            .filter_map(|(i, j)| grid.get(i, j)?.selected())
            .filter(|sel| sel.speed >= config.min_neighbor_speed)
            .map(|sel| sel.components())
            .collect();

        let tentative = match mode {
            FilterMode::Standard => closest_ambiguity(cell, &neighbors).map(Selection::Ambiguity),
            FilterMode::Dirth => smoothed_vector(cell, &neighbors, config.dirth_center),
        };
        if let Some(sel) = tentative {
            tentatives.push((cti, ati, sel));
        }
    }
    tentatives
}

/// Ambiguity with the smallest summed distance to `neighbors`; the first wins ties.
fn closest_ambiguity(cell: &WindVectorCell, neighbors: &[Vector2]) -> Option<usize> {
    if neighbors.is_empty() {
        return None;
    }
    let mut best = None;
    let mut min_sum = f32::INFINITY;
    for (k, amb) in cell.ambiguities().iter().enumerate() {
        let sum: f32 = neighbors.iter().map(|n| amb.vector_distance(n)).sum();
        if sum < min_sum {
            min_sum = sum;
            best = Some(k);
        }
    }
    best
}

/// Neighbour centre direction clamped to the selected ambiguity's range, with
/// speed, secondary and objective read from the cell's curves.
fn smoothed_vector(cell: &WindVectorCell, neighbors: &[Vector2], center: DirthCenter) -> Option<Selection> {
    let source = cell.selected_index()?;
    let centre = match center {
        DirthCenter::Median => component_median(neighbors)?,
        DirthCenter::Mean => component_mean(neighbors)?,
    };
    let range = cell.ambiguities()[source].direction_range;
    let direction = range.nearest_value(Angle::from_components(centre.x, centre.y));
    let sample = cell.curves().sample(direction);
    Some(Selection::Synthesized {
        source,
        vector: AmbiguityCandidate {
            speed: sample.speed,
            direction,
            secondary: sample.secondary,
            objective: sample.objective,
            direction_range: range,
        },
    })
}

/// Apply `tentatives`. Returns the per-slot flip mask.
pub(crate) fn commit(
    grid: &mut SwathGrid,
    tentatives: Vec<(usize, usize, Selection)>,
    mode: FilterMode,
    config: &FilterConfig,
) -> Vec<bool> {
    let ct = grid.cross_track_bins();
    let mut flipped = vec![false; ct * grid.along_track_bins()];
    for (cti, ati, new) in tentatives {
        let Some(cell) = grid.get_mut(cti, ati) else {
            continue;
        };
        let old = *cell.selection();
        let old_direction = cell.selected().map(|a| a.direction);
        let flip = match new {
            Selection::None => false,
            Selection::Ambiguity(k) => {
                cell.select(k);
                old != new
            }
            Selection::Synthesized { source, vector } => {
                cell.select_synthesized(source, vector);
                match (mode, old_direction) {
                    (FilterMode::Dirth, Some(d)) => {
                        d.separation(vector.direction) > config.dirth_flip_threshold
                    }
                    (FilterMode::Dirth, None) => true,
                    (FilterMode::Standard, _) => old != new,
                }
            }
        };
        flipped[ati * ct + cti] = flip;
    }
    flipped
}
