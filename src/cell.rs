//! Wind vector cell (WVC): everything known about one ground cell.
//!
//! A cell owns its ambiguity list, its raw solution curves, an optional prior
//! ("nudge") vector, classification flags, and the current [`Selection`].

use std::ops::BitOr;

use anyhow::ensure;
use rkyv::{Archive, Deserialize, Serialize};

use crate::angle::Angle;
use crate::curves::SolutionCurves;
use crate::wind::{AmbiguityCandidate, WindVector};

// ── Classification flags ────────────────────────────────────────────────────

/// Land/ice/rain classification and quality bits of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Archive, Serialize, Deserialize)]
pub struct CellFlags(u16);

impl CellFlags {
    pub const NONE: CellFlags = CellFlags(0);
    pub const LAND: CellFlags = CellFlags(1 << 0);
    pub const ICE: CellFlags = CellFlags(1 << 1);
    pub const COAST: CellFlags = CellFlags(1 << 2);
    /// Rain detected.
    pub const RAIN: CellFlags = CellFlags(1 << 3);
    /// The rain flag could not be evaluated; [`CellFlags::RAIN`] is meaningless.
    pub const RAIN_UNUSABLE: CellFlags = CellFlags(1 << 4);
    /// Every ambiguity of the cell was eligible during threshold nudging.
    pub const ALL_AMBIGUITIES_NUDGED: CellFlags = CellFlags(1 << 5);

    pub fn from_bits(bits: u16) -> Self {
        CellFlags(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// All bits of `other` are set.
    pub fn contains(self, other: CellFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any bit of `other` is set.
    pub fn intersects(self, other: CellFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: CellFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: CellFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: CellFlags, on: bool) {
        if on {
            self.insert(other)
        } else {
            self.remove(other)
        }
    }

    /// Land, ice or coastal contamination.
    pub fn is_land_or_ice(self) -> bool {
        self.intersects(CellFlags::LAND | CellFlags::ICE | CellFlags::COAST)
    }

    /// Usable rain flag reporting rain.
    pub fn is_raining(self) -> bool {
        self.contains(CellFlags::RAIN) && !self.contains(CellFlags::RAIN_UNUSABLE)
    }
}

impl BitOr for CellFlags {
    type Output = CellFlags;

    fn bitor(self, rhs: CellFlags) -> CellFlags {
        CellFlags(self.0 | rhs.0)
    }
}

// ── Selection ───────────────────────────────────────────────────────────────

/// Which vector a cell currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing selected yet.
    #[default]
    None,
    /// Index into the cell's own ambiguity list.
    Ambiguity(usize),
    /// Vector synthesized by smoothing, clamped to the range of ambiguity `source`.
    Synthesized {
        source: usize,
        vector: AmbiguityCandidate,
    },
}

// ── Wind vector cell ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct WindVectorCell {
    ambiguities: Vec<AmbiguityCandidate>,
    curves: SolutionCurves,
    /// Externally supplied prior used for nudging.
    pub prior: Option<WindVector>,
    pub flags: CellFlags,
    selection: Selection,
}

impl WindVectorCell {
    /// Wrap an ambiguity list and the curves it was extracted from.
    pub fn new(curves: SolutionCurves, ambiguities: Vec<AmbiguityCandidate>) -> Self {
        Self {
            ambiguities,
            curves,
            prior: None,
            flags: CellFlags::NONE,
            selection: Selection::None,
        }
    }

    pub fn with_prior(mut self, prior: WindVector) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_flags(mut self, flags: CellFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn ambiguities(&self) -> &[AmbiguityCandidate] {
        &self.ambiguities
    }

    pub fn num_ambiguities(&self) -> usize {
        self.ambiguities.len()
    }

    pub fn curves(&self) -> &SolutionCurves {
        &self.curves
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The vector the cell currently reports, if any.
    pub fn selected(&self) -> Option<&AmbiguityCandidate> {
        match &self.selection {
            Selection::None => None,
            Selection::Ambiguity(i) => self.ambiguities.get(*i),
            Selection::Synthesized { vector, .. } => Some(vector),
        }
    }

    /// Index of the selected ambiguity (or of the ambiguity a synthesized vector came from).
    pub fn selected_index(&self) -> Option<usize> {
        match self.selection {
            Selection::None => None,
            Selection::Ambiguity(i) | Selection::Synthesized { source: i, .. } => Some(i),
        }
    }

    pub fn has_selection(&self) -> bool {
        !matches!(self.selection, Selection::None)
    }

    /// Select ambiguity `index`. Returns `false` (and leaves the selection alone)
    /// if `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.ambiguities.len() {
            return false;
        }
        self.selection = Selection::Ambiguity(index);
        true
    }

    /// Replace the selection with an owned vector derived from ambiguity `source`.
    pub fn select_synthesized(&mut self, source: usize, vector: AmbiguityCandidate) -> bool {
        if source >= self.ambiguities.len() {
            return false;
        }
        self.selection = Selection::Synthesized { source, vector };
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    // ── Ranking queries ─────────────────────────────────────────────────────

    /// Ambiguity indices ordered by objective, best first. Ties keep list order.
    pub fn ranked_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.ambiguities.len()).collect();
        idx.sort_by(|&a, &b| {
            self.ambiguities[b]
                .objective
                .partial_cmp(&self.ambiguities[a].objective)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        idx
    }

    pub fn best_objective(&self) -> Option<f32> {
        self.ranked_indices()
            .first()
            .map(|&i| self.ambiguities[i].objective)
    }

    /// Number of ambiguities whose likelihood ratio to the best one,
    /// `exp(0.5 · (objective − best))`, reaches `threshold`.
    pub fn nudge_rank(&self, threshold: f32) -> usize {
        let Some(best) = self.best_objective() else {
            return 0;
        };
        self.ambiguities
            .iter()
            .filter(|a| (0.5 * (a.objective - best)).exp() >= threshold)
            .count()
    }

    /// Among the `max_rank` best-ranked ambiguities (all when `None`), the one
    /// angularly nearest `direction`. Earlier rank wins ties.
    pub fn nearest_to_direction(&self, direction: Angle, max_rank: Option<usize>) -> Option<usize> {
        let ranked = self.ranked_indices();
        let limit = max_rank.unwrap_or(ranked.len()).min(ranked.len());
        let mut nearest = None;
        let mut min_dif = f32::INFINITY;
        for &i in &ranked[..limit] {
            let dif = self.ambiguities[i].direction.separation(direction);
            if dif < min_dif {
                min_dif = dif;
                nearest = Some(i);
            }
        }
        nearest
    }

    // ── List maintenance (selection-safe) ───────────────────────────────────

    /// Reorder ambiguities by objective, best first, keeping the selection on
    /// the same ambiguity.
    pub fn sort_by_objective(&mut self) {
        let order = self.ranked_indices();
        self.reorder(&order);
    }

    /// Drop ambiguities with the same speed and direction as an earlier one.
    /// Returns the number removed. A selection on a removed duplicate moves to
    /// the surviving twin.
    pub fn remove_duplicates(&mut self) -> usize {
        let n = self.ambiguities.len();
        let mut remap: Vec<usize> = (0..n).collect();
        let mut keep: Vec<usize> = Vec::with_capacity(n);
        for i in 0..n {
            let twin = keep.iter().position(|&k| {
                self.ambiguities[k].speed == self.ambiguities[i].speed
                    && self.ambiguities[k].direction == self.ambiguities[i].direction
            });
            match twin {
                Some(pos) => remap[i] = pos,
                None => {
                    remap[i] = keep.len();
                    keep.push(i);
                }
            }
        }
        let removed = n - keep.len();
        if removed > 0 {
            self.ambiguities = keep.iter().map(|&i| self.ambiguities[i]).collect();
            self.remap_selection(|old| Some(remap[old]));
        }
        removed
    }

    /// Check the curves and that the selection points into the ambiguity list.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.curves.validate()?;
        if let Some(i) = self.selected_index() {
            ensure!(
                i < self.ambiguities.len(),
                "selection index {} out of range for {} ambiguities",
                i,
                self.ambiguities.len()
            );
        }
        Ok(())
    }

    /// Keep only the selected ambiguity (and its range). Returns `false` when
    /// there is no selection, leaving the cell untouched.
    pub fn retain_selected(&mut self) -> bool {
        let Some(index) = self.selected_index() else {
            return false;
        };
        self.reorder(&[index]);
        true
    }

    /// Replace the list by `order` (indices into the current list).
    fn reorder(&mut self, order: &[usize]) {
        let mut new_index = vec![None; self.ambiguities.len()];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = Some(new);
        }
        self.ambiguities = order.iter().map(|&i| self.ambiguities[i]).collect();
        self.remap_selection(|old| new_index[old]);
    }

    fn remap_selection<F: Fn(usize) -> Option<usize>>(&mut self, map: F) {
        self.selection = match self.selection {
            Selection::None => Selection::None,
            Selection::Ambiguity(i) => map(i).map_or(Selection::None, Selection::Ambiguity),
            Selection::Synthesized { source, vector } => map(source)
                .map_or(Selection::None, |source| Selection::Synthesized { source, vector }),
        };
    }
}
