//! Probability-mass driven growth of ambiguity confidence intervals.
//!
//! Each peak starts as a one-bin interval. Every iteration extends each
//! interval by one bin on its left and then on its right side, in rank order,
//! unless that bin already belongs to another interval. Growth stops once the
//! claimed bins hold the requested fraction of the total pseudo-probability
//! `Σ exp(objective)`, when an iteration claims nothing, or at the iteration cap.

use tracing::warn;

/// Closed run of bins `left..=right`, possibly wrapping past the last bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinInterval {
    pub left: usize,
    pub right: usize,
    pub len: usize,
}

/// Outcome of interval growth for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthReport {
    /// Fraction of the total pseudo-probability captured by all intervals.
    pub coverage: f32,
    /// Growth iterations performed.
    pub iterations: usize,
    /// Whether the requested coverage was reached.
    pub converged: bool,
}

impl GrowthReport {
    pub(crate) fn empty() -> Self {
        Self {
            coverage: 0.0,
            iterations: 0,
            converged: false,
        }
    }
}

/// Grow one interval per peak over the circular curve `objective`.
pub fn grow_intervals(
    objective: &[f32],
    peaks: &[usize],
    coverage_fraction: f32,
    max_iterations: usize,
) -> (Vec<BinInterval>, GrowthReport) {
    let n = objective.len();
    if peaks.is_empty() || n == 0 {
        return (Vec::new(), GrowthReport::empty());
    }

    // exp(o - max) keeps the largest mass at 1 so very negative curves do not underflow
    let max = objective.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mass: Vec<f64> = objective.iter().map(|&o| ((o - max) as f64).exp()).collect();
    let total: f64 = mass.iter().sum();
    let target = coverage_fraction as f64 * total;

    let mut owner: Vec<Option<usize>> = vec![None; n];
    let mut intervals = Vec::with_capacity(peaks.len());
    let mut covered = 0.0_f64;
    for (k, &p) in peaks.iter().enumerate() {
        owner[p] = Some(k);
        covered += mass[p];
        intervals.push(BinInterval {
            left: p,
            right: p,
            len: 1,
        });
    }

    let mut iterations = 0;
    while covered < target && iterations < max_iterations {
        iterations += 1;
        let mut grew = false;
        for (k, iv) in intervals.iter_mut().enumerate() {
            let left = (iv.left + n - 1) % n;
            if owner[left].is_none() {
                owner[left] = Some(k);
                iv.left = left;
                iv.len += 1;
                covered += mass[left];
                grew = true;
            }
            let right = (iv.right + 1) % n;
            if owner[right].is_none() {
                owner[right] = Some(k);
                iv.right = right;
                iv.len += 1;
                covered += mass[right];
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let converged = covered >= target;
    let coverage = (covered / total) as f32;
    if !converged {
        warn!(
            "Interval growth stopped at {:.2}% coverage after {} iterations (target {:.2}%)",
            coverage * 100.0,
            iterations,
            coverage_fraction * 100.0
        );
    }

    (
        intervals,
        GrowthReport {
            coverage,
            iterations,
            converged,
        },
    )
}
