//! Wind vectors and ambiguity candidates.
//!
//! Speeds are in m/s. Directions follow the mathematical convention of
//! [`Angle`]: counter-clockwise from the +u axis, so a vector decomposes as
//! `u = speed·cos(dir)`, `v = speed·sin(dir)`.

use rkyv::{Archive, Deserialize, Serialize};

use crate::angle::{Angle, AngleInterval};
use crate::Vector2;

/// A plain wind vector, used for priors and truth fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct WindVector {
    pub speed: f32,
    pub direction: Angle,
}

impl WindVector {
    pub fn new(speed: f32, direction: Angle) -> Self {
        Self { speed, direction }
    }

    pub fn from_degrees(speed: f32, direction_deg: f32) -> Self {
        Self::new(speed, Angle::from_degrees(direction_deg))
    }

    pub fn from_components(u: f32, v: f32) -> Self {
        Self {
            speed: (u * u + v * v).sqrt(),
            direction: Angle::from_components(u, v),
        }
    }

    /// Orthogonal `(u, v)` components.
    pub fn components(&self) -> Vector2 {
        self.direction.unit_vector() * self.speed
    }
}

/// One local optimum of a cell's objective curve.
///
/// `direction_range` is the confidence arc grown around the peak; arcs of the
/// ambiguities of one cell never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct AmbiguityCandidate {
    pub speed: f32,
    pub direction: Angle,
    /// Secondary retrieved variable (e.g. sea-surface salinity).
    pub secondary: f32,
    /// Log-likelihood-like score; higher is better, usually ≤ 0.
    pub objective: f32,
    pub direction_range: AngleInterval,
}

impl AmbiguityCandidate {
    /// Candidate whose confidence arc is just its own direction.
    pub fn point(speed: f32, direction: Angle, secondary: f32, objective: f32) -> Self {
        Self {
            speed,
            direction,
            secondary,
            objective,
            direction_range: AngleInterval {
                left: direction,
                right: direction,
            },
        }
    }

    pub fn wind_vector(&self) -> WindVector {
        WindVector::new(self.speed, self.direction)
    }

    pub fn components(&self) -> Vector2 {
        self.wind_vector().components()
    }

    /// Euclidean distance between this vector and the vector with components `other`.
    pub fn vector_distance(&self, other: &Vector2) -> f32 {
        (self.components() - other).norm()
    }
}
