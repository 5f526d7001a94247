//! Wraparound-aware angles and angular intervals.
//!
//! Wind directions live on the circle `[0, 2π)`. [`Angle`] re-normalizes after
//! every operation so call sites never have to, and [`AngleInterval`] describes
//! a closed arc `[left, right]` that may wrap through zero (`left > right`).

use std::f32::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, Sub};

use rkyv::{Archive, Deserialize, Serialize};

use crate::Vector2;

/// Slack used by interval membership so that a bound always tests as inside.
const MEMBERSHIP_EPS: f32 = 1e-6;

// ── Angle ───────────────────────────────────────────────────────────────────

/// A direction in radians, always normalized into `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Archive, Serialize, Deserialize)]
pub struct Angle(f32);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    /// Build an angle from radians, wrapping into `[0, 2π)`.
    pub fn new(radians: f32) -> Self {
        let mut r = radians.rem_euclid(TAU);
        // rem_euclid of a tiny negative value rounds up to exactly TAU
        if r >= TAU {
            r = 0.0;
        }
        Angle(r)
    }

    pub fn from_degrees(degrees: f32) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Direction of the vector `(u, v)`, measured counter-clockwise from +u.
    ///
    /// The zero vector has no direction; it maps to [`Angle::ZERO`].
    pub fn from_components(u: f32, v: f32) -> Self {
        if u == 0.0 && v == 0.0 {
            Angle::ZERO
        } else {
            Self::new(v.atan2(u))
        }
    }

    #[inline]
    pub fn radians(self) -> f32 {
        self.0
    }

    #[inline]
    pub fn degrees(self) -> f32 {
        self.0.to_degrees()
    }

    /// Smallest unsigned separation between two directions, in `[0, π]` radians.
    pub fn separation(self, other: Angle) -> f32 {
        let d = (self.0 - other.0).abs();
        if d > PI {
            TAU - d
        } else {
            d
        }
    }

    /// Counter-clockwise sweep from `from` to `self`, in `[0, 2π)` radians.
    pub fn offset_from(self, from: Angle) -> f32 {
        Angle::new(self.0 - from.0).0
    }

    /// Unit vector `(cos θ, sin θ)`.
    pub fn unit_vector(self) -> Vector2 {
        let (s, c) = self.0.sin_cos();
        Vector2::new(c, s)
    }
}

impl Add<f32> for Angle {
    type Output = Angle;

    fn add(self, rhs: f32) -> Angle {
        Angle::new(self.0 + rhs)
    }
}

impl Sub<f32> for Angle {
    type Output = Angle;

    fn sub(self, rhs: f32) -> Angle {
        Angle::new(self.0 - rhs)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.degrees())
    }
}

// ── AngleInterval ───────────────────────────────────────────────────────────

/// Closed arc of directions swept counter-clockwise from `left` to `right`.
///
/// Both bounds are normalized independently, so `left > right` denotes an arc
/// passing through zero. `left == right` is the degenerate single-direction arc.
#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct AngleInterval {
    pub left: Angle,
    pub right: Angle,
}

impl AngleInterval {
    /// Build an interval from raw radian bounds.
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            left: Angle::new(left),
            right: Angle::new(right),
        }
    }

    /// Arc spanning direction bins `left_bin..=right_bin` of a `bins`-bin circle.
    pub fn from_bins(left_bin: usize, right_bin: usize, bins: usize) -> Self {
        let step = TAU / bins as f32;
        Self::new(left_bin as f32 * step, right_bin as f32 * step)
    }

    pub fn set_left_right(&mut self, left: f32, right: f32) {
        self.left = Angle::new(left);
        self.right = Angle::new(right);
    }

    /// Angular length of the arc in radians, wrap-aware.
    pub fn width(&self) -> f32 {
        self.right.offset_from(self.left)
    }

    /// Whether `angle` lies on the arc (both bounds included).
    pub fn contains(&self, angle: Angle) -> bool {
        angle.offset_from(self.left) <= self.width() + MEMBERSHIP_EPS
    }

    /// `angle` itself when inside the arc, otherwise whichever bound is
    /// angularly closer (the left bound on an exact tie).
    pub fn nearest_value(&self, angle: Angle) -> Angle {
        if self.contains(angle) {
            return angle;
        }
        if angle.separation(self.left) <= angle.separation(self.right) {
            self.left
        } else {
            self.right
        }
    }

    /// Direction halfway along the arc.
    pub fn midpoint(&self) -> Angle {
        self.left + 0.5 * self.width()
    }

    /// Whether two arcs share at least one direction.
    pub fn overlaps(&self, other: &AngleInterval) -> bool {
        self.contains(other.left) || self.contains(other.right) || other.contains(self.left)
    }
}

impl fmt::Display for AngleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.left, self.right)
    }
}
