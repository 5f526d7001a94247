//! Per-direction solution curves of one wind vector cell.
//!
//! The retrieval model evaluates, for every integer direction in degrees, the
//! best objective value together with the speed and secondary variable that
//! achieve it. Bin `i` holds direction `i°`.
//!
//! Curves persist as flat sequential little-endian `f32` arrays: the objective
//! curve, then the speed curve, then the secondary curve, [`DIRECTION_BINS`]
//! values each. A file holds any number of such records back to back.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use anyhow::{ensure, Context};
use rkyv::{Archive, Deserialize, Serialize};
use tracing::info;

use crate::angle::Angle;

/// Number of direction bins per curve (1° resolution).
pub const DIRECTION_BINS: usize = 360;

/// Width of one direction bin in radians.
pub const BIN_WIDTH_RAD: f32 = TAU / DIRECTION_BINS as f32;

/// Bytes occupied by one persisted set of curves.
const RECORD_BYTES: usize = 3 * DIRECTION_BINS * std::mem::size_of::<f32>();

/// Curve values interpolated at an arbitrary direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub objective: f32,
    pub speed: f32,
    pub secondary: f32,
}

/// Objective, speed and secondary-variable curves over [`DIRECTION_BINS`] directions.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SolutionCurves {
    objective: Vec<f32>,
    speed: Vec<f32>,
    secondary: Vec<f32>,
}

impl SolutionCurves {
    /// Validate and wrap three curves.
    ///
    /// Every curve must have exactly [`DIRECTION_BINS`] finite values; anything
    /// else would silently corrupt downstream bin indexing.
    pub fn new(objective: Vec<f32>, speed: Vec<f32>, secondary: Vec<f32>) -> anyhow::Result<Self> {
        let curves = Self {
            objective,
            speed,
            secondary,
        };
        curves.validate()?;
        Ok(curves)
    }

    /// Check the bin count and finiteness of all three curves.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, curve) in [
            ("objective", &self.objective),
            ("speed", &self.speed),
            ("secondary", &self.secondary),
        ] {
            ensure!(
                curve.len() == DIRECTION_BINS,
                "{} curve has {} bins, expected {}",
                name,
                curve.len(),
                DIRECTION_BINS
            );
            if let Some(bin) = curve.iter().position(|v| !v.is_finite()) {
                anyhow::bail!("{} curve has non-finite value at bin {}", name, bin);
            }
        }
        Ok(())
    }

    /// Build curves by evaluating `f(bin) -> (objective, speed, secondary)` for every bin.
    pub fn from_fn<F>(f: F) -> anyhow::Result<Self>
    where
        F: Fn(usize) -> (f32, f32, f32),
    {
        let mut objective = Vec::with_capacity(DIRECTION_BINS);
        let mut speed = Vec::with_capacity(DIRECTION_BINS);
        let mut secondary = Vec::with_capacity(DIRECTION_BINS);
        for bin in 0..DIRECTION_BINS {
            let (o, s, x) = f(bin);
            objective.push(o);
            speed.push(s);
            secondary.push(x);
        }
        Self::new(objective, speed, secondary)
    }

    pub fn objective(&self) -> &[f32] {
        &self.objective
    }

    pub fn speed(&self) -> &[f32] {
        &self.speed
    }

    pub fn secondary(&self) -> &[f32] {
        &self.secondary
    }

    /// Direction represented by `bin`.
    #[inline]
    pub fn bin_direction(bin: usize) -> Angle {
        Angle::new(bin as f32 * BIN_WIDTH_RAD)
    }

    /// Largest objective value over all bins.
    pub fn max_objective(&self) -> f32 {
        self.objective
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Linearly interpolate all three curves at `direction`, wrapping from bin 359 to bin 0.
    pub fn sample(&self, direction: Angle) -> CurveSample {
        let mut pos = direction.radians() / BIN_WIDTH_RAD;
        // Snap directions that are a bin center up to float noise
        if (pos - pos.round()).abs() < 1e-3 {
            pos = pos.round();
        }
        let lower = pos.floor();
        let t = pos - lower;
        let i0 = (lower as usize) % DIRECTION_BINS;
        let i1 = (i0 + 1) % DIRECTION_BINS;
        let lerp = |c: &[f32]| c[i0] * (1.0 - t) + c[i1] * t;
        CurveSample {
            objective: lerp(&self.objective),
            speed: lerp(&self.speed),
            secondary: lerp(&self.secondary),
        }
    }

    // ── Flat binary persistence ─────────────────────────────────────────────

    /// Write one record (objective, speed, secondary) as little-endian `f32`s.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for curve in [&self.objective, &self.speed, &self.secondary] {
            for v in curve.iter() {
                writer.write_all(&v.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Read one record. Returns `Ok(None)` on a clean end of stream.
    pub fn read_from<R: Read>(reader: &mut R) -> anyhow::Result<Option<Self>> {
        let mut buf = vec![0u8; RECORD_BYTES];
        let mut filled = 0;
        while filled < RECORD_BYTES {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        ensure!(
            filled == RECORD_BYTES,
            "truncated curve record: {} of {} bytes",
            filled,
            RECORD_BYTES
        );

        let values: Vec<f32> = buf
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let (objective, rest) = values.split_at(DIRECTION_BINS);
        let (speed, secondary) = rest.split_at(DIRECTION_BINS);
        Self::new(objective.to_vec(), speed.to_vec(), secondary.to_vec()).map(Some)
    }

    /// Write a sequence of curve records to `path`.
    pub fn save_all_to_file<P: AsRef<Path>>(curves: &[SolutionCurves], path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for c in curves {
            c.write_to(&mut writer)?;
        }
        writer.flush()?;
        info!("Saved {} curve records to {}", curves.len(), path.display());
        Ok(())
    }

    /// Read every curve record stored in `path`.
    pub fn load_all_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<SolutionCurves>> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut out = Vec::new();
        while let Some(c) = Self::read_from(&mut reader)
            .with_context(|| format!("reading record {} of {}", out.len(), path.display()))?
        {
            out.push(c);
        }
        info!("Loaded {} curve records from {}", out.len(), path.display());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> SolutionCurves {
        SolutionCurves::from_fn(|b| (-(b as f32) * 0.01, 5.0 + b as f32 * 0.1, 35.0)).unwrap()
    }

    #[test]
    fn test_rejects_wrong_bin_count() {
        let err = SolutionCurves::new(vec![0.0; 359], vec![0.0; 360], vec![0.0; 360]);
        assert!(err.is_err());
        let msg = format!("{}", err.unwrap_err());
        assert!(msg.contains("359"), "unexpected message: {msg}");
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut obj = vec![0.0; DIRECTION_BINS];
        obj[17] = f32::NAN;
        assert!(SolutionCurves::new(obj, vec![0.0; 360], vec![0.0; 360]).is_err());
    }

    #[test]
    fn test_validate_catches_short_curve() {
        let mut c = ramp();
        assert!(c.validate().is_ok());
        c.secondary.truncate(12);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_sample_at_bin_center_is_exact() {
        let c = ramp();
        let s = c.sample(SolutionCurves::bin_direction(45));
        assert_eq!(s.speed, c.speed()[45]);
        assert_eq!(s.objective, c.objective()[45]);
    }

    #[test]
    fn test_sample_interpolates_and_wraps() {
        let c = ramp();
        let s = c.sample(Angle::from_degrees(10.5));
        assert!((s.speed - 0.5 * (c.speed()[10] + c.speed()[11])).abs() < 1e-4);

        // Between bin 359 and bin 0
        let s = c.sample(Angle::from_degrees(359.5));
        assert!((s.speed - 0.5 * (c.speed()[359] + c.speed()[0])).abs() < 1e-3);
    }

    #[test]
    fn test_binary_roundtrip_preserves_bin_order() {
        let a = ramp();
        let b = SolutionCurves::from_fn(|i| ((i % 7) as f32, i as f32, -(i as f32))).unwrap();
        let mut bytes = Vec::new();
        a.write_to(&mut bytes).unwrap();
        b.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 2 * RECORD_BYTES);

        let mut cursor = std::io::Cursor::new(bytes);
        assert_eq!(SolutionCurves::read_from(&mut cursor).unwrap(), Some(a));
        assert_eq!(SolutionCurves::read_from(&mut cursor).unwrap(), Some(b));
        assert_eq!(SolutionCurves::read_from(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let mut bytes = Vec::new();
        ramp().write_to(&mut bytes).unwrap();
        bytes.truncate(RECORD_BYTES - 3);
        let mut cursor = std::io::Cursor::new(bytes);
        assert!(SolutionCurves::read_from(&mut cursor).is_err());
    }
}
