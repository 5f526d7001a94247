//! Swath persistence: rkyv snapshots, CSV export of the selected field and
//! CSV import of prior vectors.

use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use tracing::{debug, info};

use super::SwathGrid;
use crate::wind::WindVector;

/// Header of the selected-vector export.
pub const SELECTED_CSV_HEADER: [&str; 7] = [
    "cti",
    "ati",
    "speed",
    "direction_deg",
    "secondary",
    "objective",
    "num_ambiguities",
];

/// Parse field `index` of a prior row.
fn parse_field<T>(record: &csv::StringRecord, index: usize, name: &str, line: usize) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = record
        .get(index)
        .with_context(|| format!("prior row {}: missing {}", line + 1, name))?;
    raw.trim()
        .parse()
        .with_context(|| format!("prior row {}: bad {} {:?}", line + 1, name, raw))
}

// ── rkyv snapshots ──────────────────────────────────────────────────────────

impl SwathGrid {
    /// Serialize the whole swath using rkyv.
    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Deserialize a swath and check it with [`validate`](Self::validate).
    pub fn from_rkyv_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        let grid = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        grid.validate().context("inconsistent swath snapshot")?;
        Ok(grid)
    }

    /// Save a snapshot of the swath to `path`.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!("Saved swath to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load a swath snapshot written by [`save_to_file`](Self::save_to_file).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let grid = Self::from_rkyv_bytes(&bytes)?;
        info!(
            "Loaded swath {} x {} with {} cells",
            grid.cross_track_bins(),
            grid.along_track_bins(),
            grid.valid_cells()
        );
        Ok(grid)
    }

    // ── CSV ─────────────────────────────────────────────────────────────────

    /// Write one row per selected cell. Returns the number of rows written.
    pub fn write_selected_csv<W: Write>(&self, writer: W) -> anyhow::Result<usize> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(SELECTED_CSV_HEADER)?;
        let mut rows = 0;
        for (cti, ati, cell) in self.iter() {
            let Some(sel) = cell.selected() else {
                continue;
            };
            wtr.write_record(&[
                cti.to_string(),
                ati.to_string(),
                format!("{:.4}", sel.speed),
                format!("{:.4}", sel.direction.degrees()),
                format!("{:.4}", sel.secondary),
                format!("{:.6}", sel.objective),
                cell.num_ambiguities().to_string(),
            ])?;
            rows += 1;
        }
        wtr.flush()?;
        Ok(rows)
    }

    pub fn export_selected_csv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let file =
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let rows = self.write_selected_csv(file)?;
        info!("Exported {} selected vectors to {}", rows, path.display());
        Ok(rows)
    }

    /// Read `cti, ati, speed, direction_deg` rows (with header) and attach
    /// each as the prior of the cell at that location. Rows naming an empty
    /// slot are ignored. Returns the number of priors applied.
    pub fn apply_priors_csv<R: Read>(&mut self, reader: R) -> anyhow::Result<usize> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut applied = 0;
        let mut ignored = 0;
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let cti: usize = parse_field(&record, 0, "cti", line)?;
            let ati: usize = parse_field(&record, 1, "ati", line)?;
            let speed: f32 = parse_field(&record, 2, "speed", line)?;
            let direction: f32 = parse_field(&record, 3, "direction_deg", line)?;

            match self.get_mut(cti, ati) {
                Some(cell) => {
                    cell.prior = Some(WindVector::from_degrees(speed, direction));
                    applied += 1;
                }
                None => ignored += 1,
            }
        }
        debug!("Applied {} priors, ignored {} rows without a cell", applied, ignored);
        Ok(applied)
    }

    pub fn load_priors_csv<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let applied = self.apply_priors_csv(file)?;
        info!("Loaded {} priors from {}", applied, path.display());
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Angle;
    use crate::cell::{CellFlags, WindVectorCell};
    use crate::curves::SolutionCurves;
    use crate::wind::AmbiguityCandidate;

    fn grid() -> SwathGrid {
        let mut g = SwathGrid::with_size(3, 2).unwrap();
        for (cti, ati) in [(0, 0), (2, 1)] {
            let curves = SolutionCurves::from_fn(|b| (-(b as f32) / 100.0, 9.0, 33.5)).unwrap();
            let ambs = vec![
                AmbiguityCandidate::point(9.0, Angle::from_degrees(30.0), 33.5, -0.5),
                AmbiguityCandidate::point(8.5, Angle::from_degrees(210.0), 33.4, -0.9),
            ];
            g.add(cti, ati, WindVectorCell::new(curves, ambs).with_flags(CellFlags::RAIN));
        }
        g
    }

    #[test]
    fn test_rkyv_roundtrip_keeps_selection_and_flags() {
        let mut g = grid();
        let v = AmbiguityCandidate::point(8.7, Angle::from_degrees(215.0), 33.4, -1.0);
        g.get_mut(2, 1).unwrap().select_synthesized(1, v);
        g.get_mut(0, 0).unwrap().select(0);

        let bytes = g.to_rkyv_bytes().unwrap();
        let back = SwathGrid::from_rkyv_bytes(&bytes).unwrap();
        assert_eq!(back, g);
        assert!(back.get(0, 0).unwrap().flags.contains(CellFlags::RAIN));
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        assert!(SwathGrid::from_rkyv_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_inconsistent_snapshot_is_an_error() {
        let short = SwathGrid {
            cross_track_bins: 4,
            along_track_bins: 4,
            cells: vec![None],
        };
        let bytes = short.to_rkyv_bytes().unwrap();
        let err = SwathGrid::from_rkyv_bytes(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("1 slots"), "unexpected error: {err:#}");

        let no_columns = SwathGrid {
            cross_track_bins: 0,
            along_track_bins: 3,
            cells: vec![None, None, None],
        };
        let bytes = no_columns.to_rkyv_bytes().unwrap();
        assert!(SwathGrid::from_rkyv_bytes(&bytes).is_err());
    }

    #[test]
    fn test_csv_export_only_selected() {
        let mut g = grid();
        g.get_mut(2, 1).unwrap().select(1);
        let mut out = Vec::new();
        assert_eq!(g.write_selected_csv(&mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "cti,ati,speed,direction_deg,secondary,objective,num_ambiguities");
        assert_eq!(lines[1], "2,1,8.5000,210.0000,33.4000,-0.900000,2");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_prior_import() {
        let mut g = grid();
        let text = "cti,ati,speed,direction_deg\n0,0,7.5,200\n1,1,3.0,10\n2,1, 6.0 , 45.0\n";
        assert_eq!(g.apply_priors_csv(text.as_bytes()).unwrap(), 2);
        let p = g.get(0, 0).unwrap().prior.unwrap();
        assert_eq!(p.speed, 7.5);
        assert!((p.direction.degrees() - 200.0).abs() < 1e-3);
        assert!(g.get(2, 1).unwrap().prior.is_some());

        let bad = "cti,ati,speed,direction_deg\n0,0,fast,200\n";
        assert!(g.apply_priors_csv(bad.as_bytes()).is_err());
    }
}
