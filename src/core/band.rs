//! Logical-channel-to-pixel-grid mapping.
//!
//! A band binds one field of one dataset to a 2D grid: dataset record index
//! is the scene row, field element index is the scene column. Bands defined
//! on a coarser tie-point grid (native sampling interval above 1 in either
//! axis) are resampled to the pixel grid with bilinear interpolation.
use tracing::debug;

use crate::core::raster::{Raster, interpolate_bilinear};
use crate::core::record::Record;
use crate::error::{Error, Result};
use crate::types::ScalarType;

/// One named flag bit within a band's sample word.
#[derive(Clone, Debug, PartialEq)]
pub struct FlagDef {
    pub name: String,
    pub bit: u8,
}

/// Affine sample scaling: `physical = scale * raw + offset`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    pub fn apply(self, raw: f64) -> f64 {
        self.scale * raw + self.offset
    }
}

/// Fully resolved description of one logical channel.
#[derive(Clone, Debug, PartialEq)]
pub struct BandDescriptor {
    pub name: String,
    /// Source dataset name.
    pub dataset: String,
    /// Source field name within each dataset record.
    pub field: String,
    /// Element type of rasters created for this band.
    pub sample_type: ScalarType,
    pub scaling: Option<Scaling>,
    /// Flag-coding table; empty for measurement bands.
    pub flags: Vec<FlagDef>,
    /// Native sampling interval in scene pixels per axis; above 1 means the
    /// band lives on a tie-point grid and must be interpolated.
    pub sampling_x: usize,
    pub sampling_y: usize,
}

impl BandDescriptor {
    pub fn is_tie_point(&self) -> bool {
        self.sampling_x > 1 || self.sampling_y > 1
    }

    /// Bit mask for a named flag of this band.
    pub fn flag_mask(&self, flag: &str) -> Result<u64> {
        self.flags
            .iter()
            .find(|f| f.name == flag)
            .map(|f| 1u64 << f.bit)
            .ok_or_else(|| Error::lookup("flag", format!("{}.{}", self.name, flag)))
    }

    fn apply_scaling(&self, raw: f64) -> f64 {
        match self.scaling {
            Some(s) => s.apply(raw),
            None => raw,
        }
    }
}

/// Supplier of decoded dataset records, keyed by dataset name and record
/// index. Implemented by the product reader; tests provide in-memory stand-ins.
pub trait RecordSource {
    fn record(&mut self, dataset: &str, index: usize) -> Result<Record>;
    fn record_count(&mut self, dataset: &str) -> Result<usize>;
}

/// Fill `raster` with band samples starting at scene position
/// `(offset_x, offset_y)`, honoring the raster's subsampling steps.
///
/// Each output row decodes the records it needs exactly once; many columns
/// share one record.
pub fn read_band(
    source: &mut impl RecordSource,
    band: &BandDescriptor,
    offset_x: usize,
    offset_y: usize,
    raster: &mut Raster,
) -> Result<()> {
    debug!(
        band = band.name.as_str(),
        offset_x, offset_y, "filling {}x{} raster", raster.width(), raster.height()
    );
    if band.is_tie_point() {
        read_band_interpolated(source, band, offset_x, offset_y, raster)
    } else {
        read_band_direct(source, band, offset_x, offset_y, raster)
    }
}

fn read_band_direct(
    source: &mut impl RecordSource,
    band: &BandDescriptor,
    offset_x: usize,
    offset_y: usize,
    raster: &mut Raster,
) -> Result<()> {
    for iy in 0..raster.height() {
        let src_y = offset_y + iy * raster.step_y();
        let record = source.record(&band.dataset, src_y)?;
        let field = record.required_field(&band.field)?;
        for ix in 0..raster.width() {
            let src_x = offset_x + ix * raster.step_x();
            let raw = field.as_f64(src_x)?;
            raster.set_f64(ix, iy, band.apply_scaling(raw))?;
        }
    }
    Ok(())
}

fn read_band_interpolated(
    source: &mut impl RecordSource,
    band: &BandDescriptor,
    offset_x: usize,
    offset_y: usize,
    raster: &mut Raster,
) -> Result<()> {
    let ss_x = band.sampling_x.max(1);
    let ss_y = band.sampling_y.max(1);
    let grid_rows = source.record_count(&band.dataset)?;
    if grid_rows == 0 {
        return Err(Error::Product(format!(
            "tie-point dataset `{}` has no records",
            band.dataset
        )));
    }

    for iy in 0..raster.height() {
        let src_y = offset_y + iy * raster.step_y();
        let gy0 = (src_y / ss_y).min(grid_rows - 1);
        let gy1 = (gy0 + 1).min(grid_rows - 1);
        let wy = (src_y % ss_y) as f64 / ss_y as f64;

        let rec0 = source.record(&band.dataset, gy0)?;
        let rec1 = if gy1 != gy0 {
            Some(source.record(&band.dataset, gy1)?)
        } else {
            None
        };
        let f0 = rec0.required_field(&band.field)?;
        let f1 = match &rec1 {
            Some(r) => r.required_field(&band.field)?,
            None => f0,
        };
        let grid_cols = f0.info.element_count;
        if grid_cols == 0 {
            return Err(Error::Product(format!(
                "tie-point field `{}` is empty",
                band.field
            )));
        }

        for ix in 0..raster.width() {
            let src_x = offset_x + ix * raster.step_x();
            let gx0 = (src_x / ss_x).min(grid_cols - 1);
            let gx1 = (gx0 + 1).min(grid_cols - 1);
            let wx = (src_x % ss_x) as f64 / ss_x as f64;

            let v00 = f0.as_f64(gx0)?;
            let v10 = f0.as_f64(gx1)?;
            let v01 = f1.as_f64(gx0)?;
            let v11 = f1.as_f64(gx1)?;
            let value = interpolate_bilinear(wx, wy, v00, v10, v01, v11);
            raster.set_f64(ix, iy, band.apply_scaling(value))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{Field, FieldData, FieldInfo};

    /// Rows of pre-built records, one dataset.
    struct MemSource {
        dataset: String,
        rows: Vec<Record>,
    }

    impl RecordSource for MemSource {
        fn record(&mut self, dataset: &str, index: usize) -> Result<Record> {
            if dataset != self.dataset {
                return Err(Error::lookup("dataset", dataset));
            }
            self.rows
                .get(index)
                .cloned()
                .ok_or(Error::Bounds {
                    index,
                    len: self.rows.len(),
                })
        }

        fn record_count(&mut self, dataset: &str) -> Result<usize> {
            if dataset != self.dataset {
                return Err(Error::lookup("dataset", dataset));
            }
            Ok(self.rows.len())
        }
    }

    fn row(name: &str, values: Vec<u16>) -> Record {
        let mut rec = Record::new();
        let n = values.len();
        rec.push(Field::new(
            FieldInfo::new(name, None, ScalarType::UInt16, n),
            FieldData::UInt16(values),
        ));
        rec
    }

    fn measurement_band() -> BandDescriptor {
        BandDescriptor {
            name: "radiance_6".into(),
            dataset: "Radiance_6".into(),
            field: "samples".into(),
            sample_type: ScalarType::Float32,
            scaling: Some(Scaling {
                scale: 0.5,
                offset: 10.0,
            }),
            flags: Vec::new(),
            sampling_x: 1,
            sampling_y: 1,
        }
    }

    #[test]
    fn direct_read_applies_scaling_per_pixel() {
        let mut source = MemSource {
            dataset: "Radiance_6".into(),
            rows: vec![
                row("samples", vec![0, 2, 4]),
                row("samples", vec![6, 8, 10]),
            ],
        };
        let band = measurement_band();
        let mut raster = Raster::new(band.sample_type, 3, 2, 1, 1).unwrap();
        read_band(&mut source, &band, 0, 0, &mut raster).unwrap();

        for y in 0..2 {
            for x in 0..3 {
                let raw = (y * 6 + x * 2) as f64;
                assert_eq!(raster.get_f64(x, y).unwrap(), 0.5 * raw + 10.0);
            }
        }
    }

    #[test]
    fn offsets_and_subsampling_select_source_pixels() {
        let mut source = MemSource {
            dataset: "Radiance_6".into(),
            rows: (0..6)
                .map(|y| row("samples", (0..8).map(|x| (y * 100 + x) as u16).collect()))
                .collect(),
        };
        let mut band = measurement_band();
        band.scaling = None;
        // 4x4 window at (2,1), every second pixel -> 2x2 raster
        let mut raster = Raster::new(ScalarType::Float32, 4, 4, 2, 2).unwrap();
        read_band(&mut source, &band, 2, 1, &mut raster).unwrap();

        assert_eq!(raster.get_f64(0, 0).unwrap(), 102.0);
        assert_eq!(raster.get_f64(1, 0).unwrap(), 104.0);
        assert_eq!(raster.get_f64(0, 1).unwrap(), 302.0);
        assert_eq!(raster.get_f64(1, 1).unwrap(), 304.0);
    }

    #[test]
    fn tie_point_band_is_bilinearly_interpolated() {
        // 2x2 tie-point grid spanning a 4x4 scene (sampling 4 would need
        // more grid columns; use 2 so grid covers the scene edge-to-edge).
        let mut source = MemSource {
            dataset: "Tie_points".into(),
            rows: vec![row("lat", vec![0, 100]), row("lat", vec![200, 300])],
        };
        let band = BandDescriptor {
            name: "latitude".into(),
            dataset: "Tie_points".into(),
            field: "lat".into(),
            sample_type: ScalarType::Float32,
            scaling: None,
            flags: Vec::new(),
            sampling_x: 2,
            sampling_y: 2,
        };
        let mut raster = Raster::new(ScalarType::Float32, 4, 4, 1, 1).unwrap();
        read_band(&mut source, &band, 0, 0, &mut raster).unwrap();

        // Grid corners reproduce exactly.
        assert_eq!(raster.get_f64(0, 0).unwrap(), 0.0);
        assert_eq!(raster.get_f64(2, 0).unwrap(), 100.0);
        assert_eq!(raster.get_f64(0, 2).unwrap(), 200.0);
        assert_eq!(raster.get_f64(2, 2).unwrap(), 300.0);
        // Half-way between the first two grid columns.
        assert_eq!(raster.get_f64(1, 0).unwrap(), 50.0);
        // Cell center blends all four corners.
        assert_eq!(raster.get_f64(1, 1).unwrap(), 150.0);
    }

    #[test]
    fn flag_mask_lookup() {
        let band = BandDescriptor {
            name: "l2_flags".into(),
            dataset: "Flags".into(),
            field: "flags".into(),
            sample_type: ScalarType::UInt32,
            scaling: None,
            flags: vec![
                FlagDef {
                    name: "LAND".into(),
                    bit: 4,
                },
                FlagDef {
                    name: "BRIGHT".into(),
                    bit: 9,
                },
            ],
            sampling_x: 1,
            sampling_y: 1,
        };
        assert_eq!(band.flag_mask("LAND").unwrap(), 1 << 4);
        assert_eq!(band.flag_mask("BRIGHT").unwrap(), 1 << 9);
        assert!(matches!(
            band.flag_mask("CLOUD"),
            Err(Error::SchemaLookup { .. })
        ));
    }

    #[test]
    fn missing_field_is_a_lookup_error() {
        let mut source = MemSource {
            dataset: "Radiance_6".into(),
            rows: vec![row("other", vec![0, 1, 2])],
        };
        let band = measurement_band();
        let mut raster = Raster::new(ScalarType::Float32, 3, 1, 1, 1).unwrap();
        assert!(matches!(
            read_band(&mut source, &band, 0, 0, &mut raster),
            Err(Error::SchemaLookup { .. })
        ));
    }
}
