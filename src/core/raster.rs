//! Dense pixel rasters for band and bitmask reads.
//!
//! A [`Raster`] covers a `source_width x source_height` scene window at a
//! given subsampling step; its buffer holds `ceil(w/step_x) * ceil(h/step_y)`
//! elements of one scalar type, stored as an [`ndarray::Array2`] per type.
//!
//! Releasing a raster is plain Rust ownership: once dropped or moved it is
//! statically inaccessible.
//!
//! ```compile_fail
//! use eopr::core::raster::Raster;
//! use eopr::types::ScalarType;
//!
//! let raster = Raster::new(ScalarType::UInt8, 4, 4, 1, 1).unwrap();
//! drop(raster);
//! raster.get_f64(0, 0); // raster was freed above
//! ```
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::types::ScalarType;

/// Typed pixel storage. Only the fixed-width numeric types can back a
/// raster; `Time`, `Str` and `Spare` fields have no pixel rendition.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterData {
    UInt8(Array2<u8>),
    Int8(Array2<i8>),
    UInt16(Array2<u16>),
    Int16(Array2<i16>),
    UInt32(Array2<u32>),
    Int32(Array2<i32>),
    Float32(Array2<f32>),
    Float64(Array2<f64>),
}

/// A zero-initialized pixel grid owned by its creator until dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    source_width: usize,
    source_height: usize,
    step_x: usize,
    step_y: usize,
    width: usize,
    height: usize,
    data: RasterData,
}

impl Raster {
    /// Allocate a zero-filled raster covering `source_width x source_height`
    /// scene pixels with the given subsampling steps.
    ///
    /// Zero dimensions, zero steps and non-numeric element types are
    /// rejected with [`Error::InvalidArgument`].
    pub fn new(
        element_type: ScalarType,
        source_width: usize,
        source_height: usize,
        step_x: usize,
        step_y: usize,
    ) -> Result<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(Error::InvalidArgument {
                arg: "raster dimensions",
                value: format!("{}x{}", source_width, source_height),
            });
        }
        if step_x == 0 || step_y == 0 {
            return Err(Error::InvalidArgument {
                arg: "subsampling step",
                value: format!("({},{})", step_x, step_y),
            });
        }
        let width = source_width.div_ceil(step_x);
        let height = source_height.div_ceil(step_y);
        let shape = (height, width);
        let data = match element_type {
            ScalarType::UInt8 => RasterData::UInt8(Array2::zeros(shape)),
            ScalarType::Int8 => RasterData::Int8(Array2::zeros(shape)),
            ScalarType::UInt16 => RasterData::UInt16(Array2::zeros(shape)),
            ScalarType::Int16 => RasterData::Int16(Array2::zeros(shape)),
            ScalarType::UInt32 => RasterData::UInt32(Array2::zeros(shape)),
            ScalarType::Int32 => RasterData::Int32(Array2::zeros(shape)),
            ScalarType::Float32 => RasterData::Float32(Array2::zeros(shape)),
            ScalarType::Float64 => RasterData::Float64(Array2::zeros(shape)),
            other => {
                return Err(Error::InvalidArgument {
                    arg: "raster element type",
                    value: other.to_string(),
                });
            }
        };
        Ok(Raster {
            source_width,
            source_height,
            step_x,
            step_y,
            width,
            height,
            data,
        })
    }

    pub fn scalar_type(&self) -> ScalarType {
        match &self.data {
            RasterData::UInt8(_) => ScalarType::UInt8,
            RasterData::Int8(_) => ScalarType::Int8,
            RasterData::UInt16(_) => ScalarType::UInt16,
            RasterData::Int16(_) => ScalarType::Int16,
            RasterData::UInt32(_) => ScalarType::UInt32,
            RasterData::Int32(_) => ScalarType::Int32,
            RasterData::Float32(_) => ScalarType::Float32,
            RasterData::Float64(_) => ScalarType::Float64,
        }
    }

    /// Raster (buffer) width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster (buffer) height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn source_width(&self) -> usize {
        self.source_width
    }

    pub fn source_height(&self) -> usize {
        self.source_height
    }

    pub fn step_x(&self) -> usize {
        self.step_x
    }

    pub fn step_y(&self) -> usize {
        self.step_y
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::PixelBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Read a pixel converted to `f64`, whatever the native element type.
    pub fn get_f64(&self, x: usize, y: usize) -> Result<f64> {
        self.check_bounds(x, y)?;
        let v = match &self.data {
            RasterData::UInt8(a) => a[(y, x)] as f64,
            RasterData::Int8(a) => a[(y, x)] as f64,
            RasterData::UInt16(a) => a[(y, x)] as f64,
            RasterData::Int16(a) => a[(y, x)] as f64,
            RasterData::UInt32(a) => a[(y, x)] as f64,
            RasterData::Int32(a) => a[(y, x)] as f64,
            RasterData::Float32(a) => a[(y, x)] as f64,
            RasterData::Float64(a) => a[(y, x)],
        };
        Ok(v)
    }

    /// Read a pixel converted to `u32` by integer truncation.
    pub fn get_u32(&self, x: usize, y: usize) -> Result<u32> {
        self.check_bounds(x, y)?;
        let v = match &self.data {
            RasterData::UInt8(a) => a[(y, x)] as u32,
            RasterData::Int8(a) => a[(y, x)] as u32,
            RasterData::UInt16(a) => a[(y, x)] as u32,
            RasterData::Int16(a) => a[(y, x)] as u32,
            RasterData::UInt32(a) => a[(y, x)],
            RasterData::Int32(a) => a[(y, x)] as u32,
            RasterData::Float32(a) => a[(y, x)] as u32,
            RasterData::Float64(a) => a[(y, x)] as u32,
        };
        Ok(v)
    }

    /// Store a pixel, converting from `f64` to the native element type.
    pub fn set_f64(&mut self, x: usize, y: usize, value: f64) -> Result<()> {
        self.check_bounds(x, y)?;
        match &mut self.data {
            RasterData::UInt8(a) => a[(y, x)] = value as u8,
            RasterData::Int8(a) => a[(y, x)] = value as i8,
            RasterData::UInt16(a) => a[(y, x)] = value as u16,
            RasterData::Int16(a) => a[(y, x)] = value as i16,
            RasterData::UInt32(a) => a[(y, x)] = value as u32,
            RasterData::Int32(a) => a[(y, x)] = value as i32,
            RasterData::Float32(a) => a[(y, x)] = value as f32,
            RasterData::Float64(a) => a[(y, x)] = value,
        }
        Ok(())
    }

    /// Dump the buffer row-major as native-endian sample bytes, the shape the
    /// raw-image export tools write.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        match &self.data {
            RasterData::UInt8(a) => a.iter().copied().collect(),
            RasterData::Int8(a) => a.iter().map(|&v| v as u8).collect(),
            RasterData::UInt16(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            RasterData::Int16(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            RasterData::UInt32(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            RasterData::Int32(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            RasterData::Float32(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
            RasterData::Float64(a) => a.iter().flat_map(|v| v.to_ne_bytes()).collect(),
        }
    }
}

/// Standard bilinear blend inside the unit cell.
///
/// `wx`, `wy` are in `[0,1]`; the four corner values are reproduced exactly
/// at the corners.
pub fn interpolate_bilinear(wx: f64, wy: f64, v00: f64, v10: f64, v01: f64, v11: f64) -> f64 {
    v00 * (1.0 - wx) * (1.0 - wy)
        + v10 * wx * (1.0 - wy)
        + v01 * (1.0 - wx) * wy
        + v11 * wx * wy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_round_up_with_subsampling() {
        let r = Raster::new(ScalarType::Float32, 10, 7, 4, 2).unwrap();
        assert_eq!(r.width(), 3);
        assert_eq!(r.height(), 4);
        assert_eq!(r.scalar_type(), ScalarType::Float32);
        // Zero-initialized everywhere.
        assert_eq!(r.get_f64(2, 3).unwrap(), 0.0);
    }

    #[test]
    fn invalid_creation_arguments_are_rejected() {
        assert!(Raster::new(ScalarType::UInt8, 0, 5, 1, 1).is_err());
        assert!(Raster::new(ScalarType::UInt8, 5, 5, 0, 1).is_err());
        assert!(Raster::new(ScalarType::Str, 5, 5, 1, 1).is_err());
        assert!(Raster::new(ScalarType::Time, 5, 5, 1, 1).is_err());
    }

    #[test]
    fn pixel_round_trip_and_bounds() {
        let mut r = Raster::new(ScalarType::Int16, 4, 4, 1, 1).unwrap();
        r.set_f64(1, 2, -321.0).unwrap();
        assert_eq!(r.get_f64(1, 2).unwrap(), -321.0);
        assert!(matches!(
            r.get_f64(4, 0),
            Err(Error::PixelBounds { .. })
        ));
        assert!(matches!(
            r.set_f64(0, 4, 1.0),
            Err(Error::PixelBounds { .. })
        ));
    }

    #[test]
    fn bilinear_corners_are_exact() {
        let (v00, v10, v01, v11) = (1.0, 2.0, 3.0, 4.0);
        assert_eq!(interpolate_bilinear(0.0, 0.0, v00, v10, v01, v11), v00);
        assert_eq!(interpolate_bilinear(1.0, 0.0, v00, v10, v01, v11), v10);
        assert_eq!(interpolate_bilinear(0.0, 1.0, v00, v10, v01, v11), v01);
        assert_eq!(interpolate_bilinear(1.0, 1.0, v00, v10, v01, v11), v11);
    }

    #[test]
    fn bilinear_center_is_the_average() {
        let v = interpolate_bilinear(0.5, 0.5, 1.0, 2.0, 3.0, 4.0);
        assert_eq!(v, 2.5);
    }

    #[test]
    fn raw_bytes_cover_the_whole_buffer() {
        let r = Raster::new(ScalarType::UInt16, 3, 2, 1, 1).unwrap();
        assert_eq!(r.to_raw_bytes().len(), 3 * 2 * 2);
    }
}
