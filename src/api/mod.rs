//! High-level, ergonomic library API: open a product with a schema, read
//! whole-scene band and bitmask rasters. Prefer these entrypoints over the
//! low-level `core` modules when embedding EOPR.
use std::fs;
use std::path::Path;

use tracing::info;

use crate::core::raster::Raster;
use crate::error::Result;
use crate::io::Product;
use crate::schema::SchemaTable;
use crate::types::ScalarType;

/// Open a product, taking the schema from `schema_path` when given and the
/// built-in MERIS-style schema otherwise.
pub fn open_product(path: &Path, schema_path: Option<&Path>) -> Result<Product> {
    let schema = match schema_path {
        Some(p) => {
            info!("loading schema from {:?}", p);
            SchemaTable::from_json(&fs::read_to_string(p)?)?
        }
        None => SchemaTable::builtin()?,
    };
    Product::open(path, schema)
}

/// Read one band over the full scene at 1:1 sampling.
pub fn read_full_band(product: &mut Product, band_name: &str) -> Result<Raster> {
    let width = product.scene_width()?;
    let height = product.scene_height()?;
    let mut raster = product.create_compatible_raster(band_name, width, height, 1, 1)?;
    product.read_band_raster(band_name, 0, 0, &mut raster)?;
    Ok(raster)
}

/// Evaluate a bitmask expression over the full scene into a `uint8` raster.
pub fn read_full_bitmask(product: &mut Product, expr_text: &str) -> Result<Raster> {
    let width = product.scene_width()?;
    let height = product.scene_height()?;
    let mut raster = Raster::new(ScalarType::UInt8, width, height, 1, 1)?;
    product.read_bitmask_raster(expr_text, 0, 0, &mut raster)?;
    Ok(raster)
}
