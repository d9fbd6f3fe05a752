#![doc = r#"
EOPR: a typed reader for ENVISAT-style Earth-observation data products.

This crate decodes the fixed binary product container used by the MERIS/AATSR
product family: an ASCII main header (MPH), an ASCII specific header (SPH), a
table of dataset descriptors (DSDs), and per-dataset sequences of fixed-stride
big-endian binary records. On top of the record level it renders logical
channels ("bands") as dense 2D rasters, interpolates tie-point grids to the
pixel grid, and evaluates boolean bitmask expressions over per-pixel flag
bits. It powers the EOPR CLI and can be embedded in your own Rust
applications.

Record layouts are not stored in the product; they come from a JSON schema
(see [`schema`]), with a compact built-in MERIS-style table for quick starts.

Quick start: read a band into a raster
--------------------------------------
```rust,no_run
use std::path::Path;
use eopr::api::{open_product, read_full_band};

fn main() -> eopr::Result<()> {
    let mut product = open_product(Path::new("/data/MER_RR__2P_TEST.N1"), None)?;
    let raster = read_full_band(&mut product, "norm_rho_surf")?;
    let center = raster.get_f64(raster.width() / 2, raster.height() / 2)?;
    println!("center sample: {center}");
    Ok(())
}
```

Derive a flag mask
------------------
```rust,no_run
use std::path::Path;
use eopr::api::{open_product, read_full_bitmask};

fn main() -> eopr::Result<()> {
    let mut product = open_product(Path::new("/data/MER_RR__2P_TEST.N1"), None)?;
    let mask = read_full_bitmask(&mut product, "l2_flags.LAND and !l2_flags.BRIGHT")?;
    println!("mask is {} x {}", mask.width(), mask.height());
    Ok(())
}
```

Low-level access
----------------
The core decoding primitives are public: [`core::header`] parses the
`NAME=VALUE<UNIT>` header dialect, [`core::decode`] turns raw record bytes
into typed [`core::record::Record`]s, [`core::raster`] holds pixel buffers
and the bilinear tie-point blend, and [`core::bitmask`] is the flag
expression engine.

Error handling
--------------
All public functions return [`Result`]; match on [`Error`] to distinguish
syntax errors (skippable) from schema lookups, size mismatches and bounds
violations (fatal to the operation that hit them).

Useful modules
--------------
- [`api`]: high-level, ergonomic entry points.
- [`core`]: header parser, record model, decoder, rasters, bitmasks.
- [`schema`]: JSON record/dataset/band definitions and the layout cache.
- [`io`]: product container reader and the endian-swap utility.
- [`types`]: the scalar type system and UTC time handling.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod schema;
pub mod types;

// Curated public API surface
// Types
pub use error::{Error, Result};
pub use types::{ScalarType, UtcTime};

// Record model and decoding
pub use core::decode::{RecordLayout, decode_record};
pub use core::header::{parse_header_block, parse_header_line};
pub use core::record::{Field, FieldData, FieldInfo, Record};

// Bands, rasters and bitmasks
pub use core::band::{BandDescriptor, FlagDef, Scaling};
pub use core::bitmask::{BitmaskExpr, FlagProvider, parse_bitmask};
pub use core::raster::{Raster, interpolate_bilinear};

// Product containers and schemas
pub use io::{DatasetDescriptor, Product, swap_bytes_in_place};
pub use schema::{ProductSchema, SchemaTable};

// High-level API re-exports
pub use api::{open_product, read_full_band, read_full_bitmask};
