//! Core decoding building blocks: the header micro-parser, the record/field
//! model, the binary record decoder, the band/raster engine, and the bitmask
//! expression engine. These are the format-level primitives consumed by the
//! high-level `api` module and the product reader in `io`.
pub mod band;
pub mod bitmask;
pub mod decode;
pub mod header;
pub mod raster;
pub mod record;
