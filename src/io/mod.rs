//! I/O layer for product containers.
//! Provides the `product` reader (open/seek lifecycle, MPH/SPH/DSD decoding,
//! record/band/bitmask reads) and the `byteswap` endian utility.
pub mod byteswap;
pub use byteswap::swap_bytes_in_place;

pub mod product;
pub use product::{ByteSource, DatasetDescriptor, MPH_SIZE, Product};
