//! Shared types used across EOPR.
//! Includes the closed `ScalarType` set of the product family, its on-disk
//! size table and schema-name mapping, and the `UtcTime` triple carried by
//! time-stamped dataset records.
use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Scalar element types a product field can hold.
///
/// The set is closed: anything a schema names outside the fixed vocabulary
/// decodes to [`ScalarType::Unknown`], which callers must check for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ScalarType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
    /// 12-byte UTC triple (days, seconds, microseconds).
    Time,
    /// ASCII text; variable width, one byte per character.
    Str,
    /// Uninterpreted filler bytes.
    Spare,
    Unknown,
}

impl ScalarType {
    /// Per-element byte width on disk.
    ///
    /// `Str` and `Spare` are variable-width (one byte per element);
    /// `Unknown` has no width at all.
    pub fn size(self) -> usize {
        match self {
            ScalarType::UInt8 | ScalarType::Int8 => 1,
            ScalarType::UInt16 | ScalarType::Int16 => 2,
            ScalarType::UInt32 | ScalarType::Int32 => 4,
            ScalarType::Float32 => 4,
            ScalarType::Float64 => 8,
            ScalarType::Time => 12,
            ScalarType::Str | ScalarType::Spare => 1,
            ScalarType::Unknown => 0,
        }
    }

    /// Map a schema type token to a `ScalarType`.
    ///
    /// Unrecognized tokens yield [`ScalarType::Unknown`] rather than an error;
    /// the schema loader decides whether that is acceptable.
    pub fn from_schema_name(name: &str) -> ScalarType {
        match name {
            "UChar" => ScalarType::UInt8,
            "SChar" | "AChar" => ScalarType::Int8,
            "UShort" => ScalarType::UInt16,
            "SShort" => ScalarType::Int16,
            "ULong" => ScalarType::UInt32,
            "SLong" => ScalarType::Int32,
            "Float" => ScalarType::Float32,
            "Double" => ScalarType::Float64,
            "MJD" => ScalarType::Time,
            "String" => ScalarType::Str,
            "Spare" => ScalarType::Spare,
            _ => ScalarType::Unknown,
        }
    }

    /// True for the multi-byte numeric types that need endian conversion.
    pub fn needs_byte_swap(self) -> bool {
        self.size() > 1 && !matches!(self, ScalarType::Str | ScalarType::Spare)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalarType::UInt8 => "uint8",
            ScalarType::Int8 => "int8",
            ScalarType::UInt16 => "uint16",
            ScalarType::Int16 => "int16",
            ScalarType::UInt32 => "uint32",
            ScalarType::Int32 => "int32",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Time => "utc-time",
            ScalarType::Str => "string",
            ScalarType::Spare => "spare",
            ScalarType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Product timestamp: days since the MJD-2000 epoch plus an intra-day
/// seconds/microseconds pair, exactly as stored on disk.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct UtcTime {
    pub days: i32,
    pub seconds: u32,
    pub microseconds: u32,
}

impl UtcTime {
    /// Convert to a chrono UTC timestamp (epoch 2000-01-01T00:00:00Z).
    pub fn to_datetime(self) -> DateTime<Utc> {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        epoch
            + Duration::days(self.days as i64)
            + Duration::seconds(self.seconds as i64)
            + Duration::microseconds(self.microseconds as i64)
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%d-%b-%Y %H:%M:%S%.6f"))
    }
}
