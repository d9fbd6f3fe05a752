//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Maps every decode failure mode (malformed header text, unknown schema names,
//! record size mismatches, out-of-range accesses) to a semantic variant so callers
//! can decide whether to skip and continue or abort.
use thiserror::Error;

use crate::types::ScalarType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error in `{text}`: {reason}")]
    Syntax { text: String, reason: &'static str },

    #[error("unknown {kind}: `{name}`")]
    SchemaLookup { kind: &'static str, name: String },

    #[error("record `{record_type}` declares {expected} bytes, got {actual}")]
    SizeMismatch {
        record_type: String,
        expected: usize,
        actual: usize,
    },

    #[error("index {index} out of range (length {len})")]
    Bounds { index: usize, len: usize },

    #[error("pixel ({x},{y}) out of range for {width}x{height} raster")]
    PixelBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("field `{field}` holds {actual}, not {expected}")]
    TypeMismatch {
        field: String,
        expected: ScalarType,
        actual: ScalarType,
    },

    #[error("invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("schema definition error: {0}")]
    SchemaFormat(#[from] serde_json::Error),

    #[error("malformed product: {0}")]
    Product(String),
}

impl Error {
    pub(crate) fn syntax(text: impl Into<String>, reason: &'static str) -> Self {
        Error::Syntax {
            text: text.into(),
            reason,
        }
    }

    pub(crate) fn lookup(kind: &'static str, name: impl Into<String>) -> Self {
        Error::SchemaLookup {
            kind,
            name: name.into(),
        }
    }
}
