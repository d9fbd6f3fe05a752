//! Schema-driven binary record decoder.
//!
//! A [`RecordLayout`] is an ordered list of field templates with a declared
//! total size; [`decode_record`] walks a byte range of exactly that size and
//! materializes one typed [`Record`]. All multi-byte scalars are big-endian
//! on disk; strings and spare bytes are copied verbatim.
use crate::core::record::{Field, FieldData, FieldInfo, Record};
use crate::error::{Error, Result};
use crate::types::{ScalarType, UtcTime};

/// Fully resolved layout of one record type: every element count is a
/// concrete number. Immutable after construction; built and cached by the
/// schema table.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordLayout {
    pub record_type: String,
    pub fields: Vec<FieldInfo>,
    pub total_size: usize,
}

impl RecordLayout {
    pub fn new(record_type: impl Into<String>, fields: Vec<FieldInfo>) -> Self {
        let total_size = fields.iter().map(|f| f.total_size).sum();
        RecordLayout {
            record_type: record_type.into(),
            fields,
            total_size,
        }
    }
}

/// Decode one dataset record from `bytes` according to `layout`.
///
/// Fails with [`Error::SizeMismatch`] unless `bytes.len()` equals the
/// layout's declared total size. Element counts come only from the layout;
/// field values are never inspected to size anything.
pub fn decode_record(layout: &RecordLayout, bytes: &[u8]) -> Result<Record> {
    if bytes.len() != layout.total_size {
        return Err(Error::SizeMismatch {
            record_type: layout.record_type.clone(),
            expected: layout.total_size,
            actual: bytes.len(),
        });
    }

    let mut record = Record::new();
    let mut cursor = 0usize;
    for info in &layout.fields {
        let raw = &bytes[cursor..cursor + info.total_size];
        cursor += info.total_size;
        record.push(Field::new(info.clone(), decode_elements(info, raw)?));
    }
    Ok(record)
}

fn decode_elements(info: &FieldInfo, raw: &[u8]) -> Result<FieldData> {
    let n = info.element_count;
    let data = match info.scalar_type {
        ScalarType::UInt8 => FieldData::UInt8(raw.to_vec()),
        ScalarType::Int8 => FieldData::Int8(raw.iter().map(|&b| b as i8).collect()),
        ScalarType::UInt16 => FieldData::UInt16(
            raw.chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect(),
        ),
        ScalarType::Int16 => FieldData::Int16(
            raw.chunks_exact(2)
                .map(|c| i16::from_be_bytes([c[0], c[1]]))
                .collect(),
        ),
        ScalarType::UInt32 => FieldData::UInt32(
            raw.chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        ScalarType::Int32 => FieldData::Int32(
            raw.chunks_exact(4)
                .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        ScalarType::Float32 => FieldData::Float32(
            raw.chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        ScalarType::Float64 => FieldData::Float64(
            raw.chunks_exact(8)
                .map(|c| {
                    f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                })
                .collect(),
        ),
        ScalarType::Time => FieldData::Time(
            raw.chunks_exact(12)
                .map(|c| UtcTime {
                    days: i32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                    seconds: u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                    microseconds: u32::from_be_bytes([c[8], c[9], c[10], c[11]]),
                })
                .collect(),
        ),
        ScalarType::Str => FieldData::Str(raw.to_vec()),
        ScalarType::Spare => FieldData::Spare(raw.to_vec()),
        ScalarType::Unknown => {
            return Err(Error::lookup("scalar type for field", info.name.clone()));
        }
    };
    debug_assert_eq!(data.len(), n);
    Ok(data)
}
