//! Generic record/field model shared by ASCII header blocks and binary
//! dataset records. A `Record` is an ordered, named sequence of `Field`s;
//! each `Field` owns a typed element buffer described by its `FieldInfo`.
use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{ScalarType, UtcTime};

/// Immutable description of one field: name, optional unit, element type,
/// element count and total on-disk size in bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub unit: Option<String>,
    pub scalar_type: ScalarType,
    pub element_count: usize,
    pub total_size: usize,
}

impl FieldInfo {
    pub fn new(
        name: impl Into<String>,
        unit: Option<String>,
        scalar_type: ScalarType,
        element_count: usize,
    ) -> Self {
        FieldInfo {
            name: name.into(),
            unit,
            scalar_type,
            element_count,
            total_size: element_count * scalar_type.size(),
        }
    }
}

/// Typed element storage, one variant per scalar type.
///
/// Keeping this a closed union means every consumer (pixel conversion,
/// header dumps, record decoding) matches exhaustively, so a new scalar
/// type cannot be added without revisiting each of them.
///
/// `Str` holds the on-disk bytes verbatim, one element per byte; products
/// do not promise UTF-8 text, so conversion happens at access time.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    UInt8(Vec<u8>),
    Int8(Vec<i8>),
    UInt16(Vec<u16>),
    Int16(Vec<i16>),
    UInt32(Vec<u32>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Time(Vec<UtcTime>),
    Str(Vec<u8>),
    Spare(Vec<u8>),
}

impl FieldData {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            FieldData::UInt8(_) => ScalarType::UInt8,
            FieldData::Int8(_) => ScalarType::Int8,
            FieldData::UInt16(_) => ScalarType::UInt16,
            FieldData::Int16(_) => ScalarType::Int16,
            FieldData::UInt32(_) => ScalarType::UInt32,
            FieldData::Int32(_) => ScalarType::Int32,
            FieldData::Float32(_) => ScalarType::Float32,
            FieldData::Float64(_) => ScalarType::Float64,
            FieldData::Time(_) => ScalarType::Time,
            FieldData::Str(_) => ScalarType::Str,
            FieldData::Spare(_) => ScalarType::Spare,
        }
    }

    /// Number of stored elements (characters for `Str`).
    pub fn len(&self) -> usize {
        match self {
            FieldData::UInt8(v) => v.len(),
            FieldData::Int8(v) => v.len(),
            FieldData::UInt16(v) => v.len(),
            FieldData::Int16(v) => v.len(),
            FieldData::UInt32(v) => v.len(),
            FieldData::Int32(v) => v.len(),
            FieldData::Float32(v) => v.len(),
            FieldData::Float64(v) => v.len(),
            FieldData::Time(v) => v.len(),
            FieldData::Str(s) => s.len(),
            FieldData::Spare(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decoded field: its description plus the owned element buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub info: FieldInfo,
    pub data: FieldData,
}

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty, $scalar:expr) => {
        pub fn $fn_name(&self, index: usize) -> Result<$ty> {
            match &self.data {
                FieldData::$variant(v) => {
                    v.get(index).copied().ok_or(Error::Bounds {
                        index,
                        len: v.len(),
                    })
                }
                other => Err(Error::TypeMismatch {
                    field: self.info.name.clone(),
                    expected: $scalar,
                    actual: other.scalar_type(),
                }),
            }
        }
    };
}

impl Field {
    pub fn new(info: FieldInfo, data: FieldData) -> Self {
        debug_assert_eq!(info.scalar_type, data.scalar_type());
        Field { info, data }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.info.unit.as_deref()
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.info.scalar_type
    }

    typed_getter!(uint8_at, UInt8, u8, ScalarType::UInt8);
    typed_getter!(int8_at, Int8, i8, ScalarType::Int8);
    typed_getter!(uint16_at, UInt16, u16, ScalarType::UInt16);
    typed_getter!(int16_at, Int16, i16, ScalarType::Int16);
    typed_getter!(uint32_at, UInt32, u32, ScalarType::UInt32);
    typed_getter!(int32_at, Int32, i32, ScalarType::Int32);
    typed_getter!(float32_at, Float32, f32, ScalarType::Float32);
    typed_getter!(float64_at, Float64, f64, ScalarType::Float64);
    typed_getter!(time_at, Time, UtcTime, ScalarType::Time);

    /// The text of a `Str` field. Non-UTF-8 bytes are replaced for display;
    /// use [`Field::str_bytes`] for the verbatim payload.
    pub fn str_value(&self) -> Result<Cow<'_, str>> {
        self.str_bytes().map(String::from_utf8_lossy)
    }

    /// The verbatim on-disk bytes of a `Str` field.
    pub fn str_bytes(&self) -> Result<&[u8]> {
        match &self.data {
            FieldData::Str(s) => Ok(s),
            other => Err(Error::TypeMismatch {
                field: self.info.name.clone(),
                expected: ScalarType::Str,
                actual: other.scalar_type(),
            }),
        }
    }

    /// Lossy numeric view of any numeric element, used by the raster engine
    /// and the header dumps.
    pub fn as_f64(&self, index: usize) -> Result<f64> {
        let bounds = |len: usize| Error::Bounds { index, len };
        match &self.data {
            FieldData::UInt8(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::Int8(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::UInt16(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::Int16(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::UInt32(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::Int32(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::Float32(v) => v.get(index).map(|&x| x as f64).ok_or(bounds(v.len())),
            FieldData::Float64(v) => v.get(index).copied().ok_or(bounds(v.len())),
            other => Err(Error::TypeMismatch {
                field: self.info.name.clone(),
                expected: ScalarType::Float64,
                actual: other.scalar_type(),
            }),
        }
    }

    /// Lossy unsigned view; signed negatives and floats are reinterpreted by
    /// integer truncation. Used for flag words and header counters.
    pub fn as_u64(&self, index: usize) -> Result<u64> {
        let bounds = |len: usize| Error::Bounds { index, len };
        match &self.data {
            FieldData::UInt8(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::Int8(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::UInt16(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::Int16(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::UInt32(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::Int32(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::Float32(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            FieldData::Float64(v) => v.get(index).map(|&x| x as u64).ok_or(bounds(v.len())),
            other => Err(Error::TypeMismatch {
                field: self.info.name.clone(),
                expected: ScalarType::UInt32,
                actual: other.scalar_type(),
            }),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.info.name)?;
        match &self.data {
            FieldData::Str(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s))?,
            FieldData::Spare(v) => write!(f, "<{} spare bytes>", v.len())?,
            data => {
                for i in 0..data.len() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match data {
                        FieldData::Time(v) => write!(f, "{}", v[i])?,
                        FieldData::Float32(v) => write!(f, "{}", v[i])?,
                        FieldData::Float64(v) => write!(f, "{}", v[i])?,
                        FieldData::Int8(v) => write!(f, "{}", v[i])?,
                        FieldData::Int16(v) => write!(f, "{}", v[i])?,
                        FieldData::Int32(v) => write!(f, "{}", v[i])?,
                        FieldData::UInt8(v) => write!(f, "{}", v[i])?,
                        FieldData::UInt16(v) => write!(f, "{}", v[i])?,
                        FieldData::UInt32(v) => write!(f, "{}", v[i])?,
                        FieldData::Str(_) | FieldData::Spare(_) => unreachable!(),
                    }
                }
            }
        }
        if let Some(unit) = &self.info.unit {
            write!(f, " <{}>", unit)?;
        }
        Ok(())
    }
}

/// Ordered collection of fields; order is declaration/decode order and field
/// names are unique within one record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_at(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(Error::Bounds {
            index,
            len: self.fields.len(),
        })
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.info.name == name)
    }

    /// Like [`Record::field_by_name`] but an absent field is a lookup error,
    /// for callers where the name comes from a schema.
    pub fn required_field(&self, name: &str) -> Result<&Field> {
        self.field_by_name(name)
            .ok_or_else(|| Error::lookup("field", name))
    }

    /// Sum of the declared sizes of all fields.
    pub fn total_size(&self) -> usize {
        self.fields.iter().map(|f| f.info.total_size).sum()
    }
}
