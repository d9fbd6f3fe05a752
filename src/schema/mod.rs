//! Schema tables: record layouts, dataset bindings and band definitions.
//!
//! The product format itself carries no field descriptions; they come from a
//! schema, deserialized from JSON. A [`SchemaTable`] is owned by each open
//! product (no process-wide registry), resolves element-count parameters
//! against header fields, and caches instantiated [`RecordLayout`]s by
//! record-type name.
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::band::{BandDescriptor, FlagDef, Scaling};
use crate::core::decode::RecordLayout;
use crate::core::record::FieldInfo;
use crate::error::{Error, Result};
use crate::types::ScalarType;

/// Element count of a field: a literal, or a `$NAME` parameter resolved from
/// a header field at open time. Per-record variable-length layouts are the
/// schema's concern; the record decoder itself only ever sees literals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Literal(u32),
    Param(String),
}

impl Default for Count {
    fn default() -> Self {
        Count::Literal(1)
    }
}

/// Named integer parameters harvested from the MPH/SPH, used to resolve
/// `Count::Param` references.
pub type ParamTable = HashMap<String, u32>;

impl Count {
    fn resolve(&self, params: &ParamTable) -> Result<u32> {
        match self {
            Count::Literal(n) => Ok(*n),
            Count::Param(name) => {
                let key = name.strip_prefix('$').unwrap_or(name);
                params
                    .get(key)
                    .copied()
                    .ok_or_else(|| Error::lookup("count parameter", key))
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub count: Count,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetDef {
    pub name: String,
    pub record_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlagEntry {
    pub name: String,
    pub bit: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandDef {
    pub name: String,
    pub dataset: String,
    pub field: String,
    /// Raster element type (schema vocabulary). Defaults to `ULong` for
    /// flag bands and `Float` otherwise.
    #[serde(default)]
    pub sample_type: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
    /// Native sampling interval `[x, y]` in scene pixels for tie-point bands.
    #[serde(default)]
    pub sampling: Option<[u32; 2]>,
    #[serde(default)]
    pub flags: Vec<FlagEntry>,
}

/// How scene dimensions bind to product structures: width comes from an SPH
/// field, height from a dataset's record count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneDef {
    pub width_field: String,
    pub height_dataset: String,
}

/// One product family's complete schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductSchema {
    #[serde(default)]
    pub scene: Option<SceneDef>,
    pub records: Vec<RecordDef>,
    pub datasets: Vec<DatasetDef>,
    #[serde(default)]
    pub bands: Vec<BandDef>,
}

impl ProductSchema {
    pub fn from_json(text: &str) -> Result<Self> {
        let schema: ProductSchema = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reject unknown type tokens up front instead of at first decode.
    fn validate(&self) -> Result<()> {
        for record in &self.records {
            for field in &record.fields {
                if ScalarType::from_schema_name(&field.type_name) == ScalarType::Unknown {
                    return Err(Error::lookup(
                        "scalar type",
                        format!("{} (field `{}.{}`)", field.type_name, record.name, field.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Compact built-in schema for MERIS-RR-style Level-2 products, used when no
/// schema file is supplied.
pub const BUILTIN_SCHEMA_JSON: &str = include_str!("builtin.json");

/// Lookup surface over one [`ProductSchema`] with a layout cache.
#[derive(Debug)]
pub struct SchemaTable {
    schema: ProductSchema,
    layouts: HashMap<String, Arc<RecordLayout>>,
}

impl SchemaTable {
    pub fn new(schema: ProductSchema) -> Self {
        SchemaTable {
            schema,
            layouts: HashMap::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(SchemaTable::new(ProductSchema::from_json(text)?))
    }

    pub fn builtin() -> Result<Self> {
        SchemaTable::from_json(BUILTIN_SCHEMA_JSON)
    }

    pub fn scene(&self) -> Option<&SceneDef> {
        self.schema.scene.as_ref()
    }

    /// Record-type name bound to a dataset; a miss is a fatal configuration
    /// error for whatever operation needed it.
    pub fn lookup_dataset(&self, name: &str) -> Result<&DatasetDef> {
        self.schema
            .datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::lookup("dataset", name))
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.schema.datasets.iter().map(|d| d.name.as_str())
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.schema.bands.iter().map(|b| b.name.as_str())
    }

    /// Resolve a band definition to a concrete [`BandDescriptor`].
    pub fn lookup_band(&self, name: &str) -> Result<BandDescriptor> {
        let def = self
            .schema
            .bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::lookup("band", name))?;

        let sample_type = match &def.sample_type {
            Some(token) => {
                let t = ScalarType::from_schema_name(token);
                if t == ScalarType::Unknown {
                    return Err(Error::lookup("scalar type", token.clone()));
                }
                t
            }
            None if !def.flags.is_empty() => ScalarType::UInt32,
            None => ScalarType::Float32,
        };

        let scaling = match (def.scale, def.offset) {
            (None, None) => None,
            (scale, offset) => Some(Scaling {
                scale: scale.unwrap_or(1.0),
                offset: offset.unwrap_or(0.0),
            }),
        };

        let (sampling_x, sampling_y) = match def.sampling {
            Some([x, y]) => (x.max(1) as usize, y.max(1) as usize),
            None => (1, 1),
        };

        Ok(BandDescriptor {
            name: def.name.clone(),
            dataset: def.dataset.clone(),
            field: def.field.clone(),
            sample_type,
            scaling,
            flags: def
                .flags
                .iter()
                .map(|f| FlagDef {
                    name: f.name.clone(),
                    bit: f.bit,
                })
                .collect(),
            sampling_x,
            sampling_y,
        })
    }

    /// Instantiate (or fetch from cache) the layout of a record type,
    /// resolving count parameters against `params`.
    pub fn lookup_layout(
        &mut self,
        record_type: &str,
        params: &ParamTable,
    ) -> Result<Arc<RecordLayout>> {
        if let Some(layout) = self.layouts.get(record_type) {
            return Ok(Arc::clone(layout));
        }

        let def = self
            .schema
            .records
            .iter()
            .find(|r| r.name == record_type)
            .ok_or_else(|| Error::lookup("record type", record_type))?;

        let mut fields = Vec::with_capacity(def.fields.len());
        for fd in &def.fields {
            let scalar_type = ScalarType::from_schema_name(&fd.type_name);
            let count = fd.count.resolve(params)? as usize;
            fields.push(FieldInfo::new(
                fd.name.clone(),
                fd.unit.clone(),
                scalar_type,
                count,
            ));
        }
        let layout = Arc::new(RecordLayout::new(record_type, fields));
        debug!(
            record_type,
            total_size = layout.total_size,
            "instantiated record layout"
        );
        self.layouts.insert(record_type.to_string(), Arc::clone(&layout));
        Ok(layout)
    }
}
