//! Product container reader: open/close lifecycle, MPH/SPH header decoding,
//! dataset-descriptor table, and on-demand record, band and bitmask reads.
//!
//! A [`Product`] owns its byte source, its parsed headers and its schema
//! table; two open products share no mutable state, so distinct instances
//! may be used from different threads.
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::band::{BandDescriptor, RecordSource, read_band};
use crate::core::bitmask::{BitmaskExpr, FlagProvider, parse_bitmask};
use crate::core::decode::decode_record;
use crate::core::header::parse_header_block;
use crate::core::raster::Raster;
use crate::core::record::Record;
use crate::error::{Error, Result};
use crate::schema::{ParamTable, SchemaTable};
use crate::types::ScalarType;

/// Fixed size of the ASCII main product header.
pub const MPH_SIZE: usize = 1247;

/// Random-access byte supplier behind a product. File-backed for real
/// products, buffer-backed for tests and in-memory use.
pub trait ByteSource {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;
    fn total_len(&self) -> u64;
}

struct FileSource {
    file: File,
    len: u64,
}

impl ByteSource for FileSource {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn total_len(&self) -> u64 {
        self.len
    }
}

struct BufferSource {
    data: Vec<u8>,
}

impl ByteSource for BufferSource {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start.checked_add(len).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => Ok(self.data[start..end].to_vec()),
            None => Err(Error::Product(format!(
                "read of {} bytes at offset {} past end ({})",
                len,
                offset,
                self.data.len()
            ))),
        }
    }

    fn total_len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Location metadata of one dataset segment, derived from a DSD entry.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetDescriptor {
    pub name: String,
    /// Record-type name the schema binds this dataset to.
    pub record_type: String,
    /// DS_TYPE marker character (M = measurement, A = annotation, ...).
    pub dsd_type: char,
    /// Absolute byte offset of the first record.
    pub offset: u64,
    /// Record stride in bytes (DSR_SIZE).
    pub stride: u64,
    pub record_count: u64,
}

/// An open product: byte source, decoded headers, dataset table and schema.
pub struct Product {
    source: Box<dyn ByteSource>,
    mph: Record,
    sph: Record,
    dsds: Vec<DatasetDescriptor>,
    schema: SchemaTable,
    params: ParamTable,
    tot_size: u64,
}

impl Product {
    /// Open a product file with the given schema table.
    pub fn open(path: impl AsRef<Path>, schema: SchemaTable) -> Result<Self> {
        let path = path.as_ref();
        info!("opening product {:?}", path);
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Product::from_source(Box::new(FileSource { file, len }), schema)
    }

    /// Open a product held entirely in memory.
    pub fn from_bytes(data: Vec<u8>, schema: SchemaTable) -> Result<Self> {
        Product::from_source(Box::new(BufferSource { data }), schema)
    }

    fn from_source(mut source: Box<dyn ByteSource>, schema: SchemaTable) -> Result<Self> {
        let mph_bytes = source.read_at(0, MPH_SIZE)?;
        let mph = parse_header_block(&String::from_utf8_lossy(&mph_bytes));

        let tot_size = header_u64(&mph, "TOT_SIZE")?;
        let sph_size = header_u64(&mph, "SPH_SIZE")?;
        let num_dsd = header_u64(&mph, "NUM_DSD")?;
        let dsd_size = header_u64(&mph, "DSD_SIZE")?;
        if tot_size > source.total_len() {
            return Err(Error::Product(format!(
                "declared size {} exceeds container size {}",
                tot_size,
                source.total_len()
            )));
        }
        if sph_size < num_dsd * dsd_size {
            return Err(Error::Product(format!(
                "SPH size {} too small for {} DSDs of {} bytes",
                sph_size, num_dsd, dsd_size
            )));
        }

        let sph_text_len = sph_size - num_dsd * dsd_size;
        let sph_bytes = source.read_at(MPH_SIZE as u64, sph_text_len as usize)?;
        let sph = parse_header_block(&String::from_utf8_lossy(&sph_bytes));
        debug!(
            mph_fields = mph.len(),
            sph_fields = sph.len(),
            num_dsd,
            "parsed product headers"
        );

        let dsd_base = MPH_SIZE as u64 + sph_text_len;
        let mut dsds = Vec::new();
        for i in 0..num_dsd {
            let block = source.read_at(dsd_base + i * dsd_size, dsd_size as usize)?;
            match parse_dsd(&schema, &String::from_utf8_lossy(&block), tot_size)? {
                Some(dsd) => dsds.push(dsd),
                None => debug!(index = i, "skipping spare DSD"),
            }
        }
        info!(
            datasets = dsds.len(),
            tot_size, "opened product with {} datasets", dsds.len()
        );

        let mut params = ParamTable::new();
        collect_params(&mph, &mut params);
        collect_params(&sph, &mut params);

        Ok(Product {
            source,
            mph,
            sph,
            dsds,
            schema,
            params,
            tot_size,
        })
    }

    /// The decoded main product header.
    pub fn mph(&self) -> &Record {
        &self.mph
    }

    /// The decoded specific product header.
    pub fn sph(&self) -> &Record {
        &self.sph
    }

    pub fn dataset_descriptors(&self) -> &[DatasetDescriptor] {
        &self.dsds
    }

    pub fn dataset(&self, name: &str) -> Result<&DatasetDescriptor> {
        self.dsds
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::lookup("dataset", name))
    }

    pub fn total_size(&self) -> u64 {
        self.tot_size
    }

    /// Scene width in pixels, from the SPH field the schema binds it to.
    pub fn scene_width(&self) -> Result<usize> {
        let scene = self
            .schema
            .scene()
            .ok_or_else(|| Error::lookup("scene binding", "width_field"))?;
        Ok(self.sph.required_field(&scene.width_field)?.as_u64(0)? as usize)
    }

    /// Scene height in pixels: the record count of the schema's height dataset.
    pub fn scene_height(&self) -> Result<usize> {
        let scene = self
            .schema
            .scene()
            .ok_or_else(|| Error::lookup("scene binding", "height_dataset"))?;
        Ok(self.dataset(&scene.height_dataset)?.record_count as usize)
    }

    pub fn band(&self, name: &str) -> Result<BandDescriptor> {
        self.schema.lookup_band(name)
    }

    pub fn band_names(&self) -> Vec<String> {
        self.schema.band_names().map(String::from).collect()
    }

    /// Allocate a raster matching the band's sample type.
    pub fn create_compatible_raster(
        &self,
        band_name: &str,
        source_width: usize,
        source_height: usize,
        step_x: usize,
        step_y: usize,
    ) -> Result<Raster> {
        let band = self.schema.lookup_band(band_name)?;
        Raster::new(band.sample_type, source_width, source_height, step_x, step_y)
    }

    /// Decode one dataset record.
    pub fn read_record(&mut self, dataset: &str, index: usize) -> Result<Record> {
        let dsd = self.dataset(dataset)?.clone();
        if index as u64 >= dsd.record_count {
            return Err(Error::Bounds {
                index,
                len: dsd.record_count as usize,
            });
        }
        let layout = self.schema.lookup_layout(&dsd.record_type, &self.params)?;
        let offset = dsd.offset + index as u64 * dsd.stride;
        let bytes = self.source.read_at(offset, dsd.stride as usize)?;
        decode_record(&layout, &bytes)
    }

    /// Fill `raster` with samples of a named band starting at scene position
    /// `(offset_x, offset_y)`.
    pub fn read_band_raster(
        &mut self,
        band_name: &str,
        offset_x: usize,
        offset_y: usize,
        raster: &mut Raster,
    ) -> Result<()> {
        let band = self.schema.lookup_band(band_name)?;
        read_band(self, &band, offset_x, offset_y, raster)
    }

    /// Evaluate a bitmask expression over the scene window covered by
    /// `raster`, writing 1 where it holds and 0 elsewhere.
    ///
    /// The expression is parsed once and each referenced flag band is read
    /// once; evaluation then runs per pixel. `raster` must be `uint8`.
    pub fn read_bitmask_raster(
        &mut self,
        expr_text: &str,
        offset_x: usize,
        offset_y: usize,
        raster: &mut Raster,
    ) -> Result<()> {
        if raster.scalar_type() != ScalarType::UInt8 {
            return Err(Error::InvalidArgument {
                arg: "bitmask raster type",
                value: raster.scalar_type().to_string(),
            });
        }
        let expr = parse_bitmask(expr_text)?;
        let provider = self.read_flag_rasters(&expr, offset_x, offset_y, raster)?;
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                let set = expr.evaluate(&provider, x, y)?;
                raster.set_f64(x, y, if set { 1.0 } else { 0.0 })?;
            }
        }
        Ok(())
    }

    fn read_flag_rasters(
        &mut self,
        expr: &BitmaskExpr,
        offset_x: usize,
        offset_y: usize,
        out: &Raster,
    ) -> Result<FlagRasterProvider> {
        let mut entries = HashMap::new();
        for band_name in expr.referenced_bands() {
            let mut band = self.schema.lookup_band(&band_name)?;
            if band.flags.is_empty() {
                return Err(Error::lookup("flag coding for band", band_name));
            }
            // Flag words must arrive bit-exact.
            band.scaling = None;
            let masks: HashMap<String, u64> = band
                .flags
                .iter()
                .map(|f| (f.name.clone(), 1u64 << f.bit))
                .collect();
            let mut flag_raster = Raster::new(
                ScalarType::UInt32,
                out.source_width(),
                out.source_height(),
                out.step_x(),
                out.step_y(),
            )?;
            read_band(self, &band, offset_x, offset_y, &mut flag_raster)?;
            entries.insert(band_name, (flag_raster, masks));
        }
        Ok(FlagRasterProvider { entries })
    }
}

impl RecordSource for Product {
    fn record(&mut self, dataset: &str, index: usize) -> Result<Record> {
        self.read_record(dataset, index)
    }

    fn record_count(&mut self, dataset: &str) -> Result<usize> {
        Ok(self.dataset(dataset)?.record_count as usize)
    }
}

/// Pre-read flag rasters plus per-band bit masks, backing bitmask evaluation.
struct FlagRasterProvider {
    entries: HashMap<String, (Raster, HashMap<String, u64>)>,
}

impl FlagProvider for FlagRasterProvider {
    fn flag_set(&self, band: &str, flag: &str, x: usize, y: usize) -> Result<bool> {
        let (raster, masks) = self
            .entries
            .get(band)
            .ok_or_else(|| Error::lookup("band", band))?;
        let mask = masks
            .get(flag)
            .ok_or_else(|| Error::lookup("flag", format!("{}.{}", band, flag)))?;
        Ok((raster.get_u32(x, y)? as u64) & mask != 0)
    }
}

fn header_u64(record: &Record, name: &str) -> Result<u64> {
    record.required_field(name)?.as_u64(0)
}

fn collect_params(record: &Record, params: &mut ParamTable) {
    for field in record.fields() {
        if field.info.element_count != 1 {
            continue;
        }
        let integral = matches!(
            field.scalar_type(),
            ScalarType::UInt8
                | ScalarType::Int8
                | ScalarType::UInt16
                | ScalarType::Int16
                | ScalarType::UInt32
                | ScalarType::Int32
        );
        if integral {
            if let Ok(v) = field.as_u64(0) {
                params.insert(field.name().to_string(), v as u32);
            }
        }
    }
}

/// Parse one DSD block. Spare descriptors (blank or missing DS_NAME) yield
/// `None`; anything with a name is validated against the container size.
fn parse_dsd(
    schema: &SchemaTable,
    text: &str,
    tot_size: u64,
) -> Result<Option<DatasetDescriptor>> {
    let rec = parse_header_block(text);
    let Some(name_field) = rec.field_by_name("DS_NAME") else {
        return Ok(None);
    };
    let name = name_field.str_value()?.trim().to_string();
    if name.is_empty() {
        return Ok(None);
    }

    let dsd_type = rec
        .field_by_name("DS_TYPE")
        .and_then(|f| f.uint8_at(0).ok())
        .map(|b| b as char)
        .unwrap_or('?');
    let offset = header_u64(&rec, "DS_OFFSET")?;
    let stride = header_u64(&rec, "DSR_SIZE")?;
    let record_count = header_u64(&rec, "NUM_DSR")?;

    let end = offset
        .checked_add(stride.checked_mul(record_count).unwrap_or(u64::MAX))
        .unwrap_or(u64::MAX);
    if end > tot_size {
        return Err(Error::Product(format!(
            "dataset `{}` extends to byte {} past declared size {}",
            name, end, tot_size
        )));
    }

    let record_type = match schema.lookup_dataset(&name) {
        Ok(def) => def.record_type.clone(),
        Err(_) => {
            warn!(dataset = name.as_str(), "dataset not in schema, keeping its own name as record type");
            name.clone()
        }
    };

    Ok(Some(DatasetDescriptor {
        name,
        record_type,
        dsd_type,
        offset,
        stride,
        record_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProductSchema;

    const TEST_SCHEMA: &str = r#"{
        "scene": { "width_field": "LINE_LENGTH", "height_dataset": "Radiance" },
        "records": [
            { "name": "Radiance_MDS", "fields": [
                { "name": "samples", "type": "UShort", "count": "$LINE_LENGTH" }
            ]},
            { "name": "Flags_MDS", "fields": [
                { "name": "l2_flags", "type": "ULong", "count": "$LINE_LENGTH" }
            ]}
        ],
        "datasets": [
            { "name": "Radiance", "record_type": "Radiance_MDS" },
            { "name": "Flags", "record_type": "Flags_MDS" }
        ],
        "bands": [
            { "name": "radiance_1", "dataset": "Radiance", "field": "samples",
              "sample_type": "Float", "scale": 0.5, "offset": 1.0 },
            { "name": "l2_flags", "dataset": "Flags", "field": "l2_flags",
              "sample_type": "ULong",
              "flags": [ { "name": "LAND", "bit": 0 }, { "name": "BRIGHT", "bit": 1 } ] }
        ]
    }"#;

    fn pad_block(mut text: String, size: usize) -> String {
        assert!(text.len() <= size, "block overflows {} bytes", size);
        while text.len() < size {
            text.push(' ');
        }
        text
    }

    fn dsd_block(name: &str, offset: u64, dsr_size: u64, num_dsr: u64, dsd_size: usize) -> String {
        let ds_size = dsr_size * num_dsr;
        let text = format!(
            "DS_NAME=\"{:<28}\"\nDS_TYPE=M\nFILENAME=\"{:<62}\"\nDS_OFFSET=+{:020}<bytes>\nDS_SIZE=+{:020}<bytes>\nNUM_DSR=+{:010}\nDSR_SIZE=+{:010}<bytes>\n",
            name, "", offset, ds_size, num_dsr, dsr_size
        );
        pad_block(text, dsd_size)
    }

    /// Build a minimal two-dataset product: 3x2 radiance samples and
    /// matching flag words.
    fn build_product() -> Vec<u8> {
        let width = 3u64;
        let height = 2u64;
        let dsd_size = 280u64;
        let sph_lines = format!("LINE_LENGTH=+{:010}<samples>\n", width);
        let sph_size = sph_lines.len() as u64 + 2 * dsd_size;

        let rad_stride = width * 2;
        let flag_stride = width * 4;
        let data_start = MPH_SIZE as u64 + sph_size;
        let rad_offset = data_start;
        let flag_offset = rad_offset + rad_stride * height;
        let tot_size = flag_offset + flag_stride * height;

        let mph_lines = format!(
            "PRODUCT=\"{:<62}\"\nTOT_SIZE=+{:021}<bytes>\nSPH_SIZE=+{:010}<bytes>\nNUM_DSD=+{:010}\nDSD_SIZE=+{:010}<bytes>\n",
            "MER_RR__2P_TEST", tot_size, sph_size, 2, dsd_size
        );

        let mut bytes = Vec::new();
        bytes.extend_from_slice(pad_block(mph_lines, MPH_SIZE).as_bytes());
        bytes.extend_from_slice(sph_lines.as_bytes());
        bytes.extend_from_slice(
            dsd_block("Radiance", rad_offset, rad_stride, height, dsd_size as usize).as_bytes(),
        );
        bytes.extend_from_slice(
            dsd_block("Flags", flag_offset, flag_stride, height, dsd_size as usize).as_bytes(),
        );
        // Radiance samples, big-endian u16: row-major 10,20,30 / 40,50,60
        for v in [10u16, 20, 30, 40, 50, 60] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        // Flag words: all four LAND/BRIGHT combinations plus two spares
        for v in [0b00u32, 0b01, 0b10, 0b11, 0, 0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(bytes.len() as u64, tot_size);
        bytes
    }

    fn open_test_product() -> Product {
        let schema = SchemaTable::new(ProductSchema::from_json(TEST_SCHEMA).unwrap());
        Product::from_bytes(build_product(), schema).unwrap()
    }

    #[test]
    fn open_parses_headers_and_dsds() {
        let product = open_test_product();
        assert_eq!(
            product
                .mph()
                .required_field("PRODUCT")
                .unwrap()
                .str_value()
                .unwrap()
                .trim(),
            "MER_RR__2P_TEST"
        );
        assert_eq!(product.scene_width().unwrap(), 3);
        assert_eq!(product.scene_height().unwrap(), 2);

        let dsd = product.dataset("Radiance").unwrap();
        assert_eq!(dsd.record_type, "Radiance_MDS");
        assert_eq!(dsd.dsd_type, 'M');
        assert_eq!(dsd.record_count, 2);
        assert_eq!(dsd.stride, 6);
        assert!(product.dataset("Missing").is_err());
    }

    #[test]
    fn read_record_decodes_and_bounds_checks() {
        let mut product = open_test_product();
        let rec = product.read_record("Radiance", 1).unwrap();
        let samples = rec.required_field("samples").unwrap();
        assert_eq!(samples.uint16_at(0).unwrap(), 40);
        assert_eq!(samples.uint16_at(2).unwrap(), 60);
        assert!(matches!(
            product.read_record("Radiance", 2),
            Err(Error::Bounds { .. })
        ));
    }

    #[test]
    fn band_raster_matches_scale_and_offset() {
        let mut product = open_test_product();
        let mut raster = product.create_compatible_raster("radiance_1", 3, 2, 1, 1).unwrap();
        product.read_band_raster("radiance_1", 0, 0, &mut raster).unwrap();
        let expected = [[10.0, 20.0, 30.0], [40.0, 50.0, 60.0]];
        for (y, row) in expected.iter().enumerate() {
            for (x, raw) in row.iter().enumerate() {
                assert_eq!(raster.get_f64(x, y).unwrap(), 0.5 * raw + 1.0);
            }
        }
    }

    #[test]
    fn bitmask_raster_land_and_not_bright() {
        let mut product = open_test_product();
        let mut mask = Raster::new(ScalarType::UInt8, 3, 2, 1, 1).unwrap();
        product
            .read_bitmask_raster("l2_flags.LAND and !l2_flags.BRIGHT", 0, 0, &mut mask)
            .unwrap();
        // Flag words row-major: 00 01 10 / 11 00 00; LAND is bit 0.
        assert_eq!(mask.get_u32(0, 0).unwrap(), 0);
        assert_eq!(mask.get_u32(1, 0).unwrap(), 1);
        assert_eq!(mask.get_u32(2, 0).unwrap(), 0);
        assert_eq!(mask.get_u32(0, 1).unwrap(), 0);
        assert_eq!(mask.get_u32(1, 1).unwrap(), 0);
    }

    #[test]
    fn bitmask_requires_uint8_raster() {
        let mut product = open_test_product();
        let mut raster = Raster::new(ScalarType::UInt16, 3, 2, 1, 1).unwrap();
        assert!(matches!(
            product.read_bitmask_raster("l2_flags.LAND", 0, 0, &mut raster),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn oversized_dataset_rejected_at_open() {
        let schema = SchemaTable::new(ProductSchema::from_json(TEST_SCHEMA).unwrap());
        let mut bytes = build_product();
        // Shrink the declared total so the Flags dataset spills past it.
        let text = String::from_utf8_lossy(&bytes[..MPH_SIZE]).into_owned();
        let patched = text.replacen("TOT_SIZE=+", "TOT_SIZE=-", 1);
        bytes[..MPH_SIZE].copy_from_slice(patched.as_bytes());
        assert!(Product::from_bytes(bytes, schema).is_err());
    }
}
