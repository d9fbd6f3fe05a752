use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use eopr::api::{open_product, read_full_band, read_full_bitmask};
use eopr::io::swap_bytes_in_place;

use super::args::{CliArgs, Command};
use super::errors::AppError;

fn dump_header(input: &Path, schema: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let product = open_product(input, schema)?;
    println!("MPH ({} fields)", product.mph().len());
    for field in product.mph().fields() {
        println!("  {}", field);
    }
    println!("SPH ({} fields)", product.sph().len());
    for field in product.sph().fields() {
        println!("  {}", field);
    }
    println!("Datasets");
    for dsd in product.dataset_descriptors() {
        println!(
            "  {} type={} records={} stride={} offset={}",
            dsd.name, dsd.dsd_type, dsd.record_count, dsd.stride, dsd.offset
        );
    }
    Ok(())
}

fn export_band(
    input: &Path,
    band: &str,
    output: &Path,
    schema: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut product = open_product(input, schema)?;
    info!("reading band '{band}'");
    let raster = read_full_band(&mut product, band)?;
    write_raw(output, &raster.to_raw_bytes())?;
    println!(
        "Raw image data written to {:?}: {} x {} pixels, type {}.",
        output,
        raster.width(),
        raster.height(),
        raster.scalar_type()
    );
    Ok(())
}

fn export_bitmask(
    input: &Path,
    expression: &str,
    output: &Path,
    schema: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut product = open_product(input, schema)?;
    info!("evaluating bitmask '{expression}'");
    let raster = read_full_bitmask(&mut product, expression)?;
    write_raw(output, &raster.to_raw_bytes())?;
    println!(
        "Raw mask data written to {:?}: {} x {} pixels, type byte.",
        output,
        raster.width(),
        raster.height()
    );
    Ok(())
}

fn write_raw(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let mut out = fs::File::create(path)?;
    out.write_all(bytes)?;
    Ok(())
}

fn swap_endian(width: usize, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    if !matches!(width, 2 | 4 | 8) {
        return Err(AppError::InvalidWidth { width }.into());
    }
    for path in files {
        let mut bytes = fs::read(path)?;
        if bytes.len() % width != 0 {
            return Err(AppError::UnalignedFile {
                path: path.display().to_string(),
                size: bytes.len() as u64,
                width,
            }
            .into());
        }
        swap_bytes_in_place(&mut bytes, width)?;
        fs::write(path, &bytes)?;
        info!("swapped {:?} ({} bytes, width {})", path, bytes.len(), width);
    }
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let schema = args.schema.as_deref();
    match &args.command {
        Command::Header { input } => dump_header(input, schema),
        Command::Band {
            input,
            band,
            output,
        } => export_band(input, band, output, schema),
        Command::Bitmask {
            input,
            expression,
            output,
        } => export_bitmask(input, expression, output, schema),
        Command::SwapEndian { width, files } => swap_endian(*width, files),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_endian_rewrites_files_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.raw");
        fs::write(&path, [1u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        swap_endian(4, &[path.clone()]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![4, 3, 2, 1, 8, 7, 6, 5]);

        swap_endian(4, &[path.clone()]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn swap_endian_rejects_bad_width_and_unaligned_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.raw");
        fs::write(&path, [0u8; 6]).unwrap();

        assert!(swap_endian(3, &[path.clone()]).is_err());
        assert!(swap_endian(4, &[path]).is_err());
    }
}
