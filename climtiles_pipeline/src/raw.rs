//! Raw tiles: the sampled float window of a tile, kept for diagnosis.
//!
//! The file is a plain little-endian `f32` dump in row-major order, `width * height` values.

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use climtiles_core::{NoData, RasterWindow, TilingError};
use std::{
	fs::{self, File},
	io::{BufReader, BufWriter, Write},
	path::Path,
};

pub fn write_raw_tile(path: &Path, window: &RasterWindow) -> Result<()> {
	write_values(path, &window.values)
		.with_context(|| format!("writing raw tile {path:?}"))
		.context(TilingError::TileIo(format!("{path:?}")))
}

fn write_values(path: &Path, values: &[f32]) -> Result<()> {
	if let Some(dir) = path.parent() {
		fs::create_dir_all(dir)?;
	}
	let mut writer = BufWriter::new(File::create(path)?);
	for value in values {
		writer.write_f32::<LittleEndian>(*value)?;
	}
	writer.flush()?;
	Ok(())
}

/// Reads a raw tile of known size. Missing samples are NaN.
pub fn read_raw_tile(path: &Path, width: u32, height: u32) -> Result<RasterWindow> {
	let expected = u64::from(width) * u64::from(height) * 4;
	let len = fs::metadata(path).with_context(|| format!("reading raw tile {path:?}"))?.len();
	ensure!(
		len == expected,
		"raw tile {path:?} has {len} bytes, expected {expected} for {width}x{height}"
	);
	let mut reader = BufReader::new(File::open(path)?);
	let mut values = vec![0f32; (width as usize) * (height as usize)];
	reader.read_f32_into::<LittleEndian>(&mut values)?;
	RasterWindow::new(width, height, values, NoData::NaN)
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::TempDir;

	#[test]
	fn write_then_read() -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join("2/1/3.f32");
		let window = RasterWindow::new(2, 2, vec![1.5, f32::NAN, -3.0, 1e6], NoData::NaN)?;
		write_raw_tile(&path, &window)?;

		let bytes = fs::read(&path)?;
		assert_eq!(bytes.len(), 16);
		assert_eq!(&bytes[0..4], &1.5f32.to_le_bytes());

		let read = read_raw_tile(&path, 2, 2)?;
		assert_eq!(read.values[0], 1.5);
		assert!(read.values[1].is_nan());
		assert_eq!(read.values[3], 1e6);
		Ok(())
	}

	#[test]
	fn wrong_size_is_rejected() -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join("tile.f32");
		write_raw_tile(&path, &RasterWindow::new(3, 1, vec![0.0; 3], NoData::None)?)?;
		assert!(read_raw_tile(&path, 2, 2).is_err());
		Ok(())
	}
}
