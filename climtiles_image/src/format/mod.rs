//! Lossless image containers for encoded tiles.

mod png;
mod webp;

use anyhow::{Context, Result, bail};
use climtiles_core::{RasterFormat, TilingError};
use image::RgbaImage;
use std::{fs, path::Path};

/// Encodes `image` losslessly into `format`.
pub fn encode_lossless(image: &RgbaImage, format: RasterFormat) -> Result<Vec<u8>> {
	match format {
		RasterFormat::Webp => webp::image2bytes(image),
		RasterFormat::Png => png::image2bytes(image),
	}
}

pub fn decode(bytes: &[u8], format: RasterFormat) -> Result<RgbaImage> {
	match format {
		RasterFormat::Webp => webp::bytes2image(bytes),
		RasterFormat::Png => png::bytes2image(bytes),
	}
}

/// Reads a tile file, choosing the codec from its extension.
pub fn read_tile(path: &Path) -> Result<RgbaImage> {
	let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
		bail!("cannot tell the image format of {path:?}");
	};
	let format = RasterFormat::try_from_str(extension)?;
	let bytes = fs::read(path).with_context(|| format!("reading tile {path:?}"))?;
	decode(&bytes, format).with_context(|| format!("decoding tile {path:?}"))
}

/// Persists encoded tiles.
pub trait ImageWriter: Send + Sync {
	/// Stores `image` at `path` without loss, replacing an existing file.
	fn write_lossless(&self, image: &RgbaImage, path: &Path) -> Result<()>;

	fn format(&self) -> RasterFormat;
}

/// Writes tiles into the file system, creating parent directories as needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct LosslessFileWriter {
	format: RasterFormat,
}

impl LosslessFileWriter {
	pub fn new(format: RasterFormat) -> LosslessFileWriter {
		LosslessFileWriter { format }
	}
}

impl ImageWriter for LosslessFileWriter {
	fn write_lossless(&self, image: &RgbaImage, path: &Path) -> Result<()> {
		let bytes = encode_lossless(image, self.format)?;
		if let Some(dir) = path.parent() {
			fs::create_dir_all(dir)
				.with_context(|| format!("creating directory {dir:?}"))
				.context(TilingError::TileIo(format!("{path:?}")))?;
		}
		fs::write(path, &bytes)
			.with_context(|| format!("writing {path:?}"))
			.context(TilingError::TileIo(format!("{path:?}")))?;
		log::trace!("wrote {} bytes to {path:?}", bytes.len());
		Ok(())
	}

	fn format(&self) -> RasterFormat {
		self.format
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use assert_fs::TempDir;
	use image::Rgba;
	use rstest::rstest;

	pub fn gradient(width: u32, height: u32) -> RgbaImage {
		RgbaImage::from_fn(width, height, |x, y| {
			if (x + y) % 7 == 0 {
				Rgba([0, 0, 0, 0])
			} else {
				Rgba([(x * 5) as u8, (y * 3) as u8, ((x * y) % 256) as u8, 255])
			}
		})
	}

	#[rstest]
	#[case(RasterFormat::Webp)]
	#[case(RasterFormat::Png)]
	fn writer_round_trip(#[case] format: RasterFormat) -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join(format!("4/8/5.{}", format.extension()));
		let writer = LosslessFileWriter::new(format);
		let image = gradient(16, 16);

		writer.write_lossless(&image, &path)?;
		assert_eq!(read_tile(&path)?, image);

		// a second write replaces the tile
		let other = gradient(8, 8);
		writer.write_lossless(&other, &path)?;
		assert_eq!(read_tile(&path)?, other);
		Ok(())
	}

	#[test]
	fn unwritable_target_is_a_tile_io_error() -> Result<()> {
		let dir = TempDir::new()?;
		let blocker = dir.path().join("3");
		fs::write(&blocker, b"file in the way")?;
		let err = LosslessFileWriter::default()
			.write_lossless(&gradient(2, 2), &blocker.join("1/1.webp"))
			.unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::TileIo(_))));
		Ok(())
	}

	#[test]
	fn read_tile_needs_known_extension() {
		assert!(read_tile(Path::new("tile")).is_err());
		assert!(read_tile(Path::new("tile.jpg")).is_err());
	}
}
