//! Turns a block of samples into an RGBA tile.
//!
//! Masked samples become `(0, 0, 0, 0)`. Every other sample is quantized and its bytes are
//! placed into the channels of the layout; unused channels stay 0 and alpha is 255.

use anyhow::{Result, ensure};
use climtiles_core::{Quantization, RasterWindow};
use image::{Rgba, RgbaImage};
use std::fmt;

/// An encoded tile and what happened while encoding it.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedTile {
	pub image: RgbaImage,
	/// Pixels whose value exceeded the representable range and was clamped.
	pub saturated: u64,
	/// Pixels written as fully transparent.
	pub masked: u64,
}

/// Encodes `values` (row-major, `width * height`) with `quantization`.
///
/// `valid` marks the samples that carry a value. NaN samples are masked even when marked valid.
pub fn encode_pixels(
	values: &[f32],
	valid: &[bool],
	width: u32,
	height: u32,
	quantization: &Quantization,
) -> Result<EncodedTile> {
	let len = (width as usize) * (height as usize);
	ensure!(
		values.len() == len,
		"expected {len} values for a {width}x{height} tile, got {}",
		values.len()
	);
	ensure!(
		valid.len() == len,
		"expected {len} mask entries for a {width}x{height} tile, got {}",
		valid.len()
	);

	let mut image = RgbaImage::new(width, height);
	let mut saturated = 0;
	let mut masked = 0;

	for ((pixel, value), is_valid) in image.pixels_mut().zip(values).zip(valid) {
		if !is_valid {
			masked += 1;
			continue;
		}
		match quantization.to_pixel(f64::from(*value)) {
			Some((rgba, clamped)) => {
				pixel.0 = rgba;
				if clamped {
					saturated += 1;
				}
			}
			None => masked += 1,
		}
	}

	Ok(EncodedTile {
		image,
		saturated,
		masked,
	})
}

/// Encodes a sampled window, masking samples that match its nodata sentinel.
pub fn encode_window(window: &RasterWindow, quantization: &Quantization) -> Result<EncodedTile> {
	encode_pixels(
		&window.values,
		&window.valid_mask(),
		window.width,
		window.height,
		quantization,
	)
}

/// Value stored in one pixel, `None` when the pixel is masked.
pub fn decode_pixel(pixel: &Rgba<u8>, quantization: &Quantization) -> Option<f64> {
	quantization.decode_pixel(pixel.0)
}

/// Summary of the values stored in an encoded tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileStats {
	pub pixels: u64,
	pub valid: u64,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub mean: Option<f64>,
}

impl TileStats {
	pub fn from_image(image: &RgbaImage, quantization: &Quantization) -> TileStats {
		let mut stats = TileStats::default();
		let mut sum = 0.0;
		for pixel in image.pixels() {
			stats.pixels += 1;
			let Some(value) = decode_pixel(pixel, quantization) else {
				continue;
			};
			stats.valid += 1;
			sum += value;
			stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
			stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
		}
		if stats.valid > 0 {
			stats.mean = Some(sum / stats.valid as f64);
		}
		stats
	}
}

impl fmt::Display for TileStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} of {} pixels valid", self.valid, self.pixels)?;
		if let (Some(min), Some(max), Some(mean)) = (self.min, self.max, self.mean) {
			write!(f, ", min {min}, max {max}, mean {mean:.4}")?;
		}
		Ok(())
	}
}
