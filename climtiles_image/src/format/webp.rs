use anyhow::{Result, anyhow};
use image::{ExtendedColorType, ImageFormat, RgbaImage, codecs::webp::WebPEncoder, load_from_memory_with_format};

/// Lossless WebP, the default container of climate tiles.
pub fn image2bytes(image: &RgbaImage) -> Result<Vec<u8>> {
	let mut result: Vec<u8> = vec![];
	WebPEncoder::new_lossless(&mut result).encode(
		image.as_raw(),
		image.width(),
		image.height(),
		ExtendedColorType::Rgba8,
	)?;
	Ok(result)
}

pub fn bytes2image(bytes: &[u8]) -> Result<RgbaImage> {
	Ok(load_from_memory_with_format(bytes, ImageFormat::WebP)
		.map_err(|e| anyhow!("failed to decode WebP image: {e}"))?
		.to_rgba8())
}
