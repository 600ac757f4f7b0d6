use anyhow::{Result, anyhow};
use image::{
	ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage,
	codecs::png::{CompressionType, FilterType, PngEncoder},
	load_from_memory_with_format,
};

pub fn image2bytes(image: &RgbaImage) -> Result<Vec<u8>> {
	let mut buffer: Vec<u8> = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive).write_image(
		image.as_raw(),
		image.width(),
		image.height(),
		ExtendedColorType::Rgba8,
	)?;
	Ok(buffer)
}

pub fn bytes2image(bytes: &[u8]) -> Result<RgbaImage> {
	Ok(load_from_memory_with_format(bytes, ImageFormat::Png)
		.map_err(|e| anyhow!("failed to decode PNG image: {e}"))?
		.to_rgba8())
}
