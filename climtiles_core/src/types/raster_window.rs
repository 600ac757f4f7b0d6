//! Sampled float windows, one per tile.

use crate::NoData;
use anyhow::{Result, ensure};

/// A row-major block of samples taken from a source raster over one tile window.
///
/// Row 0 is the northern edge. `nodata` tells which samples carry no value.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterWindow {
	pub width: u32,
	pub height: u32,
	pub values: Vec<f32>,
	pub nodata: NoData,
}

impl RasterWindow {
	pub fn new(width: u32, height: u32, values: Vec<f32>, nodata: NoData) -> Result<RasterWindow> {
		ensure!(width > 0 && height > 0, "raster window must not be empty ({width}x{height})");
		ensure!(
			values.len() == (width as usize) * (height as usize),
			"raster window of {width}x{height} needs {} values, got {}",
			(width as usize) * (height as usize),
			values.len()
		);
		Ok(RasterWindow {
			width,
			height,
			values,
			nodata,
		})
	}

	pub fn get(&self, x: u32, y: u32) -> Option<f32> {
		if x >= self.width || y >= self.height {
			return None;
		}
		self.values.get((y as usize) * (self.width as usize) + (x as usize)).copied()
	}

	/// `true` for every sample that carries a value.
	pub fn valid_mask(&self) -> Vec<bool> {
		self.values.iter().map(|v| !self.nodata.is_nodata(*v)).collect()
	}

	pub fn count_valid(&self) -> usize {
		self.values.iter().filter(|v| !self.nodata.is_nodata(**v)).count()
	}
}
