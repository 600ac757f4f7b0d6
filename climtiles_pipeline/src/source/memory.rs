use super::{RasterSource, Reprojector};
use anyhow::{Result, bail, ensure};
use async_trait::async_trait;
use climtiles_core::{MercatorBBox, NoData, RasterWindow};
use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::Arc,
};

/// A north-up grid that already lives in Web Mercator.
///
/// Samples are bilinear interpolations at pixel centres. Output pixels whose centre lies
/// outside the grid, or whose interpolation touches a nodata cell, become NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryRaster {
	bbox: MercatorBBox,
	width: u32,
	height: u32,
	values: Vec<f32>,
	nodata: NoData,
}

impl MemoryRaster {
	pub fn new(bbox: MercatorBBox, width: u32, height: u32, values: Vec<f32>, nodata: NoData) -> Result<Self> {
		ensure!(width > 0 && height > 0, "raster must not be empty");
		ensure!(bbox.width() > 0.0 && bbox.height() > 0.0, "raster extent must not be empty: {bbox:?}");
		ensure!(
			values.len() == (width as usize) * (height as usize),
			"raster of {width}x{height} needs {} values, got {}",
			(width as usize) * (height as usize),
			values.len()
		);
		Ok(MemoryRaster {
			bbox,
			width,
			height,
			values,
			nodata,
		})
	}

	/// Fills the grid by evaluating `f(x, y)` at every cell centre, in meters.
	pub fn from_fn(bbox: MercatorBBox, width: u32, height: u32, f: impl Fn(f64, f64) -> f32) -> Result<Self> {
		let cell_w = bbox.width() / f64::from(width);
		let cell_h = bbox.height() / f64::from(height);
		let mut values = Vec::with_capacity((width as usize) * (height as usize));
		for row in 0..height {
			let y = bbox.y_max - (f64::from(row) + 0.5) * cell_h;
			for col in 0..width {
				values.push(f(bbox.x_min + (f64::from(col) + 0.5) * cell_w, y));
			}
		}
		MemoryRaster::new(bbox, width, height, values, NoData::None)
	}

	fn cell(&self, col: usize, row: usize) -> Option<f32> {
		let value = self.values[row * self.width as usize + col];
		(!self.nodata.is_nodata(value)).then_some(value)
	}

	/// Bilinear value at fractional grid position `(gx, gy)`, in cell units from the
	/// upper-left corner.
	fn interpolate(&self, gx: f64, gy: f64) -> Option<f32> {
		let (w, h) = (f64::from(self.width), f64::from(self.height));
		if !(0.0..=w).contains(&gx) || !(0.0..=h).contains(&gy) {
			return None;
		}
		// shift to cell-centre coordinates, replicating the edge cells
		let fx = (gx - 0.5).clamp(0.0, w - 1.0);
		let fy = (gy - 0.5).clamp(0.0, h - 1.0);
		let x0 = fx.floor() as usize;
		let y0 = fy.floor() as usize;
		let x1 = (x0 + 1).min(self.width as usize - 1);
		let y1 = (y0 + 1).min(self.height as usize - 1);
		let dx = fx - x0 as f64;
		let dy = fy - y0 as f64;

		let mut sum = 0.0;
		for (col, row, weight) in [
			(x0, y0, (1.0 - dx) * (1.0 - dy)),
			(x1, y0, dx * (1.0 - dy)),
			(x0, y1, (1.0 - dx) * dy),
			(x1, y1, dx * dy),
		] {
			if weight == 0.0 {
				continue;
			}
			sum += f64::from(self.cell(col, row)?) * weight;
		}
		Some(sum as f32)
	}
}

#[async_trait]
impl RasterSource for MemoryRaster {
	fn bounds(&self) -> MercatorBBox {
		self.bbox
	}

	async fn sample(&self, bbox: &MercatorBBox, width: u32, height: u32) -> Result<RasterWindow> {
		ensure!(width > 0 && height > 0, "cannot sample an empty window");
		let cell_w = self.bbox.width() / f64::from(self.width);
		let cell_h = self.bbox.height() / f64::from(self.height);
		let step_x = bbox.width() / f64::from(width);
		let step_y = bbox.height() / f64::from(height);

		let mut values = Vec::with_capacity((width as usize) * (height as usize));
		for row in 0..height {
			let y = bbox.y_max - (f64::from(row) + 0.5) * step_y;
			let gy = (self.bbox.y_max - y) / cell_h;
			for col in 0..width {
				let x = bbox.x_min + (f64::from(col) + 0.5) * step_x;
				let gx = (x - self.bbox.x_min) / cell_w;
				values.push(self.interpolate(gx, gy).unwrap_or(f32::NAN));
			}
		}
		RasterWindow::new(width, height, values, NoData::NaN)
	}
}

/// Serves registered in-memory rasters by input path.
#[derive(Clone, Debug, Default)]
pub struct MemoryReprojector {
	rasters: HashMap<PathBuf, Arc<MemoryRaster>>,
}

impl MemoryReprojector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, path: impl Into<PathBuf>, raster: MemoryRaster) -> &mut Self {
		self.rasters.insert(path.into(), Arc::new(raster));
		self
	}
}

#[async_trait]
impl Reprojector for MemoryReprojector {
	async fn reproject(&self, input: &Path) -> Result<Arc<dyn RasterSource>> {
		match self.rasters.get(input) {
			Some(raster) => Ok(raster.clone() as Arc<dyn RasterSource>),
			None => bail!("no raster registered for {input:?}"),
		}
	}
}
