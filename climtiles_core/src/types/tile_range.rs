//! Inclusive ranges of tile indices covering a Web Mercator box at one zoom level.
//!
//! The lower bound of each axis is floored and the upper bound is `ceil - 1`, so a box
//! that ends exactly on a tile edge does not pull in the neighbouring tile. Both axes are
//! clamped to `[0, 2^level - 1]`.
//!
//! ```
//! use climtiles_core::{MercatorBBox, TileRange};
//!
//! let range = TileRange::for_bbox(2, &MercatorBBox::world()).unwrap();
//! assert_eq!(range.as_tuple(), (0, 3, 0, 3));
//! assert_eq!(range.count(), 16);
//! ```

use super::{MAX_ZOOM_LEVEL, MercatorBBox, TileCoord, WORLD_HALF_EXTENT, tile_size_meters, tiles_per_axis};
use anyhow::{Result, ensure};
use std::fmt::{self, Debug};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
	pub level: u8,
	pub x_min: u32,
	pub x_max: u32,
	pub y_min: u32,
	pub y_max: u32,
}

impl TileRange {
	/// Range of tiles at `level` overlapping `bbox`.
	pub fn for_bbox(level: u8, bbox: &MercatorBBox) -> Result<TileRange> {
		ensure!(level <= MAX_ZOOM_LEVEL, "level ({level}) must be <= {MAX_ZOOM_LEVEL}");
		let size = tile_size_meters(level);
		let max = i64::from(tiles_per_axis(level)) - 1;

		let x0 = (bbox.x_min + WORLD_HALF_EXTENT) / size;
		let x1 = (bbox.x_max + WORLD_HALF_EXTENT) / size;
		let y0 = (WORLD_HALF_EXTENT - bbox.y_max) / size;
		let y1 = (WORLD_HALF_EXTENT - bbox.y_min) / size;

		let clamp = |v: f64| -> u32 { (v as i64).clamp(0, max) as u32 };

		Ok(TileRange {
			level,
			x_min: clamp(x0.floor()),
			x_max: clamp(x1.ceil() - 1.0),
			y_min: clamp(y0.floor()),
			y_max: clamp(y1.ceil() - 1.0),
		})
	}

	/// `(x_min, x_max, y_min, y_max)`
	pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
		(self.x_min, self.x_max, self.y_min, self.y_max)
	}

	pub fn is_empty(&self) -> bool {
		self.x_max < self.x_min || self.y_max < self.y_min
	}

	/// Number of tiles in the range.
	pub fn count(&self) -> u64 {
		if self.is_empty() {
			return 0;
		}
		u64::from(self.x_max - self.x_min + 1) * u64::from(self.y_max - self.y_min + 1)
	}

	/// Iterates column by column, each column from north to south.
	pub fn iter_coords(&self) -> impl Iterator<Item = TileCoord> + Send + use<> {
		let TileRange {
			level,
			x_min,
			x_max,
			y_min,
			y_max,
		} = *self;
		(x_min..=x_max).flat_map(move |x| (y_min..=y_max).map(move |y| TileCoord { level, x, y }))
	}
}

/// Inclusive `(x_min, x_max, y_min, y_max)` tile indices overlapping `bbox` at `level`.
pub fn tile_range_for_bounds(level: u8, bbox: &MercatorBBox) -> Result<(u32, u32, u32, u32)> {
	Ok(TileRange::for_bbox(level, bbox)?.as_tuple())
}

/// Tiles at `level` covering a whole source raster, given its extent.
pub fn dataset_tile_range(source_bounds: &MercatorBBox, level: u8) -> Result<TileRange> {
	TileRange::for_bbox(level, source_bounds)
}

impl Debug for TileRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}: [{}..={}, {}..={}] ({} tiles)",
			self.level,
			self.x_min,
			self.x_max,
			self.y_min,
			self.y_max,
			self.count()
		)
	}
}
