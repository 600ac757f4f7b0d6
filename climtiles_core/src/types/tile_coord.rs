//! Three-dimensional tile coordinates in a Web Mercator pyramid
//!
//! [`TileCoord`] identifies one square tile by zoom level, column and row.
//! Rows grow southward from the top-left corner of the world.
//!
//! # Examples
//!
//! ```
//! use climtiles_core::{TileCoord, WORLD_HALF_EXTENT};
//!
//! let coord = TileCoord::new(1, 0, 0).unwrap();
//! let bbox = coord.to_mercator_bbox();
//! assert_eq!(bbox.x_min, -WORLD_HALF_EXTENT);
//! assert_eq!(bbox.y_max, WORLD_HALF_EXTENT);
//! ```

use super::{MAX_ZOOM_LEVEL, MercatorBBox, WORLD_HALF_EXTENT};
use anyhow::{Result, ensure};
use std::fmt::{self, Debug};

/// A tile coordinate with zoom level, x (column) and y (row) indices.
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	/// The zoom level of the tile.
	pub level: u8,
	/// The column, growing eastward.
	pub x: u32,
	/// The row, growing southward.
	pub y: u32,
}

impl TileCoord {
	/// Create a new `TileCoord` at the given zoom `level` and tile indices `x`, `y`.
	///
	/// # Errors
	/// Returns an error if `level` exceeds [`MAX_ZOOM_LEVEL`] or an index is outside `[0, 2^level - 1]`.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= MAX_ZOOM_LEVEL, "level ({level}) must be <= {MAX_ZOOM_LEVEL}");
		let max = tiles_per_axis(level);
		ensure!(x < max, "x ({x}) out of bounds for level {level}");
		ensure!(y < max, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// The Web Mercator extent of this tile.
	pub fn to_mercator_bbox(&self) -> MercatorBBox {
		tile_bounds(self.level, self.x, self.y)
	}

	/// Relative path `{z}/{x}/{y}.{extension}` of this tile inside a pyramid.
	///
	/// ```
	/// use climtiles_core::TileCoord;
	///
	/// let coord = TileCoord::new(3, 4, 5).unwrap();
	/// assert_eq!(coord.as_path("webp"), "3/4/5.webp");
	/// ```
	pub fn as_path(&self, extension: &str) -> String {
		format!("{}/{}/{}.{extension}", self.level, self.x, self.y)
	}

	/// Parses a `z/x/y` string, as used on the command line.
	pub fn parse_zxy(text: &str) -> Result<TileCoord> {
		let parts: Vec<&str> = text.trim().split('/').collect();
		ensure!(parts.len() == 3, "tile coordinate must look like z/x/y, got {text:?}");
		TileCoord::new(parts[0].parse()?, parts[1].parse()?, parts[2].parse()?)
	}
}

/// Number of tiles along one axis at `level`.
pub fn tiles_per_axis(level: u8) -> u32 {
	1u32 << level
}

/// Side length in meters of one tile at `level`.
pub fn tile_size_meters(level: u8) -> f64 {
	WORLD_HALF_EXTENT * 2.0 / f64::from(tiles_per_axis(level))
}

/// Web Mercator extent of the tile `(level, x, y)`.
///
/// Edges are computed from the tile index directly, so adjacent tiles share bit-identical
/// boundaries and the tiles of one level partition the world without gaps.
pub fn tile_bounds(level: u8, x: u32, y: u32) -> MercatorBBox {
	let size = tile_size_meters(level);
	MercatorBBox {
		x_min: f64::from(x) * size - WORLD_HALF_EXTENT,
		y_min: WORLD_HALF_EXTENT - f64::from(y + 1) * size,
		x_max: f64::from(x + 1) * size - WORLD_HALF_EXTENT,
		y_max: WORLD_HALF_EXTENT - f64::from(y) * size,
	}
}

/// Custom `Debug` format as `TileCoord(z, [x, y])` for readability.
impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

impl fmt::Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn new_and_getters() {
		let coord = TileCoord::new(5, 3, 4).unwrap();
		assert_eq!(coord.x, 3);
		assert_eq!(coord.y, 4);
		assert_eq!(coord.level, 5);
	}

	#[rstest]
	#[case(31, 0, 0)]
	#[case(2, 4, 0)]
	#[case(2, 0, 4)]
	#[case(0, 1, 0)]
	fn new_out_of_bounds(#[case] level: u8, #[case] x: u32, #[case] y: u32) {
		assert!(TileCoord::new(level, x, y).is_err());
	}

	#[test]
	fn level_zero_is_the_world() {
		let bbox = TileCoord::new(0, 0, 0).unwrap().to_mercator_bbox();
		assert_eq!(bbox, MercatorBBox::world());
	}

	#[test]
	fn bounds_of_level_one_quadrants() {
		let h = WORLD_HALF_EXTENT;
		assert_eq!(tile_bounds(1, 0, 0).as_array(), [-h, 0.0, 0.0, h]);
		assert_eq!(tile_bounds(1, 1, 0).as_array(), [0.0, 0.0, h, h]);
		assert_eq!(tile_bounds(1, 0, 1).as_array(), [-h, -h, 0.0, 0.0]);
		assert_eq!(tile_bounds(1, 1, 1).as_array(), [0.0, -h, h, 0.0]);
	}

	#[rstest]
	#[case(0)]
	#[case(1)]
	#[case(3)]
	#[case(7)]
	#[case(12)]
	fn tiles_partition_the_world(#[case] level: u8) {
		let n = tiles_per_axis(level);
		let size = tile_size_meters(level);
		// sample columns and rows including both ends
		let mut indices: Vec<u32> = (0..n).step_by((n as usize / 16).max(1)).collect();
		indices.push(n - 1);
		for &i in &indices {
			let b = tile_bounds(level, i, i);
			assert!((b.width() - size).abs() < 1e-6);
			assert!((b.height() - size).abs() < 1e-6);
			if i + 1 < n {
				let right = tile_bounds(level, i + 1, i);
				let below = tile_bounds(level, i, i + 1);
				assert_eq!(b.x_max, right.x_min, "gap between columns {i} and {}", i + 1);
				assert_eq!(b.y_min, below.y_max, "gap between rows {i} and {}", i + 1);
			}
		}
		assert_eq!(tile_bounds(level, 0, 0).x_min, -WORLD_HALF_EXTENT);
		assert_eq!(tile_bounds(level, 0, 0).y_max, WORLD_HALF_EXTENT);
		assert_eq!(tile_bounds(level, n - 1, n - 1).x_max, WORLD_HALF_EXTENT);
		assert_eq!(tile_bounds(level, n - 1, n - 1).y_min, -WORLD_HALF_EXTENT);
	}

	#[test]
	fn as_path_and_display() {
		let coord = TileCoord::new(4, 7, 8).unwrap();
		assert_eq!(coord.as_path("png"), "4/7/8.png");
		assert_eq!(coord.to_string(), "4/7/8");
		assert_eq!(format!("{coord:?}"), "TileCoord(4, [7, 8])");
	}

	#[rstest]
	#[case("3/2/1", Some((3, 2, 1)))]
	#[case(" 0/0/0 ", Some((0, 0, 0)))]
	#[case("3/8/1", None)]
	#[case("3/2", None)]
	#[case("a/b/c", None)]
	fn parse_zxy(#[case] text: &str, #[case] expected: Option<(u8, u32, u32)>) {
		let parsed = TileCoord::parse_zxy(text).ok().map(|c| (c.level, c.x, c.y));
		assert_eq!(parsed, expected);
	}
}
