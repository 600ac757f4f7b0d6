//! Web Mercator constants shared by the tile math.

use std::f64::consts::PI;

/// WGS84 semi-major axis (equatorial radius) in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the side length of the square Web Mercator world (EPSG:3857), in meters.
///
/// The projection covers `[-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT]` on both axes.
pub const WORLD_HALF_EXTENT: f64 = PI * EARTH_RADIUS;

/// Edge length in pixels of every tile unless configured otherwise.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Highest supported zoom level. `2^30` tiles per axis still fit into `u32` indices.
pub const MAX_ZOOM_LEVEL: u8 = 30;

/// Identifier of the world projection, as written into the tileset index.
pub const MERCATOR_CRS: &str = "EPSG:3857";

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn half_extent_matches_epsg_3857() {
		assert_eq!(WORLD_HALF_EXTENT, 20_037_508.342_789_244);
	}
}
