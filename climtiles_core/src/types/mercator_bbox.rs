//! Axis-aligned boxes in Web Mercator meters and the conversion from longitude/latitude.

use super::{EARTH_RADIUS, WORLD_HALF_EXTENT};
use anyhow::{Result, ensure};
use std::{f64::consts::PI, fmt::Debug};

/// Latitude at which the square Web Mercator world ends.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects a WGS84 longitude and latitude in degrees to Web Mercator meters.
///
/// Latitudes are clamped to [`MAX_MERCATOR_LATITUDE`].
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
	let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
	let x = lon.to_radians() * EARTH_RADIUS;
	let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
	(x, y)
}

/// A rectangle in Web Mercator (EPSG:3857) meters.
///
/// The bounding box is defined by four `f64` values:
/// - `x_min` (west)
/// - `y_min` (south)
/// - `x_max` (east)
/// - `y_max` (north)
///
/// Boxes are not required to lie inside the world extent; tile range computations
/// clamp to valid tile indices instead.
///
/// # Examples
/// ```
/// use climtiles_core::MercatorBBox;
///
/// let bbox = MercatorBBox::new(-1000.0, -500.0, 1000.0, 500.0).unwrap();
/// assert_eq!(bbox.as_array(), [-1000.0, -500.0, 1000.0, 500.0]);
/// assert_eq!(bbox.width(), 2000.0);
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct MercatorBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl MercatorBBox {
	/// Creates a new box from `west, south, east, north`.
	///
	/// # Errors
	/// Returns an error if a coordinate is not finite or a minimum exceeds its maximum.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<MercatorBBox> {
		MercatorBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
		.checked()
	}

	/// Builds a box from two arbitrary corners, ordering the coordinates.
	pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<MercatorBBox> {
		MercatorBBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
	}

	/// Projects a geographic box in degrees, clamping it to the Web Mercator world.
	pub fn from_lon_lat(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Result<MercatorBBox> {
		let (x0, y0) = lon_lat_to_mercator(lon_min, lat_min);
		let (x1, y1) = lon_lat_to_mercator(lon_max, lat_max);
		let clamp = |v: f64| v.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT);
		MercatorBBox::from_corners(clamp(x0), clamp(y0), clamp(x1), clamp(y1))
	}

	/// The whole Web Mercator world.
	pub fn world() -> MercatorBBox {
		MercatorBBox {
			x_min: -WORLD_HALF_EXTENT,
			y_min: -WORLD_HALF_EXTENT,
			x_max: WORLD_HALF_EXTENT,
			y_max: WORLD_HALF_EXTENT,
		}
	}

	pub fn width(&self) -> f64 {
		self.x_max - self.x_min
	}

	pub fn height(&self) -> f64 {
		self.y_max - self.y_min
	}

	/// `[x_min, y_min, x_max, y_max]`, the order used in the tileset index.
	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	fn checked(self) -> Result<Self> {
		ensure!(
			self.as_array().iter().all(|v| v.is_finite()),
			"bbox coordinates must be finite: {self:?}"
		);
		ensure!(self.x_min <= self.x_max, "x_min ({}) must be <= x_max ({})", self.x_min, self.x_max);
		ensure!(self.y_min <= self.y_max, "y_min ({}) must be <= y_max ({})", self.y_min, self.y_max);
		Ok(self)
	}
}

impl Debug for MercatorBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"MercatorBBox([{}, {}, {}, {}])",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

impl TryFrom<[f64; 4]> for MercatorBBox {
	type Error = anyhow::Error;

	fn try_from(input: [f64; 4]) -> Result<Self> {
		MercatorBBox::new(input[0], input[1], input[2], input[3])
	}
}

impl TryFrom<&[f64]> for MercatorBBox {
	type Error = anyhow::Error;

	fn try_from(input: &[f64]) -> Result<Self> {
		ensure!(input.len() == 4, "bbox must have 4 elements, got {}", input.len());
		MercatorBBox::new(input[0], input[1], input[2], input[3])
	}
}
