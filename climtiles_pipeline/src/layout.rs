//! Where a build puts its files.
//!
//! ```text
//! {output}/{identifier?}/index.json
//! {output}/{identifier?}/{series?}/{z}/{x}/{y}.{ext}
//! ```
//!
//! The series folder exists only when the build has a series axis value. Its name is the value
//! with the decimal point replaced by a dash, so `2.7` becomes `2-7` and `2.0` becomes `2-0`.
//! Very large and very small values keep the exponent form of Python's `repr(float)`, so `1e16`
//! becomes `1e+16` and `1e-7` becomes `1e-07`.

use climtiles_core::{RasterFormat, TileCoord};
use std::path::{Path, PathBuf};

pub const INDEX_FILE_NAME: &str = "index.json";
pub const RAW_TILE_EXTENSION: &str = "f32";

#[derive(Clone, Debug, PartialEq)]
pub struct TilesetLayout {
	tileset_dir: PathBuf,
	series_dir: Option<String>,
	format: RasterFormat,
}

/// Folder name of a series, e.g. `1.5 -> "1-5"`.
pub fn series_dir_name(value: f64) -> String {
	format_axis_value(value).replace('.', "-")
}

/// Shortest round-trip decimal form, scientific below `1e-4` and from `1e16` on, with a signed
/// exponent of at least two digits.
fn format_axis_value(value: f64) -> String {
	let magnitude = value.abs();
	let use_exponent = magnitude != 0.0 && (magnitude < 1e-4 || magnitude >= 1e16);
	if !use_exponent {
		return format!("{value:?}");
	}
	let scientific = format!("{value:e}");
	match scientific.split_once('e') {
		Some((mantissa, exponent)) => {
			let (sign, digits) = match exponent.strip_prefix('-') {
				Some(digits) => ('-', digits),
				None => ('+', exponent),
			};
			format!("{mantissa}e{sign}{digits:0>2}")
		}
		None => scientific,
	}
}

impl TilesetLayout {
	pub fn new(output: &Path, identifier: Option<&str>, series_axis_value: Option<f64>, format: RasterFormat) -> Self {
		let tileset_dir = match identifier {
			Some(id) => output.join(id),
			None => output.to_path_buf(),
		};
		TilesetLayout {
			tileset_dir,
			series_dir: series_axis_value.map(series_dir_name),
			format,
		}
	}

	pub fn tileset_dir(&self) -> &Path {
		&self.tileset_dir
	}

	/// Folder holding the zoom level folders of this series.
	pub fn tiles_dir(&self) -> PathBuf {
		match &self.series_dir {
			Some(series) => self.tileset_dir.join(series),
			None => self.tileset_dir.clone(),
		}
	}

	pub fn index_path(&self) -> PathBuf {
		self.tileset_dir.join(INDEX_FILE_NAME)
	}

	pub fn tile_path(&self, coord: &TileCoord) -> PathBuf {
		self.tiles_dir().join(coord.as_path(self.format.extension()))
	}

	pub fn raw_tile_path(&self, coord: &TileCoord) -> PathBuf {
		self.tiles_dir().join(coord.as_path(RAW_TILE_EXTENSION))
	}

	/// `tileUrlPattern` of the series entry, relative to the index file.
	pub fn tile_url_pattern(&self) -> String {
		let pattern = format!("{{z}}/{{x}}/{{y}}.{}", self.format.extension());
		match &self.series_dir {
			Some(series) => format!("{series}/{pattern}"),
			None => pattern,
		}
	}
}
