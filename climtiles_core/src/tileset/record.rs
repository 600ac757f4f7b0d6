//! The `index.json` record describing one spatial tileset and its series.

use crate::{ChannelLayout, MERCATOR_CRS, MercatorBBox, Quantization, RasterFormat, TilingError, ZoomRange};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// How pixel bytes map back to values. `value = int * polynomialSlope + polynomialOffset`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterEncoding {
	pub channels: ChannelLayout,
	pub vector_dimension: u32,
	pub polynomial_slope: f64,
	pub polynomial_offset: f64,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl RasterEncoding {
	/// Compares the fields that decide how a pixel decodes, ignoring unknown keys.
	pub fn decodes_like(&self, other: &RasterEncoding) -> bool {
		self.channels == other.channels
			&& self.vector_dimension == other.vector_dimension
			&& self.polynomial_slope == other.polynomial_slope
			&& self.polynomial_offset == other.polynomial_offset
	}
}

impl From<&Quantization> for RasterEncoding {
	fn from(q: &Quantization) -> Self {
		RasterEncoding {
			channels: q.layout,
			vector_dimension: 1,
			polynomial_slope: q.step,
			polynomial_offset: q.offset,
			extra: Map::new(),
		}
	}
}

impl TryFrom<&RasterEncoding> for Quantization {
	type Error = anyhow::Error;

	fn try_from(encoding: &RasterEncoding) -> Result<Self> {
		Quantization::new(encoding.polynomial_offset, encoding.polynomial_slope, encoding.channels)
	}
}

/// One slice of a tileset, e.g. one scenario or one time step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
	pub tile_url_pattern: String,
	#[serde(default)]
	pub series_axis_value: Option<f64>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl SeriesEntry {
	pub fn new(tile_url_pattern: impl Into<String>, series_axis_value: Option<f64>) -> SeriesEntry {
		SeriesEntry {
			tile_url_pattern: tile_url_pattern.into(),
			series_axis_value,
			metadata: Map::new(),
			extra: Map::new(),
		}
	}
}

/// Descriptive texts of a tileset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TilesetInfo {
	pub name: String,
	pub description: String,
	pub attribution: String,
	pub pixel_unit: String,
	pub series_axis_name: String,
	pub series_axis_unit: String,
}

/// Content of `index.json`.
///
/// Keys that this crate does not know are kept in `extra` and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetMetadata {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub attribution: Vec<String>,
	pub crs: String,
	/// `[min_x, min_y, max_x, max_y]` in meters
	pub bounds: [f64; 4],
	pub tile_size: u32,
	pub raster_format: RasterFormat,
	pub min_zoom: u8,
	pub max_zoom: u8,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	pub raster_encoding: RasterEncoding,
	#[serde(default)]
	pub pixel_unit: String,
	#[serde(default)]
	pub series_axis_name: String,
	#[serde(default)]
	pub series_axis_unit: String,
	#[serde(default)]
	pub series: Vec<SeriesEntry>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl TilesetMetadata {
	/// Assembles a fresh record holding a single series entry.
	pub fn build_record(
		info: &TilesetInfo,
		bounds: &MercatorBBox,
		zoom: ZoomRange,
		tile_size: u32,
		raster_format: RasterFormat,
		quantization: &Quantization,
		series: SeriesEntry,
	) -> TilesetMetadata {
		TilesetMetadata {
			name: info.name.clone(),
			description: info.description.clone(),
			attribution: vec![info.attribution.clone()],
			crs: MERCATOR_CRS.to_string(),
			bounds: bounds.as_array(),
			tile_size,
			raster_format,
			min_zoom: zoom.min,
			max_zoom: zoom.max,
			metadata: Map::new(),
			raster_encoding: RasterEncoding::from(quantization),
			pixel_unit: info.pixel_unit.clone(),
			series_axis_name: info.series_axis_name.clone(),
			series_axis_unit: info.series_axis_unit.clone(),
			series: vec![series],
			extra: Map::new(),
		}
	}

	pub fn quantization(&self) -> Result<Quantization> {
		Quantization::try_from(&self.raster_encoding)
	}

	/// Names of the spatial or encoding fields in which `other` differs from `self`.
	pub fn layout_mismatches(&self, other: &TilesetMetadata) -> Vec<&'static str> {
		let mut fields = Vec::new();
		let same_bounds = self
			.bounds
			.iter()
			.zip(other.bounds.iter())
			.all(|(a, b)| (a - b).abs() <= 1e-6 * a.abs().max(1.0));
		if !same_bounds {
			fields.push("bounds");
		}
		fields.extend(self.encoding_mismatches(other));
		fields
	}

	/// Names of the fields that change how the tiles of `other` decode compared to `self`.
	///
	/// Series of one index share these, so a non-empty result means `other` cannot be merged.
	pub fn encoding_mismatches(&self, other: &TilesetMetadata) -> Vec<&'static str> {
		let mut fields = Vec::new();
		if self.tile_size != other.tile_size {
			fields.push("tileSize");
		}
		if self.raster_format != other.raster_format {
			fields.push("rasterFormat");
		}
		if !self.raster_encoding.decodes_like(&other.raster_encoding) {
			fields.push("rasterEncoding");
		}
		fields
	}

	/// Fails with [`TilingError::Configuration`] if a series of `other` cannot join this index.
	pub fn ensure_mergeable(&self, other: &TilesetMetadata) -> Result<()> {
		let fields = self.encoding_mismatches(other);
		if fields.is_empty() {
			return Ok(());
		}
		Err(TilingError::Configuration(format!(
			"the existing index uses a different {}; build into another folder or identifier",
			fields.join(", ")
		))
		.into())
	}
}

/// Orders series by axis value; entries without a value come first.
fn compare_axis(a: Option<f64>, b: Option<f64>) -> Ordering {
	match (a, b) {
		(None, None) => Ordering::Equal,
		(None, Some(_)) => Ordering::Less,
		(Some(_), None) => Ordering::Greater,
		(Some(a), Some(b)) => a.total_cmp(&b),
	}
}

/// Appends the series of `record` to `existing` and sorts the list by axis value.
///
/// The sort is stable, so entries with equal values keep their insertion order. All other
/// fields of `existing` stay as they are.
pub fn merge_series(mut existing: TilesetMetadata, record: &TilesetMetadata) -> TilesetMetadata {
	existing.series.extend(record.series.iter().cloned());
	existing
		.series
		.sort_by(|a, b| compare_axis(a.series_axis_value, b.series_axis_value));
	existing
}
