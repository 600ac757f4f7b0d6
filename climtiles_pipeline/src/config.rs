use climtiles_core::{DEFAULT_TILE_SIZE, RasterFormat, TilesetInfo};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What to do when a single tile cannot be sampled, encoded or written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
	/// Abort the build on the first failing tile. No index is written.
	#[default]
	FailFast,
	/// Log the failure with its tile coordinate, continue and list it in the report.
	SkipAndReport,
}

/// Everything one pyramid build needs to know.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
	/// Georeferenced raster to tile.
	pub input: PathBuf,

	/// Root folder of the output.
	pub output: PathBuf,

	/// Optional subfolder of `output` that holds this tileset and its `index.json`.
	#[serde(default)]
	pub identifier: Option<String>,

	#[serde(default)]
	pub min_zoom: i32,

	pub max_zoom: i32,

	/// Value encoded as integer 0. Smaller values are clamped to it.
	pub lowest_value: f64,

	/// Value difference between two consecutive integers.
	pub value_step: f64,

	/// Channels carrying the encoded integer, most significant first, e.g. `"rg"`.
	pub channels: String,

	/// Also store the sampled float windows next to the tiles.
	#[serde(default)]
	pub keep_raw_tiles: bool,

	#[serde(default)]
	pub meta_name: String,

	#[serde(default)]
	pub meta_description: String,

	#[serde(default)]
	pub meta_attribution: String,

	/// Real world unit of the pixel values, e.g. `"°C"` or `"days"`.
	#[serde(default = "unknown")]
	pub meta_pixel_unit: String,

	#[serde(default = "unknown")]
	pub meta_series_axis_name: String,

	#[serde(default = "unknown")]
	pub meta_series_axis_unit: String,

	/// Position of this build along the series axis. Also selects the tile subfolder.
	#[serde(default)]
	pub meta_series_axis_value: Option<f64>,

	#[serde(default)]
	pub raster_format: RasterFormat,

	#[serde(default = "default_tile_size")]
	pub tile_size: u32,

	/// Number of tiles processed at the same time. Defaults to the number of CPUs.
	#[serde(default)]
	pub concurrency: Option<usize>,

	#[serde(default)]
	pub failure_policy: FailurePolicy,
}

fn unknown() -> String {
	"unknown".to_string()
}

fn default_tile_size() -> u32 {
	DEFAULT_TILE_SIZE
}

impl BuildConfig {
	/// A configuration with the defaults of every optional option.
	pub fn new(
		input: impl Into<PathBuf>,
		output: impl Into<PathBuf>,
		max_zoom: i32,
		lowest_value: f64,
		value_step: f64,
		channels: &str,
	) -> BuildConfig {
		BuildConfig {
			input: input.into(),
			output: output.into(),
			identifier: None,
			min_zoom: 0,
			max_zoom,
			lowest_value,
			value_step,
			channels: channels.to_string(),
			keep_raw_tiles: false,
			meta_name: String::new(),
			meta_description: String::new(),
			meta_attribution: String::new(),
			meta_pixel_unit: unknown(),
			meta_series_axis_name: unknown(),
			meta_series_axis_unit: unknown(),
			meta_series_axis_value: None,
			raster_format: RasterFormat::default(),
			tile_size: DEFAULT_TILE_SIZE,
			concurrency: None,
			failure_policy: FailurePolicy::default(),
		}
	}

	pub fn tileset_info(&self) -> TilesetInfo {
		TilesetInfo {
			name: self.meta_name.clone(),
			description: self.meta_description.clone(),
			attribution: self.meta_attribution.clone(),
			pixel_unit: self.meta_pixel_unit.clone(),
			series_axis_name: self.meta_series_axis_name.clone(),
			series_axis_unit: self.meta_series_axis_unit.clone(),
		}
	}

	pub fn concurrency(&self) -> usize {
		self.concurrency.unwrap_or_else(num_cpus::get)
	}

	/// Makes relative `input` and `output` paths relative to `base`.
	pub fn resolve_paths(&mut self, base: &Path) {
		if self.input.is_relative() {
			self.input = base.join(&self.input);
		}
		if self.output.is_relative() {
			self.output = base.join(&self.output);
		}
	}
}
