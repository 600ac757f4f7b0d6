use anyhow::Result;
use climtiles_core::{DEFAULT_TILE_SIZE, RasterFormat};
use climtiles_pipeline::{BuildConfig, BuildReport, CancelFlag, FailurePolicy, PyramidBuilder, Reprojector};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// georeferenced raster, e.g. a GeoTIFF or NetCDF file
	#[arg(long, short, display_order = 0)]
	input: PathBuf,

	/// root folder of the output
	#[arg(long, short, display_order = 0)]
	output: PathBuf,

	/// subfolder of the output holding this tileset and its index.json
	#[arg(long, display_order = 0)]
	identifier: Option<String>,

	/// minimum zoom level
	#[arg(long, value_name = "int", default_value_t = 0, allow_negative_numbers = true, display_order = 1)]
	min_zoom: i32,

	/// maximum zoom level
	#[arg(long, value_name = "int", allow_negative_numbers = true, display_order = 1)]
	max_zoom: i32,

	/// value encoded as 0; smaller values are clamped to it
	#[arg(long, value_name = "float", allow_negative_numbers = true, display_order = 2)]
	lowest_value: f64,

	/// value difference between two consecutive encoded integers
	#[arg(long, value_name = "float", display_order = 2)]
	value_step: f64,

	/// channels carrying the encoded integer, most significant first, e.g. "r", "rg" or "rgb"
	#[arg(long, display_order = 2)]
	channels: String,

	/// image format of the tiles
	#[arg(long, value_enum, default_value_t = RasterFormat::Webp, display_order = 2)]
	raster_format: RasterFormat,

	/// width and height of a tile in pixels
	#[arg(long, value_name = "int", default_value_t = DEFAULT_TILE_SIZE, display_order = 2)]
	tile_size: u32,

	/// also store the sampled float values of every tile as little endian .f32 files
	#[arg(long, display_order = 3)]
	keep_raw_tiles: bool,

	/// number of tiles processed at the same time [default: number of CPUs]
	#[arg(long, value_name = "int", display_order = 3)]
	concurrency: Option<usize>,

	/// log failing tiles and continue instead of stopping at the first one
	#[arg(long, display_order = 3)]
	skip_failed_tiles: bool,

	#[arg(long, default_value = "", display_order = 4)]
	meta_name: String,

	#[arg(long, default_value = "", display_order = 4)]
	meta_description: String,

	#[arg(long, default_value = "", display_order = 4)]
	meta_attribution: String,

	/// unit of the pixel values, e.g. "°C" or "days"
	#[arg(long, default_value = "unknown", display_order = 4)]
	meta_pixel_unit: String,

	#[arg(long, default_value = "unknown", display_order = 4)]
	meta_series_axis_name: String,

	#[arg(long, default_value = "unknown", display_order = 4)]
	meta_series_axis_unit: String,

	/// position of this build on the series axis; also names the series subfolder
	#[arg(long, value_name = "float", allow_negative_numbers = true, display_order = 4)]
	meta_series_axis_value: Option<f64>,
}

impl Subcommand {
	fn to_config(&self) -> BuildConfig {
		let mut config = BuildConfig::new(
			&self.input,
			&self.output,
			self.max_zoom,
			self.lowest_value,
			self.value_step,
			&self.channels,
		);
		config.identifier.clone_from(&self.identifier);
		config.min_zoom = self.min_zoom;
		config.keep_raw_tiles = self.keep_raw_tiles;
		config.meta_name.clone_from(&self.meta_name);
		config.meta_description.clone_from(&self.meta_description);
		config.meta_attribution.clone_from(&self.meta_attribution);
		config.meta_pixel_unit.clone_from(&self.meta_pixel_unit);
		config.meta_series_axis_name.clone_from(&self.meta_series_axis_name);
		config.meta_series_axis_unit.clone_from(&self.meta_series_axis_unit);
		config.meta_series_axis_value = self.meta_series_axis_value;
		config.raster_format = self.raster_format;
		config.tile_size = self.tile_size;
		config.concurrency = self.concurrency;
		if self.skip_failed_tiles {
			config.failure_policy = FailurePolicy::SkipAndReport;
		}
		config
	}
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	eprintln!("build {:?} into {:?}", arguments.input, arguments.output);
	let report = execute(arguments.to_config()).await?;
	print_report(&report);
	Ok(())
}

/// Validates `config`, runs the build and stops it early on Ctrl-C.
pub async fn execute(config: BuildConfig) -> Result<BuildReport> {
	let cancel = CancelFlag::new();
	let builder = PyramidBuilder::new(config)?.with_cancel_flag(cancel.clone());
	let reprojector = reprojector(builder.concurrency())?;

	let interrupt = tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			log::warn!("interrupted, stopping after the tiles in progress");
			cancel.cancel();
		}
	});

	let result = builder.build(reprojector.as_ref()).await;
	interrupt.abort();
	result
}

pub fn print_report(report: &BuildReport) {
	println!("tiles written:     {}", report.tiles_written);
	println!("pixels masked:     {}", report.masked_pixels);
	println!("pixels saturated:  {}", report.saturated_pixels);
	println!("index:             {}", report.index_path.display());
	println!("series in index:   {}", report.series_count);
	if !report.failures.is_empty() {
		println!("failed tiles:      {}", report.failures.len());
		for failure in &report.failures {
			println!("  {}: {}", failure.coord, failure.message);
		}
	}
}

#[cfg(feature = "gdal")]
fn reprojector(concurrency: usize) -> Result<Box<dyn Reprojector>> {
	Ok(Box::new(climtiles_pipeline::GdalReprojector::new(concurrency)))
}

#[cfg(not(feature = "gdal"))]
fn reprojector(_concurrency: usize) -> Result<Box<dyn Reprojector>> {
	Err(climtiles_core::TilingError::Reprojection(
		"climtiles was built without GDAL support, rebuild it with `--features gdal`".to_string(),
	)
	.into())
}
