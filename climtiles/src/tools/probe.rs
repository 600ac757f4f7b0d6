use anyhow::{Context, Result, bail};
use climtiles_core::{MetadataStore, TileCoord, TilesetMetadata};
use climtiles_image::{TileStats, read_tile};
use climtiles_pipeline::{INDEX_FILE_NAME, RAW_TILE_EXTENSION, read_raw_tile};
use std::path::{Path, PathBuf};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// index.json of a tileset, or the folder containing it
	#[arg(required = true)]
	filename: PathBuf,

	/// also decode one tile and show statistics of its values
	#[arg(long, value_name = "z/x/y")]
	tile: Option<String>,

	/// position of the series to read the tile from, as listed
	#[arg(long, value_name = "int", default_value_t = 0)]
	series: usize,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let index_path = if arguments.filename.is_dir() {
		arguments.filename.join(INDEX_FILE_NAME)
	} else {
		arguments.filename.clone()
	};

	let Some(meta) = MetadataStore::new(&index_path).read()? else {
		bail!("no tileset index found at {index_path:?}");
	};
	print!("{}", summary(&meta));

	if let Some(tile) = &arguments.tile {
		let coord = TileCoord::parse_zxy(tile)?;
		let dir = index_path.parent().unwrap_or_else(|| Path::new(""));
		let path = tile_path(dir, &meta, arguments.series, &coord)?;
		let quantization = meta.quantization()?;
		let image = read_tile(&path)?;
		println!("tile {coord} ({}):", path.display());
		println!("  {}", TileStats::from_image(&image, &quantization));

		let raw_path = path.with_extension(RAW_TILE_EXTENSION);
		if raw_path.is_file() {
			let raw = read_raw_tile(&raw_path, meta.tile_size, meta.tile_size)?;
			println!("  raw tile: {} of {} samples valid", raw.count_valid(), raw.values.len());
		}
	}
	Ok(())
}

fn summary(meta: &TilesetMetadata) -> String {
	let e = &meta.raster_encoding;
	let mut text = String::new();
	text.push_str(&format!("name:        {}\n", meta.name));
	if !meta.description.is_empty() {
		text.push_str(&format!("description: {}\n", meta.description));
	}
	text.push_str(&format!("crs:         {}\n", meta.crs));
	text.push_str(&format!("bounds:      {:?}\n", meta.bounds));
	text.push_str(&format!("zoom:        {}..={}\n", meta.min_zoom, meta.max_zoom));
	text.push_str(&format!("tiles:       {}px {}\n", meta.tile_size, meta.raster_format));
	text.push_str(&format!(
		"encoding:    channels {}, value = int * {} + {} {}\n",
		e.channels.as_letters(),
		e.polynomial_slope,
		e.polynomial_offset,
		meta.pixel_unit
	));
	text.push_str(&format!(
		"series:      {} along {} ({})\n",
		meta.series.len(),
		meta.series_axis_name,
		meta.series_axis_unit
	));
	for (index, series) in meta.series.iter().enumerate() {
		let value = series
			.series_axis_value
			.map_or_else(|| "-".to_string(), |v| v.to_string());
		text.push_str(&format!("  {index}: {value} -> {}\n", series.tile_url_pattern));
	}
	text
}

fn tile_path(dir: &Path, meta: &TilesetMetadata, series: usize, coord: &TileCoord) -> Result<PathBuf> {
	let entry = meta
		.series
		.get(series)
		.with_context(|| format!("series {series} not found, the index lists {}", meta.series.len()))?;
	let relative = entry
		.tile_url_pattern
		.replace("{z}", &coord.level.to_string())
		.replace("{x}", &coord.x.to_string())
		.replace("{y}", &coord.y.to_string());
	Ok(dir.join(relative))
}
