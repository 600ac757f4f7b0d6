//! Orchestration of one pyramid build.
//!
//! A build validates its configuration, reprojects the input once, then walks every zoom level
//! from `min_zoom` to `max_zoom`. Within a level, the tiles covering the source are sampled,
//! encoded and written concurrently. The tileset index is merged last, after every tile
//! succeeded (or was skipped under [`FailurePolicy::SkipAndReport`]). An existing index that
//! decodes its tiles differently stops the build before the first tile.

use crate::{BuildConfig, FailurePolicy, RasterSource, Reprojector, TilesetLayout, write_raw_tile};
use anyhow::{Context, Result, ensure};
use climtiles_core::{
	MercatorBBox, MetadataStore, Quantization, RasterWindow, SeriesEntry, TileCoord, TilesetMetadata, TilingError,
	ZoomRange, dataset_tile_range,
};
use climtiles_image::{ImageWriter, LosslessFileWriter, encode_window};
use futures::{StreamExt, stream};
use std::{
	fmt,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

/// Shared flag that stops a running build before its next tile.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// A tile that was skipped under [`FailurePolicy::SkipAndReport`].
#[derive(Clone, Debug, PartialEq)]
pub struct TileFailure {
	pub coord: TileCoord,
	pub message: String,
}

/// Outcome of a finished build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildReport {
	pub tiles_written: u64,
	pub failures: Vec<TileFailure>,
	/// Valid pixels whose value was clamped to the largest encodable integer.
	pub saturated_pixels: u64,
	pub masked_pixels: u64,
	pub index_path: PathBuf,
	/// Number of series in the index after merging.
	pub series_count: usize,
}

impl BuildReport {
	fn new(index_path: PathBuf) -> Self {
		BuildReport {
			tiles_written: 0,
			failures: Vec::new(),
			saturated_pixels: 0,
			masked_pixels: 0,
			index_path,
			series_count: 0,
		}
	}

	fn add(&mut self, outcome: TileOutcome) {
		self.tiles_written += 1;
		self.saturated_pixels += outcome.saturated;
		self.masked_pixels += outcome.masked;
	}
}

impl fmt::Display for BuildReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} tiles written, {} failed, {} pixels saturated, {} pixels masked; {:?} holds {} series",
			self.tiles_written,
			self.failures.len(),
			self.saturated_pixels,
			self.masked_pixels,
			self.index_path,
			self.series_count
		)
	}
}

struct TileOutcome {
	saturated: u64,
	masked: u64,
}

/// Everything a single tile needs, shared by all concurrently running tiles of a build.
struct TileJob {
	source: Arc<dyn RasterSource>,
	writer: Arc<dyn ImageWriter>,
	layout: TilesetLayout,
	quantization: Quantization,
	tile_size: u32,
	keep_raw_tiles: bool,
}

impl TileJob {
	async fn run(self: Arc<Self>, coord: TileCoord) -> Result<TileOutcome> {
		let bbox = coord.to_mercator_bbox();
		let window = self
			.source
			.sample(&bbox, self.tile_size, self.tile_size)
			.await
			.with_context(|| format!("sampling {bbox:?}"))?;
		ensure!(
			window.width == self.tile_size && window.height == self.tile_size,
			"source returned a {}x{} window, expected {}x{}",
			window.width,
			window.height,
			self.tile_size,
			self.tile_size
		);
		tokio::task::spawn_blocking(move || self.store(coord, &window)).await?
	}

	fn store(&self, coord: TileCoord, window: &RasterWindow) -> Result<TileOutcome> {
		if self.keep_raw_tiles {
			write_raw_tile(&self.layout.raw_tile_path(&coord), window)?;
		}
		let encoded = encode_window(window, &self.quantization)?;
		self.writer.write_lossless(&encoded.image, &self.layout.tile_path(&coord))?;
		log::debug!(
			"tile {coord}: {} masked, {} saturated",
			encoded.masked,
			encoded.saturated
		);
		Ok(TileOutcome {
			saturated: encoded.saturated,
			masked: encoded.masked,
		})
	}
}

/// Builds one series of a tileset from a [`BuildConfig`].
pub struct PyramidBuilder {
	config: BuildConfig,
	zoom: ZoomRange,
	quantization: Quantization,
	layout: TilesetLayout,
	concurrency: usize,
	writer: Arc<dyn ImageWriter>,
	cancel: CancelFlag,
}

fn configuration_error(message: String) -> anyhow::Error {
	TilingError::Configuration(message).into()
}

fn is_folder_name(name: &str) -> bool {
	!(name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']))
}

impl PyramidBuilder {
	/// Validates `config`. Nothing is read or written yet.
	pub fn new(config: BuildConfig) -> Result<PyramidBuilder> {
		let zoom = ZoomRange::new(config.min_zoom, config.max_zoom)?;
		let quantization = Quantization::from_letters(config.lowest_value, config.value_step, &config.channels)?;

		if config.tile_size == 0 {
			return Err(configuration_error("tile size must be positive".to_string()));
		}
		let concurrency = config.concurrency();
		if concurrency == 0 {
			return Err(configuration_error("concurrency must be positive".to_string()));
		}
		if let Some(value) = config.meta_series_axis_value.filter(|v| !v.is_finite()) {
			return Err(configuration_error(format!(
				"series axis value must be finite, got {value}"
			)));
		}
		if let Some(id) = config.identifier.as_deref().filter(|id| !is_folder_name(id)) {
			return Err(configuration_error(format!(
				"identifier must be a single folder name, got {id:?}"
			)));
		}

		let layout = TilesetLayout::new(
			&config.output,
			config.identifier.as_deref(),
			config.meta_series_axis_value,
			config.raster_format,
		);

		Ok(PyramidBuilder {
			writer: Arc::new(LosslessFileWriter::new(config.raster_format)),
			config,
			zoom,
			quantization,
			layout,
			concurrency,
			cancel: CancelFlag::new(),
		})
	}

	/// Replaces the image writer, e.g. to store tiles somewhere else than the file system.
	pub fn with_writer(mut self, writer: Arc<dyn ImageWriter>) -> Self {
		if writer.format() != self.config.raster_format {
			log::warn!(
				"image writer produces {} but tile paths use .{}",
				writer.format(),
				self.config.raster_format.extension()
			);
		}
		self.writer = writer;
		self
	}

	pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn layout(&self) -> &TilesetLayout {
		&self.layout
	}

	/// Number of tiles processed at the same time.
	pub fn concurrency(&self) -> usize {
		self.concurrency
	}

	fn check_cancelled(&self) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(TilingError::Cancelled.into());
		}
		Ok(())
	}

	/// Runs the build. The reprojected source is released before the index is written,
	/// whatever the outcome.
	pub async fn build(&self, reprojector: &dyn Reprojector) -> Result<BuildReport> {
		let input = &self.config.input;
		log::info!("building levels {} of {input:?} into {:?}", self.zoom, self.layout.tiles_dir());
		self.check_cancelled()?;

		let source = reprojector
			.reproject(input)
			.await
			.with_context(|| format!("reprojecting {input:?}"))
			.context(TilingError::Reprojection(format!("{input:?}")))?;
		let bounds = source.bounds();
		log::debug!("reprojected bounds {bounds:?}");

		let record = TilesetMetadata::build_record(
			&self.config.tileset_info(),
			&bounds,
			self.zoom,
			self.config.tile_size,
			self.config.raster_format,
			&self.quantization,
			SeriesEntry::new(self.layout.tile_url_pattern(), self.config.meta_series_axis_value),
		);
		let store = MetadataStore::new(self.layout.index_path());
		store.ensure_mergeable(&record)?;

		let job = Arc::new(TileJob {
			source,
			writer: self.writer.clone(),
			layout: self.layout.clone(),
			quantization: self.quantization,
			tile_size: self.config.tile_size,
			keep_raw_tiles: self.config.keep_raw_tiles,
		});

		let mut report = BuildReport::new(self.layout.index_path());
		for level in self.zoom.levels() {
			self.build_level(&job, &bounds, level, &mut report)
				.await
				.with_context(|| format!("building zoom level {level}"))?;
		}
		drop(job);

		if report.saturated_pixels > 0 {
			log::warn!(
				"{} pixels exceeded the range of {} channel(s) and were clamped; consider a larger value step or more channels",
				report.saturated_pixels,
				self.quantization.channel_count()
			);
		}
		if !report.failures.is_empty() {
			log::warn!("{} tiles failed and were skipped", report.failures.len());
		}

		let merged = store.merge_or_create(&record)?;
		report.series_count = merged.series.len();

		log::info!("{report}");
		Ok(report)
	}

	async fn build_level(
		&self,
		job: &Arc<TileJob>,
		bounds: &MercatorBBox,
		level: u8,
		report: &mut BuildReport,
	) -> Result<()> {
		let range = dataset_tile_range(bounds, level)?;
		log::info!("level {range:?}");

		let cancel = &self.cancel;
		let mut results = stream::iter(range.iter_coords())
			.map(|coord| {
				let job = job.clone();
				async move {
					if cancel.is_cancelled() {
						return (coord, Err(TilingError::Cancelled.into()));
					}
					(coord, job.run(coord).await)
				}
			})
			.buffer_unordered(self.concurrency);

		while let Some((coord, result)) = results.next().await {
			let err = match result {
				Ok(outcome) => {
					report.add(outcome);
					continue;
				}
				Err(err) => err,
			};
			if matches!(TilingError::of(&err), Some(TilingError::Cancelled)) {
				log::warn!("build cancelled before tile {coord}");
				return Err(err);
			}
			match self.config.failure_policy {
				FailurePolicy::FailFast => return Err(err.context(format!("tile {coord} failed"))),
				FailurePolicy::SkipAndReport => {
					log::warn!("skipping tile {coord}: {err:#}");
					report.failures.push(TileFailure {
						coord,
						message: format!("{err:#}"),
					});
				}
			}
		}
		Ok(())
	}
}

impl fmt::Debug for PyramidBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PyramidBuilder")
			.field("input", &self.config.input)
			.field("zoom", &self.zoom)
			.field("quantization", &self.quantization)
			.field("layout", &self.layout)
			.field("concurrency", &self.concurrency)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MemoryRaster, MemoryReprojector, read_raw_tile};
	use anyhow::anyhow;
	use approx::assert_abs_diff_eq;
	use assert_fs::TempDir;
	use climtiles_core::{NoData, RasterFormat, WORLD_HALF_EXTENT};
	use climtiles_image::{RgbaImage, TileStats, read_tile};
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use std::path::Path;

	const INPUT: &str = "tasmax.tif";

	fn europe() -> MercatorBBox {
		MercatorBBox::new(-600_000.0, 5_000_000.0, 1_100_000.0, 6_700_000.0).unwrap()
	}

	fn reprojector(value: f32) -> MemoryReprojector {
		let mut reprojector = MemoryReprojector::new();
		reprojector.add(INPUT, MemoryRaster::from_fn(europe(), 32, 32, |_, _| value).unwrap());
		reprojector
	}

	fn config(output: &Path) -> BuildConfig {
		let mut config = BuildConfig::new(INPUT, output, 3, -20.0, 0.01, "rg");
		config.identifier = Some("tasmax".to_string());
		config.tile_size = 16;
		config.concurrency = Some(4);
		config.raster_format = RasterFormat::Png;
		config
	}

	fn expected_tiles(max_zoom: u8) -> u64 {
		(0..=max_zoom)
			.map(|level| dataset_tile_range(&europe(), level).unwrap().count())
			.sum()
	}

	#[tokio::test]
	async fn writes_tiles_and_index() -> Result<()> {
		let dir = TempDir::new()?;
		let mut config = config(dir.path());
		config.meta_series_axis_value = Some(2.7);
		config.meta_name = "Max temperature".to_string();

		let report = PyramidBuilder::new(config)?.build(&reprojector(5.0)).await?;
		assert_eq!(report.tiles_written, expected_tiles(3));
		assert!(report.failures.is_empty());
		assert_eq!(report.saturated_pixels, 0);
		assert_eq!(report.series_count, 1);
		assert_eq!(report.index_path, dir.path().join("tasmax/index.json"));

		let tile = dir.path().join("tasmax/2-7/3/4/2.png");
		assert!(tile.is_file());
		let q = Quantization::from_letters(-20.0, 0.01, "rg")?;
		let stats = TileStats::from_image(&read_tile(&tile)?, &q);
		assert!(stats.valid > 0);
		assert_abs_diff_eq!(stats.max.unwrap(), 5.0, epsilon = 0.005);

		let meta = MetadataStore::new(&report.index_path).read()?.unwrap();
		assert_eq!(meta.name, "Max temperature");
		assert_eq!(meta.bounds, europe().as_array());
		assert_eq!(meta.min_zoom, 0);
		assert_eq!(meta.max_zoom, 3);
		assert_eq!(meta.tile_size, 16);
		assert_eq!(meta.series[0].tile_url_pattern, "2-7/{z}/{x}/{y}.png");
		Ok(())
	}

	#[tokio::test]
	async fn second_build_merges_series() -> Result<()> {
		let dir = TempDir::new()?;
		let reprojector = reprojector(1.0);
		for value in [4.0, 1.5] {
			let mut config = config(dir.path());
			config.max_zoom = 1;
			config.meta_series_axis_value = Some(value);
			PyramidBuilder::new(config)?.build(&reprojector).await?;
		}
		let meta = MetadataStore::new(dir.path().join("tasmax/index.json")).read()?.unwrap();
		let axis: Vec<Option<f64>> = meta.series.iter().map(|s| s.series_axis_value).collect();
		assert_eq!(axis, vec![Some(1.5), Some(4.0)]);
		assert!(dir.path().join("tasmax/4-0/0/0/0.png").is_file());
		assert!(dir.path().join("tasmax/1-5/0/0/0.png").is_file());
		Ok(())
	}

	#[tokio::test]
	async fn series_with_another_value_step_is_rejected() -> Result<()> {
		let dir = TempDir::new()?;
		let reprojector = reprojector(5.0);
		let mut first = config(dir.path());
		first.max_zoom = 1;
		first.meta_series_axis_value = Some(1.5);
		PyramidBuilder::new(first)?.build(&reprojector).await?;

		let mut second = config(dir.path());
		second.max_zoom = 1;
		second.value_step = 0.1;
		second.meta_series_axis_value = Some(2.7);
		let builder = PyramidBuilder::new(second)?;
		let err = builder.build(&reprojector).await.unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::Configuration(_))));
		assert!(format!("{err:#}").contains("rasterEncoding"), "{err:#}");
		assert!(!builder.layout().tiles_dir().exists());

		let meta = MetadataStore::new(dir.path().join("tasmax/index.json")).read()?.unwrap();
		assert_eq!(meta.series.len(), 1);
		assert_eq!(meta.raster_encoding.polynomial_slope, 0.01);
		Ok(())
	}

	#[tokio::test]
	async fn series_with_other_bounds_is_merged() -> Result<()> {
		let dir = TempDir::new()?;
		let mut first = config(dir.path());
		first.max_zoom = 1;
		first.meta_series_axis_value = Some(1.5);
		PyramidBuilder::new(first)?.build(&reprojector(5.0)).await?;

		let mut wider = MemoryReprojector::new();
		let bbox = MercatorBBox::new(-1_000_000.0, 4_000_000.0, 2_000_000.0, 7_000_000.0)?;
		wider.add(INPUT, MemoryRaster::from_fn(bbox, 8, 8, |_, _| 5.0)?);
		let mut second = config(dir.path());
		second.max_zoom = 1;
		second.meta_series_axis_value = Some(2.7);
		let report = PyramidBuilder::new(second)?.build(&wider).await?;
		assert_eq!(report.series_count, 2);

		let meta = MetadataStore::new(&report.index_path).read()?.unwrap();
		assert_eq!(meta.bounds, europe().as_array());
		Ok(())
	}

	#[tokio::test]
	async fn saturation_and_masking_are_counted() -> Result<()> {
		let dir = TempDir::new()?;
		let mut config = config(dir.path());
		config.max_zoom = 0;
		config.channels = "r".to_string();
		config.lowest_value = 0.0;
		config.value_step = 1.0;
		// northern hemisphere only
		let mut reprojector = MemoryReprojector::new();
		let north = MercatorBBox::new(-WORLD_HALF_EXTENT, 0.0, WORLD_HALF_EXTENT, WORLD_HALF_EXTENT)?;
		reprojector.add(INPUT, MemoryRaster::from_fn(north, 8, 4, |_, _| 1000.0)?);
		let report = PyramidBuilder::new(config)?.build(&reprojector).await?;
		assert_eq!(report.tiles_written, 1);
		assert_eq!(report.saturated_pixels, 128);
		assert_eq!(report.masked_pixels, 128);
		Ok(())
	}

	#[tokio::test]
	async fn keeps_raw_tiles() -> Result<()> {
		let dir = TempDir::new()?;
		let mut config = config(dir.path());
		config.keep_raw_tiles = true;
		PyramidBuilder::new(config)?.build(&reprojector(3.0)).await?;
		let raw = read_raw_tile(&dir.path().join("tasmax/3/4/2.f32"), 16, 16)?;
		assert!(raw.count_valid() > 0);
		assert!(raw.values.iter().filter(|v| !v.is_nan()).all(|v| (*v - 3.0).abs() < 1e-6));
		Ok(())
	}

	struct FailingWriter;

	impl ImageWriter for FailingWriter {
		fn write_lossless(&self, _image: &RgbaImage, path: &Path) -> Result<()> {
			Err(anyhow!("disk full")).context(TilingError::TileIo(format!("{path:?}")))
		}

		fn format(&self) -> RasterFormat {
			RasterFormat::Png
		}
	}

	#[tokio::test]
	async fn fail_fast_writes_no_index() -> Result<()> {
		let dir = TempDir::new()?;
		let builder = PyramidBuilder::new(config(dir.path()))?.with_writer(Arc::new(FailingWriter));
		let err = builder.build(&reprojector(1.0)).await.unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::TileIo(_))));
		assert_eq!(err.root_cause().to_string(), "disk full");
		assert!(!builder.layout().index_path().exists());
		Ok(())
	}

	#[tokio::test]
	async fn skip_and_report_keeps_going() -> Result<()> {
		let dir = TempDir::new()?;
		let mut config = config(dir.path());
		config.failure_policy = FailurePolicy::SkipAndReport;
		let report = PyramidBuilder::new(config)?
			.with_writer(Arc::new(FailingWriter))
			.build(&reprojector(1.0))
			.await?;
		assert_eq!(report.tiles_written, 0);
		assert_eq!(report.failures.len() as u64, expected_tiles(3));
		assert!(report.failures[0].message.contains("disk full"));
		assert!(report.index_path.is_file());
		Ok(())
	}

	#[tokio::test]
	async fn cancelled_build_stops() -> Result<()> {
		let dir = TempDir::new()?;
		let cancel = CancelFlag::new();
		let builder = PyramidBuilder::new(config(dir.path()))?.with_cancel_flag(cancel.clone());
		cancel.cancel();
		let err = builder.build(&reprojector(1.0)).await.unwrap_err();
		assert_eq!(TilingError::of(&err), Some(&TilingError::Cancelled));
		assert!(!builder.layout().index_path().exists());
		assert!(!builder.layout().tiles_dir().exists());
		Ok(())
	}

	#[tokio::test]
	async fn reprojection_failure_is_fatal() -> Result<()> {
		let dir = TempDir::new()?;
		let builder = PyramidBuilder::new(config(dir.path()))?;
		let err = builder.build(&MemoryReprojector::new()).await.unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::Reprojection(_))));
		assert!(!builder.layout().index_path().exists());
		Ok(())
	}

	#[tokio::test]
	async fn nodata_only_source_writes_transparent_tiles() -> Result<()> {
		let dir = TempDir::new()?;
		let mut config = config(dir.path());
		config.max_zoom = 1;
		let mut reprojector = MemoryReprojector::new();
		reprojector.add(
			INPUT,
			MemoryRaster::new(europe(), 2, 2, vec![-9999.0; 4], NoData::Value(-9999.0))?,
		);
		let report = PyramidBuilder::new(config)?.build(&reprojector).await?;
		assert_eq!(report.masked_pixels, report.tiles_written * 256);
		Ok(())
	}

	#[rstest]
	#[case::negative_zoom(|c: &mut BuildConfig| c.min_zoom = -1, "must not be negative")]
	#[case::inverted_zoom(|c: &mut BuildConfig| c.min_zoom = 4, "must be <= max_zoom")]
	#[case::bad_channels(|c: &mut BuildConfig| c.channels = "rx".to_string(), "invalid channels")]
	#[case::zero_step(|c: &mut BuildConfig| c.value_step = 0.0, "value step must be positive")]
	#[case::zero_tile_size(|c: &mut BuildConfig| c.tile_size = 0, "tile size")]
	#[case::zero_concurrency(|c: &mut BuildConfig| c.concurrency = Some(0), "concurrency")]
	#[case::nan_axis(|c: &mut BuildConfig| c.meta_series_axis_value = Some(f64::NAN), "axis value")]
	#[case::nested_identifier(|c: &mut BuildConfig| c.identifier = Some("../up".to_string()), "identifier")]
	fn invalid_configuration(#[case] change: fn(&mut BuildConfig), #[case] message: &str) {
		let mut config = config(Path::new("/nonexistent"));
		change(&mut config);
		let err = PyramidBuilder::new(config).unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::Configuration(_))));
		assert!(err.to_string().contains(message), "{err}");
	}

	#[test]
	fn report_display() {
		let mut report = BuildReport::new(PathBuf::from("out/index.json"));
		report.add(TileOutcome { saturated: 2, masked: 3 });
		assert_eq!(
			report.to_string(),
			"1 tiles written, 0 failed, 2 pixels saturated, 3 pixels masked; \"out/index.json\" holds 0 series"
		);
	}
}
