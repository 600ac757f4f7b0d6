use super::{Instance, ResampleAlg};
use crate::source::{RasterSource, Reprojector};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use climtiles_core::{MercatorBBox, RasterWindow};
use deadpool::managed::{Manager, Metrics, Object, Pool, RecycleError, RecycleResult};
use gdal::{Dataset, config::set_config_option};
use std::{path::Path, sync::Arc};

type DatasetFactory = Arc<dyn Fn() -> Result<Dataset> + Send + Sync + 'static>;

struct GdalManager {
	open_dataset: DatasetFactory,
	reuse_limit: u32,
}

impl Manager for GdalManager {
	type Type = Instance;
	type Error = anyhow::Error;

	async fn create(&self) -> Result<Self::Type, Self::Error> {
		let open_dataset = self.open_dataset.clone();
		tokio::task::spawn_blocking(move || {
			let ds = (open_dataset)().context("failed to open GDAL dataset via factory")?;
			Ok(Instance::new(ds))
		})
		.await
		.map_err(|e| anyhow!("spawn_blocking failed: {e}"))?
	}

	async fn recycle(&self, obj: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
		if obj.age() > self.reuse_limit {
			return Err(RecycleError::message("instance exceeded reuse limit"));
		}
		obj.cleanup().map_err(RecycleError::Backend)?;
		Ok(())
	}
}

/// A georeferenced raster in any projection, warped to Web Mercator on demand.
///
/// Every sample borrows one dataset handle from a pool, so up to `concurrency` windows are
/// warped in parallel. Handles are reopened after `reuse_limit` uses.
pub struct GdalSource {
	pool: Pool<GdalManager>,
	bounds: MercatorBBox,
	resample: ResampleAlg,
}

impl GdalSource {
	pub async fn open(filename: &Path, reuse_limit: u32, concurrency: usize) -> Result<GdalSource> {
		let path = filename.to_path_buf();
		let factory: DatasetFactory =
			Arc::new(move || Dataset::open(&path).with_context(|| format!("failed to open GDAL dataset: {path:?}")));
		Self::new_with_factory(factory, reuse_limit, concurrency)
			.await
			.with_context(|| format!("failed to open raster {filename:?}"))
	}

	pub async fn new_with_factory(open_dataset: DatasetFactory, reuse_limit: u32, concurrency: usize) -> Result<GdalSource> {
		set_config_option("GDAL_NUM_THREADS", "ALL_CPUS")?;

		let instance = Instance::new((open_dataset)()?);
		let bounds = instance.mercator_bounds()?;
		log::debug!("source covers {bounds:?}");

		let manager = GdalManager {
			open_dataset,
			reuse_limit: reuse_limit.min(1024),
		};

		let pool = Pool::builder(manager)
			.max_size(concurrency.max(1))
			.build()
			.context("failed to build dataset pool")?;

		Ok(GdalSource {
			pool,
			bounds,
			resample: ResampleAlg::default(),
		})
	}

	pub fn with_resample(mut self, resample: ResampleAlg) -> Self {
		self.resample = resample;
		self
	}
}

#[async_trait]
impl RasterSource for GdalSource {
	fn bounds(&self) -> MercatorBBox {
		self.bounds
	}

	async fn sample(&self, bbox: &MercatorBBox, width: u32, height: u32) -> Result<RasterWindow> {
		let instance: Object<GdalManager> = self
			.pool
			.get()
			.await
			.map_err(|e| anyhow!("failed to get dataset from pool: {e}"))?;

		let bbox = *bbox;
		let resample = self.resample;
		tokio::task::spawn_blocking(move || instance.read_window(&bbox, width, height, resample))
			.await?
			.with_context(|| format!("failed to warp {width}x{height} window {bbox:?}"))
	}
}

impl std::fmt::Debug for GdalSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GdalSource")
			.field("pool", &"<deadpool::Pool<GdalManager>>")
			.field("bounds", &self.bounds)
			.field("resample", &self.resample)
			.finish()
	}
}

/// Opens inputs with GDAL.
#[derive(Clone, Debug)]
pub struct GdalReprojector {
	pub reuse_limit: u32,
	pub concurrency: usize,
	pub resample: ResampleAlg,
}

impl GdalReprojector {
	pub fn new(concurrency: usize) -> GdalReprojector {
		GdalReprojector {
			reuse_limit: 256,
			concurrency,
			resample: ResampleAlg::default(),
		}
	}
}

#[async_trait]
impl Reprojector for GdalReprojector {
	async fn reproject(&self, input: &Path) -> Result<Arc<dyn RasterSource>> {
		let source = GdalSource::open(input, self.reuse_limit, self.concurrency).await?;
		Ok(Arc::new(source.with_resample(self.resample)))
	}
}

#[cfg(test)]
mod tests {
	use super::super::instance::tests::dataset;
	use super::*;
	use climtiles_core::TileCoord;

	/// WGS84 raster over Europe whose values grow by one per column.
	fn europe_factory() -> DatasetFactory {
		Arc::new(|| Ok(dataset(4326, [-10.0, 35.0, 30.0, 70.0], 40, None, |col, _| col as f32)))
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn bounds_are_mercator() -> Result<()> {
		let source = GdalSource::new_with_factory(europe_factory(), 4, 2).await?;
		let b = source.bounds();
		assert!((b.x_min - -1_113_194.9).abs() < 1.0, "{b:?}");
		assert!((b.x_max - 3_339_584.7).abs() < 1.0, "{b:?}");
		assert!(b.y_min < b.y_max);
		Ok(())
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn samples_in_parallel() -> Result<()> {
		let source = Arc::new(GdalSource::new_with_factory(europe_factory(), 1, 2).await?);
		let coords = [TileCoord::new(3, 4, 2)?, TileCoord::new(3, 4, 3)?, TileCoord::new(3, 3, 2)?];
		let mut handles = Vec::new();
		for coord in coords {
			let source = source.clone();
			handles.push(tokio::spawn(async move {
				source.sample(&coord.to_mercator_bbox(), 16, 16).await
			}));
		}
		for handle in handles {
			let window = handle.await??;
			assert_eq!(window.values.len(), 256);
			assert!(window.count_valid() > 0);
			// the column gradient grows eastwards
			let row = 8;
			let valid: Vec<f32> = (0..16).filter_map(|x| window.get(x, row)).filter(|v| !v.is_nan()).collect();
			assert!(valid.windows(2).all(|w| w[0] <= w[1] + 1e-3));
		}
		Ok(())
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn nearest_neighbour_keeps_source_values() -> Result<()> {
		let source = GdalSource::new_with_factory(europe_factory(), 4, 1)
			.await?
			.with_resample(ResampleAlg::NearestNeighbour);
		let window = source.sample(&TileCoord::new(3, 4, 2)?.to_mercator_bbox(), 16, 16).await?;
		assert!(
			window
				.values
				.iter()
				.filter(|v| !v.is_nan())
				.all(|v| (v - v.round()).abs() < 1e-6)
		);
		Ok(())
	}

	#[tokio::test]
	async fn missing_file() {
		let err = GdalReprojector::new(1)
			.reproject(Path::new("/does/not/exist.tif"))
			.await
			.unwrap_err();
		assert!(format!("{err:?}").contains("exist.tif"));
	}
}
