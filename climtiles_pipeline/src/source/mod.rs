//! Raster collaborators: reprojection of the input and sampling of tile windows.

mod memory;
pub use memory::*;

#[cfg(feature = "gdal")]
mod gdal;
#[cfg(feature = "gdal")]
pub use gdal::*;

use anyhow::Result;
use async_trait::async_trait;
use climtiles_core::{MercatorBBox, RasterWindow};
use std::{fmt::Debug, path::Path, sync::Arc};

/// A raster in the world projection that tile windows can be sampled from.
///
/// Sampling must be safe to call concurrently.
#[async_trait]
pub trait RasterSource: Debug + Send + Sync {
	/// Extent of the data in Web Mercator meters.
	fn bounds(&self) -> MercatorBBox;

	/// Resamples the area `bbox` into a `width x height` window, row 0 at the northern edge.
	async fn sample(&self, bbox: &MercatorBBox, width: u32, height: u32) -> Result<RasterWindow>;
}

/// Brings an input raster into the world projection.
///
/// Called once per build. The returned source lives as long as the build uses it and
/// releases its resources when dropped.
#[async_trait]
pub trait Reprojector: Send + Sync {
	async fn reproject(&self, input: &Path) -> Result<Arc<dyn RasterSource>>;
}
