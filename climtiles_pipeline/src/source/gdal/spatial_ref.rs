use anyhow::{Result, anyhow};
use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};

/// Spatial reference for `epsg` with x as longitude/easting.
pub fn get_spatial_ref(epsg: u32) -> Result<SpatialRef> {
	let mut srs = SpatialRef::from_epsg(epsg).map_err(|e| anyhow!("failed to get spatial reference EPSG:{epsg}: {e}"))?;
	srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
	Ok(srs)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mercator_is_projected() -> Result<()> {
		let srs = get_spatial_ref(3857)?;
		assert!(srs.is_projected());
		assert!(get_spatial_ref(4326)?.is_geographic());
		Ok(())
	}
}
