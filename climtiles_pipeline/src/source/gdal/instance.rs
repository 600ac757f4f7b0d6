use super::{ResampleAlg, get_spatial_ref};
use anyhow::{Context, Result, bail, ensure};
use climtiles_core::{MercatorBBox, NoData, RasterWindow};
use gdal::{Dataset, DriverManager, GeoTransform, spatial_ref::CoordTransform};

/// One opened handle of the source dataset. Handles are pooled and never shared between
/// two warps at the same time.
#[derive(Debug)]
pub struct Instance {
	dataset: Dataset,
	age: u32,
}

unsafe impl Sync for Instance {}

impl Instance {
	pub fn new(dataset: Dataset) -> Self {
		Self { dataset, age: 0 }
	}

	pub fn age(&self) -> u32 {
		self.age
	}

	pub fn cleanup(&mut self) -> Result<()> {
		self.age = self.age.wrapping_add(1);
		self.dataset.flush_cache()?;
		Ok(())
	}

	/// Nodata sentinel of the first band.
	pub fn nodata(&self) -> Result<Option<f64>> {
		Ok(self.dataset.rasterband(1)?.no_data_value())
	}

	/// Extent of the dataset in Web Mercator, clamped to the world.
	pub fn mercator_bounds(&self) -> Result<MercatorBBox> {
		log::trace!("computing mercator bounds");
		let gt = self
			.dataset
			.geo_transform()
			.context("failed to get geo transform from GDAL dataset")?;
		ensure!(gt[2] == 0.0 && gt[4] == 0.0, "GDAL dataset must not be rotated");

		let (width, height) = self.dataset.raster_size();
		let spatial_ref = self
			.dataset
			.spatial_ref()
			.context("GDAL dataset must have a spatial reference (SRS) defined")?;

		let x0 = gt[0];
		let x1 = gt[0] + gt[1] * width as f64;
		let y0 = gt[3];
		let y1 = gt[3] + gt[5] * height as f64;

		// go through WGS84 so that sources reaching the poles are clamped instead of failing
		let to_wgs84 = CoordTransform::new(&spatial_ref, &get_spatial_ref(4326)?)
			.context("failed to create coordinate transform to EPSG:4326")?;
		let b = to_wgs84.transform_bounds(&[x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)], 21)?;
		MercatorBBox::from_lon_lat(b[0], b[1], b[2], b[3])
	}

	/// Warps the source into a 1-band Float32 in-memory dataset covering `bbox`.
	///
	/// Pixels without source data, outside the source or matching its nodata value, are NaN.
	pub fn warp_to_float_dataset(
		&self,
		bbox: &MercatorBBox,
		width: usize,
		height: usize,
		resample: ResampleAlg,
	) -> Result<Dataset> {
		log::trace!("warping {bbox:?} into {width}x{height}");

		let driver = DriverManager::get_driver_by_name("MEM").context("failed to get GDAL MEM driver")?;
		let mut dst_ds = driver
			.create_with_band_type::<f32, _>("mem", width, height, 1)
			.context("failed to create Float32 in-memory dataset")?;
		dst_ds.set_spatial_ref(&get_spatial_ref(3857)?)?;

		let geo_transform: GeoTransform = [
			bbox.x_min,
			bbox.width() / width as f64,
			0.0,
			bbox.y_max,
			0.0,
			-bbox.height() / height as f64,
		];
		dst_ds.set_geo_transform(&geo_transform)?;
		dst_ds.rasterband(1)?.set_no_data_value(Some(f64::NAN))?;

		let src_nodata = self.nodata()?;
		let c_width = i32::try_from(width)?;
		let c_height = i32::try_from(height)?;

		let h_src_ds = self.dataset.c_dataset();
		let h_dst_ds = dst_ds.c_dataset();

		unsafe {
			use gdal_sys::{
				CPLErr, CPLMalloc, CSLSetNameValue, GDALChunkAndWarpImage,
				GDALCreateGenImgProjTransformer2, GDALCreateWarpOperation, GDALCreateWarpOptions,
				GDALDestroyGenImgProjTransformer, GDALDestroyWarpOperation, GDALDestroyWarpOptions, GDALGenImgProjTransform,
				GDALWarpOperationH,
			};

			// owned by GDAL, released with GDALDestroyWarpOptions together with the arrays below
			let options = GDALCreateWarpOptions();
			(*options).hSrcDS = h_src_ds;
			(*options).hDstDS = h_dst_ds;

			(*options).papszWarpOptions =
				CSLSetNameValue((*options).papszWarpOptions, c"INIT_DEST".as_ptr(), c"NO_DATA".as_ptr());

			(*options).nBandCount = 1;
			let n = std::mem::size_of::<i32>();
			(*options).panSrcBands = CPLMalloc(n).cast::<i32>();
			(*options).panDstBands = CPLMalloc(n).cast::<i32>();
			(*options).panSrcBands.write(1);
			(*options).panDstBands.write(1);

			let m = std::mem::size_of::<f64>();
			(*options).padfDstNoDataReal = CPLMalloc(m).cast::<f64>();
			(*options).padfDstNoDataReal.write(f64::NAN);
			if let Some(nodata) = src_nodata {
				(*options).padfSrcNoDataReal = CPLMalloc(m).cast::<f64>();
				(*options).padfSrcNoDataReal.write(nodata);
			}

			(*options).eResampleAlg = resample.as_gdal();
			(*options).dfWarpMemoryLimit = 256.0 * 1024.0 * 1024.0;

			let transformer = GDALCreateGenImgProjTransformer2(h_src_ds, h_dst_ds, core::ptr::null_mut());
			if transformer.is_null() {
				GDALDestroyWarpOptions(options);
				bail!("failed to create transformer: {}", last_error());
			}
			(*options).pTransformerArg = transformer;
			(*options).pfnTransformer = Some(GDALGenImgProjTransform);

			let operation: GDALWarpOperationH = GDALCreateWarpOperation(options);
			let rv = GDALChunkAndWarpImage(operation, 0, 0, c_width, c_height);

			GDALDestroyWarpOperation(operation);
			GDALDestroyGenImgProjTransformer(transformer);
			GDALDestroyWarpOptions(options);

			if rv != CPLErr::CE_None {
				bail!("warping failed: {}", last_error());
			}
		}

		Ok(dst_ds)
	}

	/// Samples `bbox` into a raster window. Missing samples are NaN.
	pub fn read_window(&self, bbox: &MercatorBBox, width: u32, height: u32, resample: ResampleAlg) -> Result<RasterWindow> {
		let (w, h) = (width as usize, height as usize);
		let dst = self.warp_to_float_dataset(bbox, w, h, resample)?;
		let buffer = dst.rasterband(1)?.read_band_as::<f32>()?;
		let data = buffer.data();
		ensure!(
			data.len() == w * h,
			"band data length mismatch: expected {} but got {}",
			w * h,
			data.len()
		);
		RasterWindow::new(width, height, data.to_vec(), NoData::NaN)
	}
}

fn last_error() -> String {
	// SAFETY: GDAL returns a NUL-terminated, thread local buffer that is never null
	unsafe { std::ffi::CStr::from_ptr(gdal_sys::CPLGetLastErrorMsg()) }
		.to_string_lossy()
		.into_owned()
}
