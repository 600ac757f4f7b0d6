/// Interpolation kernels GDAL may use when warping a tile window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResampleAlg {
	NearestNeighbour,
	/// 2×2 kernel; smooth and value preserving for continuous fields.
	#[default]
	Bilinear,
	Cubic,
	CubicSpline,
	Lanczos,
}

impl ResampleAlg {
	pub fn as_gdal(self) -> u32 {
		use gdal_sys::GDALResampleAlg::*;
		match self {
			ResampleAlg::NearestNeighbour => GRA_NearestNeighbour,
			ResampleAlg::Bilinear => GRA_Bilinear,
			ResampleAlg::Cubic => GRA_Cubic,
			ResampleAlg::CubicSpline => GRA_CubicSpline,
			ResampleAlg::Lanczos => GRA_Lanczos,
		}
	}
}
