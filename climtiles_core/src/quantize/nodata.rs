//! Nodata sentinels and the per-sample validity test.

use serde::{Deserialize, Serialize};

/// Marker for samples that carry no value.
///
/// NaN samples are treated as nodata whatever the sentinel is, because warped rasters fill
/// pixels outside the source extent with NaN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum NoData {
	/// No sentinel; only NaN samples are masked.
	#[default]
	None,
	/// Samples equal to this value are masked.
	Value(f64),
	/// The sentinel is NaN itself.
	NaN,
}

impl NoData {
	/// `true` if `sample` must be masked.
	pub fn is_nodata(&self, sample: f32) -> bool {
		if sample.is_nan() {
			return true;
		}
		match self {
			NoData::Value(v) => sample == *v as f32,
			NoData::None | NoData::NaN => false,
		}
	}
}
