//! The inclusive range of zoom levels a build produces.

use super::MAX_ZOOM_LEVEL;
use crate::TilingError;
use anyhow::Result;
use std::{fmt, ops::RangeInclusive};

/// Validated, inclusive range of zoom levels to build.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ZoomRange {
	pub min: u8,
	pub max: u8,
}

impl ZoomRange {
	/// Checks `0 <= min <= max <= MAX_ZOOM_LEVEL`.
	///
	/// Bounds are taken as signed integers so that negative values coming from a
	/// configuration file are reported instead of wrapping.
	pub fn new(min: i32, max: i32) -> Result<ZoomRange> {
		let fail = |msg: String| -> Result<ZoomRange> { Err(TilingError::Configuration(msg).into()) };
		if min < 0 || max < 0 {
			return fail(format!("zoom levels must not be negative (min_zoom {min}, max_zoom {max})"));
		}
		if min > max {
			return fail(format!("min_zoom ({min}) must be <= max_zoom ({max})"));
		}
		if max > i32::from(MAX_ZOOM_LEVEL) {
			return fail(format!("max_zoom ({max}) must be <= {MAX_ZOOM_LEVEL}"));
		}
		Ok(ZoomRange {
			min: min as u8,
			max: max as u8,
		})
	}

	pub fn levels(&self) -> RangeInclusive<u8> {
		self.min..=self.max
	}}

impl fmt::Display for ZoomRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}..={}", self.min, self.max)
	}
}
