//! Image container used for the encoded tiles of a pyramid.
//!
//! ```
//! use climtiles_core::RasterFormat;
//!
//! let format: RasterFormat = "PNG".parse().unwrap();
//! assert_eq!(format, RasterFormat::Png);
//! assert_eq!(format.extension(), "png");
//! assert_eq!(RasterFormat::default().to_string(), "webp");
//! ```

use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lossless raster containers supported for encoded tiles.
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
	#[default]
	Webp,
	Png,
}

impl RasterFormat {
	/// File extension without the leading dot.
	pub fn extension(&self) -> &'static str {
		match self {
			RasterFormat::Webp => "webp",
			RasterFormat::Png => "png",
		}
	}

	pub fn try_from_str(value: &str) -> Result<Self> {
		Ok(match value.trim().to_lowercase().as_str() {
			"webp" => RasterFormat::Webp,
			"png" => RasterFormat::Png,
			_ => bail!("unknown raster format '{value}', expected 'webp' or 'png'"),
		})
	}
}

impl FromStr for RasterFormat {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		RasterFormat::try_from_str(s)
	}
}

impl fmt::Display for RasterFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("webp", RasterFormat::Webp)]
	#[case(" WebP ", RasterFormat::Webp)]
	#[case("png", RasterFormat::Png)]
	fn parse(#[case] text: &str, #[case] expected: RasterFormat) {
		assert_eq!(text.parse::<RasterFormat>().unwrap(), expected);
	}

	#[test]
	fn parse_unknown() {
		assert_eq!(
			"jpg".parse::<RasterFormat>().unwrap_err().to_string(),
			"unknown raster format 'jpg', expected 'webp' or 'png'"
		);
	}

	#[test]
	fn serde_uses_lowercase_names() {
		assert_eq!(serde_json::to_string(&RasterFormat::Png).unwrap(), "\"png\"");
		let format: RasterFormat = serde_json::from_str("\"webp\"").unwrap();
		assert_eq!(format, RasterFormat::Webp);
	}
}
