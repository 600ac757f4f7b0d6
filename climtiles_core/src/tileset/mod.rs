//! The tileset index (`index.json`): its record model, the series merge and its persistence.

mod record;
pub use record::*;

mod store;
pub use store::*;

#[cfg(test)]
use crate::{MercatorBBox, Quantization, RasterFormat, ZoomRange};

#[cfg(test)]
pub(crate) fn sample_record(axis: Option<f64>) -> TilesetMetadata {
	let info = TilesetInfo {
		name: "Tropical nights".to_string(),
		description: "Days with a minimum temperature above 20 °C".to_string(),
		attribution: "Météo-France".to_string(),
		pixel_unit: "days".to_string(),
		series_axis_name: "TRACC °C".to_string(),
		series_axis_unit: "°C".to_string(),
	};
	let pattern = match axis {
		Some(v) => format!("{}/{{z}}/{{x}}/{{y}}.webp", format!("{v:?}").replace('.', "-")),
		None => "{z}/{x}/{y}.webp".to_string(),
	};
	TilesetMetadata::build_record(
		&info,
		&MercatorBBox::new(-600_000.0, 5_000_000.0, 1_100_000.0, 6_700_000.0).unwrap(),
		ZoomRange::new(0, 5).unwrap(),
		512,
		RasterFormat::Webp,
		&Quantization::from_letters(0.0, 1.0, "r").unwrap(),
		SeriesEntry::new(pattern, axis),
	)
}

