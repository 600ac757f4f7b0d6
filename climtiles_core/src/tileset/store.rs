//! Persistence of `index.json`.

use super::{TilesetMetadata, merge_series};
use crate::TilingError;
use anyhow::{Context, Result};
use std::{
	fs,
	io::{BufWriter, Write},
	path::{Path, PathBuf},
};

/// Reads and writes the `index.json` of one tileset folder.
///
/// Every write replaces the whole file through a temporary file in the same directory
/// followed by a rename, so readers never observe a truncated index. Two builds merging
/// into the same folder at the same time can still lose one series; callers serialize them.
#[derive(Clone, Debug)]
pub struct MetadataStore {
	path: PathBuf,
}

impl MetadataStore {
	pub fn new(path: impl Into<PathBuf>) -> MetadataStore {
		MetadataStore { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Parses the index if it exists.
	pub fn read(&self) -> Result<Option<TilesetMetadata>> {
		if !self.path.is_file() {
			return Ok(None);
		}
		let text = fs::read_to_string(&self.path).with_context(|| format!("reading {:?}", self.path))?;
		let meta = serde_json::from_str(&text).with_context(|| format!("parsing tileset index {:?}", self.path))?;
		Ok(Some(meta))
	}

	/// Fails with a configuration error if an index exists and decodes its tiles differently
	/// from `record`. Nothing is written.
	pub fn ensure_mergeable(&self, record: &TilesetMetadata) -> Result<()> {
		match self.read()? {
			Some(existing) => existing
				.ensure_mergeable(record)
				.with_context(|| format!("adding a series to {:?}", self.path)),
			None => Ok(()),
		}
	}

	/// Writes `record` if no index exists yet; otherwise appends its series to the stored
	/// record, re-sorts the series and rewrites the file. Returns what was written.
	///
	/// A stored index with another tile size, format or encoding is left untouched and a
	/// configuration error is returned. Differing bounds only log a warning.
	pub fn merge_or_create(&self, record: &TilesetMetadata) -> Result<TilesetMetadata> {
		let merged = match self.read()? {
			None => {
				log::debug!("creating tileset index {:?}", self.path);
				record.clone()
			}
			Some(existing) => {
				existing
					.ensure_mergeable(record)
					.with_context(|| format!("adding a series to {:?}", self.path))?;
				if !existing.layout_mismatches(record).is_empty() {
					log::warn!(
						"new series covers other bounds than {:?}; keeping the stored bounds",
						self.path
					);
				}
				let merged = merge_series(existing, record);
				log::debug!("merging into tileset index {:?}, now {} series", self.path, merged.series.len());
				merged
			}
		};
		self.write(&merged)?;
		Ok(merged)
	}

	/// Atomically replaces the index with `meta`.
	pub fn write(&self, meta: &TilesetMetadata) -> Result<()> {
		self.write_atomic(meta).with_context(|| {
			TilingError::TileIo(format!("writing tileset index {:?}", self.path))
		})
	}

	fn write_atomic(&self, meta: &TilesetMetadata) -> Result<()> {
		let dir = match self.path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir,
			_ => Path::new("."),
		};
		fs::create_dir_all(dir).with_context(|| format!("creating directory {dir:?}"))?;

		let mut file = tempfile::NamedTempFile::new_in(dir)?;
		{
			let mut writer = BufWriter::new(file.as_file_mut());
			serde_json::to_writer_pretty(&mut writer, meta)?;
			writer.flush()?;
		}
		file.as_file().sync_all()?;
		file.persist(&self.path).map_err(|e| e.error)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tileset::sample_record;
	use assert_fs::TempDir;
	use pretty_assertions::assert_eq;

	#[test]
	fn read_missing_file() -> Result<()> {
		let dir = TempDir::new()?;
		assert_eq!(MetadataStore::new(dir.path().join("index.json")).read()?, None);
		Ok(())
	}

	#[test]
	fn create_then_merge() -> Result<()> {
		let dir = TempDir::new()?;
		let store = MetadataStore::new(dir.path().join("tropical_nights/index.json"));

		let first = store.merge_or_create(&sample_record(Some(2.0)))?;
		assert_eq!(first.series.len(), 1);
		assert_eq!(store.read()?, Some(first.clone()));

		let second = store.merge_or_create(&sample_record(Some(1.5)))?;
		let values: Vec<Option<f64>> = second.series.iter().map(|s| s.series_axis_value).collect();
		assert_eq!(values, vec![Some(1.5), Some(2.0)]);

		let mut expected = first;
		expected.series = second.series.clone();
		assert_eq!(store.read()?, Some(expected));
		Ok(())
	}

	#[test]
	fn writes_two_space_indented_utf8() -> Result<()> {
		let dir = TempDir::new()?;
		let store = MetadataStore::new(dir.path().join("index.json"));
		store.merge_or_create(&sample_record(Some(1.5)))?;
		let text = fs::read_to_string(store.path())?;
		assert!(text.starts_with("{\n  \"name\": \"Tropical nights\",\n  \"description\""));
		assert!(text.contains("\"Météo-France\""));
		assert!(text.contains("\"tileUrlPattern\": \"1-5/{z}/{x}/{y}.webp\""));
		Ok(())
	}

	#[test]
	fn unknown_keys_survive_a_merge() -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join("index.json");
		let mut value = serde_json::to_value(sample_record(Some(1.0)))?;
		value["legend"] = serde_json::json!({ "min": 0, "max": 40 });
		value["rasterEncoding"]["noDataValue"] = serde_json::json!(0);
		value["series"][0]["label"] = serde_json::json!("SSP2-4.5");
		fs::write(&path, serde_json::to_string_pretty(&value)?)?;

		let store = MetadataStore::new(&path);
		store.merge_or_create(&sample_record(Some(3.0)))?;
		let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
		assert_eq!(written["legend"]["max"], 40);
		assert_eq!(written["rasterEncoding"]["noDataValue"], 0);
		assert_eq!(written["series"][0]["label"], "SSP2-4.5");
		assert_eq!(written["series"][0]["tileUrlPattern"], "1-0/{z}/{x}/{y}.webp");
		assert_eq!(written["series"][1].get("label"), None);
		assert_eq!(written["series"].as_array().map(Vec::len), Some(2));
		Ok(())
	}

	#[test]
	fn different_encoding_is_not_merged() -> Result<()> {
		let dir = TempDir::new()?;
		let store = MetadataStore::new(dir.path().join("index.json"));
		let stored = store.merge_or_create(&sample_record(Some(1.5)))?;
		let before = fs::read_to_string(store.path())?;

		let mut other = sample_record(Some(2.7));
		other.raster_encoding.polynomial_slope = 0.1;
		assert!(store.ensure_mergeable(&other).is_err());
		let err = store.merge_or_create(&other).unwrap_err();
		assert!(matches!(TilingError::of(&err), Some(TilingError::Configuration(_))));
		assert!(format!("{err:#}").contains("rasterEncoding"), "{err:#}");

		assert_eq!(fs::read_to_string(store.path())?, before);
		assert_eq!(store.read()?, Some(stored));
		Ok(())
	}

	#[test]
	fn mismatching_layout_keeps_stored_fields() -> Result<()> {
		let dir = TempDir::new()?;
		let store = MetadataStore::new(dir.path().join("index.json"));
		let stored = store.merge_or_create(&sample_record(Some(1.0)))?;

		let mut other = sample_record(Some(2.0));
		other.bounds = [0.0, 0.0, 1.0, 1.0];
		let merged = store.merge_or_create(&other)?;
		assert_eq!(merged.bounds, stored.bounds);
		assert_eq!(merged.series.len(), 2);
		Ok(())
	}

	#[test]
	fn corrupt_index_is_reported() -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join("index.json");
		fs::write(&path, "{ not json")?;
		let err = MetadataStore::new(&path).merge_or_create(&sample_record(None)).unwrap_err();
		assert!(err.to_string().starts_with("parsing tileset index"));
		// the broken file is left untouched
		assert_eq!(fs::read_to_string(&path)?, "{ not json");
		Ok(())
	}

	#[test]
	fn no_temporary_files_are_left_behind() -> Result<()> {
		let dir = TempDir::new()?;
		let store = MetadataStore::new(dir.path().join("index.json"));
		store.merge_or_create(&sample_record(Some(1.0)))?;
		store.merge_or_create(&sample_record(Some(2.0)))?;
		let names: Vec<String> = fs::read_dir(dir.path())?
			.map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
			.collect::<std::io::Result<_>>()?;
		assert_eq!(names, vec!["index.json".to_string()]);
		Ok(())
	}
}
