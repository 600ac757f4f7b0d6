//! Batch files: several builds in one YAML document.
//!
//! ```yaml
//! builds:
//!   - input: data/tasmax_ssp245.tif
//!     output: tiles
//!     identifier: tasmax
//!     max_zoom: 6
//!     lowest_value: -20
//!     value_step: 0.01
//!     channels: rg
//!     meta_series_axis_value: 2.7
//! ```
//!
//! Relative `input` and `output` paths are taken relative to the folder of the batch file.

use anyhow::{Context, Result, ensure};
use climtiles_pipeline::BuildConfig;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
	/// Builds in the order they run.
	pub builds: Vec<BuildConfig>,
}

impl BatchConfig {
	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let text = fs::read_to_string(path).with_context(|| format!("opening batch file {path:?}"))?;
		let mut cfg = BatchConfig::from_string(&text).with_context(|| format!("parsing batch file {path:?}"))?;
		ensure!(!cfg.builds.is_empty(), "batch file {path:?} lists no builds");

		let base = path.parent().unwrap_or_else(|| Path::new(""));
		cfg.resolve_paths(base);
		Ok(cfg)
	}

	pub fn resolve_paths(&mut self, base: &Path) {
		for build in &mut self.builds {
			build.resolve_paths(base);
		}
	}
}
