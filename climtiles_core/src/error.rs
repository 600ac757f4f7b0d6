//! Classification of the failures that stop a build.
//!
//! Errors travel as [`anyhow::Error`]. A [`TilingError`] is attached to the chain either as the
//! root error or as context, so callers can recover the category with
//! `err.downcast_ref::<TilingError>()` no matter how much context was added afterwards.

use thiserror::Error;

/// Fatal error categories of a pyramid build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TilingError {
	/// Invalid zoom range, channel letters, value step or other option. Raised before any I/O.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The source raster could not be brought into the world projection.
	#[error("reprojection failed: {0}")]
	Reprojection(String),

	/// A tile, raw tile, directory or index file could not be written.
	#[error("tile i/o failed: {0}")]
	TileIo(String),

	/// The build was cancelled between two tiles.
	#[error("build cancelled")]
	Cancelled,
}

impl TilingError {
	/// Returns the category attached to `err`, if any.
	pub fn of(err: &anyhow::Error) -> Option<&TilingError> {
		err.downcast_ref::<TilingError>()
	}
}
