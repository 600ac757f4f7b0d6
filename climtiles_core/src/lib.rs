//! Core types and rules for building quantized raster tile pyramids.
//!
//! - [`types`]: tile coordinates, Web Mercator boxes, per-zoom tile ranges and sample windows
//! - [`quantize`]: the affine value-to-byte encoding and nodata handling
//! - [`tileset`]: the `index.json` tileset record and its merge semantics
//! - [`error`]: classification of fatal failures

pub mod error;
pub mod quantize;
pub mod tileset;
pub mod types;

pub use error::*;
pub use quantize::*;
pub use tileset::*;
pub use types::*;
