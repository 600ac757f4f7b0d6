//! Builds quantized tile pyramids from a georeferenced raster.
//!
//! A [`PyramidBuilder`] reprojects the input once through a [`Reprojector`], samples every tile
//! of every requested zoom level from the resulting [`RasterSource`], encodes the samples into
//! lossless images and finally merges a series entry into the tileset's `index.json`.

pub mod builder;
pub mod config;
pub mod layout;
pub mod raw;
pub mod source;

pub use builder::*;
pub use config::*;
pub use layout::*;
pub use raw::*;
pub use source::*;
