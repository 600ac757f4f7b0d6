//! Pixel encoding of sampled tiles and the lossless image codecs used to store them.

pub mod encoder;
pub mod format;

pub use encoder::*;
pub use format::*;
pub use image::{Rgba, RgbaImage};
