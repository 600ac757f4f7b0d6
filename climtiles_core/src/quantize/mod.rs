//! Affine quantization of scalar samples into one to three color bytes.
//!
//! A value is mapped to `round((value - offset) / step)` and split big-endian over the
//! configured channels. Values below `offset` are clamped to `offset`; values above the
//! largest representable integer saturate at that integer and are reported as saturated.
//!
//! ```
//! use climtiles_core::Quantization;
//!
//! let q = Quantization::from_letters(-20.0, 0.01, "rg").unwrap();
//! let (pixel, saturated) = q.to_pixel(5.0).unwrap();
//! assert_eq!(pixel, [9, 196, 0, 255]);
//! assert!(!saturated);
//! assert!((q.decode_pixel(pixel).unwrap() - 5.0).abs() < 0.005);
//! ```

mod nodata;
pub use nodata::*;

use crate::TilingError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One color channel of an RGBA pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
	R,
	G,
	B,
}

impl Channel {
	/// Position of the channel in an RGBA pixel.
	pub fn index(self) -> usize {
		match self {
			Channel::R => 0,
			Channel::G => 1,
			Channel::B => 2,
		}
	}

	pub fn letter(self) -> char {
		match self {
			Channel::R => 'r',
			Channel::G => 'g',
			Channel::B => 'b',
		}
	}

	fn from_letter(c: char) -> Option<Channel> {
		match c.to_ascii_lowercase() {
			'r' => Some(Channel::R),
			'g' => Some(Channel::G),
			'b' => Some(Channel::B),
			_ => None,
		}
	}
}

/// Which pixel channels carry the encoded integer, most significant byte first.
///
/// Parsed once from letters such as `"r"`, `"rg"`, `"gb"` or `"rgb"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelLayout {
	One(Channel),
	Two(Channel, Channel),
	Three(Channel, Channel, Channel),
}

impl ChannelLayout {
	pub fn channel_count(&self) -> u8 {
		match self {
			ChannelLayout::One(_) => 1,
			ChannelLayout::Two(..) => 2,
			ChannelLayout::Three(..) => 3,
		}
	}

	/// Channels in significance order.
	pub fn channels(&self) -> Vec<Channel> {
		match *self {
			ChannelLayout::One(a) => vec![a],
			ChannelLayout::Two(a, b) => vec![a, b],
			ChannelLayout::Three(a, b, c) => vec![a, b, c],
		}
	}

	/// RGBA positions of the channels in significance order; unused entries are `None`.
	pub fn slots(&self) -> [Option<usize>; 3] {
		match *self {
			ChannelLayout::One(a) => [Some(a.index()), None, None],
			ChannelLayout::Two(a, b) => [Some(a.index()), Some(b.index()), None],
			ChannelLayout::Three(a, b, c) => [Some(a.index()), Some(b.index()), Some(c.index())],
		}
	}

	pub fn as_letters(&self) -> String {
		self.channels().into_iter().map(Channel::letter).collect()
	}

	/// Largest integer the layout can hold, `2^(8 * channels) - 1`.
	pub fn max_encoded(&self) -> u32 {
		max_encoded(self.channel_count())
	}
}

impl FromStr for ChannelLayout {
	type Err = anyhow::Error;

	fn from_str(letters: &str) -> Result<Self> {
		let fail = |reason: &str| -> anyhow::Error {
			TilingError::Configuration(format!("invalid channels {letters:?}: {reason}")).into()
		};

		let mut channels = Vec::with_capacity(3);
		for c in letters.trim().chars() {
			let channel = Channel::from_letter(c).ok_or_else(|| fail("only the letters r, g and b are allowed"))?;
			if channels.contains(&channel) {
				return Err(fail("a channel must not repeat"));
			}
			channels.push(channel);
		}

		Ok(match channels[..] {
			[a] => ChannelLayout::One(a),
			[a, b] => ChannelLayout::Two(a, b),
			[a, b, c] => ChannelLayout::Three(a, b, c),
			_ => return Err(fail("expected one to three letters")),
		})
	}
}

impl TryFrom<String> for ChannelLayout {
	type Error = anyhow::Error;

	fn try_from(value: String) -> Result<Self> {
		value.parse()
	}
}

impl From<ChannelLayout> for String {
	fn from(layout: ChannelLayout) -> String {
		layout.as_letters()
	}
}

impl fmt::Display for ChannelLayout {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.as_letters())
	}
}

/// Result of quantizing one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoded {
	pub value: u32,
	/// The value did not fit and was clamped to the largest representable integer.
	pub saturated: bool,
}

fn max_encoded(channels: u8) -> u32 {
	((1u64 << (8 * u32::from(channels))) - 1) as u32
}

/// Quantizes `value` with the affine map `round((value - offset) / step)`.
///
/// Returns `None` for a step that is not a positive finite number, for a channel count
/// outside `1..=3` and for a NaN value.
pub fn encode_value(value: f64, offset: f64, step: f64, channels: u8) -> Option<Encoded> {
	if !(step > 0.0 && step.is_finite()) || !(1..=3).contains(&channels) || value.is_nan() {
		return None;
	}
	let max = max_encoded(channels);
	let scaled = ((value.max(offset) - offset) / step).round();
	if scaled > f64::from(max) {
		Some(Encoded {
			value: max,
			saturated: true,
		})
	} else {
		Some(Encoded {
			value: scaled as u32,
			saturated: false,
		})
	}
}

/// Splits `encoded` over the first `channels` bytes, most significant byte first.
pub fn split_channels(encoded: u32, channels: u8) -> [u8; 3] {
	let mut bytes = [0u8; 3];
	let n = usize::from(channels.min(3));
	for (i, byte) in bytes.iter_mut().take(n).enumerate() {
		*byte = (encoded >> (8 * (n - 1 - i))) as u8;
	}
	bytes
}

/// Reconstructs a value from big-endian `bytes`.
pub fn decode_channels(bytes: &[u8], offset: f64, step: f64) -> f64 {
	let encoded = bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
	f64::from(encoded) * step + offset
}

/// A validated quantization: offset, step and the channels carrying the result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantization {
	pub offset: f64,
	pub step: f64,
	pub layout: ChannelLayout,
}

impl Quantization {
	pub fn new(offset: f64, step: f64, layout: ChannelLayout) -> Result<Quantization> {
		if !offset.is_finite() {
			return Err(TilingError::Configuration(format!("lowest value must be finite, got {offset}")).into());
		}
		if !(step > 0.0 && step.is_finite()) {
			return Err(TilingError::Configuration(format!("value step must be positive, got {step}")).into());
		}
		Ok(Quantization { offset, step, layout })
	}

	pub fn from_letters(offset: f64, step: f64, letters: &str) -> Result<Quantization> {
		Quantization::new(offset, step, letters.parse()?)
	}

	pub fn channel_count(&self) -> u8 {
		self.layout.channel_count()
	}

	/// Quantizes one value; `None` for NaN.
	pub fn encode(&self, value: f64) -> Option<Encoded> {
		encode_value(value, self.offset, self.step, self.channel_count())
	}

	/// RGBA pixel for a valid sample, plus whether it saturated. `None` for NaN.
	pub fn to_pixel(&self, value: f64) -> Option<([u8; 4], bool)> {
		let encoded = self.encode(value)?;
		let bytes = split_channels(encoded.value, self.channel_count());
		let mut pixel = [0, 0, 0, 255];
		for (byte, slot) in bytes.iter().zip(self.layout.slots()) {
			if let Some(index) = slot {
				pixel[index] = *byte;
			}
		}
		Some((pixel, encoded.saturated))
	}

	/// Value stored in a pixel written by [`Quantization::to_pixel`]; `None` when the pixel is masked.
	pub fn decode_pixel(&self, pixel: [u8; 4]) -> Option<f64> {
		if pixel[3] == 0 {
			return None;
		}
		let bytes: Vec<u8> = self.layout.slots().iter().flatten().map(|i| pixel[*i]).collect();
		Some(decode_channels(&bytes, self.offset, self.step))
	}
}
