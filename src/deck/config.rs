//! Per-deck settings, read from attributes of the `slidem-deck` element.

use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct DeckConfig {
	/// How long to wait for `document.fonts.ready` before showing the deck anyway, in milliseconds.
	pub font_timeout: i32,
	/// Minimum horizontal touch travel, in CSS pixels, that counts as a swipe.
	pub swipe_threshold: f64,
	/// Quiet period after the last `resize` before rescaling, in milliseconds.
	pub resize_debounce: i32,
	/// `localStorage` entry the current location is mirrored into.
	pub storage_key: String,
	/// Size the slides are authored for. The deck is scaled to fit it into the viewport.
	pub design_width: f64,
	pub design_height: f64,
}

impl Default for DeckConfig {
	fn default() -> Self {
		Self {
			font_timeout: 3000,
			swipe_threshold: 50.0,
			resize_debounce: 100,
			storage_key: "location".to_owned(),
			design_width: 1920.0,
			design_height: 1080.0,
		}
	}
}

impl DeckConfig {
	/// Attributes [`DeckConfig::from_element`] reads.
	pub const ATTRIBUTES: &'static [&'static str] = &["font-timeout", "swipe-threshold", "resize-debounce", "storage-key", "design-width", "design-height"];

	/// Defaults, overridden by whichever [`ATTRIBUTES`](`DeckConfig::ATTRIBUTES`) are present.
	#[must_use]
	pub fn from_element(element: &web_sys::Element) -> Self {
		let mut config = Self::default();
		for &name in Self::ATTRIBUTES {
			if let Some(value) = element.get_attribute(name) {
				config.apply(name, &value);
			}
		}
		config
	}

	/// Sets one setting from its attribute. Unknown names and unparseable or non-positive values are logged and ignored.
	pub fn apply(&mut self, name: &str, value: &str) {
		let value = value.trim();
		match name {
			"font-timeout" => set_positive(&mut self.font_timeout, name, value),
			"swipe-threshold" => set_positive(&mut self.swipe_threshold, name, value),
			"resize-debounce" => set_positive(&mut self.resize_debounce, name, value),
			"storage-key" if !value.is_empty() => self.storage_key = value.to_owned(),
			"design-width" => set_positive(&mut self.design_width, name, value),
			"design-height" => set_positive(&mut self.design_height, name, value),
			_ => warn!(name, value, "Ignored deck setting."),
		}
	}

	/// Factor that fits the design size into `width` × `height`, preserving the aspect ratio.
	#[must_use]
	pub fn scale(&self, width: f64, height: f64) -> f64 {
		(width / self.design_width).min(height / self.design_height)
	}
}

fn set_positive<T: FromStr + PartialOrd + Default>(setting: &mut T, name: &str, value: &str) {
	match value.parse::<T>() {
		Ok(parsed) if parsed > T::default() => *setting = parsed,
		_ => warn!(name, value, "Expected a positive number. Keeping the previous setting."),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn overrides() {
		let mut config = DeckConfig::default();
		config.apply("font-timeout", "500");
		config.apply("swipe-threshold", " 80.5 ");
		config.apply("storage-key", "talk");
		config.apply("design-width", "1280");
		config.apply("design-height", "720");
		assert_eq!(
			config,
			DeckConfig {
				font_timeout: 500,
				swipe_threshold: 80.5,
				resize_debounce: 100,
				storage_key: "talk".to_owned(),
				design_width: 1280.0,
				design_height: 720.0,
			}
		);
	}

	#[test]
	fn invalid_values_keep_defaults() {
		let mut config = DeckConfig::default();
		config.apply("font-timeout", "soon");
		config.apply("resize-debounce", "-5");
		config.apply("design-width", "0");
		config.apply("storage-key", "  ");
		config.apply("colour", "blue");
		assert_eq!(config, DeckConfig::default());
	}

	#[test]
	fn scale_fits_the_smaller_dimension() {
		let config = DeckConfig::default();
		assert!((config.scale(960.0, 1080.0) - 0.5).abs() < f64::EPSILON);
		assert!((config.scale(3840.0, 1080.0) - 1.0).abs() < f64::EPSILON);
	}
}
