//! Single slides.

use crate::{
	element::{Component, Host},
	error::Result,
	listener::on_settled,
	template::TemplateResult,
};
use tracing::{error, instrument, trace};
use wasm_bindgen::JsCast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideVariant {
	Basic,
	/// Plays its first `<video>` while active.
	Video,
}

impl SlideVariant {
	#[must_use]
	pub fn of(element: &web_sys::Element) -> Self {
		if element.tag_name().eq_ignore_ascii_case("slidem-video-slide") || element.has_attribute("video") {
			Self::Video
		} else {
			Self::Basic
		}
	}
}

/// A slide's position relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Active,
	Previous,
	Next,
	/// Further away.
	None,
}

impl Role {
	#[must_use]
	pub fn of(index: usize, current: usize) -> Self {
		if index == current {
			Self::Active
		} else if index + 1 == current {
			Self::Previous
		} else if index == current + 1 {
			Self::Next
		} else {
			Self::None
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Forward,
	Backward,
}

/// Shadow content of a slide: a background layer and the slotted content.
pub struct SlideView {
	background: Option<String>,
}

impl Component for SlideView {
	const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["background"];

	fn template(&self) -> Option<TemplateResult> {
		let background = self.background.as_deref().map_or_else(String::new, |background| format!("background: {}", background));
		Some(crate::html!(
			"<div id=\"background\" part=\"background\" style=\"{}\"></div><div id=\"content\" part=\"content\"><slot></slot></div>",
			background
		))
	}

	fn attribute_changed(&mut self, _element: &web_sys::HtmlElement, name: &str, _old: Option<&str>, new: Option<&str>) -> bool {
		if name == "background" {
			self.background = new.map(str::to_owned);
		}
		true
	}
}

/// A slide element of a deck.
pub struct Slide {
	host: Host<SlideView>,
	variant: SlideVariant,
	reveals: Vec<web_sys::Element>,
}

impl Slide {
	/// Whether `element` is a slide as far as its deck is concerned.
	#[must_use]
	pub fn is_slide(element: &web_sys::Element) -> bool {
		let tag = element.tag_name();
		tag.eq_ignore_ascii_case("slidem-slide") || tag.eq_ignore_ascii_case("slidem-video-slide") || element.has_attribute("slidem-slide")
	}

	/// # Errors
	///
	/// Iff upgrading the element fails.
	#[instrument(skip(element))]
	pub fn upgrade(element: web_sys::HtmlElement) -> Result<Self> {
		let variant = SlideVariant::of(&element);
		let found = element.query_selector_all("[reveal]")?;
		let reveals = (0..found.length()).filter_map(|i| found.item(i)).filter_map(|node| node.dyn_into::<web_sys::Element>().ok()).collect::<Vec<_>>();
		trace!(?variant, reveals = reveals.len(), "Upgrading slide.");
		Ok(Self {
			host: Host::upgrade(element, SlideView { background: None })?,
			variant,
			reveals,
		})
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::HtmlElement {
		self.host.element()
	}

	#[must_use]
	pub fn variant(&self) -> SlideVariant {
		self.variant
	}

	/// Number of `reveal` descendants, which is also the last step index.
	#[must_use]
	pub fn steps(&self) -> usize {
		self.reveals.len()
	}

	/// Text of the first `[notes]` descendant, for the presenter view.
	#[must_use]
	pub fn notes(&self) -> Option<String> {
		self.element().query_selector("[notes]").ok().flatten().and_then(|notes| notes.text_content()).map(|notes| notes.trim().to_owned())
	}

	/// Marks the first `step` `reveal` elements `visible`.
	///
	/// # Errors
	///
	/// Iff setting an attribute throws.
	pub fn set_step(&self, step: usize) -> Result<()> {
		self.element().set_attribute("step", &step.to_string())?;
		for (i, reveal) in self.reveals.iter().enumerate() {
			reveal.toggle_attribute_with_force("visible", i < step)?;
		}
		Ok(())
	}

	/// # Errors
	///
	/// Iff setting an attribute throws.
	pub fn set_role(&self, role: Role) -> Result<()> {
		let element = self.element();
		let was_active = element.has_attribute("active");
		element.toggle_attribute_with_force("active", role == Role::Active)?;
		element.toggle_attribute_with_force("previous", role == Role::Previous)?;
		element.toggle_attribute_with_force("next", role == Role::Next)?;

		if self.variant == SlideVariant::Video && was_active != (role == Role::Active) {
			self.set_playing(role == Role::Active);
		}
		Ok(())
	}

	/// Sets the classes the stylesheet animates transitions with.
	///
	/// # Errors
	///
	/// Iff the class list can't be changed.
	pub fn animate(&self, direction: Direction, entering: bool) -> Result<()> {
		let classes = self.element().class_list();
		classes.toggle_with_force("in", entering)?;
		classes.toggle_with_force("out", !entering)?;
		classes.toggle_with_force("forward", direction == Direction::Forward)?;
		classes.toggle_with_force("backward", direction == Direction::Backward)?;
		Ok(())
	}

	/// # Errors
	///
	/// Iff the class list can't be changed.
	pub fn clear_animation(&self) -> Result<()> {
		Ok(self.element().class_list().remove_4("in", "out", "forward", "backward")?)
	}

	fn set_playing(&self, playing: bool) {
		let video: web_sys::HtmlMediaElement = match self.element().query_selector("video") {
			Ok(Some(video)) => video.unchecked_into(),
			Ok(None) => return,
			Err(error) => return error!("Failed to look up slide video: {:?}", error),
		};
		if playing {
			match video.play() {
				// Autoplay policies may refuse.
				Ok(promise) => on_settled(&promise, |_| trace!("Video playing."), |reason| error!("Video didn't start: {:?}", reason)),
				Err(error) => error!("Failed to play video: {:?}", error),
			}
		} else {
			if let Err(error) = video.pause() {
				error!("Failed to pause video: {:?}", error);
			}
			video.set_current_time(0.0);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roles_around_the_current_slide() {
		let roles: Vec<Role> = (0..5).map(|i| Role::of(i, 2)).collect();
		assert_eq!(roles, [Role::None, Role::Previous, Role::Active, Role::Next, Role::None]);
		assert_eq!(Role::of(0, 0), Role::Active);
		assert_eq!(Role::of(1, 0), Role::Next);
	}
}
