//! Keyboard shortcuts that activate elements.
//!
//! Each key maps to an ordered list of targets. On `keydown`, the first visible target in that list is activated,
//! and dispatch continues to the next visible one only if the activated target was registered with `propagate`.
//! Targets registered with `override` go in front of all others. Otherwise, the most recent registration goes first.

use crate::{
	element::{Component, Host},
	error::Result,
	listener::EventListener,
	template::TemplateResult,
};
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::{instrument, trace, warn};

/// Something a key can activate.
pub trait KeyTarget {
	fn same_target(&self, other: &Self) -> bool;
	fn is_visible(&self) -> bool;
	fn activate(&self);
}

impl KeyTarget for web_sys::HtmlElement {
	fn same_target(&self, other: &Self) -> bool {
		self.is_same_node(Some(other))
	}

	/// Elements that aren't rendered (`display: none` on them or an ancestor) have no layout box.
	fn is_visible(&self) -> bool {
		self.offset_parent().is_some() || self.offset_width() > 0 || self.offset_height() > 0
	}

	fn activate(&self) {
		self.click()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingOptions {
	/// Go in front of non-override registrations for the same key.
	pub override_: bool,
	/// Let dispatch continue to the next target after this one.
	pub propagate: bool,
}

#[derive(Debug, Clone)]
struct Binding<T> {
	target: T,
	options: BindingOptions,
}

/// The key → targets map, without any DOM wiring.
#[derive(Debug, Clone)]
pub struct KeybindingRegistry<T> {
	bindings: HashMap<String, Vec<Binding<T>>>,
}

impl<T> Default for KeybindingRegistry<T> {
	fn default() -> Self {
		Self { bindings: HashMap::new() }
	}
}

impl<T: KeyTarget + Clone> KeybindingRegistry<T> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `target` to `key`, replacing an existing registration of the same target for that key.
	pub fn register(&mut self, key: &str, target: T, options: BindingOptions) {
		self.unregister(key, &target);
		let bindings = self.bindings.entry(key.to_owned()).or_default();
		let position = if options.override_ { 0 } else { bindings.iter().take_while(|binding| binding.options.override_).count() };
		bindings.insert(position, Binding { target, options });
		trace!(key, position, "Registered key binding.");
	}

	/// Returns whether `target` was registered for `key`.
	pub fn unregister(&mut self, key: &str, target: &T) -> bool {
		let bindings = match self.bindings.get_mut(key) {
			Some(bindings) => bindings,
			None => return false,
		};
		let position = match bindings.iter().position(|binding| binding.target.same_target(target)) {
			Some(position) => position,
			None => return false,
		};
		bindings.remove(position);
		if bindings.is_empty() {
			self.bindings.remove(key);
		}
		true
	}

	/// Snapshot of the targets for `key`, in dispatch order.
	#[must_use]
	pub fn targets(&self, key: &str) -> Vec<T> {
		self.bindings.get(key).map_or_else(Vec::new, |bindings| bindings.iter().map(|binding| binding.target.clone()).collect())
	}

	/// Activates the targets for `key` as described in the [module documentation](`self`).
	///
	/// Returns how many targets were activated.
	pub fn dispatch(&self, key: &str) -> usize {
		let bindings: Vec<Binding<T>> = match self.bindings.get(key) {
			Some(bindings) => bindings.clone(),
			None => return 0,
		};
		let mut activated = 0;
		for binding in bindings.iter().filter(|binding| binding.target.is_visible()) {
			binding.target.activate();
			activated += 1;
			if !binding.options.propagate {
				break;
			}
		}
		activated
	}
}

/// A [`KeybindingRegistry`] for elements, with the document-level `keydown` listener that feeds it.
pub struct KeybindingService {
	registry: Rc<RefCell<KeybindingRegistry<web_sys::HtmlElement>>>,
	_listener: EventListener,
}

impl KeybindingService {
	/// # Errors
	///
	/// Iff the `keydown` listener can't be installed.
	#[instrument(skip(document))]
	pub fn install(document: &web_sys::Document) -> Result<Rc<Self>> {
		let registry = Rc::new(RefCell::new(KeybindingRegistry::new()));
		let listener = {
			let registry = Rc::downgrade(&registry);
			EventListener::typed(document, "keydown", move |event: web_sys::KeyboardEvent| {
				let registry = match registry.upgrade() {
					Some(registry) => registry,
					None => return,
				};
				if event.default_prevented() || event.ctrl_key() || event.meta_key() || event.alt_key() || is_editable_target(&event) {
					return;
				}
				// Activation may (un)register bindings, so the registry isn't borrowed while dispatching.
				let snapshot = registry.borrow().clone();
				if snapshot.dispatch(&event.key()) > 0 {
					event.prevent_default();
				}
			})?
		};
		Ok(Rc::new(Self { registry, _listener: listener }))
	}

	pub fn register(&self, key: &str, element: web_sys::HtmlElement, options: BindingOptions) {
		self.registry.borrow_mut().register(key, element, options)
	}

	pub fn unregister(&self, key: &str, element: &web_sys::HtmlElement) -> bool {
		self.registry.borrow_mut().unregister(key, element)
	}

	/// Dispatches `key` as if it had been pressed.
	pub fn dispatch(&self, key: &str) -> usize {
		let snapshot = self.registry.borrow().clone();
		snapshot.dispatch(key)
	}
}

fn is_editable_target(event: &web_sys::KeyboardEvent) -> bool {
	use wasm_bindgen::JsCast;
	event
		.target()
		.and_then(|target| target.dyn_into::<web_sys::HtmlElement>().ok())
		.map_or(false, |element| element.is_content_editable() || matches!(element.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT"))
}

/// Wraps a `slidem-keybinding` element.
///
/// Its `key` attribute names the key (as in `KeyboardEvent.key`) that clicks the element.
/// The boolean attributes `override` and `propagate` map onto [`BindingOptions`].
pub struct KeyBinding {
	service: Rc<KeybindingService>,
	registered: Option<(String, web_sys::HtmlElement)>,
	key: Option<String>,
	options: BindingOptions,
}

impl KeyBinding {
	/// # Errors
	///
	/// Iff upgrading the element fails.
	pub fn upgrade(element: web_sys::HtmlElement, service: Rc<KeybindingService>) -> Result<Host<Self>> {
		let host = Host::upgrade(
			element.clone(),
			Self {
				service,
				registered: None,
				key: None,
				options: BindingOptions::default(),
			},
		)?;
		// Attribute callbacks ran before the host existed, so registration happens now.
		host.update(|binding| binding.reregister(&element))?;
		Ok(host)
	}

	fn reregister(&mut self, element: &web_sys::HtmlElement) {
		if let Some((key, element)) = self.registered.take() {
			self.service.unregister(&key, &element);
		}
		match &self.key {
			Some(key) if !key.is_empty() => {
				self.service.register(key, element.clone(), self.options);
				self.registered = Some((key.clone(), element.clone()));
			}
			_ => warn!("Key binding without `key` attribute."),
		}
	}
}

impl Drop for KeyBinding {
	fn drop(&mut self) {
		if let Some((key, element)) = self.registered.take() {
			self.service.unregister(&key, &element);
		}
	}
}

impl Component for KeyBinding {
	const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["key", "override", "propagate"];

	fn template(&self) -> Option<TemplateResult> {
		Some(crate::html!("<slot></slot>"))
	}

	fn attribute_changed(&mut self, element: &web_sys::HtmlElement, name: &str, _old: Option<&str>, new: Option<&str>) -> bool {
		match name {
			"key" => self.key = new.map(str::to_owned),
			"override" => self.options.override_ = new.is_some(),
			"propagate" => self.options.propagate = new.is_some(),
			_ => return false,
		}
		if self.registered.is_some() {
			self.reregister(element);
		}
		false
	}
}
