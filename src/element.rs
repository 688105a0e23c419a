//! A minimal custom element base.
//!
//! Rust can't subclass `HTMLElement`, so components are attached to elements that already exist in the page ("upgraded").
//! The [`Host`] then plays the part of the element class: it owns the shadow root, renders the [`Component`]'s template into it,
//! and forwards attribute changes.

use crate::{
	error::{Error, Result},
	listener,
	template::{default_part_factory, PartFactory, RenderRoot, TemplateResult},
};
use hashbrown::HashMap;
use std::{
	cell::{Cell, Ref, RefCell},
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
	/// Render right away.
	Sync,
	/// Render in a microtask. Multiple deferred requests before then result in a single render.
	Deferred,
}

/// Behaviour and state of an upgraded element.
pub trait Component: 'static {
	/// Changes to these attributes are passed to [`Component::attribute_changed`].
	const OBSERVED_ATTRIBUTES: &'static [&'static str] = &[];

	/// What to render into the shadow root. [`None`] leaves it as is.
	fn template(&self) -> Option<TemplateResult> {
		None
	}

	fn part_factory(&self) -> Rc<dyn PartFactory> {
		default_part_factory()
	}

	/// Called once per observed attribute that's present during upgrade, and on each later change.
	///
	/// Returns whether to re-render (deferred).
	fn attribute_changed(&mut self, _element: &web_sys::HtmlElement, _name: &str, _old: Option<&str>, _new: Option<&str>) -> bool {
		true
	}
}

struct HostInner<C: Component> {
	element: web_sys::HtmlElement,
	shadow_root: web_sys::ShadowRoot,
	render_root: RefCell<RenderRoot>,
	component: RefCell<C>,
	pending: Cell<bool>,
	ids: RefCell<Option<HashMap<String, web_sys::Element>>>,
	observer: RefCell<Option<(web_sys::MutationObserver, Closure<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>)>>,
}

impl<C: Component> Drop for HostInner<C> {
	fn drop(&mut self) {
		if let Some((observer, _)) = self.observer.get_mut().take() {
			observer.disconnect();
		}
	}
}

/// An element upgraded with a [`Component`]. Cheap to clone.
pub struct Host<C: Component> {
	inner: Rc<HostInner<C>>,
}

impl<C: Component> Clone for Host<C> {
	fn clone(&self) -> Self {
		Self { inner: Rc::clone(&self.inner) }
	}
}

/// A [`Host`] that doesn't keep the component alive, for use in callbacks.
pub struct WeakHost<C: Component> {
	inner: Weak<HostInner<C>>,
}

impl<C: Component> Clone for WeakHost<C> {
	fn clone(&self) -> Self {
		Self { inner: Weak::clone(&self.inner) }
	}
}

impl<C: Component> WeakHost<C> {
	#[must_use]
	pub fn upgrade(&self) -> Option<Host<C>> {
		self.inner.upgrade().map(|inner| Host { inner })
	}
}

impl<C: Component> Host<C> {
	/// Attaches an open shadow root (or reuses the existing one), reports present observed attributes,
	/// renders synchronously and starts observing attribute changes.
	///
	/// # Errors
	///
	/// Iff the shadow root can't be attached, the first render fails or the attribute observer can't be installed.
	#[instrument(skip(component), fields(tag = %element.tag_name()))]
	pub fn upgrade(element: web_sys::HtmlElement, component: C) -> Result<Self> {
		let shadow_root = match element.shadow_root() {
			Some(shadow_root) => shadow_root,
			None => element.attach_shadow(&web_sys::ShadowRootInit::new(web_sys::ShadowRootMode::Open))?,
		};

		let host = Self {
			inner: Rc::new(HostInner {
				render_root: RefCell::new(RenderRoot::new(shadow_root.clone().into())),
				element,
				shadow_root,
				component: RefCell::new(component),
				pending: Cell::new(false),
				ids: RefCell::new(None),
				observer: RefCell::new(None),
			}),
		};

		{
			let element = &host.inner.element;
			let mut component = host.inner.component.borrow_mut();
			for &name in C::OBSERVED_ATTRIBUTES {
				if let Some(value) = element.get_attribute(name) {
					component.attribute_changed(element, name, None, Some(&value));
				}
			}
		}

		host.render(RenderMode::Sync)?;
		host.observe_attributes()?;
		Ok(host)
	}

	fn observe_attributes(&self) -> Result<()> {
		if C::OBSERVED_ATTRIBUTES.is_empty() {
			return Ok(());
		}

		let weak = self.downgrade();
		let callback = Closure::wrap(Box::new(move |records: js_sys::Array, _: web_sys::MutationObserver| {
			let host = match weak.upgrade() {
				Some(host) => host,
				None => return,
			};
			for record in records.iter() {
				let record: web_sys::MutationRecord = record.unchecked_into();
				if let Some(name) = record.attribute_name() {
					host.attribute_changed(&name, record.old_value().as_deref());
				}
			}
		}) as Box<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>);

		let observer = web_sys::MutationObserver::new(callback.as_ref().unchecked_ref())?;
		let init = web_sys::MutationObserverInit::new();
		init.set_attributes(true);
		init.set_attribute_old_value(true);
		init.set_attribute_filter(&C::OBSERVED_ATTRIBUTES.iter().map(|&name| JsValue::from_str(name)).collect::<js_sys::Array>());
		observer.observe_with_options(&self.inner.element, &init)?;

		*self.inner.observer.borrow_mut() = Some((observer, callback));
		Ok(())
	}

	fn attribute_changed(&self, name: &str, old: Option<&str>) {
		let span = trace_span!("attribute_changed", name);
		let _enter = span.enter();

		let new = self.inner.element.get_attribute(name);
		if old == new.as_deref() {
			return;
		}
		let render = self.inner.component.borrow_mut().attribute_changed(&self.inner.element, name, old, new.as_deref());
		if render {
			if let Err(error) = self.render(RenderMode::Deferred) {
				error!("Failed to schedule render: {}", error);
			}
		}
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakHost<C> {
		WeakHost { inner: Rc::downgrade(&self.inner) }
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::HtmlElement {
		&self.inner.element
	}

	#[must_use]
	pub fn shadow_root(&self) -> &web_sys::ShadowRoot {
		&self.inner.shadow_root
	}

	/// Looks up an element in the shadow root by `id`.
	///
	/// The index is built after the first synchronous render.
	#[must_use]
	pub fn by_id(&self, id: &str) -> Option<web_sys::Element> {
		self.inner.ids.borrow().as_ref().and_then(|ids| ids.get(id).cloned())
	}

	#[must_use]
	pub fn component(&self) -> Ref<'_, C> {
		self.inner.component.borrow()
	}

	/// Mutates the component and schedules a deferred render.
	///
	/// # Errors
	///
	/// Iff the render can't be scheduled.
	pub fn update<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R> {
		let result = f(&mut self.inner.component.borrow_mut());
		self.render(RenderMode::Deferred)?;
		Ok(result)
	}

	/// # Errors
	///
	/// Iff rendering fails ([`RenderMode::Sync`]) or the render can't be scheduled ([`RenderMode::Deferred`]).
	pub fn render(&self, mode: RenderMode) -> Result<()> {
		match mode {
			RenderMode::Sync => {
				self.inner.pending.set(false);
				self.render_now()
			}
			RenderMode::Deferred => {
				if self.inner.pending.replace(true) {
					trace!("Render already pending.");
					return Ok(());
				}
				let weak = self.downgrade();
				listener::queue_microtask(move || {
					let host = match weak.upgrade() {
						Some(host) => host,
						None => return,
					};
					// A synchronous render in the meantime already cleared the flag.
					if !host.inner.pending.replace(false) {
						return trace!("Deferred render superseded.");
					}
					if let Err(error) = host.render_now() {
						error!("Deferred render failed: {}", error);
					}
				})
			}
		}
	}

	fn render_now(&self) -> Result<()> {
		let (template, part_factory) = {
			let component = self.inner.component.borrow();
			(component.template(), component.part_factory())
		};
		if let Some(template) = template {
			self.inner.render_root.borrow_mut().render_with(template, part_factory)?;
		}

		if self.inner.ids.borrow().is_none() {
			*self.inner.ids.borrow_mut() = Some(self.index_ids()?);
		}
		Ok(())
	}

	fn index_ids(&self) -> Result<HashMap<String, web_sys::Element>> {
		let with_id = self.inner.shadow_root.query_selector_all("[id]")?;
		let mut ids = HashMap::new();
		for i in 0..with_id.length() {
			let element = with_id.item(i).and_then(|node| node.dyn_into::<web_sys::Element>().ok()).ok_or_else(|| Error::defect("`[id]` matched a non-element"))?;
			ids.insert(element.id(), element);
		}
		trace!(count = ids.len(), "Indexed shadow root ids.");
		Ok(ids)
	}
}
