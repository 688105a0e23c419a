//! Property and event bindings.
//!
//! With [`ExtendedPartFactory`], attribute expressions are interpreted by name:
//!
//! - `on-click="{}"` binds a [`Listener`] for the `click` event,
//! - `class$="{}"` sets the `class` attribute like the default factory would,
//! - anything else, e.g. `someProp="{}"`, assigns the element's `someProp` property.

use super::{
	part::{element_for, resolve_directive},
	AttributePart, CustomPart, Listener, NodePart, Part, PartFactory, PartKind, TemplateInstance, TemplatePart, Value,
};
use crate::{
	error::{Error, Result},
	listener::EventListener,
};
use core::fmt::{self, Debug, Formatter};
use std::{cell::RefCell, rc::Rc};
use tracing::{instrument, trace, warn};
use wasm_bindgen::JsValue;

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedPartFactory;

thread_local! {
	static EXTENDED_PART_FACTORY: Rc<dyn PartFactory> = Rc::new(ExtendedPartFactory);
}

/// The shared [`ExtendedPartFactory`] instance. See [`default_part_factory`](`super::default_part_factory`).
#[must_use]
pub fn extended_part_factory() -> Rc<dyn PartFactory> {
	EXTENDED_PART_FACTORY.with(Rc::clone)
}

impl PartFactory for ExtendedPartFactory {
	fn create_part(&self, instance: &TemplateInstance, part: &TemplatePart, node: web_sys::Node) -> Result<Part> {
		let (raw_name, strings) = match &part.kind {
			PartKind::Node => return Ok(Part::Node(Rc::new(NodePart::after_marker(node, Rc::clone(instance.part_factory()))?))),
			PartKind::Attribute { raw_name, strings, .. } => (raw_name, strings),
		};
		let element = element_for(part, node)?;

		if let Some(event) = raw_name.strip_prefix("on-") {
			if strings.len() != 2 || strings.iter().any(|literal| !literal.is_empty()) {
				return Err(Error::defect(format!("event binding {:?} must consist of exactly one expression", raw_name)));
			}
			Ok(Part::Custom(Rc::new(EventPart::new(element.into(), event))))
		} else if let Some(name) = raw_name.strip_suffix('$') {
			Ok(Part::Attribute(Rc::new(AttributePart::new(element, name.into(), Rc::clone(strings)))))
		} else {
			Ok(Part::Custom(Rc::new(PropertyPart::new(element, Rc::clone(raw_name), Rc::clone(strings)))))
		}
	}
}

/// Assigns a JavaScript property of an element.
///
/// A single expression without literal text assigns the value itself. Otherwise the interpolated string is assigned.
#[derive(Debug)]
pub struct PropertyPart {
	attribute: AttributePart,
}

impl PropertyPart {
	#[must_use]
	pub fn new(element: web_sys::Element, name: Rc<str>, strings: Rc<[String]>) -> Self {
		Self { attribute: AttributePart::new(element, name, strings) }
	}

	fn is_single_expression(&self) -> bool {
		self.attribute.size() == 1 && self.attribute.strings().iter().all(String::is_empty)
	}
}

impl CustomPart for PropertyPart {
	fn size(&self) -> usize {
		self.attribute.size()
	}

	#[instrument(skip(this, values))]
	fn set_values(&self, this: &Part, mut values: Vec<Value>) -> Result<()> {
		let value = if self.is_single_expression() {
			resolve_directive(this, values.pop().unwrap_or_default()).to_js()
		} else {
			JsValue::from_str(&self.attribute.text(this, values))
		};
		trace!(property = self.attribute.name(), "Setting property.");
		js_sys::Reflect::set(self.attribute.element(), &JsValue::from_str(self.attribute.name()), &value)?;
		Ok(())
	}
}

/// Binds a [`Listener`] to an event on the element. [`Value::Absent`] removes it.
pub struct EventPart {
	target: web_sys::EventTarget,
	event: Rc<str>,
	bound: RefCell<Option<(Listener, EventListener)>>,
}

impl Debug for EventPart {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventPart")
			.field("target", &self.target)
			.field("event", &self.event)
			.field("bound", &self.bound.try_borrow().map(|bound| bound.as_ref().map(|(listener, _)| listener.clone())))
			.finish()
	}
}

impl EventPart {
	#[must_use]
	pub fn new(target: web_sys::EventTarget, event: &str) -> Self {
		Self {
			target,
			event: event.into(),
			bound: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn event(&self) -> &str {
		&self.event
	}
}

impl CustomPart for EventPart {
	fn size(&self) -> usize {
		1
	}

	fn set_values(&self, this: &Part, mut values: Vec<Value>) -> Result<()> {
		let listener = match resolve_directive(this, values.pop().unwrap_or_default()) {
			Value::Listener(listener) => Some(listener),
			Value::Absent => None,
			value => {
				warn!("Expected a listener for `on-{}` but got a {}. Removing the listener.", self.event, value.kind());
				None
			}
		};

		let mut bound = self.bound.borrow_mut();
		let unchanged = match (&*bound, &listener) {
			(Some((previous, _)), Some(listener)) => previous.ptr_eq(listener),
			(None, None) => true,
			_ => false,
		};
		if unchanged {
			return Ok(());
		}

		*bound = None;
		if let Some(listener) = listener {
			let handler = listener.clone();
			let event_listener = EventListener::new(&self.target, self.event.to_string(), move |event| handler.call(event))?;
			*bound = Some((listener, event_listener));
		}
		Ok(())
	}
}
