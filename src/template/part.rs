use super::{PartKind, Primitive, TemplateInstance, TemplatePart, TemplateResult, Value};
use crate::{
	error::{Error, Result},
	listener,
};
use core::{
	fmt::{self, Debug, Formatter},
	mem,
};
use std::{cell::RefCell, rc::Rc};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::JsCast;

/// Binds [`TemplatePart`]s to the nodes of a freshly cloned [`TemplateInstance`].
///
/// Factories are compared by identity ([`Rc::ptr_eq`]) when deciding whether a previous render can be reused.
pub trait PartFactory {
	/// # Errors
	///
	/// Iff `node` can't carry `part`, which means the factory doesn't fit the template compiler.
	fn create_part(&self, instance: &TemplateInstance, part: &TemplatePart, node: web_sys::Node) -> Result<Part>;
}

/// A [`Part`] with custom update behaviour, created by a non-default [`PartFactory`].
pub trait CustomPart {
	/// How many consecutive values this part consumes per update.
	fn size(&self) -> usize;

	/// `values` has exactly [`size`](`CustomPart::size`) items, padded with [`Value::Absent`].
	///
	/// `this` is the [`Part`] wrapping `self`, for passing on to [`Directive`](`super::Directive`)s.
	///
	/// # Errors
	///
	/// Iff the DOM couldn't be updated.
	fn set_values(&self, this: &Part, values: Vec<Value>) -> Result<()>;
}

/// A live binding between one expression position of a [`TemplateInstance`] and what's rendered there.
#[derive(Clone)]
pub enum Part {
	Attribute(Rc<AttributePart>),
	Node(Rc<NodePart>),
	Custom(Rc<dyn CustomPart>),
}

impl Debug for Part {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Part::Attribute(part) => f.debug_tuple("Attribute").field(part).finish(),
			Part::Node(part) => f.debug_tuple("Node").field(part).finish(),
			Part::Custom(part) => f.debug_tuple("Custom").field(&Rc::as_ptr(part)).finish(),
		}
	}
}

impl Part {
	/// How many consecutive values this part consumes per update.
	#[must_use]
	pub fn size(&self) -> usize {
		match self {
			Part::Attribute(part) => part.size(),
			Part::Node(_) => 1,
			Part::Custom(part) => part.size(),
		}
	}

	/// Takes [`size`](`Part::size`) values from `values` and renders them.
	pub(crate) fn apply(&self, values: &mut impl Iterator<Item = Value>) -> Result<()> {
		match self {
			Part::Node(part) => part.set_value(values.next().unwrap_or_default()),
			Part::Attribute(part) => part.set_values(self, take_padded(values, part.size())),
			Part::Custom(part) => part.set_values(self, take_padded(values, part.size())),
		}
	}
}

fn take_padded(values: &mut impl Iterator<Item = Value>, count: usize) -> Vec<Value> {
	let mut taken: Vec<_> = values.take(count).collect();
	taken.resize_with(count, Value::default);
	taken
}

/// Replaces [`Value::Directive`] with the value it computes for `part`.
pub(crate) fn resolve_directive(part: &Part, value: Value) -> Value {
	match value {
		Value::Directive(directive) => directive.resolve(part),
		value => value,
	}
}

/// Renders one attribute that may interleave literal text with several expressions.
#[derive(Debug)]
pub struct AttributePart {
	element: web_sys::Element,
	name: Rc<str>,
	strings: Rc<[String]>,
}

impl AttributePart {
	/// `strings` are the literal segments around the expressions, so there's always at least one.
	#[must_use]
	pub fn new(element: web_sys::Element, name: Rc<str>, strings: Rc<[String]>) -> Self {
		debug_assert!(!strings.is_empty());
		Self { element, name, strings }
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::Element {
		&self.element
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn strings(&self) -> &[String] {
		&self.strings
	}

	#[must_use]
	pub fn size(&self) -> usize {
		self.strings.len() - 1
	}

	/// Interleaves the literal segments with `values`, resolving directives against `this`.
	#[must_use]
	pub fn text(&self, this: &Part, values: Vec<Value>) -> String {
		let mut text = String::new();
		let mut values = values.into_iter();
		for (i, literal) in self.strings.iter().enumerate() {
			text.push_str(literal);
			if i < self.size() {
				let value = resolve_directive(this, values.next().unwrap_or_default());
				text.push_str(&value.to_attribute_text());
			}
		}
		text
	}

	/// Recomputes and sets the whole attribute value.
	///
	/// # Errors
	///
	/// Iff `setAttribute` throws.
	#[instrument(skip(this, values))]
	pub fn set_values(&self, this: &Part, values: Vec<Value>) -> Result<()> {
		let text = self.text(this, values);
		#[cfg(feature = "dangerous-logging")]
		trace!(text = text.as_str(), "Setting attribute.");
		#[cfg(not(feature = "dangerous-logging"))]
		trace!(len = text.len(), "Setting attribute.");
		self.element.set_attribute(&self.name, &text)?;
		Ok(())
	}
}

/// What a [`NodePart`] rendered last.
enum Previous {
	/// Nothing, or [`Value::Absent`].
	Nothing,
	Primitive(Primitive),
	Node(web_sys::Node),
	Instance(TemplateInstance),
	/// One part per item, in order.
	Items(Vec<Rc<NodePart>>),
	Promise(js_sys::Promise),
}

impl Previous {
	fn kind(&self) -> &'static str {
		match self {
			Previous::Nothing => "nothing",
			Previous::Primitive(_) => "primitive",
			Previous::Node(_) => "node",
			Previous::Instance(_) => "template instance",
			Previous::Items(_) => "items",
			Previous::Promise(_) => "promise",
		}
	}
}

/// Controls all DOM nodes strictly between its start and end marker.
pub struct NodePart {
	start: web_sys::Node,
	end: RefCell<web_sys::Node>,
	part_factory: Rc<dyn PartFactory>,
	previous: RefCell<Previous>,
}

impl Debug for NodePart {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodePart")
			.field("start", &self.start)
			.field("end", &self.end)
			.field("previous", &self.previous.try_borrow().map(|previous| previous.kind()))
			.finish_non_exhaustive()
	}
}

impl NodePart {
	/// Nested templates rendered into this part use `part_factory`.
	#[must_use]
	pub fn new(start: web_sys::Node, end: web_sys::Node, part_factory: Rc<dyn PartFactory>) -> Self {
		Self {
			start,
			end: RefCell::new(end),
			part_factory,
			previous: RefCell::new(Previous::Nothing),
		}
	}

	/// Creates a part spanning the gap between `start` and its next sibling.
	///
	/// # Errors
	///
	/// Iff `start` has no next sibling.
	pub fn after_marker(start: web_sys::Node, part_factory: Rc<dyn PartFactory>) -> Result<Self> {
		let end = start.next_sibling().ok_or_else(|| Error::defect("node part marker without next sibling"))?;
		Ok(Self::new(start, end, part_factory))
	}

	#[must_use]
	pub fn start(&self) -> &web_sys::Node {
		&self.start
	}

	#[must_use]
	pub fn end(&self) -> web_sys::Node {
		self.end.borrow().clone()
	}

	/// Moves the end marker, including that of the last item part if this part currently renders items.
	fn set_end(&self, end: web_sys::Node) {
		if let Previous::Items(items) = &*self.previous.borrow() {
			if let Some(last) = items.last() {
				last.set_end(end.clone());
			}
		}
		*self.end.borrow_mut() = end;
	}

	fn document(&self) -> Result<web_sys::Document> {
		self.start.owner_document().ok_or(Error::MissingGlobal("document"))
	}

	fn parent(&self) -> Result<web_sys::Node> {
		self.start.parent_node().ok_or_else(|| Error::defect("node part marker without parent"))
	}

	/// Renders `value` between the markers, reusing what's already there where possible.
	///
	/// # Errors
	///
	/// Iff a nested template fails to compile or a DOM operation throws.
	pub fn set_value(self: &Rc<Self>, value: Value) -> Result<()> {
		let value = resolve_directive(&Part::Node(Rc::clone(self)), value);
		let span = trace_span!("NodePart::set_value", kind = value.kind());
		let _enter = span.enter();

		match value {
			Value::Absent => {
				if matches!(*self.previous.borrow(), Previous::Nothing) {
					return Ok(());
				}
				self.set_text("")?;
				*self.previous.borrow_mut() = Previous::Nothing;
				Ok(())
			}
			Value::Primitive(primitive) => self.set_primitive(primitive),
			Value::Template(result) => self.set_template_result(result),
			Value::Iterable(items) => self.set_items(items),
			Value::Node(node) => {
				self.set_node(&node)?;
				*self.previous.borrow_mut() = Previous::Node(node);
				Ok(())
			}
			Value::Promise(promise) => {
				self.set_promise(promise);
				Ok(())
			}
			value @ (Value::Directive(_) | Value::Listener(_)) => {
				warn!("A {} can't be rendered as content. Rendering nothing instead.", value.kind());
				self.set_value(Value::Absent)
			}
		}
	}

	fn set_primitive(&self, primitive: Primitive) -> Result<()> {
		if matches!(&*self.previous.borrow(), Previous::Primitive(previous) if *previous == primitive) {
			trace!("Primitive unchanged.");
			return Ok(());
		}
		self.set_text(&primitive.to_string())?;
		*self.previous.borrow_mut() = Previous::Primitive(primitive);
		Ok(())
	}

	/// Updates a lone text node in place or replaces the content with a new one.
	fn set_text(&self, text: &str) -> Result<()> {
		#[cfg(feature = "dangerous-logging")]
		trace!(text, "Setting text.");

		let end = self.end();
		if let Some(first) = self.start.next_sibling() {
			let is_only_node = !first.is_same_node(Some(&end)) && first.next_sibling().map_or(false, |next| next.is_same_node(Some(&end)));
			if is_only_node {
				if let Some(text_node) = first.dyn_ref::<web_sys::Text>() {
					text_node.set_data(text);
					return Ok(());
				}
			}
		}
		self.set_node(&self.document()?.create_text_node(text))
	}

	/// Replaces the content with `node`.
	///
	/// The previous value is left for the caller to update.
	fn set_node(&self, node: &web_sys::Node) -> Result<()> {
		self.clear()?;
		self.parent()?.insert_before(node, Some(&self.end()))?;
		Ok(())
	}

	fn set_template_result(&self, result: TemplateResult) -> Result<()> {
		let template = result.template(&self.document()?)?;

		if let Previous::Instance(instance) = &*self.previous.borrow() {
			if Rc::ptr_eq(instance.template(), &template) {
				trace!("Reusing template instance.");
				return instance.update(result.into_values());
			}
		}

		trace!("Creating template instance.");
		let mut instance = TemplateInstance::new(template, Rc::clone(&self.part_factory));
		let fragment = instance.clone_fragment(&self.document()?)?;
		instance.update(result.into_values())?;
		self.set_node(&fragment)?;
		*self.previous.borrow_mut() = Previous::Instance(instance);
		Ok(())
	}

	/// Diffs `items` positionally against the previously rendered item parts.
	fn set_items(&self, items: Vec<Value>) -> Result<()> {
		let mut item_parts = match mem::replace(&mut *self.previous.borrow_mut(), Previous::Nothing) {
			Previous::Items(item_parts) => item_parts,
			_ => {
				self.clear()?;
				vec![]
			}
		};

		let document = self.document()?;
		let mut count = 0;
		for item in items {
			let item_part = if let Some(item_part) = item_parts.get(count) {
				Rc::clone(item_part)
			} else {
				let item_start = match item_parts.last() {
					None => self.start.clone(),
					Some(previous_part) => {
						let separator: web_sys::Node = document.create_text_node("").into();
						self.parent()?.insert_before(&separator, Some(&self.end()))?;
						previous_part.set_end(separator.clone());
						separator
					}
				};
				let item_part = Rc::new(NodePart::new(item_start, self.end(), Rc::clone(&self.part_factory)));
				item_parts.push(Rc::clone(&item_part));
				item_part
			};
			item_part.set_value(item)?;
			count += 1;
		}

		if count == 0 {
			trace!(removed = item_parts.len(), "Clearing items.");
			return self.clear();
		}

		if count < item_parts.len() {
			trace!(kept = count, removed = item_parts.len() - count, "Trimming items.");
			let last_kept = &item_parts[count - 1];
			// Removes the trailing separator along with the dropped items' content.
			remove_range(&self.parent()?, &last_kept.end(), &self.end())?;
			last_kept.set_end(self.end());
			item_parts.truncate(count);
		}

		*self.previous.borrow_mut() = Previous::Items(item_parts);
		Ok(())
	}

	fn set_promise(self: &Rc<Self>, promise: js_sys::Promise) {
		*self.previous.borrow_mut() = Previous::Promise(promise.clone());

		let part = Rc::downgrade(self);
		let expected = promise.clone();
		listener::on_settled(
			&promise,
			move |value| {
				let part = match part.upgrade() {
					Some(part) => part,
					None => return trace!("Promise settled after its part was dropped."),
				};
				let is_current = matches!(&*part.previous.borrow(), Previous::Promise(current) if js_sys::Object::is(current, &expected));
				if !is_current {
					return trace!("Ignoring stale promise result.");
				}
				if let Err(error) = part.set_value(Value::from_js(value)) {
					error!("Failed to render promise result: {}", error);
				}
			},
			|reason| error!("Promise rendered into a node part was rejected: {:?}", reason),
		);
	}

	/// Removes everything between the markers.
	///
	/// # Errors
	///
	/// Iff the markers are detached or `removeChild` throws.
	pub fn clear(&self) -> Result<()> {
		let first = match self.start.next_sibling() {
			Some(first) => first,
			None => return Err(Error::defect("node part start marker without next sibling")),
		};
		remove_range(&self.parent()?, &first, &self.end())
	}
}

/// Removes `first` and its following siblings up to but excluding `end`.
fn remove_range(parent: &web_sys::Node, first: &web_sys::Node, end: &web_sys::Node) -> Result<()> {
	let mut next = Some(first.clone());
	while let Some(node) = next {
		if node.is_same_node(Some(end)) {
			return Ok(());
		}
		next = node.next_sibling();
		parent.remove_child(&node)?;
	}
	error!("End marker not found while clearing. The node part's range was modified externally.");
	Ok(())
}

/// Binds attribute parts to [`AttributePart`]s and node parts to [`NodePart`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPartFactory;

impl PartFactory for DefaultPartFactory {
	fn create_part(&self, instance: &TemplateInstance, part: &TemplatePart, node: web_sys::Node) -> Result<Part> {
		match &part.kind {
			PartKind::Attribute { raw_name, strings, .. } => {
				let element = element_for(part, node)?;
				Ok(Part::Attribute(Rc::new(AttributePart::new(element, Rc::clone(raw_name), Rc::clone(strings)))))
			}
			PartKind::Node => Ok(Part::Node(Rc::new(NodePart::after_marker(node, Rc::clone(instance.part_factory()))?))),
		}
	}
}

pub(crate) fn element_for(part: &TemplatePart, node: web_sys::Node) -> Result<web_sys::Element> {
	node.dyn_into::<web_sys::Element>()
		.map_err(|node| Error::defect(format!("attribute part at index {} bound to non-element {:?}", part.index, node.node_name())))
}

thread_local! {
	static DEFAULT_PART_FACTORY: Rc<dyn PartFactory> = Rc::new(DefaultPartFactory);
}

/// The shared [`DefaultPartFactory`] instance.
///
/// Always use this one (rather than a new [`DefaultPartFactory`]) so that renders are recognised as reusable.
#[must_use]
pub fn default_part_factory() -> Rc<dyn PartFactory> {
	DEFAULT_PART_FACTORY.with(Rc::clone)
}
