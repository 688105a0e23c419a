use super::{Part, PartFactory, Template, Value, SHOW_ELEMENTS_AND_TEXT};
use crate::error::{Error, Result};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{instrument, trace, warn};
use wasm_bindgen::JsCast;

/// One live clone of a [`Template`], together with the [`Part`]s bound into it.
///
/// The instance is the only thing that may modify its nodes, which is done through [`TemplateInstance::update`].
pub struct TemplateInstance {
	template: Rc<Template>,
	part_factory: Rc<dyn PartFactory>,
	parts: Vec<Part>,
}

impl Debug for TemplateInstance {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateInstance")
			.field("template", &Rc::as_ptr(&self.template))
			.field("part_factory", &Rc::as_ptr(&self.part_factory))
			.field("parts", &self.parts)
			.finish()
	}
}

impl TemplateInstance {
	#[must_use]
	pub fn new(template: Rc<Template>, part_factory: Rc<dyn PartFactory>) -> Self {
		Self { template, part_factory, parts: vec![] }
	}

	#[must_use]
	pub fn template(&self) -> &Rc<Template> {
		&self.template
	}

	#[must_use]
	pub fn part_factory(&self) -> &Rc<dyn PartFactory> {
		&self.part_factory
	}

	#[must_use]
	pub fn parts(&self) -> &[Part] {
		&self.parts
	}

	/// Clones the template's content and binds one [`Part`] per [`TemplatePart`](`super::TemplatePart`) into it.
	///
	/// Nodes are visited in the same order as during compilation, so part indices line up.
	///
	/// # Errors
	///
	/// Iff the part factory rejects a part or a DOM operation throws.
	#[instrument(skip(document))]
	pub fn clone_fragment(&mut self, document: &web_sys::Document) -> Result<web_sys::DocumentFragment> {
		let template = Rc::clone(&self.template);
		let fragment: web_sys::DocumentFragment = document.import_node_with_deep(&template.content(), true)?.unchecked_into();
		let template_parts = template.parts();
		if template_parts.is_empty() {
			return Ok(fragment);
		}

		let walker = document.create_tree_walker_with_what_to_show(&fragment, SHOW_ELEMENTS_AND_TEXT)?;
		let mut template_parts = template_parts.iter().peekable();
		let mut node = walker.next_node()?;
		let mut index = 0;
		while let (Some(current), Some(&template_part)) = (node.as_ref(), template_parts.peek()) {
			if index == template_part.index {
				// Several attribute parts can share a node, so the walker stays put.
				let part = self.part_factory.create_part(self, template_part, current.clone())?;
				self.parts.push(part);
				template_parts.next();
			} else {
				index += 1;
				node = walker.next_node()?;
			}
		}

		if template_parts.peek().is_some() {
			return Err(Error::defect("template parts beyond the end of the cloned fragment"));
		}
		trace!(parts = self.parts.len(), "Bound parts.");
		Ok(fragment)
	}

	/// Renders `values` into the [`Part`]s, in order.
	///
	/// Each part consumes as many values as it has expressions. Missing values render as [`Value::Absent`].
	///
	/// # Errors
	///
	/// Iff rendering into one of the parts fails. Later parts aren't updated in that case.
	#[instrument(skip(values), fields(values = values.len()))]
	pub fn update(&self, values: Vec<Value>) -> Result<()> {
		let expected: usize = self.parts.iter().map(Part::size).sum();
		if values.len() != expected {
			warn!("Template instance expects {} value(s) but got {}.", expected, values.len());
		}

		let mut values = values.into_iter();
		for part in &self.parts {
			part.apply(&mut values)?;
		}
		Ok(())
	}
}
