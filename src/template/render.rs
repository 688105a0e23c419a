use super::{default_part_factory, PartFactory, TemplateInstance, TemplateResult};
use crate::error::{Error, Result};
use std::rc::Rc;
use tracing::{instrument, trace};

/// Attached to a container node, this `struct` remembers the [`TemplateInstance`] last rendered into it.
///
/// Rendering the same template with the same [`PartFactory`] again only updates the instance's parts.
/// Anything else replaces the container's children.
#[derive(Debug)]
pub struct RenderRoot {
	container: web_sys::Node,
	instance: Option<TemplateInstance>,
}

impl RenderRoot {
	#[must_use]
	pub fn new(container: web_sys::Node) -> Self {
		Self { container, instance: None }
	}

	#[must_use]
	pub fn container(&self) -> &web_sys::Node {
		&self.container
	}

	#[must_use]
	pub fn instance(&self) -> Option<&TemplateInstance> {
		self.instance.as_ref()
	}

	/// Renders `result` with the [`default_part_factory`].
	///
	/// # Errors
	///
	/// Iff the template fails to compile or a DOM operation throws.
	pub fn render(&mut self, result: TemplateResult) -> Result<()> {
		self.render_with(result, default_part_factory())
	}

	/// # Errors
	///
	/// Iff the template fails to compile or a DOM operation throws.
	#[instrument(skip(result, part_factory))]
	pub fn render_with(&mut self, result: TemplateResult, part_factory: Rc<dyn PartFactory>) -> Result<()> {
		let document = self.container.owner_document().ok_or(Error::MissingGlobal("document"))?;
		let template = result.template(&document)?;

		if let Some(instance) = &self.instance {
			if Rc::ptr_eq(instance.template(), &template) && Rc::ptr_eq(instance.part_factory(), &part_factory) {
				trace!("Updating existing instance.");
				return instance.update(result.into_values());
			}
		}

		trace!("Rendering new instance.");
		let mut instance = TemplateInstance::new(template, part_factory);
		let fragment = instance.clone_fragment(&document)?;
		// Before insertion, so the first paint already has the final content.
		instance.update(result.into_values())?;

		while let Some(child) = self.container.first_child() {
			self.container.remove_child(&child)?;
		}
		self.container.append_child(&fragment)?;
		self.instance = Some(instance);
		Ok(())
	}
}
