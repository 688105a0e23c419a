//! Tagged-template rendering.
//!
//! A template is written once per call site with [`html!`](`crate::html`), compiled into a [`Template`] the first time it's rendered,
//! and afterwards only the [`Part`]s at its expression positions are updated.
//!
//! ```ignore
//! use slidem::{html, template::RenderRoot};
//!
//! let mut root = RenderRoot::new(container);
//! for count in 0..3 {
//! 	// Only the text node inside `<p>` changes after the first iteration.
//! 	root.render(html!("<p class=\"count-{}\">{}</p>", count, count))?;
//! }
//! ```

use crate::error::{Error, Result};
use std::{cell::OnceCell, rc::Rc};
use tracing::{instrument, trace};
use wasm_bindgen::JsCast;

pub mod marker;

mod extended;
mod instance;
mod part;
mod render;
mod value;

pub use extended::{extended_part_factory, EventPart, ExtendedPartFactory, PropertyPart};
pub use instance::TemplateInstance;
pub use part::{default_part_factory, AttributePart, CustomPart, DefaultPartFactory, NodePart, Part, PartFactory};
pub use render::RenderRoot;
pub use value::{Directive, Listener, Primitive, Value};

/// `NodeFilter.SHOW_ELEMENT | NodeFilter.SHOW_TEXT`
pub(crate) const SHOW_ELEMENTS_AND_TEXT: u32 = 0x1 | 0x4;

/// Describes one expression position in a compiled [`Template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePart {
	/// Position of the bound node in document order, counting elements and text nodes.
	pub index: u32,
	pub kind: PartKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
	/// Bound to the content between a text marker node and its next sibling. Consumes one value.
	Node,
	/// Bound to an attribute that was stripped from the compiled template. Consumes `strings.len() - 1` values.
	Attribute {
		/// The attribute name as parsed by the browser, which may be lowercased.
		name: String,
		/// The attribute name as written in the template source.
		raw_name: Rc<str>,
		/// Literal text surrounding the expressions, in order.
		strings: Rc<[String]>,
	},
}

impl TemplatePart {
	/// How many values this part consumes during [`TemplateInstance::update`].
	#[must_use]
	pub fn size(&self) -> usize {
		match &self.kind {
			PartKind::Node => 1,
			PartKind::Attribute { strings, .. } => strings.len() - 1,
		}
	}
}

/// A parsed template: an inert DOM skeleton with its expression positions described by [`TemplatePart`]s.
///
/// Immutable once compiled. Identity (as in [`Rc::ptr_eq`]) decides whether rendered instances can be reused.
#[derive(Debug)]
pub struct Template {
	element: web_sys::HtmlTemplateElement,
	parts: Vec<TemplatePart>,
}

impl Template {
	#[must_use]
	pub fn parts(&self) -> &[TemplatePart] {
		&self.parts
	}

	#[must_use]
	pub fn content(&self) -> web_sys::DocumentFragment {
		self.element.content()
	}

	#[instrument(skip(document, fragments), fields(fragments = fragments.len()))]
	fn compile(document: &web_sys::Document, fragments: &[String]) -> Result<Self> {
		let marker = marker::marker();
		let element: web_sys::HtmlTemplateElement = document.create_element("template")?.unchecked_into();
		element.set_inner_html(&fragments.join(&*marker));

		let content = element.content();
		let walker = document.create_tree_walker_with_what_to_show(&content, SHOW_ELEMENTS_AND_TEXT)?;

		let mut parts = vec![];
		let mut nodes_to_remove = vec![];
		let mut index = -1_i64;
		let mut fragment_index = 0;

		while let Some(node) = walker.next_node()? {
			index += 1;
			if let Some(element) = node.dyn_ref::<web_sys::Element>() {
				let attributes = element.attributes();
				let mut i = 0;
				while let Some(attribute) = attributes.item(i) {
					let value = attribute.value();
					let strings = marker::split_on_marker(&value, &marker);
					if strings.len() < 2 {
						i += 1;
						continue;
					}

					let fragment = fragments.get(fragment_index).ok_or_else(|| Error::defect("more attribute expressions than template fragments"))?;
					let raw_name = marker::raw_attribute_name(fragment, strings[0]).ok_or_else(|| Error::MalformedAttribute { fragment: fragment.clone() })?;
					let name = attribute.name();
					trace!(?name, raw_name, expressions = strings.len() - 1, "Found attribute part.");

					parts.push(TemplatePart {
						index: to_index(index)?,
						kind: PartKind::Attribute {
							name: name.clone(),
							raw_name: raw_name.into(),
							strings: strings.iter().map(|&s| s.to_owned()).collect(),
						},
					});
					fragment_index += strings.len() - 1;

					// The live `NamedNodeMap` shrinks, so `i` now points at the next attribute.
					element.remove_attribute(&name)?;
				}
			} else if let Some(text) = node.dyn_ref::<web_sys::Text>() {
				let data = text.data();
				let strings = marker::split_on_marker(&data, &marker);
				if strings.len() < 2 {
					if marker::is_insignificant_whitespace(&data) {
						nodes_to_remove.push(node.clone());
						index -= 1;
					}
					continue;
				}

				let parent = node.parent_node().ok_or_else(|| Error::defect("template text node without parent"))?;
				let (last, literals) = strings.split_last().ok_or_else(|| Error::defect("empty split"))?;
				fragment_index += literals.len();

				// The new nodes go in front of `node` so the walker continues after it.
				for literal in literals {
					parent.insert_before(&document.create_text_node(literal), Some(&node))?;
					parts.push(TemplatePart { index: to_index(index)?, kind: PartKind::Node });
					index += 1;
				}
				text.set_data(last);
				trace!(count = literals.len(), "Found node part(s).");
			}
		}

		for node in nodes_to_remove {
			if let Some(parent) = node.parent_node() {
				parent.remove_child(&node)?;
			}
		}

		trace!(parts = parts.len(), "Compiled template.");
		Ok(Self { element, parts })
	}
}

fn to_index(index: i64) -> Result<u32> {
	u32::try_from(index).map_err(|_| Error::defect("node index out of range"))
}

/// The cache handle of one template call site.
///
/// Each [`html!`](`crate::html`) invocation site owns exactly one of these,
/// so the same site always renders the same [`Template`] while two sites with equal text get independent ones.
#[derive(Debug)]
pub struct TemplateSite {
	fragments: Vec<String>,
	compiled: OnceCell<Rc<Template>>,
}

impl TemplateSite {
	/// Creates a site from `html!`-style source text, with `{}` at each expression position.
	#[must_use]
	pub fn new(source: &str) -> Self {
		Self::from_fragments(marker::split_placeholders(source))
	}

	/// Creates a site from the static fragments between expressions.
	///
	/// Every call creates a new cache entry, even for equal `fragments`.
	/// An empty list is treated as a single empty fragment.
	#[must_use]
	pub fn from_fragments(mut fragments: Vec<String>) -> Self {
		if fragments.is_empty() {
			fragments.push(String::new());
		}
		Self { fragments, compiled: OnceCell::new() }
	}

	#[must_use]
	pub fn fragments(&self) -> &[String] {
		&self.fragments
	}

	/// The number of values a [`TemplateResult`] for this site should carry.
	#[must_use]
	pub fn expression_count(&self) -> usize {
		self.fragments.len().saturating_sub(1)
	}

	/// Compiles the template on first use and returns the cached [`Template`] afterwards.
	///
	/// # Errors
	///
	/// Iff compilation fails. Failures aren't cached.
	pub fn template(&self, document: &web_sys::Document) -> Result<Rc<Template>> {
		if let Some(template) = self.compiled.get() {
			return Ok(Rc::clone(template));
		}
		let template = Rc::new(Template::compile(document, &self.fragments)?);
		Ok(Rc::clone(self.compiled.get_or_init(|| template)))
	}
}

/// A [`TemplateSite`] paired with one set of values.
#[derive(Debug, Clone)]
pub struct TemplateResult {
	site: Rc<TemplateSite>,
	values: Vec<Value>,
}

impl TemplateResult {
	#[must_use]
	pub fn new(site: Rc<TemplateSite>, values: Vec<Value>) -> Self {
		if values.len() != site.expression_count() {
			tracing::warn!("Template expects {} value(s) but got {}.", site.expression_count(), values.len());
		}
		Self { site, values }
	}

	#[must_use]
	pub fn site(&self) -> &Rc<TemplateSite> {
		&self.site
	}

	#[must_use]
	pub fn values(&self) -> &[Value] {
		&self.values
	}

	/// See [`TemplateSite::template`].
	///
	/// # Errors
	///
	/// Iff compilation fails.
	pub fn template(&self, document: &web_sys::Document) -> Result<Rc<Template>> {
		self.site.template(document)
	}

	#[must_use]
	pub fn into_values(self) -> Vec<Value> {
		self.values
	}
}

/// Creates a [`TemplateResult`](`crate::template::TemplateResult`) from a string literal with `{}` at each expression position.
///
/// `{{` and `}}` escape literal braces. Each invocation site has its own template cache entry.
///
/// ```ignore
/// let item = |text: &str| html!("<li>{}</li>", text);
/// let list = html!("<ul class=\"{} {}\">{}</ul>", "list", kind, vec![item("a"), item("b")]);
/// ```
#[macro_export]
macro_rules! html {
	($source:literal $(, $value:expr)* $(,)?) => {{
		::std::thread_local! {
			static SITE: ::std::rc::Rc<$crate::template::TemplateSite> = ::std::rc::Rc::new($crate::template::TemplateSite::new($source));
		}
		$crate::template::TemplateResult::new(
			SITE.with(::std::rc::Rc::clone),
			::std::vec![$($crate::template::Value::from($value)),*],
		)
	}};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sites_count_expressions() {
		assert_eq!(TemplateSite::new("<p>{}</p>").expression_count(), 1);
		assert_eq!(TemplateSite::new("<p a=\"{}-{}\">{}</p>").expression_count(), 3);
		assert_eq!(TemplateSite::new("<p>{{}}</p>").expression_count(), 0);
	}

	#[test]
	fn empty_fragment_list_has_no_expressions() {
		let site = TemplateSite::from_fragments(vec![]);
		assert_eq!(site.expression_count(), 0);
		assert_eq!(site.fragments(), [String::new()]);
	}

	#[test]
	fn macro_reuses_its_site() {
		let render = |x: i32| crate::html!("<p>{}</p>", x);
		let a = render(1);
		let b = render(2);
		assert!(Rc::ptr_eq(a.site(), b.site()));
		assert_eq!(a.values().len(), 1);
	}

	#[test]
	fn equal_sources_at_different_sites_are_distinct() {
		let a = crate::html!("<p>{}</p>", 1);
		let b = crate::html!("<p>{}</p>", 1);
		assert!(!Rc::ptr_eq(a.site(), b.site()));
		assert_eq!(a.site().fragments(), b.site().fragments());
	}

	#[test]
	fn attribute_parts_consume_one_value_per_expression() {
		let part = TemplatePart {
			index: 0,
			kind: PartKind::Attribute {
				name: "attr".to_owned(),
				raw_name: "attr".into(),
				strings: vec![String::new(), "-".to_owned(), String::new()].into(),
			},
		};
		assert_eq!(part.size(), 2);
		assert_eq!(TemplatePart { index: 3, kind: PartKind::Node }.size(), 1);
	}
}
