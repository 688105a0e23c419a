use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// A [`TemplatePart`](`crate::template::TemplatePart`) reached a [`PartFactory`](`crate::template::PartFactory`) that can't bind it to the node found at its position.
	///
	/// This points to a mismatch between the template compiler's output and the factory.
	#[error("slidem bug: {reason}")]
	ConfigurationDefect { reason: String },

	#[error("Could not find an attribute name before an expression in template fragment {fragment:?}")]
	MalformedAttribute { fragment: String },

	#[error("Missing browser global: {0}")]
	MissingGlobal(&'static str),

	#[error("DOM operation failed: {0}")]
	Dom(String),
}

impl Error {
	pub(crate) fn defect(reason: impl Into<String>) -> Self {
		Self::ConfigurationDefect { reason: reason.into() }
	}
}

impl From<JsValue> for Error {
	fn from(value: JsValue) -> Self {
		let message = value
			.as_string()
			.or_else(|| value.dyn_ref::<js_sys::Error>().map(|error| String::from(error.message())))
			.unwrap_or_else(|| format!("{:?}", value));
		Self::Dom(message)
	}
}

impl From<Error> for JsValue {
	fn from(error: Error) -> Self {
		js_sys::Error::new(&error.to_string()).into()
	}
}

pub type Result<T> = core::result::Result<T, Error>;

pub(crate) fn window() -> Result<web_sys::Window> {
	web_sys::window().ok_or(Error::MissingGlobal("window"))
}

pub(crate) fn document() -> Result<web_sys::Document> {
	window()?.document().ok_or(Error::MissingGlobal("document"))
}
