use super::{Part, TemplateResult};
use core::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};

/// Anything that can be rendered into a [`Part`].
///
/// Each variant is handled by its own branch of [`NodePart::set_value`](`super::NodePart::set_value`).
#[derive(Debug, Clone)]
pub enum Value {
	/// Renders as nothing. Stands in for both `null` and `undefined`.
	Absent,
	Primitive(Primitive),
	Template(TemplateResult),
	/// Rendered item by item, with positional reuse of the previous render's items.
	Iterable(Vec<Value>),
	Node(web_sys::Node),
	/// Rendered once it resolves, unless something else was rendered into the same part in the meantime.
	Promise(js_sys::Promise),
	Directive(Directive),
	Listener(Listener),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
	Str(Rc<str>),
	Number(f64),
	Bool(bool),
}

impl Display for Primitive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Primitive::Str(str) => f.write_str(str),
			Primitive::Number(number) => f.write_str(&format_number(*number)),
			Primitive::Bool(bool) => Display::fmt(bool, f),
		}
	}
}

/// Formats `number` the way JavaScript's `Number.prototype.toString()` does.
#[allow(clippy::cast_sign_loss)]
fn format_number(number: f64) -> String {
	if number.is_nan() {
		return "NaN".to_owned();
	}
	if number == 0.0 {
		return "0".to_owned();
	}
	if number < 0.0 {
		return format!("-{}", format_number(-number));
	}
	if number.is_infinite() {
		return "Infinity".to_owned();
	}

	// `{:e}` yields the shortest round-tripping digits, e.g. `1.2345e2`.
	let scientific = format!("{:e}", number);
	let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
	let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
	let exponent: i32 = exponent.parse().unwrap_or(0);
	let k = i32::try_from(digits.len()).unwrap_or(i32::MAX);
	// Position of the decimal point relative to the start of `digits`.
	let n = exponent + 1;

	if k <= n && n <= 21 {
		format!("{}{}", digits, "0".repeat((n - k) as usize))
	} else if 0 < n && n <= 21 {
		let (int, frac) = digits.split_at(n as usize);
		format!("{}.{}", int, frac)
	} else if -6 < n && n <= 0 {
		format!("0.{}{}", "0".repeat((-n) as usize), digits)
	} else {
		let sign = if n - 1 < 0 { '-' } else { '+' };
		let (first, rest) = digits.split_at(1);
		if rest.is_empty() {
			format!("{}e{}{}", first, sign, (n - 1).abs())
		} else {
			format!("{}.{}e{}{}", first, rest, sign, (n - 1).abs())
		}
	}
}

/// A callable evaluated against the [`Part`] it's rendered into. Its return value is rendered instead.
#[derive(Clone)]
pub struct Directive(Rc<dyn Fn(&Part) -> Value>);
impl Directive {
	pub fn new(f: impl Fn(&Part) -> Value + 'static) -> Self {
		Self(Rc::new(f))
	}

	#[must_use]
	pub fn resolve(&self, part: &Part) -> Value {
		(self.0)(part)
	}
}
impl Debug for Directive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Directive").field(&Rc::as_ptr(&self.0)).finish()
	}
}

/// An event handler, for use with [`ExtendedPartFactory`](`super::ExtendedPartFactory`)'s `on-*` bindings.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(web_sys::Event)>);
impl Listener {
	pub fn new(f: impl Fn(web_sys::Event) + 'static) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, event: web_sys::Event) {
		(self.0)(event)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0)).finish()
	}
}

impl Value {
	/// Converts a JavaScript value, e.g. the result of a settled promise.
	#[must_use]
	pub fn from_js(value: JsValue) -> Self {
		if value.is_null() || value.is_undefined() {
			Value::Absent
		} else if let Some(str) = value.as_string() {
			Value::Primitive(Primitive::Str(str.into()))
		} else if let Some(number) = value.as_f64() {
			Value::Primitive(Primitive::Number(number))
		} else if let Some(bool) = value.as_bool() {
			Value::Primitive(Primitive::Bool(bool))
		} else if value.is_instance_of::<web_sys::Node>() {
			Value::Node(value.unchecked_into())
		} else if value.is_instance_of::<js_sys::Promise>() {
			Value::Promise(value.unchecked_into())
		} else if let Some(items) = Self::iterate_js(&value) {
			Value::Iterable(items)
		} else {
			Value::Primitive(Primitive::Str(String::from(value.unchecked_into::<js_sys::Object>().to_string()).into()))
		}
	}

	/// Collects arrays, `Set`s, generators and other objects with a `Symbol.iterator`.
	fn iterate_js(value: &JsValue) -> Option<Vec<Value>> {
		if js_sys::Array::is_array(value) {
			return Some(js_sys::Array::from(value).iter().map(Value::from_js).collect());
		}
		let iter = match js_sys::try_iter(value) {
			Ok(Some(iter)) => iter,
			Ok(None) => return None,
			Err(error) => {
				tracing::warn!("Failed to iterate value: {:?}", error);
				return None;
			}
		};
		let mut items = vec![];
		for item in iter {
			match item {
				Ok(item) => items.push(Value::from_js(item)),
				Err(error) => {
					tracing::warn!("Iteration threw after {} item(s): {:?}", items.len(), error);
					break;
				}
			}
		}
		Some(items)
	}

	/// Converts into a JavaScript value, e.g. for assignment to a property.
	///
	/// Templates and directives have no JavaScript representation and become `undefined`.
	#[must_use]
	pub fn to_js(&self) -> JsValue {
		match self {
			Value::Absent | Value::Template(_) | Value::Directive(_) | Value::Listener(_) => JsValue::UNDEFINED,
			Value::Primitive(Primitive::Str(str)) => JsValue::from_str(str),
			Value::Primitive(Primitive::Number(number)) => JsValue::from_f64(*number),
			Value::Primitive(Primitive::Bool(bool)) => JsValue::from_bool(*bool),
			Value::Iterable(items) => items.iter().map(Value::to_js).collect::<js_sys::Array>().into(),
			Value::Node(node) => JsValue::from(node.clone()),
			Value::Promise(promise) => JsValue::from(promise.clone()),
		}
	}

	/// The text this value contributes to an attribute.
	#[must_use]
	pub fn to_attribute_text(&self) -> String {
		let mut text = String::new();
		self.push_attribute_text(&mut text);
		text
	}

	fn push_attribute_text(&self, text: &mut String) {
		match self {
			Value::Absent => (),
			Value::Primitive(primitive) => text.push_str(&primitive.to_string()),
			Value::Iterable(items) => items.iter().for_each(|item| item.push_attribute_text(text)),
			Value::Node(node) => text.push_str(&node.text_content().unwrap_or_default()),
			Value::Template(_) | Value::Promise(_) | Value::Directive(_) | Value::Listener(_) => {
				tracing::warn!("{} can't be rendered into an attribute. Skipping.", self.kind())
			}
		}
	}

	/// A short description of the variant, for logging.
	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Absent => "absent value",
			Value::Primitive(Primitive::Str(_)) => "string",
			Value::Primitive(Primitive::Number(_)) => "number",
			Value::Primitive(Primitive::Bool(_)) => "boolean",
			Value::Template(_) => "template result",
			Value::Iterable(_) => "iterable",
			Value::Node(_) => "DOM node",
			Value::Promise(_) => "promise",
			Value::Directive(_) => "directive",
			Value::Listener(_) => "listener",
		}
	}
}

impl Default for Value {
	fn default() -> Self {
		Value::Absent
	}
}

impl From<Primitive> for Value {
	fn from(primitive: Primitive) -> Self {
		Value::Primitive(primitive)
	}
}

impl From<&str> for Value {
	fn from(str: &str) -> Self {
		Value::Primitive(Primitive::Str(str.into()))
	}
}

impl From<String> for Value {
	fn from(string: String) -> Self {
		Value::Primitive(Primitive::Str(string.into()))
	}
}

impl From<Rc<str>> for Value {
	fn from(str: Rc<str>) -> Self {
		Value::Primitive(Primitive::Str(str))
	}
}

impl From<bool> for Value {
	fn from(bool: bool) -> Self {
		Value::Primitive(Primitive::Bool(bool))
	}
}

macro_rules! number_from {
	($($t:ty),*) => {$(
		impl From<$t> for Value {
			#[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
			fn from(number: $t) -> Self {
				Value::Primitive(Primitive::Number(number as f64))
			}
		}
	)*};
}
number_from!(f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<TemplateResult> for Value {
	fn from(result: TemplateResult) -> Self {
		Value::Template(result)
	}
}

impl From<web_sys::Node> for Value {
	fn from(node: web_sys::Node) -> Self {
		Value::Node(node)
	}
}

impl From<web_sys::Element> for Value {
	fn from(element: web_sys::Element) -> Self {
		Value::Node(element.into())
	}
}

impl From<web_sys::HtmlElement> for Value {
	fn from(element: web_sys::HtmlElement) -> Self {
		Value::Node(element.into())
	}
}

impl From<js_sys::Promise> for Value {
	fn from(promise: js_sys::Promise) -> Self {
		Value::Promise(promise)
	}
}

impl From<Directive> for Value {
	fn from(directive: Directive) -> Self {
		Value::Directive(directive)
	}
}

impl From<Listener> for Value {
	fn from(listener: Listener) -> Self {
		Value::Listener(listener)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(option: Option<T>) -> Self {
		option.map_or(Value::Absent, Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::Iterable(items.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Value>> FromIterator<T> for Value {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Value::Iterable(iter.into_iter().map(Into::into).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numbers_print_like_javascript() {
		assert_eq!(Primitive::Number(3.0).to_string(), "3");
		assert_eq!(Primitive::Number(-0.5).to_string(), "-0.5");
		assert_eq!(Primitive::Number(f64::INFINITY).to_string(), "Infinity");
		assert_eq!(Primitive::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
		assert_eq!(Primitive::Number(f64::NAN).to_string(), "NaN");
	}

	#[test]
	fn number_edge_cases_print_like_javascript() {
		let cases = [
			(-0.0, "0"),
			(123.456, "123.456"),
			(1e20, "100000000000000000000"),
			(1e21, "1e+21"),
			(1.5e300, "1.5e+300"),
			(0.000_001, "0.000001"),
			(1e-7, "1e-7"),
			(-2.5e-8, "-2.5e-8"),
			(0.1, "0.1"),
			(42.0, "42"),
		];
		for (number, expected) in cases {
			assert_eq!(Primitive::Number(number).to_string(), expected, "{number:?}");
		}
	}

	#[test]
	fn conversions_pick_the_expected_variant() {
		assert!(matches!(Value::from(1_u8), Value::Primitive(Primitive::Number(n)) if n == 1.0));
		assert!(matches!(Value::from(None::<&str>), Value::Absent));
		assert!(matches!(Value::from(Some("x")), Value::Primitive(Primitive::Str(ref s)) if &**s == "x"));
		assert!(matches!(Value::from(vec![1, 2]), Value::Iterable(ref items) if items.len() == 2));
	}

	#[test]
	fn attribute_text_flattens_iterables_and_drops_absent() {
		let value: Value = vec![Value::from("a"), Value::Absent, Value::from(2), Value::from(vec![true])].into();
		assert_eq!(value.to_attribute_text(), "a2true");
		assert_eq!(Value::Absent.to_attribute_text(), "");
	}

	#[test]
	fn primitive_equality_is_by_value() {
		assert_eq!(Primitive::Str("x".into()), Primitive::Str("x".into()));
		assert_ne!(Primitive::Number(1.0), Primitive::Str("1".into()));
		assert_ne!(Primitive::Number(f64::NAN), Primitive::Number(f64::NAN));
	}
}
