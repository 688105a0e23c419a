//! Marker token generation and the string surgery around it.
//!
//! Everything except [`marker`] itself is pure and doesn't touch the browser.

use std::rc::Rc;

thread_local! {
	static MARKER: Rc<str> = format!("{{{{slidem-{}}}}}", random_digits()).into();
}

/// The per-thread marker token that is substituted at every expression position.
#[must_use]
pub fn marker() -> Rc<str> {
	MARKER.with(Rc::clone)
}

fn random_digits() -> String {
	let random = js_sys::Math::random().to_string();
	random.trim_start_matches("0.").chars().filter(char::is_ascii_digit).collect()
}

/// Splits `html!`-style source text at each `{}` placeholder.
///
/// `{{` and `}}` stand for literal braces. Any other brace is kept as-is.
/// The result always has one more element than there are placeholders.
#[must_use]
pub fn split_placeholders(source: &str) -> Vec<String> {
	let mut fragments = vec![];
	let mut current = String::new();
	let mut chars = source.chars().peekable();
	while let Some(c) = chars.next() {
		match (c, chars.peek()) {
			('{', Some('}')) => {
				chars.next();
				fragments.push(core::mem::take(&mut current));
			}
			('{', Some('{')) | ('}', Some('}')) => {
				chars.next();
				current.push(c);
			}
			_ => current.push(c),
		}
	}
	fragments.push(current);
	fragments
}

/// Splits `text` at each occurrence of `marker`.
#[must_use]
pub fn split_on_marker<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
	text.split(marker).collect()
}

/// Recovers the case-preserving attribute name from the static fragment that precedes an attribute's first expression.
///
/// `first_literal` is the attribute value's literal text before that expression, as parsed by the browser.
/// It's trimmed off the end of `fragment`, after which the remainder has to end with `name=`, `name="` or `name='`.
#[must_use]
pub fn raw_attribute_name<'a>(fragment: &'a str, first_literal: &str) -> Option<&'a str> {
	let head = fragment.strip_suffix(first_literal)?;
	let head = head.strip_suffix(|c| c == '"' || c == '\'').unwrap_or(head);
	let head = head.strip_suffix('=')?;
	let start = head
		.char_indices()
		.rev()
		.take_while(|&(_, c)| is_attribute_name_char(c))
		.last()
		.map(|(i, _)| i)?;
	Some(&head[start..])
}

fn is_attribute_name_char(c: char) -> bool {
	c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '$')
}

/// Whether the text node should be dropped from compiled templates.
#[must_use]
pub fn is_insignificant_whitespace(text: &str) -> bool {
	text.trim().is_empty()
}
