#![cfg(target_arch = "wasm32")]

use slidem::{
	html,
	listener::on_settled,
	template::{RenderRoot, TemplateResult, Value},
};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
	window().unwrap().document().unwrap()
}

fn container() -> HtmlElement {
	let _ = tracing_wasm::try_set_as_global_default();
	let document = document();
	let container: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	container
}

fn paragraph(text: &str) -> TemplateResult {
	html!("<p>{}</p>", text)
}

#[wasm_bindgen_test]
fn one_template_per_site() {
	let document = document();
	let a = paragraph("a").template(&document).unwrap();
	let b = paragraph("b").template(&document).unwrap();
	assert!(Rc::ptr_eq(&a, &b));

	let other = html!("<p>{}</p>", "a").template(&document).unwrap();
	assert!(!Rc::ptr_eq(&a, &other));
}

#[wasm_bindgen_test]
fn rerender_reuses_nodes() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());

	root.render(paragraph("first")).unwrap();
	let p = container.query_selector("p").unwrap().unwrap();
	assert_eq!(p.text_content().unwrap(), "first");
	// Start marker, text, end marker.
	assert_eq!(p.child_nodes().length(), 3);
	let text = p.child_nodes().item(1).unwrap();

	root.render(paragraph("second")).unwrap();
	let p_again = container.query_selector("p").unwrap().unwrap();
	assert!(p.is_same_node(Some(&p_again)));
	assert_eq!(p_again.text_content().unwrap(), "second");
	assert_eq!(p.child_nodes().length(), 3);
	assert!(text.is_same_node(p.child_nodes().item(1).as_ref()));
	assert_eq!(text.text_content().unwrap(), "second");
}

#[wasm_bindgen_test]
fn other_site_replaces_content() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());

	root.render(paragraph("text")).unwrap();
	root.render(html!("<span>{}</span>", 1)).unwrap();
	assert!(container.query_selector("p").unwrap().is_none());
	assert_eq!(container.text_content().unwrap(), "1");
}

#[wasm_bindgen_test]
fn whitespace_between_tags_is_dropped() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());

	root.render(html!("<ul>\n\t<li>{}</li>\n\t<li>{}</li>\n</ul>", "a", "b")).unwrap();
	let ul = container.query_selector("ul").unwrap().unwrap();
	assert_eq!(ul.child_nodes().length(), 2);
	assert_eq!(ul.text_content().unwrap(), "ab");
}

fn list(items: &[u32]) -> TemplateResult {
	html!("<ul>{}</ul>", items.iter().map(|&item| html!("<li>{}</li>", item)).collect::<Vec<_>>())
}

#[wasm_bindgen_test]
fn lists_grow_and_trim() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());

	root.render(list(&[1, 2, 3])).unwrap();
	let ul = container.query_selector("ul").unwrap().unwrap();
	let first = ul.query_selector("li").unwrap().unwrap();
	assert_eq!(ul.text_content().unwrap(), "123");
	// Two part markers plus one `li` and one separator per item.
	assert_eq!(ul.child_nodes().length(), 7);

	root.render(list(&[1, 2])).unwrap();
	assert_eq!(ul.text_content().unwrap(), "12");
	assert_eq!(ul.query_selector_all("li").unwrap().length(), 2);
	assert_eq!(ul.child_nodes().length(), 5);
	assert!(first.is_same_node(ul.query_selector("li").unwrap().as_ref()));

	root.render(list(&[4, 5, 6, 7])).unwrap();
	assert_eq!(ul.text_content().unwrap(), "4567");
	assert_eq!(ul.child_nodes().length(), 9);
	assert!(first.is_same_node(ul.query_selector("li").unwrap().as_ref()));
}

#[wasm_bindgen_test]
fn empty_list_clears() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());

	root.render(list(&[1, 2, 3])).unwrap();
	root.render(list(&[])).unwrap();
	let ul = container.query_selector("ul").unwrap().unwrap();
	assert_eq!(ul.query_selector_all("li").unwrap().length(), 0);
	assert_eq!(ul.text_content().unwrap(), "");
	assert_eq!(ul.child_nodes().length(), 2);

	root.render(list(&[8])).unwrap();
	assert_eq!(ul.text_content().unwrap(), "8");
	assert_eq!(ul.child_nodes().length(), 3);
}

#[wasm_bindgen_test]
fn nested_lists_keep_their_bounds() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let render = |root: &mut RenderRoot, rows: &[&[u32]], tail: &str| {
		let rows = rows.iter().map(|row| Value::from(row.iter().copied().map(Value::from).collect::<Vec<_>>())).collect::<Vec<_>>();
		root.render(html!("<div>{}{}</div>", rows, tail)).unwrap();
	};

	render(&mut root, &[&[1, 2], &[3]], "|");
	assert_eq!(container.text_content().unwrap(), "123|");
	render(&mut root, &[&[1, 2], &[3, 4, 5]], "|");
	assert_eq!(container.text_content().unwrap(), "12345|");
	render(&mut root, &[&[1]], "!");
	assert_eq!(container.text_content().unwrap(), "1!");
}

#[wasm_bindgen_test]
fn attribute_with_several_expressions() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let render = |root: &mut RenderRoot, a: &str, b: &str| root.render(html!("<p data-pair=\"{}-{}\">text</p>", a, b)).unwrap();

	render(&mut root, "x", "y");
	let p = container.query_selector("p").unwrap().unwrap();
	assert_eq!(p.get_attribute("data-pair").unwrap(), "x-y");

	render(&mut root, "p", "y");
	assert_eq!(p.get_attribute("data-pair").unwrap(), "p-y");
	assert_eq!(p.text_content().unwrap(), "text");
}

#[wasm_bindgen_test]
fn absent_renders_nothing() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let render = |root: &mut RenderRoot, value: Option<&str>| root.render(html!("<p class=\"{}\">{}</p>", value, value)).unwrap();

	render(&mut root, None);
	let p = container.query_selector("p").unwrap().unwrap();
	assert_eq!(p.get_attribute("class").unwrap(), "");
	assert_eq!(p.text_content().unwrap(), "");

	render(&mut root, Some("shown"));
	assert_eq!(p.text_content().unwrap(), "shown");
	render(&mut root, None);
	assert_eq!(p.text_content().unwrap(), "");
}

#[wasm_bindgen_test]
fn raw_nodes_are_inserted() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let node = document().create_element("em").unwrap();
	node.set_text_content(Some("raw"));

	root.render(html!("<p>{}</p>", node.clone())).unwrap();
	assert!(container.query_selector("em").unwrap().unwrap().is_same_node(Some(&node)));
	root.render(html!("<p>{}</p>", node.clone())).unwrap();
	assert_eq!(container.query_selector_all("em").unwrap().length(), 1);
}

/// Resolves once `promise` settled and the continuations registered before it ran.
async fn settled(promise: &js_sys::Promise) {
	let _ = JsFuture::from(promise.clone()).await;
}

fn deferred() -> (js_sys::Promise, js_sys::Function) {
	let mut resolve = None;
	let promise = js_sys::Promise::new(&mut |resolve_fn, _| resolve = Some(resolve_fn));
	(promise, resolve.unwrap())
}

fn content(value: Value) -> TemplateResult {
	html!("<p>{}</p>", value)
}

#[wasm_bindgen_test]
async fn promise_result_is_rendered() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let (promise, resolve) = deferred();

	root.render(content(promise.clone().into())).unwrap();
	resolve.call1(&JsValue::NULL, &JsValue::from_str("late")).unwrap();
	settled(&promise).await;
	assert_eq!(container.text_content().unwrap(), "late");
}

#[wasm_bindgen_test]
async fn stale_promise_is_ignored() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let (promise, resolve) = deferred();

	root.render(content(promise.clone().into())).unwrap();
	let p = container.query_selector("p").unwrap().unwrap();
	root.render(content("sync".into())).unwrap();
	assert!(p.is_same_node(container.query_selector("p").unwrap().as_ref()));
	assert_eq!(container.text_content().unwrap(), "sync");

	resolve.call1(&JsValue::NULL, &JsValue::from_str("late")).unwrap();
	settled(&promise).await;
	assert_eq!(container.text_content().unwrap(), "sync");
}

#[wasm_bindgen_test]
async fn js_iterables_render_their_items() {
	let container = container();
	let mut root = RenderRoot::new(container.clone().into());
	let set = js_sys::Set::new(&JsValue::UNDEFINED);
	set.add(&JsValue::from_str("a"));
	set.add(&JsValue::from_str("b"));
	let promise = js_sys::Promise::resolve(&set);

	root.render(content(promise.clone().into())).unwrap();
	settled(&promise).await;
	assert_eq!(container.text_content().unwrap(), "ab");
	assert_eq!(container.query_selector("p").unwrap().unwrap().child_nodes().length(), 5);
}

#[wasm_bindgen_test]
async fn settled_promises_reach_one_continuation() {
	let outcomes = Rc::new(RefCell::new(Vec::new()));
	let record = |outcomes: &Rc<RefCell<Vec<String>>>, kind: &'static str| {
		let outcomes = Rc::clone(outcomes);
		move |value: JsValue| outcomes.borrow_mut().push(format!("{} {}", kind, value.as_string().unwrap()))
	};

	let fulfilled = js_sys::Promise::resolve(&JsValue::from_str("one"));
	on_settled(&fulfilled, record(&outcomes, "fulfilled"), record(&outcomes, "rejected"));
	let rejected = js_sys::Promise::reject(&JsValue::from_str("two"));
	on_settled(&rejected, record(&outcomes, "fulfilled"), record(&outcomes, "rejected"));

	settled(&fulfilled).await;
	settled(&rejected).await;
	assert_eq!(*outcomes.borrow(), ["fulfilled one", "rejected two"]);
}
