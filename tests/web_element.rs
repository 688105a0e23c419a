#![cfg(target_arch = "wasm32")]

use slidem::{
	element::{Component, Host, RenderMode},
	html,
	listener::on_settled,
	template::{extended_part_factory, Listener, PartFactory, RenderRoot, TemplateResult},
};
use std::{
	cell::{Cell, RefCell},
	future::Future,
	pin::Pin,
	rc::Rc,
	task::{Context, Poll, Waker},
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn element(tag: &str) -> HtmlElement {
	let _ = tracing_wasm::try_set_as_global_default();
	let document = window().unwrap().document().unwrap();
	let element: HtmlElement = document.create_element(tag).unwrap().dyn_into().unwrap();
	document.body().unwrap().append_child(&element).unwrap();
	element
}

struct Tick(Rc<RefCell<(bool, Option<Waker>)>>);

impl Future for Tick {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		let mut state = self.0.borrow_mut();
		if state.0 {
			Poll::Ready(())
		} else {
			state.1 = Some(cx.waker().clone());
			Poll::Pending
		}
	}
}

/// Lets the microtasks queued so far run.
fn tick() -> Tick {
	let state = Rc::new(RefCell::new((false, None::<Waker>)));
	let wake = |state: Rc<RefCell<(bool, Option<Waker>)>>| {
		move |_: JsValue| {
			let waker = {
				let mut state = state.borrow_mut();
				state.0 = true;
				state.1.take()
			};
			if let Some(waker) = waker {
				waker.wake();
			}
		}
	};
	on_settled(&js_sys::Promise::resolve(&JsValue::NULL), wake(Rc::clone(&state)), wake(Rc::clone(&state)));
	Tick(state)
}

struct Greeting {
	name: String,
	renders: Rc<Cell<u32>>,
}

impl Component for Greeting {
	const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["name"];

	fn template(&self) -> Option<TemplateResult> {
		self.renders.set(self.renders.get() + 1);
		Some(html!("<p id=\"greeting\">Hello, {}!</p>", self.name.clone()))
	}

	fn attribute_changed(&mut self, _element: &HtmlElement, name: &str, _old: Option<&str>, new: Option<&str>) -> bool {
		assert_eq!(name, "name");
		self.name = new.unwrap_or("nobody").to_owned();
		true
	}
}

fn greeting(host: &Host<Greeting>) -> String {
	host.by_id("greeting").unwrap().text_content().unwrap()
}

#[wasm_bindgen_test]
fn upgrade_renders_synchronously() {
	let element = element("x-greeting");
	element.set_attribute("name", "deck").unwrap();
	let renders = Rc::new(Cell::new(0));
	let host = Host::upgrade(element, Greeting { name: String::new(), renders: Rc::clone(&renders) }).unwrap();

	assert_eq!(renders.get(), 1);
	assert_eq!(greeting(&host), "Hello, deck!");
	assert!(host.shadow_root().get_element_by_id("greeting").is_some());
}

#[wasm_bindgen_test]
async fn deferred_renders_coalesce() {
	let renders = Rc::new(Cell::new(0));
	let host = Host::upgrade(element("x-greeting"), Greeting { name: "a".to_owned(), renders: Rc::clone(&renders) }).unwrap();

	host.update(|greeting| greeting.name = "b".to_owned()).unwrap();
	host.update(|greeting| greeting.name = "c".to_owned()).unwrap();
	assert_eq!(renders.get(), 1);
	assert_eq!(greeting(&host), "Hello, a!");

	tick().await;
	assert_eq!(renders.get(), 2);
	assert_eq!(greeting(&host), "Hello, c!");
}

#[wasm_bindgen_test]
async fn sync_render_supersedes_pending_one() {
	let renders = Rc::new(Cell::new(0));
	let host = Host::upgrade(element("x-greeting"), Greeting { name: "a".to_owned(), renders: Rc::clone(&renders) }).unwrap();

	host.update(|greeting| greeting.name = "b".to_owned()).unwrap();
	host.render(RenderMode::Sync).unwrap();
	assert_eq!(renders.get(), 2);

	tick().await;
	assert_eq!(renders.get(), 2);
	assert_eq!(greeting(&host), "Hello, b!");
}

#[wasm_bindgen_test]
async fn attribute_changes_rerender() {
	let renders = Rc::new(Cell::new(0));
	let host = Host::upgrade(element("x-greeting"), Greeting { name: "a".to_owned(), renders: Rc::clone(&renders) }).unwrap();

	host.element().set_attribute("name", "observer").unwrap();
	host.element().set_attribute("title", "not observed").unwrap();
	tick().await;
	tick().await;
	assert_eq!(greeting(&host), "Hello, observer!");
	assert_eq!(renders.get(), 2);
}

struct Counter {
	clicks: Rc<Cell<u32>>,
}

impl Counter {
	fn template(&self) -> TemplateResult {
		let clicks = Rc::clone(&self.clicks);
		html!(
			"<button on-click=\"{}\" title=\"{}\" data-count$=\"{}\">+</button>",
			Listener::new(move |_| clicks.set(clicks.get() + 1)),
			"increment",
			self.clicks.get(),
		)
	}
}

#[wasm_bindgen_test]
fn extended_bindings() {
	let container = element("div");
	let clicks = Rc::new(Cell::new(0));
	let counter = Counter { clicks: Rc::clone(&clicks) };
	let factory: Rc<dyn PartFactory> = extended_part_factory();
	let mut root = RenderRoot::new(container.clone().into());

	root.render_with(counter.template(), Rc::clone(&factory)).unwrap();
	let button: HtmlElement = container.query_selector("button").unwrap().unwrap().dyn_into().unwrap();
	assert_eq!(button.title(), "increment");
	assert_eq!(button.get_attribute("data-count").unwrap(), "0");
	assert!(!button.has_attribute("on-click"));

	button.click();
	button.click();
	assert_eq!(clicks.get(), 2);

	root.render_with(counter.template(), factory).unwrap();
	assert_eq!(button.get_attribute("data-count").unwrap(), "2");
	button.click();
	assert_eq!(clicks.get(), 3);
}
