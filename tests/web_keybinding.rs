#![cfg(target_arch = "wasm32")]

use slidem::{
	keybinding::{BindingOptions, KeyBinding, KeybindingService},
	listener::EventListener,
};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, HtmlElement, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
	let _ = tracing_wasm::try_set_as_global_default();
	window().unwrap().document().unwrap()
}

/// Appends a button that logs `name` when clicked.
fn button(document: &Document, name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> (HtmlElement, EventListener) {
	let button: HtmlElement = document.create_element("button").unwrap().dyn_into().unwrap();
	button.set_text_content(Some(name));
	document.body().unwrap().append_child(&button).unwrap();
	let log = Rc::clone(log);
	let listener = EventListener::new(&button, "click", move |_| log.borrow_mut().push(name)).unwrap();
	(button, listener)
}

fn press(document: &Document, key: &str) -> bool {
	let init = KeyboardEventInit::new();
	init.set_key(key);
	init.set_bubbles(true);
	init.set_cancelable(true);
	let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
	document.dispatch_event(&event).unwrap();
	event.default_prevented()
}

#[wasm_bindgen_test]
fn most_recent_registration_wins() {
	let document = document();
	let log = Rc::new(RefCell::new(vec![]));
	let (first, _first) = button(&document, "first", &log);
	let (second, _second) = button(&document, "second", &log);
	let service = KeybindingService::install(&document).unwrap();

	service.register("a", first.clone(), BindingOptions::default());
	service.register("a", second.clone(), BindingOptions::default());
	assert!(press(&document, "a"));
	assert_eq!(*log.borrow(), ["second"]);

	assert!(!press(&document, "b"));
	assert_eq!(log.borrow().len(), 1);

	service.unregister("a", &second);
	press(&document, "a");
	assert_eq!(*log.borrow(), ["second", "first"]);
}

#[wasm_bindgen_test]
fn override_and_propagate() {
	let document = document();
	let log = Rc::new(RefCell::new(vec![]));
	let (overriding, _overriding) = button(&document, "override", &log);
	let (later, _later) = button(&document, "later", &log);
	let service = KeybindingService::install(&document).unwrap();

	service.register("o", overriding, BindingOptions { override_: true, propagate: true });
	service.register("o", later, BindingOptions::default());
	press(&document, "o");
	assert_eq!(*log.borrow(), ["override", "later"]);
}

#[wasm_bindgen_test]
fn hidden_elements_are_skipped() {
	let document = document();
	let log = Rc::new(RefCell::new(vec![]));
	let (visible, _visible) = button(&document, "visible", &log);
	let (hidden, _hidden) = button(&document, "hidden", &log);
	hidden.style().set_property("display", "none").unwrap();
	let service = KeybindingService::install(&document).unwrap();

	service.register("h", visible, BindingOptions::default());
	service.register("h", hidden, BindingOptions::default());
	assert_eq!(service.dispatch("h"), 1);
	assert_eq!(*log.borrow(), ["visible"]);
}

#[wasm_bindgen_test]
fn keybinding_elements() {
	let document = document();
	let log = Rc::new(RefCell::new(vec![]));
	let element: HtmlElement = document.create_element("slidem-keybinding").unwrap().dyn_into().unwrap();
	element.set_attribute("key", "k").unwrap();
	element.set_text_content(Some("bound"));
	document.body().unwrap().append_child(&element).unwrap();
	let log_clicks = Rc::clone(&log);
	let _listener = EventListener::new(&element, "click", move |_| log_clicks.borrow_mut().push("element")).unwrap();
	let service = KeybindingService::install(&document).unwrap();

	let binding = KeyBinding::upgrade(element, Rc::clone(&service)).unwrap();
	press(&document, "k");
	assert_eq!(*log.borrow(), ["element"]);

	drop(binding);
	press(&document, "k");
	assert_eq!(log.borrow().len(), 1);
}
