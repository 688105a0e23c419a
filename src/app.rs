//! JavaScript entry point.

use crate::{
	deck::SlideDeck,
	element::Host,
	error::{document, window, Result},
	keybinding::{KeyBinding, KeybindingService},
	router::Router,
};
use std::rc::Rc;
use tracing::{info, instrument};
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};

/// Upgrades the page's `slidem-deck` and `slidem-keybinding` elements.
///
/// ```js
/// import init, { SlidemApp } from "./slidem.js";
/// await init();
/// const app = new SlidemApp();
/// // Later, to remove all listeners and timers again:
/// app.free();
/// ```
#[wasm_bindgen]
pub struct SlidemApp {
	router: Rc<Router>,
	_keybindings: Rc<KeybindingService>,
	decks: Vec<SlideDeck>,
	_bindings: Vec<Host<KeyBinding>>,
}

#[wasm_bindgen]
impl SlidemApp {
	/// # Errors
	///
	/// Iff any element fails to upgrade.
	#[wasm_bindgen(constructor)]
	pub fn new() -> core::result::Result<SlidemApp, JsValue> {
		Ok(Self::start()?)
	}

	/// Number of upgraded decks.
	#[wasm_bindgen(getter)]
	#[must_use]
	pub fn decks(&self) -> usize {
		self.decks.len()
	}

	/// Advances the deck at `index` by one step.
	///
	/// # Errors
	///
	/// Iff navigation fails. Out-of-range indices are ignored.
	pub fn next(&self, index: usize) -> core::result::Result<(), JsValue> {
		match self.decks.get(index) {
			Some(deck) => Ok(deck.next()?),
			None => Ok(()),
		}
	}

	/// Moves the deck at `index` back by one step.
	///
	/// # Errors
	///
	/// Iff navigation fails. Out-of-range indices are ignored.
	pub fn previous(&self, index: usize) -> core::result::Result<(), JsValue> {
		match self.decks.get(index) {
			Some(deck) => Ok(deck.previous()?),
			None => Ok(()),
		}
	}

	/// Re-reads the location and notifies all decks, e.g. after the page changed the URL behind the router's back.
	pub fn refresh(&self) {
		self.router.notify();
	}
}

impl SlidemApp {
	#[instrument]
	fn start() -> Result<Self> {
		let window = window()?;
		let document = document()?;
		let router = Router::install(&window)?;
		let keybindings = KeybindingService::install(&document)?;

		let decks = select(&document, "slidem-deck")?
			.into_iter()
			.map(|element| SlideDeck::upgrade(element, Rc::clone(&router), Rc::clone(&keybindings)))
			.collect::<Result<Vec<_>>>()?;
		let bindings = select(&document, "slidem-keybinding")?
			.into_iter()
			.map(|element| KeyBinding::upgrade(element, Rc::clone(&keybindings)))
			.collect::<Result<Vec<_>>>()?;

		info!(decks = decks.len(), keybindings = bindings.len(), "slidem started.");
		Ok(Self {
			router,
			_keybindings: keybindings,
			decks,
			_bindings: bindings,
		})
	}
}

fn select(document: &web_sys::Document, selector: &str) -> Result<Vec<web_sys::HtmlElement>> {
	let found = document.query_selector_all(selector)?;
	Ok((0..found.length()).filter_map(|i| found.item(i)).filter_map(|node| node.dyn_into::<web_sys::HtmlElement>().ok()).collect())
}
