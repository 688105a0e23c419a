//! Location change notifications.
//!
//! [`Router::install`] listens for `hashchange`, `popstate` and clicks on same-origin links,
//! and notifies subscribers with the current [`Route`] whenever the location changes.

use crate::{
	error::{window, Error, Result},
	listener::EventListener,
};
use std::{
	cell::{Cell, RefCell},
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace};
use wasm_bindgen::{JsCast, JsValue};

/// The parts of the current location subscribers care about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
	pub path: String,
	/// Includes the leading `?`, if not empty.
	pub query: String,
	/// Includes the leading `#`, if not empty.
	pub hash: String,
}

impl Route {
	/// # Errors
	///
	/// Iff reading the location throws.
	pub fn from_location(location: &web_sys::Location) -> Result<Self> {
		Ok(Self {
			path: location.pathname()?,
			query: location.search()?,
			hash: location.hash()?,
		})
	}

	/// Whether the query string contains `flag`, with or without a value.
	#[must_use]
	pub fn has_query_flag(&self, flag: &str) -> bool {
		self.query
			.trim_start_matches('?')
			.split('&')
			.any(|pair| pair.split('=').next() == Some(flag))
	}

	/// The path, query and hash concatenated, as used for history entries and storage.
	#[must_use]
	pub fn relative_url(&self) -> String {
		format!("{}{}{}", self.path, self.query, self.hash)
	}
}

type Callback = Rc<dyn Fn(&Route)>;

/// Dispatches location changes to subscribers. Construct once per page.
pub struct Router {
	window: web_sys::Window,
	callbacks: RefCell<Vec<(u64, Callback)>>,
	next_id: Cell<u64>,
	listeners: RefCell<Vec<EventListener>>,
}

/// Unsubscribes its callback from the [`Router`] on drop.
#[must_use = "The callback is unsubscribed when this handle is dropped."]
pub struct RouteSubscription {
	router: Weak<Router>,
	id: u64,
}

impl Drop for RouteSubscription {
	fn drop(&mut self) {
		if let Some(router) = self.router.upgrade() {
			router.unsubscribe(self.id);
		}
	}
}

impl Router {
	/// # Errors
	///
	/// Iff the listeners can't be installed.
	#[instrument(skip(window))]
	pub fn install(window: &web_sys::Window) -> Result<Rc<Self>> {
		let router = Rc::new(Self {
			window: window.clone(),
			callbacks: RefCell::new(vec![]),
			next_id: Cell::new(0),
			listeners: RefCell::new(vec![]),
		});

		let document = window.document().ok_or(Error::MissingGlobal("document"))?;
		let listeners = vec![
			Self::listen(&router, window, "hashchange", |router, _| router.notify())?,
			Self::listen(&router, window, "popstate", |router, _| router.notify())?,
			Self::listen(&router, &document, "click", |router, event| {
				if let Some(event) = event.dyn_ref::<web_sys::MouseEvent>() {
					router.intercept_link_click(event)
				}
			})?,
		];
		*router.listeners.borrow_mut() = listeners;
		Ok(router)
	}

	fn listen(router: &Rc<Self>, target: &web_sys::EventTarget, event: &'static str, handler: impl Fn(&Router, web_sys::Event) + 'static) -> Result<EventListener> {
		let router = Rc::downgrade(router);
		EventListener::new(target, event, move |event| {
			if let Some(router) = router.upgrade() {
				handler(&router, event)
			}
		})
	}

	/// Subscribes `callback` to location changes. It isn't called for the current location.
	pub fn on_route_change(self: &Rc<Self>, callback: impl Fn(&Route) + 'static) -> RouteSubscription {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.callbacks.borrow_mut().push((id, Rc::new(callback)));
		trace!(id, "Subscribed to route changes.");
		RouteSubscription { router: Rc::downgrade(self), id }
	}

	fn unsubscribe(&self, id: u64) {
		let mut callbacks = self.callbacks.borrow_mut();
		if let Some(index) = callbacks.iter().position(|&(i, _)| i == id) {
			callbacks.remove(index);
			trace!(id, "Unsubscribed from route changes.");
		}
	}

	/// # Errors
	///
	/// Iff reading the location throws.
	pub fn current(&self) -> Result<Route> {
		Route::from_location(&self.window.location())
	}

	/// Calls all subscribers with the current [`Route`].
	///
	/// Subscriptions made or dropped by a callback take effect from the next notification.
	pub fn notify(&self) {
		let route = match self.current() {
			Ok(route) => route,
			Err(error) => return error!("Failed to read location: {}", error),
		};
		let callbacks: Vec<Callback> = self.callbacks.borrow().iter().map(|(_, callback)| Rc::clone(callback)).collect();
		trace!(subscribers = callbacks.len(), ?route, "Route changed.");
		for callback in callbacks {
			callback(&route);
		}
	}

	/// Pushes a history entry for `url` and notifies subscribers.
	///
	/// # Errors
	///
	/// Iff `history.pushState` throws.
	pub fn navigate(&self, url: &str) -> Result<()> {
		self.window.history()?.push_state_with_url(&JsValue::NULL, "", Some(url))?;
		self.notify();
		Ok(())
	}

	/// Replaces the current history entry with `url` and notifies subscribers.
	///
	/// # Errors
	///
	/// Iff `history.replaceState` throws.
	pub fn replace(&self, url: &str) -> Result<()> {
		self.window.history()?.replace_state_with_url(&JsValue::NULL, "", Some(url))?;
		self.notify();
		Ok(())
	}

	fn intercept_link_click(&self, event: &web_sys::MouseEvent) {
		if event.default_prevented() || event.button() != 0 || event.ctrl_key() || event.meta_key() || event.shift_key() || event.alt_key() {
			return;
		}
		let anchor = match event
			.target()
			.and_then(|target| target.dyn_into::<web_sys::Element>().ok())
			.and_then(|element| element.closest("a[href]").ok().flatten())
			.and_then(|element| element.dyn_into::<web_sys::HtmlAnchorElement>().ok())
		{
			Some(anchor) => anchor,
			None => return,
		};
		if anchor.has_attribute("download") || !matches!(anchor.target().as_str(), "" | "_self") {
			return;
		}

		let result = (|| -> Result<bool> {
			let location = self.window.location();
			let href = resolve_url(&anchor.href(), &location.href()?)?;
			let url = web_sys::Url::new(&href)?;
			if url.origin() != location.origin()? {
				return Ok(false);
			}
			event.prevent_default();
			self.navigate(&format!("{}{}{}", url.pathname(), url.search(), url.hash()))?;
			Ok(true)
		})();
		match result {
			Ok(intercepted) => trace!(intercepted, "Link clicked."),
			Err(error) => error!("Failed to handle link click: {}", error),
		}
	}
}

/// Resolves `href` against `base`.
///
/// Uses the `URL` constructor where available and falls back to letting an anchor element resolve it.
///
/// # Errors
///
/// Iff `href` can't be resolved.
pub fn resolve_url(href: &str, base: &str) -> Result<String> {
	let window = window()?;
	let has_url_constructor = js_sys::Reflect::has(&window, &JsValue::from_str("URL")).unwrap_or(false);
	if has_url_constructor {
		return Ok(web_sys::Url::new_with_base(href, base)?.href());
	}

	trace!("No `URL` constructor. Resolving through an anchor element.");
	let document = window.document().ok_or(Error::MissingGlobal("document"))?;
	let base_element = document.create_element("base")?;
	base_element.set_attribute("href", base)?;
	let anchor: web_sys::HtmlAnchorElement = document.create_element("a")?.unchecked_into();
	let head = document.head().ok_or(Error::MissingGlobal("document.head"))?;
	head.append_child(&base_element)?;
	anchor.set_href(href);
	let resolved = anchor.href();
	head.remove_child(&base_element)?;
	Ok(resolved)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn route(query: &str) -> Route {
		Route { path: "/deck".to_owned(), query: query.to_owned(), hash: "#slide-2".to_owned() }
	}

	#[test]
	fn query_flags() {
		assert!(route("?presenter").has_query_flag("presenter"));
		assert!(route("?a=1&presenter=yes").has_query_flag("presenter"));
		assert!(!route("?presenters").has_query_flag("presenter"));
		assert!(!route("").has_query_flag("presenter"));
	}

	#[test]
	fn relative_url_concatenates() {
		assert_eq!(route("?presenter").relative_url(), "/deck?presenter#slide-2");
	}
}
