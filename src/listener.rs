//! Owned [`Closure`]s for event listeners and timers, and promise continuations.
//!
//! Listeners and timers are released when their handle drops, so tearing down a component is a matter of dropping its handles.

use crate::error::{window, Result};
use std::borrow::Cow;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

/// An event listener that is removed from its target on drop.
#[must_use = "The listener is removed when this handle is dropped."]
pub struct EventListener {
	target: web_sys::EventTarget,
	event: Cow<'static, str>,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl EventListener {
	/// # Errors
	///
	/// Iff `addEventListener` throws.
	pub fn new(target: &web_sys::EventTarget, event: impl Into<Cow<'static, str>>, handler: impl FnMut(web_sys::Event) + 'static) -> Result<Self> {
		let event = event.into();
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
		target.add_event_listener_with_callback(&event, closure.as_ref().unchecked_ref())?;
		trace!(event = &*event, "Added event listener.");
		Ok(Self { target: target.clone(), event, closure })
	}

	/// Like [`EventListener::new`], but passes the event as `E` and drops events of other types.
	///
	/// # Errors
	///
	/// Iff `addEventListener` throws.
	pub fn typed<E: JsCast>(target: &web_sys::EventTarget, event: impl Into<Cow<'static, str>>, mut handler: impl FnMut(E) + 'static) -> Result<Self> {
		Self::new(target, event, move |event: web_sys::Event| match event.dyn_into::<E>() {
			Ok(event) => handler(event),
			Err(event) => error!("Unexpected event type for {:?}: {:?}", event.type_(), event),
		})
	}

	#[must_use]
	pub fn event(&self) -> &str {
		&self.event
	}
}

impl Drop for EventListener {
	fn drop(&mut self) {
		if let Err(error) = self.target.remove_event_listener_with_callback(&self.event, self.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {:?} listener: {:?}", self.event, error);
		}
		trace!(event = &*self.event, "Removed event listener.");
	}
}

/// A pending `setTimeout` callback that is cancelled on drop.
#[must_use = "The timeout is cleared when this handle is dropped."]
pub struct Timeout {
	handle: i32,
	_closure: Closure<dyn FnMut()>,
}

impl Timeout {
	/// # Errors
	///
	/// Iff there's no `window` or `setTimeout` throws.
	pub fn new(millis: i32, callback: impl FnOnce() + 'static) -> Result<Self> {
		let closure: Closure<dyn FnMut()> = Closure::once(callback);
		let handle = window()?.set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis)?;
		Ok(Self { handle, _closure: closure })
	}
}

impl Drop for Timeout {
	fn drop(&mut self) {
		// Clearing an already-fired timeout is a no-op.
		if let Some(window) = web_sys::window() {
			window.clear_timeout_with_handle(self.handle);
		}
	}
}

/// A `setInterval` callback that is cleared on drop.
#[must_use = "The interval is cleared when this handle is dropped."]
pub struct Interval {
	handle: i32,
	_closure: Closure<dyn FnMut()>,
}

impl Interval {
	/// # Errors
	///
	/// Iff there's no `window` or `setInterval` throws.
	pub fn new(millis: i32, callback: impl FnMut() + 'static) -> Result<Self> {
		let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
		let handle = window()?.set_interval_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis)?;
		Ok(Self { handle, _closure: closure })
	}
}

impl Drop for Interval {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			window.clear_interval_with_handle(self.handle);
		}
	}
}

/// Runs `callback` in a microtask.
///
/// # Errors
///
/// Iff there's no `window`.
pub fn queue_microtask(callback: impl FnOnce() + 'static) -> Result<()> {
	let callback = Closure::once_into_js(callback);
	window()?.queue_microtask(callback.unchecked_ref());
	Ok(())
}

/// Calls one of the callbacks once `promise` settles.
///
/// The continuations are released after they ran.
pub fn on_settled(promise: &js_sys::Promise, on_fulfilled: impl FnOnce(JsValue) + 'static, on_rejected: impl FnOnce(JsValue) + 'static) {
	let settled = JsFuture::from(promise.clone());
	spawn_local(async move {
		match settled.await {
			Ok(value) => on_fulfilled(value),
			Err(reason) => on_rejected(reason),
		}
	});
}
