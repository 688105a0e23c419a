//! The `slidem-deck` element: navigation, progress, presenter view and the page-level plumbing around them.

use super::{
	config::DeckConfig,
	location::Location,
	slide::{Direction, Role, Slide},
};
use crate::{
	element::{Component, Host, RenderMode},
	error::{window, Error, Result},
	keybinding::{BindingOptions, KeybindingService},
	listener::{on_settled, EventListener, Interval, Timeout},
	router::{Route, RouteSubscription, Router},
	template::{extended_part_factory, Listener, PartFactory, TemplateResult},
};
use std::{
	cell::{Cell, OnceCell, RefCell},
	cmp::Ordering,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};

/// Keys that click the deck's own controls, by control `id`.
const CONTROL_KEYS: &[(&str, &[&str])] = &[("forward", &["ArrowRight", "PageDown", " "]), ("backward", &["ArrowLeft", "PageUp"]), ("timer", &["t"])];

/// Shadow content of the deck.
pub struct DeckView {
	slides: usize,
	location: Location,
	presenter: bool,
	elapsed: u32,
	timer_running: bool,
	notes: Option<String>,
	on_next: Listener,
	on_previous: Listener,
	on_timer: Listener,
}

impl Component for DeckView {
	#[allow(clippy::cast_precision_loss)]
	fn template(&self) -> Option<TemplateResult> {
		let dots = (0..self.slides)
			.map(|i| {
				let class = match i.cmp(&self.location.slide) {
					Ordering::Less => "dot past",
					Ordering::Equal => "dot active",
					Ordering::Greater => "dot",
				};
				crate::html!("<span part=\"dot\" class$=\"{}\"></span>", class)
			})
			.collect::<Vec<_>>();
		let progress = if self.slides > 1 { self.location.slide as f64 * 100.0 / (self.slides - 1) as f64 } else { 100.0 };

		Some(crate::html!(
			"<nav id=\"progress\" part=\"progress\">{}</nav>\
			<div id=\"bar\" part=\"bar\" style$=\"width: {}%\"></div>\
			<button id=\"backward\" part=\"backward\" on-click=\"{}\">&lsaquo;</button>\
			<button id=\"forward\" part=\"forward\" on-click=\"{}\">&rsaquo;</button>\
			<div id=\"slides\" part=\"slides\"><slot></slot></div>\
			<aside id=\"presenter\" part=\"presenter\" style$=\"display: {}\">\
				<button id=\"timer\" part=\"timer\" class$=\"{}\" on-click=\"{}\">{}</button>\
				<div id=\"notes\" part=\"notes\">{}</div>\
			</aside>",
			dots,
			progress,
			self.on_previous.clone(),
			self.on_next.clone(),
			if self.presenter { "block" } else { "none" },
			if self.timer_running { "running" } else { "stopped" },
			self.on_timer.clone(),
			format_elapsed(self.elapsed),
			self.notes.clone(),
		))
	}

	fn part_factory(&self) -> Rc<dyn PartFactory> {
		extended_part_factory()
	}
}

/// `mm:ss`, with minutes growing past two digits as needed.
#[must_use]
pub fn format_elapsed(seconds: u32) -> String {
	format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

struct DeckInner {
	host: Host<DeckView>,
	config: DeckConfig,
	slides: Vec<Slide>,
	router: Rc<Router>,
	keybindings: Rc<KeybindingService>,
	bound_keys: RefCell<Vec<(&'static str, web_sys::HtmlElement)>>,
	location: Cell<Option<Location>>,
	subscription: RefCell<Option<RouteSubscription>>,
	listeners: RefCell<Vec<EventListener>>,
	timer: RefCell<Option<Interval>>,
	resize: RefCell<Option<Timeout>>,
	font_deadline: RefCell<Option<Timeout>>,
	touch_start: Cell<Option<f64>>,
}

impl Drop for DeckInner {
	fn drop(&mut self) {
		for (key, element) in self.bound_keys.get_mut().drain(..) {
			self.keybindings.unregister(key, &element);
		}
		trace!("Deck torn down.");
	}
}

/// An upgraded `slidem-deck` element. Cheap to clone. Dropping the last clone removes all listeners, timers and key bindings.
#[derive(Clone)]
pub struct SlideDeck {
	inner: Rc<DeckInner>,
}

impl SlideDeck {
	/// Upgrades `element` and its slide children, then shows the location from the current URL.
	///
	/// # Errors
	///
	/// Iff upgrading an element, installing a listener or reading the location fails.
	#[instrument(skip(element, router, keybindings))]
	pub fn upgrade(element: web_sys::HtmlElement, router: Rc<Router>, keybindings: Rc<KeybindingService>) -> Result<Self> {
		let config = DeckConfig::from_element(&element);

		let children = element.children();
		let slides = (0..children.length())
			.filter_map(|i| children.item(i))
			.filter(Slide::is_slide)
			.map(|child| Slide::upgrade(child.unchecked_into()))
			.collect::<Result<Vec<_>>>()?;
		trace!(slides = slides.len(), ?config, "Upgrading deck.");

		let controller = Rc::new(OnceCell::new());
		let view = DeckView {
			slides: slides.len(),
			location: Location::default(),
			presenter: false,
			elapsed: 0,
			timer_running: false,
			notes: None,
			on_next: command(&controller, Self::next),
			on_previous: command(&controller, Self::previous),
			on_timer: command(&controller, Self::toggle_timer),
		};

		let deck = Self {
			inner: Rc::new(DeckInner {
				host: Host::upgrade(element, view)?,
				config,
				slides,
				router,
				keybindings,
				bound_keys: RefCell::new(vec![]),
				location: Cell::new(None),
				subscription: RefCell::new(None),
				listeners: RefCell::new(vec![]),
				timer: RefCell::new(None),
				resize: RefCell::new(None),
				font_deadline: RefCell::new(None),
				touch_start: Cell::new(None),
			}),
		};
		controller.set(Rc::downgrade(&deck.inner)).map_err(|_| Error::defect("deck controller set twice"))?;

		deck.bind_keys()?;
		deck.listen()?;
		deck.subscribe();
		deck.apply_route(&deck.inner.router.current()?)?;
		deck.inner.host.render(RenderMode::Sync)?;
		deck.rescale()?;
		deck.gate_on_fonts()?;
		Ok(deck)
	}

	fn from_weak(weak: &Weak<DeckInner>) -> Option<Self> {
		weak.upgrade().map(|inner| Self { inner })
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::HtmlElement {
		self.inner.host.element()
	}

	#[must_use]
	pub fn config(&self) -> &DeckConfig {
		&self.inner.config
	}

	#[must_use]
	pub fn slides(&self) -> &[Slide] {
		&self.inner.slides
	}

	/// The shown location. [`None`] only during upgrade.
	#[must_use]
	pub fn location(&self) -> Option<Location> {
		self.inner.location.get()
	}

	fn reveals(&self) -> Vec<usize> {
		self.inner.slides.iter().map(Slide::steps).collect()
	}

	fn bind_keys(&self) -> Result<()> {
		let mut bound = self.inner.bound_keys.borrow_mut();
		for &(id, keys) in CONTROL_KEYS {
			let control: web_sys::HtmlElement = self.inner.host.by_id(id).ok_or_else(|| Error::defect(format!("deck template lacks #{}", id)))?.unchecked_into();
			for &key in keys {
				self.inner.keybindings.register(key, control.clone(), BindingOptions::default());
				bound.push((key, control.clone()));
			}
		}
		Ok(())
	}

	fn listen(&self) -> Result<()> {
		let window = window()?;
		let element = self.element();
		let weak = Rc::downgrade(&self.inner);
		let mut listeners = self.inner.listeners.borrow_mut();

		listeners.push(EventListener::typed(element, "touchstart", {
			let weak = weak.clone();
			move |event: web_sys::TouchEvent| {
				if let Some(deck) = Self::from_weak(&weak) {
					deck.inner.touch_start.set(event.changed_touches().get(0).map(|touch| f64::from(touch.client_x())));
				}
			}
		})?);
		listeners.push(EventListener::typed(element, "touchend", {
			let weak = weak.clone();
			move |event: web_sys::TouchEvent| {
				if let Some(deck) = Self::from_weak(&weak) {
					let end = event.changed_touches().get(0).map(|touch| f64::from(touch.client_x()));
					if let (Some(start), Some(end)) = (deck.inner.touch_start.take(), end) {
						deck.log_failure("swipe", deck.swipe(end - start));
					}
				}
			}
		})?);
		listeners.push(EventListener::new(&window, "resize", {
			let weak = weak.clone();
			move |_| {
				if let Some(deck) = Self::from_weak(&weak) {
					deck.log_failure("resize", deck.debounce_rescale());
				}
			}
		})?);
		listeners.push(EventListener::typed(&window, "storage", move |event: web_sys::StorageEvent| {
			if let Some(deck) = Self::from_weak(&weak) {
				deck.log_failure("storage sync", deck.sync_from_storage(&event));
			}
		})?);
		Ok(())
	}

	fn subscribe(&self) {
		let weak = Rc::downgrade(&self.inner);
		let subscription = self.inner.router.on_route_change(move |route| {
			if let Some(deck) = Self::from_weak(&weak) {
				deck.log_failure("route change", deck.apply_route(route));
			}
		});
		*self.inner.subscription.borrow_mut() = Some(subscription);
	}

	fn log_failure(&self, what: &str, result: Result<()>) {
		if let Err(error) = result {
			error!("Deck {} failed: {}", what, error);
		}
	}

	/// Shows the location from `route`, clamped to the deck, and canonicalises the URL hash if it differs.
	///
	/// # Errors
	///
	/// Iff updating slides, the view or the history fails.
	#[instrument(skip(self))]
	pub fn apply_route(&self, route: &Route) -> Result<()> {
		let target = Location::parse_hash(&route.hash).unwrap_or_default().clamp(&self.reveals());
		let presenter = route.has_query_flag("presenter");
		self.element().toggle_attribute_with_force("presenter", presenter)?;

		let previous = self.inner.location.replace(Some(target));
		if previous != Some(target) {
			self.show(previous, target)?;
			self.store(target);
		}

		let notes = self.inner.slides.get(target.slide).and_then(Slide::notes);
		self.inner.host.update(|view| {
			view.location = target;
			view.presenter = presenter;
			view.notes = notes;
		})?;

		let canonical = target.to_string();
		if !self.inner.slides.is_empty() && route.hash != canonical {
			trace!(from = %route.hash, to = %canonical, "Canonicalising location.");
			self.inner.router.replace(&format!("{}{}{}", route.path, route.query, canonical))?;
		}
		Ok(())
	}

	fn show(&self, previous: Option<Location>, target: Location) -> Result<()> {
		let direction = match previous {
			Some(previous) if previous > target => Direction::Backward,
			_ => Direction::Forward,
		};
		let previous_slide = previous.map(|previous| previous.slide);
		let slide_changed = previous_slide != Some(target.slide);

		for (i, slide) in self.inner.slides.iter().enumerate() {
			slide.set_role(Role::of(i, target.slide))?;
			slide.set_step(match i.cmp(&target.slide) {
				Ordering::Less => slide.steps(),
				Ordering::Equal => target.step,
				Ordering::Greater => 0,
			})?;
			if slide_changed {
				if previous_slide == Some(i) {
					slide.animate(direction, false)?;
				} else if i == target.slide && previous.is_some() {
					slide.animate(direction, true)?;
				} else {
					slide.clear_animation()?;
				}
			}
		}
		trace!(?previous, ?target, ?direction, "Showed location.");
		Ok(())
	}

	fn store(&self, location: Location) {
		let result = (|| -> Result<()> {
			let storage = window()?.local_storage()?.ok_or(Error::MissingGlobal("localStorage"))?;
			Ok(storage.set_item(&self.inner.config.storage_key, &location.to_string())?)
		})();
		if let Err(error) = result {
			warn!("Couldn't mirror location into storage: {}", error);
		}
	}

	fn sync_from_storage(&self, event: &web_sys::StorageEvent) -> Result<()> {
		if event.key().as_deref() != Some(self.inner.config.storage_key.as_str()) {
			return Ok(());
		}
		match event.new_value().as_deref().and_then(Location::parse_hash) {
			Some(location) if Some(location.clamp(&self.reveals())) != self.location() => self.go_to(location),
			_ => Ok(()),
		}
	}

	/// Navigates to `location`, keeping path and query. Pushes a history entry.
	///
	/// # Errors
	///
	/// Iff reading the location or pushing the history entry fails.
	pub fn go_to(&self, location: Location) -> Result<()> {
		let route = self.inner.router.current()?;
		self.inner.router.navigate(&format!("{}{}{}", route.path, route.query, location.clamp(&self.reveals())))
	}

	/// Reveals the next step, or moves to the next slide. Does nothing on the last step of the last slide.
	///
	/// # Errors
	///
	/// See [`SlideDeck::go_to`].
	pub fn next(&self) -> Result<()> {
		match self.location().unwrap_or_default().next(&self.reveals()) {
			Some(location) => self.go_to(location),
			None => Ok(()),
		}
	}

	/// Hides the last revealed step, or moves to the last step of the previous slide. Does nothing at the very start.
	///
	/// # Errors
	///
	/// See [`SlideDeck::go_to`].
	pub fn previous(&self) -> Result<()> {
		match self.location().unwrap_or_default().previous(&self.reveals()) {
			Some(location) => self.go_to(location),
			None => Ok(()),
		}
	}

	fn swipe(&self, delta: f64) -> Result<()> {
		if delta.abs() < self.inner.config.swipe_threshold {
			return Ok(());
		}
		trace!(delta, "Swiped.");
		if delta < 0.0 {
			self.next()
		} else {
			self.previous()
		}
	}

	/// Starts or stops the presenter timer.
	///
	/// # Errors
	///
	/// Iff the interval can't be started or the view can't be updated.
	pub fn toggle_timer(&self) -> Result<()> {
		let running = {
			let mut timer = self.inner.timer.borrow_mut();
			if timer.take().is_some() {
				false
			} else {
				let weak = Rc::downgrade(&self.inner);
				*timer = Some(Interval::new(1000, move || {
					if let Some(deck) = Self::from_weak(&weak) {
						deck.log_failure("timer tick", deck.inner.host.update(|view| view.elapsed += 1));
					}
				})?);
				true
			}
		};
		trace!(running, "Toggled timer.");
		self.inner.host.update(|view| view.timer_running = running)
	}

	#[must_use]
	pub fn timer_running(&self) -> bool {
		self.inner.timer.borrow().is_some()
	}

	fn debounce_rescale(&self) -> Result<()> {
		let weak = Rc::downgrade(&self.inner);
		let timeout = Timeout::new(self.inner.config.resize_debounce, move || {
			if let Some(deck) = Self::from_weak(&weak) {
				deck.log_failure("rescale", deck.rescale());
			}
		})?;
		// Replacing the handle cancels the previous timeout.
		*self.inner.resize.borrow_mut() = Some(timeout);
		Ok(())
	}

	/// Sets `--slidem-scale` on the deck so that the design size fits the viewport.
	///
	/// # Errors
	///
	/// Iff the viewport size can't be read or the property can't be set.
	pub fn rescale(&self) -> Result<()> {
		let window = window()?;
		let (width, height) = match (window.inner_width()?.as_f64(), window.inner_height()?.as_f64()) {
			(Some(width), Some(height)) => (width, height),
			_ => return Err(Error::Dom("non-numeric viewport size".to_owned())),
		};
		let scale = self.inner.config.scale(width, height);
		trace!(width, height, scale, "Rescaling deck.");
		Ok(self.element().style().set_property("--slidem-scale", &scale.to_string())?)
	}

	/// Sets `loaded` once `document.fonts.ready` settles or the font timeout elapses, whichever is first.
	fn gate_on_fonts(&self) -> Result<()> {
		let weak = Rc::downgrade(&self.inner);
		let document = self.element().owner_document().ok_or(Error::MissingGlobal("document"))?;
		match document.fonts().ready() {
			Ok(ready) => on_settled(
				&ready,
				{
					let weak = weak.clone();
					move |_| Self::mark_loaded(&weak)
				},
				{
					let weak = weak.clone();
					move |reason: JsValue| {
						warn!("`document.fonts.ready` rejected: {:?}", reason);
						Self::mark_loaded(&weak)
					}
				},
			),
			Err(error) => {
				warn!("`document.fonts.ready` unavailable: {:?}", error);
				Self::mark_loaded(&weak);
			}
		}
		let deadline = Timeout::new(self.inner.config.font_timeout, move || Self::mark_loaded(&weak))?;
		*self.inner.font_deadline.borrow_mut() = Some(deadline);
		Ok(())
	}

	fn mark_loaded(weak: &Weak<DeckInner>) {
		if let Some(deck) = Self::from_weak(weak) {
			if deck.is_loaded() {
				return;
			}
			match deck.element().set_attribute("loaded", "") {
				Ok(()) => trace!("Deck loaded."),
				Err(error) => error!("Failed to mark deck loaded: {:?}", error),
			}
		}
	}

	#[must_use]
	pub fn is_loaded(&self) -> bool {
		self.element().has_attribute("loaded")
	}
}

fn command(controller: &Rc<OnceCell<Weak<DeckInner>>>, action: fn(&SlideDeck) -> Result<()>) -> Listener {
	let controller = Rc::clone(controller);
	Listener::new(move |_| {
		if let Some(deck) = controller.get().and_then(SlideDeck::from_weak) {
			deck.log_failure("command", action(&deck));
		}
	})
}
