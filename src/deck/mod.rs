//! Slide decks.
//!
//! A `slidem-deck` element's `slidem-slide` (or `[slidem-slide]`) children are its slides.
//! The current slide and step follow the URL hash (`#slide-2/step-3`), which is mirrored into `localStorage` so that
//! other windows on the same deck (like a presenter view opened with `?presenter`) stay in sync.

mod config;
#[allow(clippy::module_inception)]
mod deck;
mod location;
mod slide;

pub use config::DeckConfig;
pub use deck::{format_elapsed, DeckView, SlideDeck};
pub use location::Location;
pub use slide::{Direction, Role, Slide, SlideVariant, SlideView};
