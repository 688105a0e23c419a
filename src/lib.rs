#![doc(html_root_url = "https://docs.rs/slidem/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Browser slide decks on top of a small tagged-template renderer.
//!
//! - [`template`] compiles HTML with expression positions once per call site and updates only what changed between renders.
//! - [`element`] attaches shadow-root rendering and attribute observation to existing elements.
//! - [`router`] and [`keybinding`] are page-wide services the decks use.
//! - [`deck`] implements the `slidem-deck` element itself, and [`app`] wires everything up for JavaScript.

pub mod app;
pub mod deck;
pub mod element;
pub mod error;
pub mod keybinding;
pub mod listener;
pub mod router;
pub mod template;

pub use app::SlidemApp;
pub use error::{Error, Result};
