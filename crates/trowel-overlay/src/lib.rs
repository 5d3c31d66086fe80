//! Mobile navigation overlay for trowel sites.
//!
//! Opens a navigation panel, drops a backdrop behind it, and closes both when
//! the backdrop or the panel's close control is clicked. The host document is
//! injected through the [`Document`] trait so the controller runs the same way
//! against a browser DOM (`web` feature) or the in-memory [`MemoryDocument`].

pub mod controller;
pub mod document;
#[cfg(any(feature = "web", test))]
mod listeners;
pub mod memory;
pub mod menu;
#[cfg(feature = "web")]
pub mod web;

pub use controller::{BackdropPolicy, OverlayController, PanelState};
pub use document::{ClickHandler, Document, OverlayError};
pub use memory::{MemoryDocument, NodeId};
pub use menu::{MenuConfig, MobileMenu};
