//! Development server with live reload for trowel sites.
//!
//! Serves the source tree, rebuilds whatever a file change affects and tells
//! connected browsers to reload the page or just its stylesheets.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent, WatchRules};
pub use websocket::{ReloadHub, ReloadMessage};
