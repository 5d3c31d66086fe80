//! Build tasks for trowel sites.
//!
//! Each task turns a set of source files into output files: page templates
//! into HTML, a stylesheet entry into minified CSS, scripts into minified
//! bundles, raster images into optimised copies and WebP variants, and SVG
//! icons into a single sprite. [`Pipeline`] sequences them for dev and
//! production builds.

pub mod config;
pub mod error;
pub mod files;
pub mod images;
pub mod pipeline;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod views;

pub use config::{BrowserTargets, Destination, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{BuildMode, BuildResult, Pipeline, Task, TaskOutput};
