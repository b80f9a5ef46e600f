//! Core modules: layout, rendered output, watch loop and SVG view.

pub mod layout;
pub mod output;
pub mod raster;
pub mod view;
pub mod watch;
