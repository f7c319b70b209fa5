//! Ambient pixel-buffer I/O: no FITS/WCS handling, just enough to get a
//! `f64` pixel grid into and out of memory for tests and the CLI (§0 scope
//! note — FITS support is explicitly out of scope).

pub mod image_io;
pub mod raw;

pub use image_io::{load_image, save_image, save_png, save_tiff};
pub use raw::{load_raw, save_raw};
