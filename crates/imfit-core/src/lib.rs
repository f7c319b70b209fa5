//! Core 2D image-model-fitting engine: parametric intensity functions (C1),
//! PSF convolution (C2), oversampled-region refinement (C3), the single- and
//! multi-image model objects (C4/C5), the pure parameter-holder transform
//! (C6), and the textual configuration parsers (C7).

pub mod consts;
pub mod error;
pub mod fft;
pub mod convolver;
pub mod functions;
pub mod function_set;
pub mod image_description;
pub mod oversampled_region;
pub mod model_object;
pub mod multi_image;
pub mod param_holder;
pub mod config;
pub mod io;

pub use error::{Error, Result};
