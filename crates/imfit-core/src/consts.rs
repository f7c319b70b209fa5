/// Minimum cell count to use Rayon parallelism for the per-cell model sum.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Default chunk size (in cells) handed to each worker of the per-cell loop.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Floor applied to nonpositive model values before taking a logarithm in the
/// Cash / Poisson-MLR fit statistics.
pub const LOG_FLOOR: f64 = 1e-25;

/// Relative tolerance used by PSF-identity and convolution invariant checks.
pub const CONVOLUTION_RELATIVE_TOLERANCE: f64 = 1e-9;

/// Per-image stride in the multi-image external flat parameter vector:
/// `pixScale, rotation, fluxScale, X0_image, Y0_image`.
pub const N_IMAGE_PARAMS: usize = 5;
