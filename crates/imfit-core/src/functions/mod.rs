//! C1: the closed family of 2D parametric intensity functions.
//!
//! Each variant implements [`FunctionObject`]: `setup` caches
//! parameter-derived precomputations, `value` evaluates intensity at a
//! geometric pixel-center coordinate. Registration is static — new function
//! kinds are added to the `FunctionKind` enum and the `make_function` match,
//! never discovered at runtime.

mod broken_exponential;
mod exponential;
mod flat_sky;
mod gaussian;
mod gaussian_ring;
mod ring2d;
mod sersic;

pub use broken_exponential::BrokenExponential;
pub use exponential::Exponential;
pub use flat_sky::FlatSky;
pub use gaussian::Gaussian;
pub use gaussian_ring::GaussianRing;
pub use ring2d::Ring2D;
pub use sersic::Sersic;

/// Public contract for a single function instance (§4.1).
///
/// `value` must be referentially transparent between successive `setup`
/// calls — implementations may assume `setup` is never called concurrently
/// with `value`.
pub trait FunctionObject: std::fmt::Debug + Send + Sync {
    /// Static function name, as it appears in model-configuration files.
    fn name(&self) -> &'static str;

    /// Ordered parameter names (excluding the X0,Y0 the owning function set
    /// holds). Fixes the per-instance offset within the flat parameter vector.
    fn param_names(&self) -> &'static [&'static str];

    fn n_params(&self) -> usize {
        self.param_names().len()
    }

    /// Cache parameter-derived precomputations and the current center.
    /// `params` has exactly `n_params()` entries, in `param_names()` order.
    fn setup(&mut self, params: &[f64], x0: f64, y0: f64);

    /// Evaluate intensity at geometric coordinate `(x, y)`.
    fn value(&self, x: f64, y: f64) -> f64;

    /// Whether this instance can report its total flux analytically.
    fn can_compute_total_flux(&self) -> bool {
        false
    }

    /// Analytic total flux, if `can_compute_total_flux()` is true.
    fn total_flux(&self) -> Option<f64> {
        None
    }

    /// Optional human label set via `LABEL <text>` on the `FUNCTION` line.
    fn label(&self) -> Option<&str> {
        None
    }

    fn set_label(&mut self, label: Option<String>);
}

/// Closed enumeration of registrable function kinds, used by the model
/// configuration parser (§6.1) to look up a constructor by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    FlatSky,
    Gaussian,
    Exponential,
    Sersic,
    BrokenExponential,
    GaussianRing,
    Ring2D,
}

impl FunctionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FlatSky" => FunctionKind::FlatSky,
            "Gaussian" => FunctionKind::Gaussian,
            "Exponential" => FunctionKind::Exponential,
            "Sersic" => FunctionKind::Sersic,
            "BrokenExponential" => FunctionKind::BrokenExponential,
            "GaussianRing" => FunctionKind::GaussianRing,
            "Ring2D" => FunctionKind::Ring2D,
            _ => return None,
        })
    }

    pub fn make(self) -> Box<dyn FunctionObject> {
        match self {
            FunctionKind::FlatSky => Box::new(FlatSky::default()),
            FunctionKind::Gaussian => Box::new(Gaussian::default()),
            FunctionKind::Exponential => Box::new(Exponential::default()),
            FunctionKind::Sersic => Box::new(Sersic::default()),
            FunctionKind::BrokenExponential => Box::new(BrokenExponential::default()),
            FunctionKind::GaussianRing => Box::new(GaussianRing::default()),
            FunctionKind::Ring2D => Box::new(Ring2D::default()),
        }
    }
}

/// Construct a function instance by its config-file name, or `None` if the
/// name is not one of the registered [`FunctionKind`] variants.
pub fn make_function(name: &str) -> Option<Box<dyn FunctionObject>> {
    FunctionKind::from_name(name).map(FunctionKind::make)
}

/// Shared per-pixel subsampling helper (§4.1): evaluate on a finer grid near
/// the component center and Kahan-average, when the pixel's distance from
/// `(x0,y0)` is below `threshold`. `n` is the per-axis subsample count; `n=1`
/// (or distance beyond threshold) reduces to a single evaluation.
pub(crate) fn subsampled_value<F: Fn(f64, f64) -> f64>(
    eval: F,
    x: f64,
    y: f64,
    x0: f64,
    y0: f64,
    threshold: f64,
    n: u32,
) -> f64 {
    if n <= 1 {
        return eval(x, y);
    }
    let dist = ((x - x0).powi(2) + (y - y0).powi(2)).sqrt();
    if dist >= threshold {
        return eval(x, y);
    }

    let half = (n as f64 - 1.0) / 2.0;
    let step = 1.0 / n as f64;
    let mut sum = 0.0f64;
    let mut comp = 0.0f64;
    for iy in 0..n {
        let sy = y + (iy as f64 - half) * step;
        for ix in 0..n {
            let sx = x + (ix as f64 - half) * step;
            let v = eval(sx, sy);
            let y_ = v - comp;
            let t = sum + y_;
            comp = (t - sum) - y_;
            sum = t;
        }
    }
    sum / (n * n) as f64
}

/// Rotate `(dx, dy)` (offset from a component center) into the component's
/// position-angle frame and apply the ellipticity scaling used by every
/// elliptical profile in this family: returns the elliptical radius.
///
/// `pa_deg` is measured counterclockwise from the +Y (north) axis, the
/// convention used throughout this family's parameter grammar.
pub(crate) fn elliptical_radius(dx: f64, dy: f64, pa_deg: f64, ell: f64) -> f64 {
    let pa = pa_deg.to_radians();
    // Rotate so the major axis aligns with the new y' axis (PA measured from +Y).
    let xp = dx * pa.cos() - dy * pa.sin();
    let yp = dx * pa.sin() + dy * pa.cos();
    let q = (1.0 - ell).max(1e-12);
    (xp * xp + (yp * yp) / (q * q)).sqrt()
}
