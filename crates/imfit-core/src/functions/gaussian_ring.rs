use super::{elliptical_radius, subsampled_value, FunctionObject};

/// Symmetric Gaussian ring: `I(r) = A * exp(-(r - R_ring)^2 / (2 sigma_r^2))`.
/// No analytic flux (numeric integration only).
#[derive(Debug, Default)]
pub struct GaussianRing {
    pa: f64,
    ell: f64,
    a: f64,
    r_ring: f64,
    sigma_r: f64,
    x0: f64,
    y0: f64,
    label: Option<String>,
}

const PARAM_NAMES: &[&str] = &["PA", "ell", "A", "R_ring", "sigma_r"];

impl GaussianRing {
    fn eval_raw(&self, x: f64, y: f64) -> f64 {
        let r = elliptical_radius(x - self.x0, y - self.y0, self.pa, self.ell);
        let d = r - self.r_ring;
        self.a * (-(d * d) / (2.0 * self.sigma_r * self.sigma_r)).exp()
    }
}

impl FunctionObject for GaussianRing {
    fn name(&self) -> &'static str {
        "GaussianRing"
    }

    fn param_names(&self) -> &'static [&'static str] {
        PARAM_NAMES
    }

    fn setup(&mut self, params: &[f64], x0: f64, y0: f64) {
        self.pa = params[0];
        self.ell = params[1];
        self.a = params[2];
        self.r_ring = params[3];
        self.sigma_r = params[4];
        self.x0 = x0;
        self.y0 = y0;
    }

    fn value(&self, x: f64, y: f64) -> f64 {
        // The ring's steep feature sits at r = R_ring, not at the center, so
        // subsample around that annulus rather than around (x0,y0): widen
        // the threshold to cover R_ring + a few sigma.
        subsampled_value(
            |sx, sy| self.eval_raw(sx, sy),
            x,
            y,
            self.x0,
            self.y0,
            self.r_ring + 3.0 * self.sigma_r,
            3,
        )
    }

    fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
