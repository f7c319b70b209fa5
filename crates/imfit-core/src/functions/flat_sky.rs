use super::FunctionObject;

/// Constant background level. No analytic total flux: integrated over an
/// unbounded plane it diverges, so callers must always numerically integrate
/// it over a finite window if they need a flux contribution at all.
#[derive(Debug, Default)]
pub struct FlatSky {
    i_sky: f64,
    label: Option<String>,
}

const PARAM_NAMES: &[&str] = &["I_sky"];

impl FunctionObject for FlatSky {
    fn name(&self) -> &'static str {
        "FlatSky"
    }

    fn param_names(&self) -> &'static [&'static str] {
        PARAM_NAMES
    }

    fn setup(&mut self, params: &[f64], _x0: f64, _y0: f64) {
        self.i_sky = params[0];
    }

    fn value(&self, _x: f64, _y: f64) -> f64 {
        self.i_sky
    }

    fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_constant() {
        let mut f = FlatSky::default();
        f.setup(&[100.0], 0.0, 0.0);
        assert_eq!(f.value(1.0, 1.0), 100.0);
        assert_eq!(f.value(-50.0, 200.0), 100.0);
    }
}
