//! Function sets (§3): ordered groups of [`FunctionObject`] instances sharing
//! one `(X0,Y0)` center, plus the Kahan-summed evaluation shared by the main
//! model-image loop (§4.4.2) and the oversampled-region loop (§4.3).

use crate::functions::FunctionObject;

/// A nonempty ordered list of function instances sharing one center.
pub struct FunctionSet {
    pub x0: f64,
    pub y0: f64,
    pub functions: Vec<Box<dyn FunctionObject>>,
}

impl FunctionSet {
    pub fn new(x0: f64, y0: f64) -> Self {
        FunctionSet {
            x0,
            y0,
            functions: Vec::new(),
        }
    }

    /// Total parameter count of this set, excluding its own X0,Y0.
    pub fn n_params(&self) -> usize {
        self.functions.iter().map(|f| f.n_params()).sum()
    }

    /// Kahan-summed intensity contribution of every function in this set at
    /// `(x, y)`.
    pub fn value_sum(&self, x: f64, y: f64) -> f64 {
        let mut sum = 0.0f64;
        let mut comp = 0.0f64;
        for f in &self.functions {
            let y_ = f.value(x, y) - comp;
            let t = sum + y_;
            comp = (t - sum) - y_;
            sum = t;
        }
        sum
    }
}

/// Evaluate the full additive model (every function in every set) at
/// `(x, y)`, Kahan-summing across sets as well as within each set so the
/// result does not depend on how functions happen to be grouped.
pub fn evaluate_model(sets: &[FunctionSet], x: f64, y: f64) -> f64 {
    let mut sum = 0.0f64;
    let mut comp = 0.0f64;
    for set in sets {
        let y_ = set.value_sum(x, y) - comp;
        let t = sum + y_;
        comp = (t - sum) - y_;
        sum = t;
    }
    sum
}

/// Total flat parameter count for a model: `2 * |sets| + sum(nparams(f))`.
pub fn total_param_count(sets: &[FunctionSet]) -> usize {
    2 * sets.len() + sets.iter().map(|s| s.n_params()).sum::<usize>()
}

/// Scatter a flat parameter vector `theta` into `sets` in place: each set
/// consumes `X0, Y0` followed by its functions' parameters in order, and
/// each function's `setup` is called with its slice and the set's center.
pub fn apply_parameters(sets: &mut [FunctionSet], theta: &[f64]) -> crate::error::Result<()> {
    let expected = total_param_count(sets);
    if theta.len() != expected {
        return Err(crate::error::Error::Lifecycle(format!(
            "parameter vector has {} entries, model expects {}",
            theta.len(),
            expected
        )));
    }

    let mut offset = 0usize;
    for set in sets.iter_mut() {
        set.x0 = theta[offset];
        set.y0 = theta[offset + 1];
        offset += 2;
        for f in set.functions.iter_mut() {
            let n = f.n_params();
            f.setup(&theta[offset..offset + n], set.x0, set.y0);
            offset += n;
        }
    }
    Ok(())
}
