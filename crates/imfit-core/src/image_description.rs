//! The per-image affine transform (§3, §4.5) relating a non-reference
//! image's pixel frame to the shared reference frame the global model's
//! intrinsic parameters (scale lengths, position angles, ...) are defined
//! in. Evaluating a function at an image-frame coordinate means mapping
//! that coordinate back into the reference frame (inverse rotate + rescale)
//! and evaluating the function there, then scaling the resulting intensity.

use crate::function_set::FunctionSet;

/// `(pixScale, rotation_deg, fluxScale)` — the reference image's implicit
/// triple is `(1, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDescription {
    pub pix_scale: f64,
    pub rotation_deg: f64,
    pub flux_scale: f64,
}

impl Default for ImageDescription {
    fn default() -> Self {
        ImageDescription {
            pix_scale: 1.0,
            rotation_deg: 0.0,
            flux_scale: 1.0,
        }
    }
}

impl ImageDescription {
    pub fn is_identity(&self) -> bool {
        self.pix_scale == 1.0 && self.rotation_deg % 360.0 == 0.0 && self.flux_scale == 1.0
    }

    /// Evaluate the full model at image-frame coordinate `(x, y)`, mapping
    /// back into the reference frame that each function set's intrinsic
    /// parameters were fit in.
    pub fn evaluate(&self, sets: &[FunctionSet], x: f64, y: f64) -> f64 {
        if self.is_identity() {
            return crate::function_set::evaluate_model(sets, x, y);
        }

        let theta = self.rotation_deg.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();

        let mut sum = 0.0f64;
        let mut comp = 0.0f64;
        for set in sets {
            let dx_im = x - set.x0;
            let dy_im = y - set.y0;
            // Inverse of the forward ref->image rotation+scale (§4.6 step 3).
            let dx_ref = (dx_im * cos_t - dy_im * sin_t) / self.pix_scale;
            let dy_ref = (dx_im * sin_t + dy_im * cos_t) / self.pix_scale;
            let v = self.flux_scale * set.value_sum(set.x0 + dx_ref, set.y0 + dy_ref);
            let y_ = v - comp;
            let t = sum + y_;
            comp = (t - sum) - y_;
            sum = t;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FlatSky, FunctionObject};

    fn flat_sets(value: f64) -> Vec<FunctionSet> {
        let mut f = Box::new(FlatSky::default());
        f.setup(&[value], 3.0, 4.0);
        let mut set = FunctionSet::new(3.0, 4.0);
        set.functions.push(f);
        vec![set]
    }

    #[test]
    fn identity_matches_plain_evaluation() {
        let sets = flat_sets(7.0);
        let desc = ImageDescription::default();
        assert_eq!(desc.evaluate(&sets, 10.0, 12.0), 7.0);
    }

    #[test]
    fn flux_scale_multiplies_output() {
        let sets = flat_sets(7.0);
        let desc = ImageDescription {
            pix_scale: 1.0,
            rotation_deg: 0.0,
            flux_scale: 2.0,
        };
        assert!((desc.evaluate(&sets, 10.0, 12.0) - 14.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_by_360_matches_identity() {
        let sets = flat_sets(7.0);
        let desc = ImageDescription {
            pix_scale: 1.0,
            rotation_deg: 360.0,
            flux_scale: 1.0,
        };
        assert!((desc.evaluate(&sets, 10.0, 12.0) - 7.0).abs() < 1e-9);
    }
}
