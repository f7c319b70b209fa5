//! C6: the pure transform from the multi-image external flat parameter
//! vector to each child [`crate::model_object::ModelObject`]'s own flat
//! vector (§4.6). No model state lives here — every function takes and
//! returns plain slices/vectors.

use crate::consts::N_IMAGE_PARAMS;
use crate::error::{Error, Result};

/// `(pixScale, rotation_deg, fluxScale, X0_image, Y0_image)` extracted from
/// the external vector for one non-reference image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageParams {
    pub pix_scale: f64,
    pub rotation_deg: f64,
    pub flux_scale: f64,
    pub x0_image: f64,
    pub y0_image: f64,
}

/// Extract image `n`'s `(pixScale, rot, fluxScale, X0, Y0)` 5-tuple from the
/// head of the external vector. `n` is 1-based (image 0 is the reference and
/// has no entry).
pub fn extract_image_params(external: &[f64], n: usize) -> Result<ImageParams> {
    if n == 0 {
        return Err(Error::Lifecycle(
            "extract_image_params called for the reference image".into(),
        ));
    }
    let start = (n - 1) * N_IMAGE_PARAMS;
    let chunk = external.get(start..start + N_IMAGE_PARAMS).ok_or_else(|| {
        Error::Lifecycle(format!(
            "external parameter vector too short for image {n}'s 5-tuple"
        ))
    })?;
    let params = ImageParams {
        pix_scale: chunk[0],
        rotation_deg: chunk[1],
        flux_scale: chunk[2],
        x0_image: chunk[3],
        y0_image: chunk[4],
    };
    if params.pix_scale <= 0.0 {
        return Err(Error::InvalidPixScale(params.pix_scale));
    }
    Ok(params)
}

/// Reference-frame `(X0, Y0)` of each global function set, in declaration
/// order — the only per-set information this module needs from the model.
pub type SetCenters<'a> = &'a [(f64, f64)];

/// Map one reference-frame `(dx_ref, dy_ref)` offset from the first function
/// set's center into image `n`'s frame, per §4.6 step 3.
fn rotate_scale(dx_ref: f64, dy_ref: f64, pix_scale: f64, rotation_deg: f64) -> (f64, f64) {
    let theta = rotation_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let dx_im = dx_ref * cos_t + dy_ref * sin_t;
    let dy_im = -dx_ref * sin_t + dy_ref * cos_t;
    (pix_scale * dx_im, pix_scale * dy_im)
}

/// Assemble image `n`'s child parameter vector: the transformed global model
/// parameters (length `global.len()`) followed by image `n`'s own local
/// function parameters, copied through untransformed (§4.6, Design Note b).
///
/// `global` is the flat vector of global model parameters in the reference
/// frame; `set_centers` gives every global function set's reference-frame
/// center in declaration order, and `set_spans` each set's total flat-vector
/// span (`2 + nparams`) so this module stays a pure function of slices
/// without depending on [`crate::function_set`].
pub fn assemble_parameters_for_image(
    image_params: ImageParams,
    global: &[f64],
    set_centers: SetCenters<'_>,
    set_spans: &[usize],
    local: &[f64],
) -> Result<Vec<f64>> {
    if image_params.pix_scale <= 0.0 {
        return Err(Error::InvalidPixScale(image_params.pix_scale));
    }
    if set_centers.is_empty() || set_centers.len() != set_spans.len() {
        return Err(Error::Lifecycle(
            "set_centers and set_spans must be the same nonempty length".into(),
        ));
    }

    let mut out = global.to_vec();
    let (x0_ref_1, y0_ref_1) = set_centers[0];

    out[0] = image_params.x0_image;
    out[1] = image_params.y0_image;

    let mut offset = set_spans[0];
    for (k, &(x0_ref_k, y0_ref_k)) in set_centers.iter().enumerate().skip(1) {
        let dx_ref = x0_ref_k - x0_ref_1;
        let dy_ref = y0_ref_k - y0_ref_1;
        let (dx_im, dy_im) =
            rotate_scale(dx_ref, dy_ref, image_params.pix_scale, image_params.rotation_deg);
        out[offset] = image_params.x0_image + dx_im;
        out[offset + 1] = image_params.y0_image + dy_im;
        offset += set_spans[k];
    }

    out.extend_from_slice(local);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_rejects_nonpositive_pixscale() {
        let external = [1.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0];
        assert!(extract_image_params(&external, 1).is_ok());
        assert!(extract_image_params(&external, 2).is_err());
    }

    #[test]
    fn identity_transform_preserves_centers() {
        let image_params = ImageParams {
            pix_scale: 1.0,
            rotation_deg: 0.0,
            flux_scale: 1.0,
            x0_image: 5.0,
            y0_image: 7.0,
        };
        let global = vec![5.0, 7.0, 100.0, 10.0, 10.0, 1.0];
        let set_centers = [(5.0, 7.0), (10.0, 10.0)];
        let spans = [2 + 1, 2 + 1];
        let out = assemble_parameters_for_image(
            image_params,
            &global,
            &set_centers,
            &spans,
            &[],
        )
        .unwrap();
        assert_eq!(out[0], 5.0);
        assert_eq!(out[1], 7.0);
        assert_eq!(out[3], 10.0);
        assert_eq!(out[4], 10.0);
    }

    #[test]
    fn rotation_by_360_matches_identity() {
        let base = ImageParams {
            pix_scale: 1.0,
            rotation_deg: 0.0,
            flux_scale: 1.0,
            x0_image: 5.0,
            y0_image: 7.0,
        };
        let rotated = ImageParams {
            rotation_deg: 360.0,
            ..base
        };
        let global = vec![5.0, 7.0, 100.0, 10.0, 10.0, 1.0];
        let set_centers = [(5.0, 7.0), (10.0, 10.0)];
        let spans = [3, 3];
        let a = assemble_parameters_for_image(base, &global, &set_centers, &spans, &[])
            .unwrap();
        let b =
            assemble_parameters_for_image(rotated, &global, &set_centers, &spans, &[])
                .unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn local_parameters_are_appended_untransformed() {
        let image_params = ImageParams {
            pix_scale: 2.0,
            rotation_deg: 90.0,
            flux_scale: 1.0,
            x0_image: 0.0,
            y0_image: 0.0,
        };
        let global = vec![0.0, 0.0, 1.0];
        let set_centers = [(0.0, 0.0)];
        let spans = [3];
        let local = [42.0, 1.0, 2.0];
        let out = assemble_parameters_for_image(
            image_params,
            &global,
            &set_centers,
            &spans,
            &local,
        )
        .unwrap();
        assert_eq!(&out[3..], &local);
    }
}
