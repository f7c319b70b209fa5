//! C5: joint fitting of N single-image models sharing one global model in a
//! reference frame, each related to the reference by an image-description
//! triple (§4.5).

use crate::error::{Error, Result};
use crate::function_set::FunctionSet;
use crate::image_description::ImageDescription;
use crate::model_object::ModelObject;
use crate::param_holder::{self, ImageParams};

/// Re-derive the child's flux-scale-only image description for this call.
/// `assemble_parameters_for_image` already bakes the pixScale/rotation center
/// transform directly into the returned theta (§4.6 step 3), so only
/// `fluxScale` — a pure output multiplier, not a coordinate change — still
/// needs to reach [`crate::function_set::evaluate_model`] via
/// [`ModelObject::set_image_description`].
fn flux_scale_only_desc(image_params: ImageParams) -> ImageDescription {
    ImageDescription {
        pix_scale: 1.0,
        rotation_deg: 0.0,
        flux_scale: image_params.flux_scale,
    }
}

/// One non-reference image's relationship to image 0: its
/// [`ModelObject`] (already carrying its own local function sets, if any),
/// plus the count of local parameters appended after the global model's in
/// the external flat vector.
struct ChildImage {
    model: ModelObject,
    n_local_params: usize,
}

pub struct MultiImageModelObject {
    reference: ModelObject,
    children: Vec<ChildImage>,
    n_global_params: usize,
    set_spans: Vec<usize>,
}

impl MultiImageModelObject {
    /// `reference` is image 0, already fully configured (function sets,
    /// PSF, data, ...) except for `finalize_for_fitting`, which this type
    /// calls on every child during [`MultiImageModelObject::new`].
    /// `set_spans` is each global function set's total flat-vector span
    /// (`2 + nparams`), in declaration order, matching `reference`'s sets.
    pub fn new(mut reference: ModelObject, set_spans: Vec<usize>) -> Result<Self> {
        reference.finalize_for_fitting()?;
        let n_global_params = set_spans.iter().sum();
        Ok(MultiImageModelObject {
            reference,
            children: Vec::new(),
            n_global_params,
            set_spans,
        })
    }

    /// Attach image `n` (1-based; images are appended in order). `model`
    /// must already have its own local function sets (if any) added and its
    /// data/PSF/mask/error steps done, but not yet finalized — this method
    /// finalizes it. `n_local_params` is the flat-vector length of those
    /// local function sets.
    pub fn add_image(
        &mut self,
        desc: ImageDescription,
        mut model: ModelObject,
        n_local_params: usize,
    ) -> Result<()> {
        model.set_image_description(desc);
        model.finalize_for_fitting()?;
        self.children.push(ChildImage {
            model,
            n_local_params,
        });
        Ok(())
    }

    pub fn n_images(&self) -> usize {
        1 + self.children.len()
    }

    /// Total external flat-vector length: `5*(N-1) + nGlobalParams +
    /// sum(nLocalParams)` (§4.5 invariant).
    pub fn n_params(&self) -> usize {
        5 * self.children.len()
            + self.n_global_params
            + self
                .children
                .iter()
                .map(|c| c.n_local_params)
                .sum::<usize>()
    }

    pub fn n_pixels(&self) -> usize {
        self.reference.n_valid_pixels()
            + self
                .children
                .iter()
                .map(|c| c.model.n_valid_pixels())
                .sum::<usize>()
    }

    fn global_slice<'a>(&self, external: &'a [f64]) -> &'a [f64] {
        let start = 5 * self.children.len();
        &external[start..start + self.n_global_params]
    }

    fn local_slices_offset(&self) -> usize {
        5 * self.children.len() + self.n_global_params
    }

    /// First `(X0,Y0)` of each global function set, in the reference frame,
    /// read back out of the global parameter slice using `set_spans`.
    fn set_centers(&self, global: &[f64]) -> Vec<(f64, f64)> {
        let mut centers = Vec::with_capacity(self.set_spans.len());
        let mut offset = 0usize;
        for &span in &self.set_spans {
            centers.push((global[offset], global[offset + 1]));
            offset += span;
        }
        centers
    }

    fn child_theta(&self, external: &[f64], image_params: ImageParams, child_idx: usize) -> Result<Vec<f64>> {
        let global = self.global_slice(external);
        let centers = self.set_centers(global);

        let mut local_offset = self.local_slices_offset();
        for c in &self.children[..child_idx] {
            local_offset += c.n_local_params;
        }
        let n_local = self.children[child_idx].n_local_params;
        let local = &external[local_offset..local_offset + n_local];

        param_holder::assemble_parameters_for_image(
            image_params,
            global,
            &centers,
            &self.set_spans,
            local,
        )
    }

    /// Create every child's model image (§4.5): the reference with the
    /// global parameters verbatim, and each non-reference image via the
    /// parameter holder transform.
    pub fn create_all_model_images(&mut self, external: &[f64]) -> Result<()> {
        self.check_len(external)?;
        let global = self.global_slice(external).to_vec();
        self.reference.create_model_image(&global)?;

        for n in 1..=self.children.len() {
            let image_params = param_holder::extract_image_params(external, n)?;
            let theta = self.child_theta(external, image_params, n - 1)?;
            let child = &mut self.children[n - 1].model;
            child.set_image_description(flux_scale_only_desc(image_params));
            child.create_model_image(&theta)?;
        }
        Ok(())
    }

    pub fn get_fit_statistic(&mut self, external: &[f64]) -> Result<f64> {
        self.check_len(external)?;
        let global = self.global_slice(external).to_vec();
        let mut total = self.reference.get_fit_statistic(&global)?;

        for n in 1..=self.children.len() {
            let image_params = param_holder::extract_image_params(external, n)?;
            let theta = self.child_theta(external, image_params, n - 1)?;
            let child = &mut self.children[n - 1].model;
            child.set_image_description(flux_scale_only_desc(image_params));
            total += child.get_fit_statistic(&theta)?;
        }
        Ok(total)
    }

    pub fn compute_deviates(&mut self, external: &[f64], out: &mut Vec<f64>) -> Result<()> {
        self.check_len(external)?;
        out.clear();

        let global = self.global_slice(external).to_vec();
        let mut chunk = Vec::new();
        self.reference.compute_deviates(&global, &mut chunk)?;
        out.extend_from_slice(&chunk);

        for n in 1..=self.children.len() {
            let image_params = param_holder::extract_image_params(external, n)?;
            let theta = self.child_theta(external, image_params, n - 1)?;
            let child = &mut self.children[n - 1].model;
            child.set_image_description(flux_scale_only_desc(image_params));
            child.compute_deviates(&theta, &mut chunk)?;
            out.extend_from_slice(&chunk);
        }
        Ok(())
    }

    fn check_len(&self, external: &[f64]) -> Result<()> {
        if external.len() != self.n_params() {
            return Err(Error::Lifecycle(format!(
                "external parameter vector has {} entries, model expects {}",
                external.len(),
                self.n_params()
            )));
        }
        Ok(())
    }

    pub fn reference_image(&self) -> &ModelObject {
        &self.reference
    }

    pub fn child_image(&self, n: usize) -> Option<&ModelObject> {
        self.children.get(n - 1).map(|c| &c.model)
    }
}

/// Per-set span helper for callers building `set_spans` from a model's
/// function sets directly (`2 + nparams` each, in declaration order).
pub fn spans_from_sets(sets: &[FunctionSet]) -> Vec<usize> {
    sets.iter().map(|s| 2 + s.n_params()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FlatSky, FunctionObject};

    fn single_flat_sky_model(n: usize) -> (ModelObject, Vec<usize>) {
        let mut mo = ModelObject::new();
        let mut f = Box::new(FlatSky::default());
        f.setup(&[100.0], 0.0, 0.0);
        let mut set = FunctionSet::new(0.0, 0.0);
        set.functions.push(f);
        let spans = vec![2 + set.n_params()];
        mo.add_function_set(set).unwrap();
        mo.set_data_dimensions(n, n).unwrap();
        mo.add_data(ndarray::Array2::from_elem((n, n), 1.0)).unwrap();
        (mo, spans)
    }

    #[test]
    fn s5_identical_images_at_identity_give_equal_model_images() {
        let (reference, spans) = single_flat_sky_model(4);
        let (child, _) = single_flat_sky_model(4);
        let n_ref = spans.iter().sum::<usize>();

        let mut multi = MultiImageModelObject::new(reference, spans).unwrap();
        multi
            .add_image(ImageDescription::default(), child, 0)
            .unwrap();

        let mut theta = vec![1.0, 0.0, 1.0, 0.0, 0.0];
        theta.extend(vec![0.0, 0.0, 100.0]);
        assert_eq!(theta.len(), 5 + n_ref);

        multi.create_all_model_images(&theta).unwrap();
        let ref_model = multi.reference_image().get_model_image();
        let child_model = multi.child_image(1).unwrap().get_model_image();
        for (a, b) in ref_model.iter().zip(child_model.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn flux_scale_multiplies_child_model_image() {
        let (reference, spans) = single_flat_sky_model(4);
        let (child, _) = single_flat_sky_model(4);
        let n_ref = spans.iter().sum::<usize>();

        let mut multi = MultiImageModelObject::new(reference, spans).unwrap();
        multi
            .add_image(ImageDescription::default(), child, 0)
            .unwrap();

        let mut theta = vec![1.0, 0.0, 2.5, 0.0, 0.0];
        theta.extend(vec![0.0, 0.0, 100.0]);
        assert_eq!(theta.len(), 5 + n_ref);

        multi.create_all_model_images(&theta).unwrap();
        let ref_model = multi.reference_image().get_model_image();
        let child_model = multi.child_image(1).unwrap().get_model_image();
        for (a, b) in ref_model.iter().zip(child_model.iter()) {
            assert!((b - 2.5 * a).abs() < 1e-9);
        }
    }

    #[test]
    fn invariant_4_single_image_vector_equals_global() {
        let (reference, spans) = single_flat_sky_model(3);
        let multi = MultiImageModelObject::new(reference, spans).unwrap();
        assert_eq!(multi.n_params(), 3);
        assert_eq!(multi.n_images(), 1);
    }

    #[test]
    fn invariant_6_rotation_by_360_matches_baseline() {
        let (reference, spans) = single_flat_sky_model(4);
        let (child_a, _) = single_flat_sky_model(4);
        let (child_b, _) = single_flat_sky_model(4);
        let n_ref = spans.iter().sum::<usize>();

        let mut multi_a = MultiImageModelObject::new(reference, spans.clone()).unwrap();
        multi_a
            .add_image(ImageDescription::default(), child_a, 0)
            .unwrap();
        let (reference2, _) = single_flat_sky_model(4);
        let mut multi_b = MultiImageModelObject::new(reference2, spans).unwrap();
        multi_b
            .add_image(ImageDescription::default(), child_b, 0)
            .unwrap();

        let mut theta_a = vec![1.0, 0.0, 1.0, 0.0, 0.0];
        theta_a.extend(vec![0.0, 0.0, 100.0]);
        let mut theta_b = vec![1.0, 360.0, 1.0, 0.0, 0.0];
        theta_b.extend(vec![0.0, 0.0, 100.0]);
        assert_eq!(theta_a.len(), 5 + n_ref);

        let fs_a = multi_a.get_fit_statistic(&theta_a).unwrap();
        let fs_b = multi_b.get_fit_statistic(&theta_b).unwrap();
        assert!((fs_a - fs_b).abs() / fs_a.max(1e-12) < 1e-9);
    }
}
