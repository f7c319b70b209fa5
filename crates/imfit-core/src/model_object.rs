//! C4: the single-image model object — owns a model's function sets, an
//! optional PSF convolver, oversampled regions, and the data/mask/weight
//! buffers a fit statistic is computed against (§4.4).
//!
//! Lifecycle (§4.4.1) is enforced by explicit state flags rather than a
//! type-state encoding: callers that violate the declared order get a
//! `Error::Lifecycle` back, not a panic.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::consts::{DEFAULT_CHUNK_SIZE, LOG_FLOOR, PARALLEL_PIXEL_THRESHOLD};
use crate::convolver::Convolver;
use crate::error::{Error, Result};
use crate::function_set::{self, FunctionSet};
use crate::image_description::ImageDescription;
use crate::oversampled_region::{OversampledRegion, OversampledRegionSpec};

/// Which fit statistic `get_fit_statistic`/`compute_deviates` evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatisticKind {
    ChiSquareData,
    ChiSquareModel,
    ChiSquareExternal,
    Cash,
    PoissonMlr,
}

impl FitStatisticKind {
    fn is_poisson_like(self) -> bool {
        matches!(self, FitStatisticKind::Cash | FitStatisticKind::PoissonMlr)
    }
}

/// External convention an attached error map was supplied in; converted
/// once, at attach time, to the internal `w = 1/sigma` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightConvention {
    Sigma,
    Variance,
    Weight,
}

/// Scalars needed to convert data values to electron units (§3: weight and
/// extra-terms buffer derivation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageCharacteristics {
    pub gain: f64,
    pub read_noise: f64,
    pub original_sky: f64,
    pub exptime: f64,
    pub n_combined: f64,
}

impl Default for ImageCharacteristics {
    fn default() -> Self {
        ImageCharacteristics {
            gain: 1.0,
            read_noise: 0.0,
            original_sky: 0.0,
            exptime: 1.0,
            n_combined: 1.0,
        }
    }
}

impl ImageCharacteristics {
    fn g_eff(&self) -> f64 {
        self.gain * self.exptime * self.n_combined
    }
}

pub struct ModelObject {
    function_sets: Vec<FunctionSet>,
    n_params: usize,

    psf_raw: Option<Array2<f64>>,
    n_psf_rows: usize,
    n_psf_cols: usize,
    convolver: Option<Convolver>,

    n_rows: usize,
    n_cols: usize,
    n_rows_pad: usize,
    n_cols_pad: usize,
    dims_set: bool,

    data: Option<Array2<f64>>,
    mask: Option<Array2<f64>>,
    weight: Option<Array2<f64>>,
    extra_terms: Option<Array2<f64>>,
    weight_externally_supplied: bool,

    oversampled_regions: Vec<OversampledRegion>,

    characteristics: ImageCharacteristics,
    fit_kind: FitStatisticKind,
    image_desc: ImageDescription,

    finalized: bool,
    valid_pixel_indices: Vec<usize>,

    model_image_padded: Array2<f64>,

    rng: Option<StdRng>,
    bootstrap_indices: Option<Vec<usize>>,
}

impl ModelObject {
    pub fn new() -> Self {
        ModelObject {
            function_sets: Vec::new(),
            n_params: 0,
            psf_raw: None,
            n_psf_rows: 0,
            n_psf_cols: 0,
            convolver: None,
            n_rows: 0,
            n_cols: 0,
            n_rows_pad: 0,
            n_cols_pad: 0,
            dims_set: false,
            data: None,
            mask: None,
            weight: None,
            extra_terms: None,
            weight_externally_supplied: false,
            oversampled_regions: Vec::new(),
            characteristics: ImageCharacteristics::default(),
            fit_kind: FitStatisticKind::ChiSquareData,
            image_desc: ImageDescription::default(),
            finalized: false,
            valid_pixel_indices: Vec::new(),
            model_image_padded: Array2::zeros((0, 0)),
            rng: None,
            bootstrap_indices: None,
        }
    }

    // -- Step 1: function sets ------------------------------------------

    pub fn add_function_set(&mut self, set: FunctionSet) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle(
                "cannot add a function set after finalize_for_fitting".into(),
            ));
        }
        self.function_sets.push(set);
        self.n_params = function_set::total_param_count(&self.function_sets);
        Ok(())
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    pub fn set_image_description(&mut self, desc: ImageDescription) {
        self.image_desc = desc;
    }

    pub fn set_image_characteristics(&mut self, c: ImageCharacteristics) {
        self.characteristics = c;
    }

    pub fn set_fit_statistic(&mut self, kind: FitStatisticKind) {
        self.fit_kind = kind;
    }

    // -- Step 2: PSF ------------------------------------------------------

    pub fn attach_psf(&mut self, psf: Array2<f64>) -> Result<()> {
        if self.dims_set {
            return Err(Error::Lifecycle(
                "PSF must be attached before data dimensions are declared".into(),
            ));
        }
        let (ph, pw) = psf.dim();
        if ph == 0 || pw == 0 {
            return Err(Error::InvalidDimensions {
                width: pw,
                height: ph,
            });
        }
        self.n_psf_rows = ph;
        self.n_psf_cols = pw;
        self.psf_raw = Some(psf);
        Ok(())
    }

    // -- Step 3: data dimensions ------------------------------------------

    pub fn set_data_dimensions(&mut self, n_rows: usize, n_cols: usize) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle("dimensions already finalized".into()));
        }
        if n_rows == 0 || n_cols == 0 {
            return Err(Error::InvalidDimensions {
                width: n_cols,
                height: n_rows,
            });
        }
        if self.dims_set && (n_rows != self.n_rows || n_cols != self.n_cols) {
            return Err(Error::Lifecycle(
                "data dimensions cannot be changed once declared".into(),
            ));
        }

        self.n_rows = n_rows;
        self.n_cols = n_cols;
        self.n_rows_pad = n_rows + 2 * self.n_psf_rows;
        self.n_cols_pad = n_cols + 2 * self.n_psf_cols;

        if let Some(psf) = &self.psf_raw {
            self.convolver = Some(Convolver::new(psf, self.n_rows_pad, self.n_cols_pad)?);
        }
        self.model_image_padded = Array2::zeros((self.n_rows_pad, self.n_cols_pad));
        self.dims_set = true;
        Ok(())
    }

    pub fn add_data(&mut self, data: Array2<f64>) -> Result<()> {
        let (nr, nc) = data.dim();
        if !self.dims_set {
            self.set_data_dimensions(nr, nc)?;
        } else if (nr, nc) != (self.n_rows, self.n_cols) {
            return Err(Error::InvalidDimensions {
                width: nc,
                height: nr,
            });
        }
        self.data = Some(data);
        Ok(())
    }

    // -- Step 4: oversampled regions --------------------------------------

    pub fn add_oversampled_region(&mut self, spec: OversampledRegionSpec) -> Result<()> {
        if !self.dims_set {
            return Err(Error::Lifecycle(
                "data dimensions must be declared before an oversampled region".into(),
            ));
        }
        self.oversampled_regions.push(OversampledRegion::new(spec)?);
        Ok(())
    }

    // -- Step 5: error map -------------------------------------------------

    pub fn add_error_map(&mut self, raw: Array2<f64>, convention: WeightConvention) -> Result<()> {
        if !self.dims_set {
            return Err(Error::Lifecycle(
                "data dimensions must be declared before an error map".into(),
            ));
        }
        let (nr, nc) = raw.dim();
        if (nr, nc) != (self.n_rows, self.n_cols) {
            return Err(Error::InvalidDimensions {
                width: nc,
                height: nr,
            });
        }
        let w = raw.mapv(|v| match convention {
            WeightConvention::Sigma => 1.0 / v,
            WeightConvention::Variance => 1.0 / v.sqrt(),
            WeightConvention::Weight => v.sqrt(),
        });
        self.weight = Some(w);
        self.weight_externally_supplied = true;
        self.fit_kind = FitStatisticKind::ChiSquareExternal;
        Ok(())
    }

    pub fn use_model_errors(&mut self) {
        self.fit_kind = FitStatisticKind::ChiSquareModel;
    }

    pub fn use_cash_statistic(&mut self) {
        self.fit_kind = FitStatisticKind::Cash;
    }

    pub fn use_poisson_mlr(&mut self) {
        self.fit_kind = FitStatisticKind::PoissonMlr;
    }

    // -- Step 6: mask -------------------------------------------------------

    pub fn add_mask(&mut self, raw: Array2<f64>, zero_is_good: bool) -> Result<()> {
        if !self.dims_set {
            return Err(Error::Lifecycle(
                "data dimensions must be declared before a mask".into(),
            ));
        }
        let (nr, nc) = raw.dim();
        if (nr, nc) != (self.n_rows, self.n_cols) {
            return Err(Error::InvalidDimensions {
                width: nc,
                height: nr,
            });
        }
        let mask = raw.mapv(|v| {
            let is_zero = v == 0.0;
            if is_zero == zero_is_good {
                1.0
            } else {
                0.0
            }
        });
        self.mask = Some(mask);
        Ok(())
    }

    // -- Step 7: finalize -----------------------------------------------------

    pub fn finalize_for_fitting(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle("finalize_for_fitting called twice".into()));
        }
        if !self.dims_set {
            return Err(Error::Lifecycle(
                "data dimensions must be declared before finalize_for_fitting".into(),
            ));
        }
        let data = self
            .data
            .clone()
            .unwrap_or_else(|| Array2::zeros((self.n_rows, self.n_cols)));

        let mut mask = self
            .mask
            .take()
            .unwrap_or_else(|| Array2::from_elem((self.n_rows, self.n_cols), 1.0));

        let mut data = data;
        for ((r, c), d) in data.indexed_iter_mut() {
            if !d.is_finite() {
                tracing::warn!(row = r, col = c, "nonfinite data pixel folded into mask");
                mask[[r, c]] = 0.0;
                *d = 0.0;
            }
        }
        self.data = Some(data.clone());

        if self.weight.is_none() {
            let g_eff = self.characteristics.g_eff();
            let sky = self.characteristics.original_sky;
            let rn = self.characteristics.read_noise;
            let n_combined = self.characteristics.n_combined;
            let w = match self.fit_kind {
                FitStatisticKind::Cash | FitStatisticKind::PoissonMlr => {
                    Array2::from_elem((self.n_rows, self.n_cols), 1.0)
                }
                _ => data.mapv(|d| {
                    let variance = (d + sky) / g_eff + n_combined * (rn / g_eff).powi(2);
                    1.0 / variance.sqrt()
                }),
            };
            self.weight = Some(w);
        }

        if matches!(self.fit_kind, FitStatisticKind::PoissonMlr) {
            let g_eff = self.characteristics.g_eff();
            let sky = self.characteristics.original_sky;
            let extra = data.mapv(|d| {
                let d_prime = g_eff * (d + sky);
                if d_prime > 0.0 {
                    d_prime * d_prime.ln() - d_prime
                } else {
                    0.0
                }
            });
            self.extra_terms = Some(extra);
        }

        {
            let weight = self.weight.as_mut().expect("weight just populated");
            for ((r, c), w) in weight.indexed_iter_mut() {
                let product = *w * mask[[r, c]];
                if !product.is_finite() || product <= 0.0 {
                    *w = 0.0;
                    if mask[[r, c]] != 0.0 {
                        tracing::warn!(
                            row = r,
                            col = c,
                            weight = product,
                            "nonfinite or negative weight folded into mask"
                        );
                    }
                    mask[[r, c]] = 0.0;
                } else {
                    *w = product;
                }
            }
        }

        self.valid_pixel_indices = mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m != 0.0)
            .map(|(i, _)| i)
            .collect();
        if self.valid_pixel_indices.is_empty() {
            return Err(Error::NoValidPixels);
        }
        tracing::debug!(
            n_valid = self.valid_pixel_indices.len(),
            n_total = self.n_rows * self.n_cols,
            "finalized model object"
        );

        self.mask = Some(mask);
        self.finalized = true;
        Ok(())
    }

    pub fn n_valid_pixels(&self) -> usize {
        self.valid_pixel_indices.len()
    }

    // -- §4.4.2 model image generation ---------------------------------------

    /// Apply `theta`, fill the padded model grid, convolve, and refine any
    /// oversampled regions. Must be called (directly or via
    /// `compute_deviates`/`get_fit_statistic`) before any readback method.
    pub fn create_model_image(&mut self, theta: &[f64]) -> Result<()> {
        function_set::apply_parameters(&mut self.function_sets, theta)?;
        self.fill_padded_grid();
        if let Some(conv) = &self.convolver {
            conv.convolve(&mut self.model_image_padded)?;
        }
        let n_psf_rows = self.n_psf_rows;
        let n_psf_cols = self.n_psf_cols;
        for region in &self.oversampled_regions {
            region.compute_and_downsample(
                &mut self.model_image_padded,
                n_psf_rows,
                n_psf_cols,
                &self.function_sets,
                &self.image_desc,
            )?;
        }
        Ok(())
    }

    fn fill_padded_grid(&mut self) {
        let sets = &self.function_sets;
        let desc = &self.image_desc;
        let n_psf_rows = self.n_psf_rows as f64;
        let n_psf_cols = self.n_psf_cols as f64;
        let n_cols_pad = self.n_cols_pad;
        let total = self.n_rows_pad * self.n_cols_pad;

        let buf = self
            .model_image_padded
            .as_slice_mut()
            .expect("model image padded buffer is contiguous");

        let compute_cell = |k: usize| -> f64 {
            let i = k / n_cols_pad;
            let j = k % n_cols_pad;
            let x = j as f64 + 1.0 - n_psf_cols;
            let y = i as f64 + 1.0 - n_psf_rows;
            desc.evaluate(sets, x, y)
        };

        if total >= PARALLEL_PIXEL_THRESHOLD {
            buf.par_chunks_mut(DEFAULT_CHUNK_SIZE)
                .enumerate()
                .for_each(|(chunk_idx, chunk)| {
                    let base = chunk_idx * DEFAULT_CHUNK_SIZE;
                    for (offset, cell) in chunk.iter_mut().enumerate() {
                        *cell = compute_cell(base + offset);
                    }
                });
        } else {
            for (k, cell) in buf.iter_mut().enumerate() {
                *cell = compute_cell(k);
            }
        }
    }

    fn update_weight_from_model(&mut self) -> Result<()> {
        let g_eff = self.characteristics.g_eff();
        let sky = self.characteristics.original_sky;
        let rn = self.characteristics.read_noise;
        let n_combined = self.characteristics.n_combined;
        let n_psf_rows = self.n_psf_rows;
        let n_psf_cols = self.n_psf_cols;
        let n_cols = self.n_cols;
        let padded = &self.model_image_padded;
        let mask = self.mask.as_ref().ok_or(Error::Lifecycle(
            "update_weight_from_model called before finalize_for_fitting".into(),
        ))?;
        let weight = self.weight.as_mut().expect("weight allocated at finalize");
        for r in 0..self.n_rows {
            for c in 0..n_cols {
                if mask[[r, c]] == 0.0 {
                    weight[[r, c]] = 0.0;
                    continue;
                }
                let m = padded[[r + n_psf_rows, c + n_psf_cols]];
                let variance = (m + sky) / g_eff + n_combined * (rn / g_eff).powi(2);
                let w = 1.0 / variance.sqrt();
                weight[[r, c]] = if w.is_finite() { w } else { 0.0 };
            }
        }
        Ok(())
    }

    // -- §4.4.3 deviates / fit statistics -------------------------------------

    fn pixel_ids(&self) -> Vec<usize> {
        match &self.bootstrap_indices {
            Some(idx) => idx.clone(),
            None => (0..self.n_rows * self.n_cols).collect(),
        }
    }

    fn pixel_contribution(&self, idx: usize) -> (f64, f64) {
        let r = idx / self.n_cols;
        let c = idx % self.n_cols;
        let data = self.data.as_ref().expect("data present after finalize");
        let weight = self.weight.as_ref().expect("weight present after finalize");
        let w = weight[[r, c]];
        let d = data[[r, c]];
        let m = self.model_image_padded[[r + self.n_psf_rows, c + self.n_psf_cols]];

        if self.fit_kind.is_poisson_like() {
            let g_eff = self.characteristics.g_eff();
            let sky = self.characteristics.original_sky;
            let m_prime = g_eff * (m + sky);
            let d_prime = g_eff * (d + sky);
            let e = self
                .extra_terms
                .as_ref()
                .map(|e| e[[r, c]])
                .unwrap_or(0.0);
            let log_m = m_prime.max(LOG_FLOOR).ln();
            let inner = m_prime - d_prime * log_m + e;
            (w, inner)
        } else {
            (w, d - m)
        }
    }

    pub fn compute_deviates(&mut self, theta: &[f64], out: &mut Vec<f64>) -> Result<()> {
        if !self.finalized {
            return Err(Error::Lifecycle(
                "compute_deviates called before finalize_for_fitting".into(),
            ));
        }
        self.create_model_image(theta)?;
        if matches!(self.fit_kind, FitStatisticKind::ChiSquareModel) {
            self.update_weight_from_model()?;
        }

        let ids = self.pixel_ids();
        out.clear();
        out.reserve(ids.len());
        for idx in ids {
            let (w, inner) = self.pixel_contribution(idx);
            let dev = if self.fit_kind.is_poisson_like() {
                (2.0 * w * inner.abs()).sqrt()
            } else {
                w * inner
            };
            out.push(dev);
        }
        Ok(())
    }

    pub fn get_fit_statistic(&mut self, theta: &[f64]) -> Result<f64> {
        if !self.finalized {
            return Err(Error::Lifecycle(
                "get_fit_statistic called before finalize_for_fitting".into(),
            ));
        }
        self.create_model_image(theta)?;
        if matches!(self.fit_kind, FitStatisticKind::ChiSquareModel) {
            self.update_weight_from_model()?;
        }

        let ids = self.pixel_ids();
        let mut sum = 0.0f64;
        let mut comp = 0.0f64;
        for idx in ids {
            let (w, inner) = self.pixel_contribution(idx);
            let term = if self.fit_kind.is_poisson_like() {
                2.0 * w * inner
            } else {
                (w * inner).powi(2)
            };
            let y = term - comp;
            let t = sum + y;
            comp = (t - sum) - y;
            sum = t;
        }
        Ok(sum)
    }

    // -- §4.4.4 readback ---------------------------------------------------

    pub fn get_expanded_model_image(&self) -> &Array2<f64> {
        &self.model_image_padded
    }

    pub fn get_model_image(&self) -> Array2<f64> {
        self.crop(&self.model_image_padded)
    }

    pub fn get_residual_image(&self) -> Result<Array2<f64>> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::Lifecycle("no data attached".into()))?;
        let model = self.get_model_image();
        Ok(data - &model)
    }

    /// Externally visible weight buffer, in `1/sigma^2` form (the internal
    /// representation is `1/sigma`).
    pub fn get_weight_image(&self) -> Result<Array2<f64>> {
        let w = self
            .weight
            .as_ref()
            .ok_or_else(|| Error::Lifecycle("no weight buffer yet".into()))?;
        Ok(w.mapv(|v| v * v))
    }

    pub fn get_data_image(&self) -> Option<&Array2<f64>> {
        self.data.as_ref()
    }

    fn crop(&self, padded: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((self.n_rows, self.n_cols), |(r, c)| {
            padded[[r + self.n_psf_rows, c + self.n_psf_cols]]
        })
    }

    fn function_at_index(&self, k: usize) -> Option<(usize, usize)> {
        let mut seen = 0usize;
        for (si, set) in self.function_sets.iter().enumerate() {
            if k < seen + set.functions.len() {
                return Some((si, k - seen));
            }
            seen += set.functions.len();
        }
        None
    }

    /// Evaluate only function `k` (flattened index over every function in
    /// every set), convolve if a PSF is attached, and return the cropped
    /// result (§4.4.4).
    pub fn get_single_function_image(&mut self, theta: &[f64], k: usize) -> Result<Array2<f64>> {
        function_set::apply_parameters(&mut self.function_sets, theta)?;
        let (si, fi) = self
            .function_at_index(k)
            .ok_or_else(|| Error::Lifecycle(format!("function index {k} out of range")))?;

        let n_psf_rows = self.n_psf_rows as f64;
        let n_psf_cols = self.n_psf_cols as f64;
        let mut padded = Array2::<f64>::zeros((self.n_rows_pad, self.n_cols_pad));
        let f = &self.function_sets[si].functions[fi];
        for i in 0..self.n_rows_pad {
            let y = i as f64 + 1.0 - n_psf_rows;
            for j in 0..self.n_cols_pad {
                let x = j as f64 + 1.0 - n_psf_cols;
                padded[[i, j]] = f.value(x, y);
            }
        }
        if let Some(conv) = &self.convolver {
            conv.convolve(&mut padded)?;
        }
        Ok(self.crop(&padded))
    }

    pub fn get_function_names(&self) -> Vec<&'static str> {
        self.function_sets
            .iter()
            .flat_map(|s| s.functions.iter().map(|f| f.name()))
            .collect()
    }

    /// Header line matching the config-writer's `X0_n\t\tY0_n\t\t` per block
    /// plus `NAME_k\t` per function parameter, `k` a 1-based running function
    /// index over the whole model.
    pub fn get_param_header(&self) -> String {
        let mut s = String::new();
        let mut func_idx = 0usize;
        for (block_idx, set) in self.function_sets.iter().enumerate() {
            s.push_str(&format!("X0_{}\t\tY0_{}\t\t", block_idx + 1, block_idx + 1));
            for f in &set.functions {
                func_idx += 1;
                for pname in f.param_names() {
                    s.push_str(&format!("{pname}_{func_idx}\t"));
                }
            }
        }
        s
    }

    /// Re-center every function set at `(W/2, H/2)` and sum each function's
    /// total flux — analytic where available, else a per-cell Kahan-summed
    /// numeric integral over `[1,W] x [1,H]` (§4.4.4).
    pub fn find_total_fluxes(
        &mut self,
        theta: &[f64],
        w: usize,
        h: usize,
        mut per_component_out: Option<&mut Vec<f64>>,
    ) -> Result<f64> {
        let mut recentered = theta.to_vec();
        let cx = w as f64 / 2.0;
        let cy = h as f64 / 2.0;
        let mut offset = 0usize;
        for set in &self.function_sets {
            recentered[offset] = cx;
            recentered[offset + 1] = cy;
            offset += 2 + set.n_params();
        }
        function_set::apply_parameters(&mut self.function_sets, &recentered)?;

        if let Some(out) = per_component_out.as_deref_mut() {
            out.clear();
        }

        let mut total = 0.0f64;
        let mut total_comp = 0.0f64;
        for set in &self.function_sets {
            for f in &set.functions {
                let flux = if f.can_compute_total_flux() {
                    f.total_flux().expect("can_compute_total_flux implies total_flux")
                } else {
                    let mut sum = 0.0f64;
                    let mut comp = 0.0f64;
                    for y in 1..=h {
                        for x in 1..=w {
                            let v = f.value(x as f64, y as f64) - comp;
                            let t = sum + v;
                            comp = (t - sum) - v;
                            sum = t;
                        }
                    }
                    sum
                };
                if let Some(out) = per_component_out.as_deref_mut() {
                    out.push(flux);
                }
                let y_ = flux - total_comp;
                let t = total + y_;
                total_comp = (t - total) - y_;
                total = t;
            }
        }

        function_set::apply_parameters(&mut self.function_sets, theta)?;
        Ok(total)
    }

    // -- §4.4.6 bootstrap ----------------------------------------------------

    pub fn use_bootstrap(&mut self, seed: u64) {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self.bootstrap_indices = None;
    }

    pub fn make_bootstrap_sample(&mut self) -> Result<()> {
        if !self.finalized {
            return Err(Error::Lifecycle(
                "make_bootstrap_sample called before finalize_for_fitting".into(),
            ));
        }
        let rng = self
            .rng
            .as_mut()
            .ok_or_else(|| Error::Lifecycle("use_bootstrap must be called first".into()))?;
        let n_valid = self.valid_pixel_indices.len();
        let sample: Vec<usize> = (0..n_valid)
            .map(|_| self.valid_pixel_indices[rng.gen_range(0..n_valid)])
            .collect();
        self.bootstrap_indices = Some(sample);
        Ok(())
    }

    pub fn clear_bootstrap_sample(&mut self) {
        self.bootstrap_indices = None;
    }
}

impl Default for ModelObject {
    fn default() -> Self {
        Self::new()
    }
}
