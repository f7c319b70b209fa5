use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use imfit_core::config::{
    build_function_sets, FilenameSection, ImageBlockSpec, ImageInfoFile, ModelConfigFile, ParamLimit,
};
use imfit_core::image_description::ImageDescription;
use imfit_core::io;
use imfit_core::model_object::{ImageCharacteristics, ModelObject, WeightConvention};
use imfit_core::multi_image::{spans_from_sets, MultiImageModelObject};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array2};

use crate::commands::report::{print_fit_summary, BootstrapSummary, FitReport};

#[derive(Args)]
pub struct FitArgs {
    /// Model configuration file (§6.1 grammar)
    #[arg(long)]
    pub config: PathBuf,

    /// Multi-image info file (§6.2 grammar); mutually exclusive with --data
    #[arg(long, conflicts_with = "data")]
    pub image_info: Option<PathBuf>,

    /// Single-image data file
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Point-spread function image, convolved with the model before comparison
    #[arg(long)]
    pub psf: Option<PathBuf>,

    /// Bad-pixel mask (zero-is-good by default; see --mask-zero-is-bad)
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// A zero pixel in the mask marks a BAD pixel, not a good one
    #[arg(long)]
    pub mask_zero_is_bad: bool,

    /// Per-pixel sigma (1-sigma) error map
    #[arg(long, conflicts_with_all = ["variance", "weight"])]
    pub sigma: Option<PathBuf>,

    /// Per-pixel variance error map
    #[arg(long, conflicts_with_all = ["sigma", "weight"])]
    pub variance: Option<PathBuf>,

    /// Per-pixel weight (1/sigma^2) error map
    #[arg(long, conflicts_with_all = ["sigma", "variance"])]
    pub weight: Option<PathBuf>,

    #[arg(long, default_value_t = 1.0)]
    pub gain: f64,
    #[arg(long = "read-noise", default_value_t = 0.0)]
    pub read_noise: f64,
    #[arg(long = "sky", default_value_t = 0.0)]
    pub original_sky: f64,
    #[arg(long, default_value_t = 1.0)]
    pub exptime: f64,
    #[arg(long, default_value_t = 1.0)]
    pub ncombined: f64,

    /// Use the Cash statistic instead of chi-square
    #[arg(long, conflicts_with = "poisson_mlr")]
    pub cashstat: bool,
    /// Use the Poisson maximum-likelihood-ratio statistic instead of chi-square
    #[arg(long = "poisson-mlr", conflicts_with = "cashstat")]
    pub poisson_mlr: bool,

    /// Run N bootstrap trials of the fit statistic at the supplied parameters
    #[arg(long)]
    pub bootstrap: Option<usize>,
    /// Bootstrap PRNG seed
    #[arg(long, default_value_t = 1)]
    pub bootstrap_seed: u64,

    #[arg(long = "save-model")]
    pub save_model: Option<PathBuf>,
    #[arg(long = "save-residual")]
    pub save_residual: Option<PathBuf>,
    /// Write the evaluated parameter vector back out as a re-parseable §6.1 config file
    #[arg(long = "save-params")]
    pub save_params: Option<PathBuf>,

    /// Print the parameter header and initial values, then exit
    #[arg(long = "print-params")]
    pub print_params: bool,

    /// Emit the fit report as JSON instead of a human-readable table
    #[arg(long)]
    pub json: bool,
}

fn load_grid(path: &Path) -> Result<Array2<f64>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("raw") => io::load_raw(path).map_err(Into::into),
        _ => io::load_image(path).map_err(Into::into),
    }
    .with_context(|| format!("loading '{}'", path.display()))
}

/// Load a possibly-sectioned path (§6.3 `name.fits[x1:x2,y1:y2]` syntax) and
/// crop to the declared section, returning the crop alongside the parsed
/// section (whose `offset()` is `(0,0)` when no section was given).
fn load_grid_section(raw_path: &str) -> Result<(Array2<f64>, FilenameSection)> {
    let section = FilenameSection::parse(raw_path)?;
    let full = load_grid(Path::new(&section.path))?;
    let (full_h, full_w) = full.dim();
    let (row_start, row_end, col_start, col_end) = section.bounds(full_h, full_w);
    if row_start >= row_end || col_start >= col_end {
        bail!(
            "image section of '{}' is empty after clamping to {}x{}",
            raw_path,
            full_w,
            full_h
        );
    }
    let cropped = full.slice(s![row_start..row_end, col_start..col_end]).to_owned();
    Ok((cropped, section))
}

/// Shift every function set's `X0,Y0` (and their range limits, if any) by
/// `-x_off, -y_off` — the §6.3 "subtract the section offset before fitting"
/// rule, applied uniformly across every function set in the file.
fn shift_config_by_section_offset(config: &ModelConfigFile, x_off: f64, y_off: f64) -> ModelConfigFile {
    let mut shifted = config.clone();
    for set in &mut shifted.function_sets {
        set.x0.value -= x_off;
        set.x0.limit = shift_limit(set.x0.limit, x_off);
        set.y0.value -= y_off;
        set.y0.limit = shift_limit(set.y0.limit, y_off);
    }
    shifted
}

fn shift_limit(limit: ParamLimit, off: f64) -> ParamLimit {
    match limit {
        ParamLimit::Range(lo, hi) => ParamLimit::Range(lo - off, hi - off),
        other => other,
    }
}

/// Undo [`shift_config_by_section_offset`] on a flat theta vector built from
/// `config`'s declaration order, re-adding the section offset to each
/// function set's `X0,Y0` entries before the values are reported or saved.
fn unshift_theta_by_section_offset(config: &ModelConfigFile, theta: &mut [f64], x_off: f64, y_off: f64) {
    let mut i = 0usize;
    for set in &config.function_sets {
        theta[i] += x_off;
        theta[i + 1] += y_off;
        i += 2;
        for f in &set.functions {
            i += f.params.len();
        }
    }
}

fn characteristics(args: &FitArgs) -> ImageCharacteristics {
    ImageCharacteristics {
        gain: args.gain,
        read_noise: args.read_noise,
        original_sky: args.original_sky,
        exptime: args.exptime,
        n_combined: args.ncombined,
    }
}

fn fit_statistic_kind_name(args: &FitArgs, has_error_map: bool) -> &'static str {
    if args.cashstat {
        "Cash"
    } else if args.poisson_mlr {
        "PoissonMLR"
    } else if has_error_map {
        "ChiSquareExternal"
    } else {
        "ChiSquareData"
    }
}

fn apply_fit_statistic_and_errors(model: &mut ModelObject, args: &FitArgs) -> Result<bool> {
    let mut has_error_map = false;
    if let Some(path) = &args.sigma {
        model.add_error_map(load_grid(path)?, WeightConvention::Sigma)?;
        has_error_map = true;
    } else if let Some(path) = &args.variance {
        model.add_error_map(load_grid(path)?, WeightConvention::Variance)?;
        has_error_map = true;
    } else if let Some(path) = &args.weight {
        model.add_error_map(load_grid(path)?, WeightConvention::Weight)?;
        has_error_map = true;
    }

    if args.cashstat {
        model.use_cash_statistic();
    } else if args.poisson_mlr {
        model.use_poisson_mlr();
    }
    Ok(has_error_map)
}

/// Builds the single-image model, applying the §6.3 section-offset shift (if
/// the `--data` path carries a `[x1:x2,y1:y2]` section) to every function
/// set's `X0,Y0` before the engine ever sees them. Returns the model, the
/// shifted theta the engine was built and fit with, and the `(x_off, y_off)`
/// to re-add when reporting or saving parameters.
fn build_single_image_model(
    args: &FitArgs,
    config: &ModelConfigFile,
) -> Result<(ModelObject, Vec<f64>, (f64, f64))> {
    let data_path = args
        .data
        .as_ref()
        .ok_or_else(|| anyhow!("--data is required in single-image mode"))?;
    let (data, section) = load_grid_section(
        data_path
            .to_str()
            .ok_or_else(|| anyhow!("--data path is not valid UTF-8"))?,
    )?;
    let (x_off, y_off) = section.offset();
    let (x_off, y_off) = (x_off as f64, y_off as f64);

    let shifted = shift_config_by_section_offset(config, x_off, y_off);
    let (sets, theta) = build_function_sets(&shifted)?;
    let mut model = ModelObject::new();
    for set in sets {
        model.add_function_set(set)?;
    }

    if let Some(path) = &args.psf {
        model.attach_psf(load_grid(path)?)?;
    }

    model.add_data(data)?;

    if let Some(path) = &args.mask {
        model.add_mask(load_grid(path)?, !args.mask_zero_is_bad)?;
    }

    model.set_image_characteristics(characteristics(args));
    apply_fit_statistic_and_errors(&mut model, args)?;
    model.finalize_for_fitting()?;
    Ok((model, theta, (x_off, y_off)))
}

/// Build this image block's local function sets (already in its own
/// image-frame per the Open Question (b) decision in `DESIGN.md`), shifted
/// by the block's own `--data` section offset (§6.3).
fn local_theta(
    block: &ImageBlockSpec,
    x_off: f64,
    y_off: f64,
) -> Result<(Vec<imfit_core::function_set::FunctionSet>, Vec<f64>)> {
    if block.local_function_sets.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let config = ModelConfigFile {
        options: Default::default(),
        function_sets: block.local_function_sets.clone(),
    };
    let shifted = shift_config_by_section_offset(&config, x_off, y_off);
    Ok(build_function_sets(&shifted)?)
}

/// Returns the configured model, its local-function theta, the local
/// parameter count, and this block's `--data` §6.3 section offset (needed by
/// the caller to shift the reference block's *global* function sets too).
fn load_block_model(
    block: &ImageBlockSpec,
    args: &FitArgs,
) -> Result<(ModelObject, Vec<f64>, usize, (f64, f64))> {
    let mut model = ModelObject::new();

    let data_path = block
        .data_path
        .as_ref()
        .ok_or_else(|| anyhow!("image block has no DATA filename"))?;
    let (data, section) = load_grid_section(data_path)?;
    let (x_off, y_off) = section.offset();
    let (x_off, y_off) = (x_off as f64, y_off as f64);

    let (local_sets, local_theta_vec) = local_theta(block, x_off, y_off)?;
    let n_local_params = local_theta_vec.len();
    for set in local_sets {
        model.add_function_set(set)?;
    }

    if let Some(path) = &block.psf_path {
        model.attach_psf(load_grid(Path::new(path))?)?;
    }

    model.add_data(data)?;

    if let Some(path) = &block.mask_path {
        model.add_mask(load_grid(Path::new(path))?, !args.mask_zero_is_bad)?;
    }
    if let Some(path) = &block.error_path {
        model.add_error_map(load_grid(Path::new(path))?, WeightConvention::Sigma)?;
    }

    let mut chars = ImageCharacteristics::default();
    if let Some(v) = block.gain {
        chars.gain = v;
    }
    if let Some(v) = block.read_noise {
        chars.read_noise = v;
    }
    if let Some(v) = block.original_sky {
        chars.original_sky = v;
    }
    if let Some(v) = block.exptime {
        chars.exptime = v;
    }
    if let Some(v) = block.n_combined {
        chars.n_combined = v;
    }
    model.set_image_characteristics(chars);

    if args.cashstat {
        model.use_cash_statistic();
    } else if args.poisson_mlr {
        model.use_poisson_mlr();
    }

    Ok((model, local_theta_vec, n_local_params, (x_off, y_off)))
}

fn image_5tuple(block: &ImageBlockSpec) -> Vec<f64> {
    vec![
        block.pixel_scale.as_ref().map(|p| p.value).unwrap_or(1.0),
        block.image_pa.as_ref().map(|p| p.value).unwrap_or(0.0),
        block.flux_scale.as_ref().map(|p| p.value).unwrap_or(1.0),
        block.x0.as_ref().map(|p| p.value).unwrap_or(0.0),
        block.y0.as_ref().map(|p| p.value).unwrap_or(0.0),
    ]
}

fn run_single_image(args: &FitArgs, config: &ModelConfigFile) -> Result<()> {
    let start = Instant::now();
    let (mut model, theta, (x_off, y_off)) = build_single_image_model(args, config)?;

    let fit_value = model.get_fit_statistic(&theta)?;
    let n_valid = model.n_valid_pixels();
    let n_params = theta.len();
    let reduced = if n_valid > n_params {
        Some(fit_value / (n_valid - n_params) as f64)
    } else {
        None
    };

    let bootstrap = if let Some(n_trials) = args.bootstrap {
        model.use_bootstrap(args.bootstrap_seed);
        let pb = ProgressBar::new(n_trials as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("Bootstrap [{bar:40}] {pos}/{len}")?,
        );
        let mut values = Vec::with_capacity(n_trials);
        for _ in 0..n_trials {
            model.make_bootstrap_sample()?;
            values.push(model.get_fit_statistic(&theta)?);
            pb.inc(1);
        }
        pb.finish_and_clear();
        model.clear_bootstrap_sample();
        Some(bootstrap_summary(n_trials, &values))
    } else {
        None
    };

    if let Some(path) = &args.save_model {
        model.create_model_image(&theta)?;
        io::save_image(&model.get_model_image(), path)?;
    }
    if let Some(path) = &args.save_residual {
        model.create_model_image(&theta)?;
        io::save_image(&model.get_residual_image()?, path)?;
    }
    // §6.3: report and persist parameters in the file's original (unsectioned)
    // frame, re-adding the offset that was subtracted before fitting.
    let mut reported_theta = theta.clone();
    unshift_theta_by_section_offset(config, &mut reported_theta, x_off, y_off);

    if let Some(path) = &args.save_params {
        let mut saved = config.clone();
        saved.set_values(&reported_theta)?;
        std::fs::write(path, saved.to_text())
            .with_context(|| format!("writing '{}'", path.display()))?;
    }

    let header = model.get_param_header();
    let names: Vec<String> = header.split_whitespace().map(str::to_string).collect();

    let report = FitReport {
        fit_statistic_kind: fit_statistic_kind_name(args, has_error_map(args)).to_string(),
        fit_statistic_value: fit_value,
        reduced_chi_square: reduced,
        n_valid_pixels: n_valid,
        n_params,
        param_names: names,
        param_values: reported_theta,
        bootstrap,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    emit_report(args, &report)
}

fn run_multi_image(args: &FitArgs, config: &ModelConfigFile, image_info_path: &Path) -> Result<()> {
    let start = Instant::now();
    let text = std::fs::read_to_string(image_info_path)
        .with_context(|| format!("reading '{}'", image_info_path.display()))?;
    let info = ImageInfoFile::parse(&text)?;
    if info.images.is_empty() {
        bail!("image-info file declares no images");
    }

    let (reference_block, child_blocks) = info.images.split_first().expect("checked non-empty");
    let (mut reference, _, ref_n_local, (ref_x_off, ref_y_off)) = load_block_model(reference_block, args)?;
    if ref_n_local > 0 {
        bail!("the reference image block must not declare local functions");
    }

    // §6.3: the reference image's own DATA section offset shifts the global
    // model (declared in the reference frame) the same way it would a
    // single-image fit.
    let shifted_global_config = shift_config_by_section_offset(config, ref_x_off, ref_y_off);
    let (global_sets, global_theta) = build_function_sets(&shifted_global_config)?;
    let set_spans = spans_from_sets(&global_sets);
    for set in global_sets {
        reference.add_function_set(set)?;
    }

    let mut multi = MultiImageModelObject::new(reference, set_spans)?;

    let mut external = Vec::new();
    let mut local_thetas = Vec::new();
    for block in child_blocks {
        external.extend(image_5tuple(block));
    }
    external.extend(global_theta.iter().copied());

    for block in child_blocks {
        let (model, local, n_local, _) = load_block_model(block, args)?;
        let desc = ImageDescription::default();
        multi.add_image(desc, model, n_local)?;
        local_thetas.push(local);
    }
    for local in local_thetas {
        external.extend(local);
    }

    let fit_value = multi.get_fit_statistic(&external)?;
    let n_valid = multi.n_pixels();
    let n_params = external.len();
    let reduced = if n_valid > n_params {
        Some(fit_value / (n_valid - n_params) as f64)
    } else {
        None
    };

    if args.save_model.is_some() || args.save_residual.is_some() {
        multi.create_all_model_images(&external)?;
        if let Some(path) = &args.save_model {
            io::save_image(&multi.reference_image().get_model_image(), path)?;
        }
        if let Some(path) = &args.save_residual {
            io::save_image(&multi.reference_image().get_residual_image()?, path)?;
        }
    }

    let report = FitReport {
        fit_statistic_kind: fit_statistic_kind_name(args, false).to_string(),
        fit_statistic_value: fit_value,
        reduced_chi_square: reduced,
        n_valid_pixels: n_valid,
        n_params,
        param_names: (0..n_params).map(|i| format!("p{i}")).collect(),
        param_values: external,
        bootstrap: None,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    emit_report(args, &report)
}

fn has_error_map(args: &FitArgs) -> bool {
    args.sigma.is_some() || args.variance.is_some() || args.weight.is_some()
}

fn bootstrap_summary(n_trials: usize, values: &[f64]) -> BootstrapSummary {
    let mean = values.iter().sum::<f64>() / n_trials as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_trials as f64;
    BootstrapSummary {
        n_trials,
        mean,
        std_dev: variance.sqrt(),
        min: values.iter().cloned().fold(f64::INFINITY, f64::min),
        max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn emit_report(args: &FitArgs, report: &FitReport) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_fit_summary(report);
    }
    Ok(())
}

pub fn run(args: &FitArgs) -> Result<()> {
    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading '{}'", args.config.display()))?;
    let config = ModelConfigFile::parse(&config_text)?;

    if args.print_params {
        let (_, theta) = build_function_sets(&config)?;
        println!("{} parameters, initial values:", theta.len());
        for (i, v) in theta.iter().enumerate() {
            println!("  [{i}] {v}");
        }
        return Ok(());
    }

    match &args.image_info {
        Some(path) => run_multi_image(args, &config, path),
        None => run_single_image(args, &config),
    }
}
