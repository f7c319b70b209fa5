//! End-to-end path: parse a model-configuration file, build the function
//! sets and initial parameter vector, attach a PSF and synthetic data, and
//! read back a fit statistic — the path a single-image `fit` invocation
//! drives in full, as opposed to the unit tests colocated with each module.

use ndarray::Array2;

use imfit_core::config::{build_function_sets, ModelConfigFile};
use imfit_core::model_object::{ImageCharacteristics, ModelObject, WeightConvention};

const CONFIG: &str = "\
X0 5
Y0 5
FUNCTION Gaussian
PA 0
ell 0
I_0  50.0
sigma 2.0
";

#[test]
fn parsed_config_drives_a_full_single_image_fit() {
    let parsed = ModelConfigFile::parse(CONFIG).unwrap();
    let (sets, theta) = build_function_sets(&parsed).unwrap();
    assert_eq!(theta.len(), parsed.n_params());

    let mut mo = ModelObject::new();
    for set in sets {
        mo.add_function_set(set).unwrap();
    }
    mo.set_data_dimensions(11, 11).unwrap();
    mo.add_data(Array2::zeros((11, 11))).unwrap();
    mo.set_image_characteristics(ImageCharacteristics {
        gain: 2.0,
        read_noise: 3.0,
        ..Default::default()
    });
    mo.finalize_for_fitting().unwrap();

    let stat = mo.get_fit_statistic(&theta).unwrap();
    assert!(stat.is_finite() && stat >= 0.0);

    let model = mo.get_model_image();
    assert_eq!(model.dim(), (11, 11));
    // Peak sits at the function's center, (5, 5) in 0-based pixel coords.
    let peak = model[[5, 5]];
    assert!(model.iter().all(|&v| v <= peak + 1e-9));
}

#[test]
fn psf_attached_before_dimensions_blurs_the_model() {
    let parsed = ModelConfigFile::parse(CONFIG).unwrap();
    let (sets, theta) = build_function_sets(&parsed).unwrap();

    let mut sharp = ModelObject::new();
    for set in build_function_sets(&parsed).unwrap().0 {
        sharp.add_function_set(set).unwrap();
    }
    sharp.set_data_dimensions(11, 11).unwrap();
    sharp.add_data(Array2::zeros((11, 11))).unwrap();
    sharp.finalize_for_fitting().unwrap();
    sharp.create_model_image(&theta).unwrap();
    let sharp_peak = sharp.get_model_image()[[5, 5]];

    let mut psf = Array2::<f64>::zeros((3, 3));
    psf.fill(1.0 / 9.0);

    let mut blurred = ModelObject::new();
    for set in sets {
        blurred.add_function_set(set).unwrap();
    }
    blurred.attach_psf(psf).unwrap();
    blurred.set_data_dimensions(11, 11).unwrap();
    blurred.add_data(Array2::zeros((11, 11))).unwrap();
    blurred.finalize_for_fitting().unwrap();
    blurred.create_model_image(&theta).unwrap();
    let blurred_peak = blurred.get_model_image()[[5, 5]];

    assert!(
        blurred_peak < sharp_peak,
        "box-averaging PSF should spread the peak: blurred={blurred_peak} sharp={sharp_peak}"
    );
}

#[test]
fn external_sigma_map_takes_precedence_over_derived_weights() {
    let parsed = ModelConfigFile::parse(CONFIG).unwrap();
    let (sets, theta) = build_function_sets(&parsed).unwrap();

    let mut mo = ModelObject::new();
    for set in sets {
        mo.add_function_set(set).unwrap();
    }
    mo.set_data_dimensions(11, 11).unwrap();
    mo.add_data(Array2::zeros((11, 11))).unwrap();
    mo.add_error_map(Array2::from_elem((11, 11), 2.0), WeightConvention::Sigma)
        .unwrap();
    mo.finalize_for_fitting().unwrap();

    let weights = mo.get_weight_image().unwrap();
    for w in weights.iter() {
        assert!((w - 0.25).abs() < 1e-12, "sigma=2 should give weight 1/sigma^2 = 0.25, got {w}");
    }

    // A fit statistic is still computable end to end with the external map.
    let stat = mo.get_fit_statistic(&theta).unwrap();
    assert!(stat.is_finite());
}

#[test]
fn saved_config_round_trips_to_the_same_fit_statistic() {
    let parsed = ModelConfigFile::parse(CONFIG).unwrap();
    let (sets, theta) = build_function_sets(&parsed).unwrap();

    let data = Array2::from_shape_fn((11, 11), |(r, c)| {
        let dx = c as f64 - 5.0;
        let dy = r as f64 - 5.0;
        50.0 * (-(dx * dx + dy * dy) / 8.0).exp()
    });

    let mut original = ModelObject::new();
    for set in sets {
        original.add_function_set(set).unwrap();
    }
    original.set_data_dimensions(11, 11).unwrap();
    original.add_data(data.clone()).unwrap();
    original.finalize_for_fitting().unwrap();
    let original_stat = original.get_fit_statistic(&theta).unwrap();

    let mut saved = parsed.clone();
    saved.set_values(&theta).unwrap();
    let text = saved.to_text();
    let reparsed = ModelConfigFile::parse(&text).unwrap();
    let (reloaded_sets, reloaded_theta) = build_function_sets(&reparsed).unwrap();
    assert_eq!(theta, reloaded_theta);

    let mut reloaded = ModelObject::new();
    for set in reloaded_sets {
        reloaded.add_function_set(set).unwrap();
    }
    reloaded.set_data_dimensions(11, 11).unwrap();
    reloaded.add_data(data).unwrap();
    reloaded.finalize_for_fitting().unwrap();
    let reloaded_stat = reloaded.get_fit_statistic(&reloaded_theta).unwrap();

    assert!(
        (original_stat - reloaded_stat).abs() / original_stat.max(1e-12) < 1e-10,
        "original={original_stat} reloaded={reloaded_stat}"
    );
}
