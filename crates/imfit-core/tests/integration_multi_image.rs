//! End-to-end path: two images built from parsed model-configuration text,
//! joined into a `MultiImageModelObject`, driven through a full external
//! parameter vector to `create_all_model_images`/`get_fit_statistic` — the
//! path a multi-image `fit` invocation drives in full.

use ndarray::Array2;

use imfit_core::config::{build_function_sets, ModelConfigFile};
use imfit_core::image_description::ImageDescription;
use imfit_core::model_object::ModelObject;
use imfit_core::multi_image::{spans_from_sets, MultiImageModelObject};

const GLOBAL_CONFIG: &str = "\
X0 8
Y0 8
FUNCTION FlatSky
I_sky 50.0
";

fn build_reference() -> (ModelObject, Vec<usize>) {
    let parsed = ModelConfigFile::parse(GLOBAL_CONFIG).unwrap();
    let (sets, _theta) = build_function_sets(&parsed).unwrap();
    let spans = spans_from_sets(&sets);

    let mut mo = ModelObject::new();
    for set in sets {
        mo.add_function_set(set).unwrap();
    }
    mo.set_data_dimensions(16, 16).unwrap();
    mo.add_data(Array2::from_elem((16, 16), 50.0)).unwrap();
    (mo, spans)
}

#[test]
fn two_parsed_images_fit_jointly_through_the_external_vector() {
    let (reference, spans) = build_reference();
    let n_global = spans.iter().sum::<usize>();

    let (child, _) = build_reference();

    let mut multi = MultiImageModelObject::new(reference, spans).unwrap();
    multi
        .add_image(ImageDescription::default(), child, 0)
        .unwrap();

    assert_eq!(multi.n_images(), 2);
    assert_eq!(multi.n_params(), 5 + n_global);

    let mut external = vec![1.0, 0.0, 1.0, 0.0, 0.0]; // identity image-description params
    external.extend(vec![8.0, 8.0, 50.0]); // global FlatSky theta

    multi.create_all_model_images(&external).unwrap();
    let ref_model = multi.reference_image().get_model_image();
    let child_model = multi.child_image(1).unwrap().get_model_image();
    for (a, b) in ref_model.iter().zip(child_model.iter()) {
        assert!((a - b).abs() < 1e-12);
    }

    let stat = multi.get_fit_statistic(&external).unwrap();
    assert!(stat.is_finite() && stat >= 0.0);

    let mut deviates = Vec::new();
    multi.compute_deviates(&external, &mut deviates).unwrap();
    assert_eq!(deviates.len(), multi.n_pixels());
}

#[test]
fn child_flux_scale_doubles_its_model_but_not_the_reference() {
    let (reference, spans) = build_reference();
    let (child, _) = build_reference();

    let mut multi = MultiImageModelObject::new(reference, spans).unwrap();
    multi
        .add_image(
            ImageDescription {
                pix_scale: 1.0,
                rotation_deg: 0.0,
                flux_scale: 2.0,
            },
            child,
            0,
        )
        .unwrap();

    let mut external = vec![1.0, 0.0, 1.0, 0.0, 0.0];
    external.extend(vec![8.0, 8.0, 50.0]);

    multi.create_all_model_images(&external).unwrap();
    let ref_model = multi.reference_image().get_model_image();
    let child_model = multi.child_image(1).unwrap().get_model_image();

    for (a, b) in ref_model.iter().zip(child_model.iter()) {
        assert!((2.0 * a - b).abs() < 1e-9, "child should be 2x reference: {a} vs {b}");
    }
}

#[test]
fn parameter_vector_length_mismatch_is_rejected() {
    let (reference, spans) = build_reference();
    let (child, _) = build_reference();
    let mut multi = MultiImageModelObject::new(reference, spans).unwrap();
    multi
        .add_image(ImageDescription::default(), child, 0)
        .unwrap();

    let too_short = vec![1.0, 0.0, 1.0, 0.0, 0.0, 8.0, 8.0];
    assert!(multi.get_fit_statistic(&too_short).is_err());
}
