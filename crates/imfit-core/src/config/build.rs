//! Bridges the parsed §6.1 structures to the runtime types: builds
//! [`FunctionSet`]s (with each [`FunctionObject`] constructed and `setup`
//! already called) and the matching flat initial parameter vector, so a
//! caller building a [`crate::model_object::ModelObject`] never touches raw
//! config text (§3.1).

use crate::config::{FunctionSetSpec, ModelConfigFile};
use crate::error::{Error, Result};
use crate::function_set::FunctionSet;
use crate::functions::make_function;

/// Build one function set's [`FunctionSet`] plus the `(X0, Y0, params...)`
/// slice of the flat initial parameter vector it contributes.
pub fn build_function_set(spec: &FunctionSetSpec) -> Result<(FunctionSet, Vec<f64>)> {
    let mut set = FunctionSet::new(spec.x0.value, spec.y0.value);
    let mut theta = vec![spec.x0.value, spec.y0.value];

    for fn_spec in &spec.functions {
        let mut func = make_function(&fn_spec.name)
            .ok_or_else(|| Error::UnknownIdentifier(fn_spec.name.clone()))?;
        let values: Vec<f64> = fn_spec.params.iter().map(|p| p.value).collect();
        if values.len() != func.n_params() {
            return Err(Error::Lifecycle(format!(
                "function '{}' expects {} parameters, config supplied {}",
                fn_spec.name,
                func.n_params(),
                values.len()
            )));
        }
        func.setup(&values, spec.x0.value, spec.y0.value);
        func.set_label(fn_spec.label.clone());
        theta.extend_from_slice(&values);
        set.functions.push(func);
    }

    Ok((set, theta))
}

/// Build every function set declared in a parsed model-configuration file,
/// plus the full flat initial parameter vector in declaration order (§3).
pub fn build_function_sets(config: &ModelConfigFile) -> Result<(Vec<FunctionSet>, Vec<f64>)> {
    let mut sets = Vec::with_capacity(config.function_sets.len());
    let mut theta = Vec::with_capacity(config.n_params());
    for spec in &config.function_sets {
        let (set, set_theta) = build_function_set(spec)?;
        sets.push(set);
        theta.extend(set_theta);
    }
    Ok((sets, theta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model_config::{ParamLimit, ParamSpec};
    use crate::config::{FunctionSpec};

    #[test]
    fn builds_a_flat_sky_set_and_matching_theta() {
        let spec = FunctionSetSpec {
            x0: ParamSpec { name: "X0".into(), value: 50.0, limit: ParamLimit::Free },
            y0: ParamSpec { name: "Y0".into(), value: 60.0, limit: ParamLimit::Free },
            functions: vec![FunctionSpec {
                name: "FlatSky".into(),
                label: None,
                params: vec![ParamSpec { name: "I_sky".into(), value: 100.0, limit: ParamLimit::Free }],
            }],
        };
        let (set, theta) = build_function_set(&spec).unwrap();
        assert_eq!(set.functions.len(), 1);
        assert_eq!(theta, vec![50.0, 60.0, 100.0]);
    }

    #[test]
    fn unknown_function_name_is_rejected() {
        let spec = FunctionSetSpec {
            x0: ParamSpec { name: "X0".into(), value: 0.0, limit: ParamLimit::Free },
            y0: ParamSpec { name: "Y0".into(), value: 0.0, limit: ParamLimit::Free },
            functions: vec![FunctionSpec {
                name: "NotAFunction".into(),
                label: None,
                params: vec![],
            }],
        };
        assert!(build_function_set(&spec).is_err());
    }
}
