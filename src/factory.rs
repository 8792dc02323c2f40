//! Construction of methods from string tags.
//!
//! Useful for sweeping over methods in benchmarking scripts, where the
//! method and its tuning parameter come from configuration rather than
//! code.

use crate::core::{DualMethod, Error, Problem};
use crate::methods::bundle::{Bundle, BundleOptions, CuttingPlanes, CuttingPlanesOptions};
use crate::methods::quasi_monotone::{
    AveragingOptions, DoubleSimpleAveraging, TripleAveraging, TripleAveragingOptions,
    TripleAveragingVariant,
};
use crate::methods::subgradient::{StepSizeRule, Subgradient, SubgradientOptions};
use crate::methods::universal::{UniversalDGM, UniversalFGM, UniversalOptions, UniversalPGM};

/// Tags accepted by [`for_tag`].
pub const AVAILABLE_METHODS: &[&str] = &[
    "SG 1/k",
    "SG const",
    "SG 1/sqrt(k)",
    "UPGM",
    "UDGM",
    "UFGM",
    "DSA",
    "TA 1",
    "TA 2",
    "CP",
    "bundle",
];

/// Constructs the method named by `tag` with the given tuning parameter
/// (the step size, γ or ε of the method; `0.0` selects its documented
/// default). Unknown tags yield [`Error::UnknownMethod`].
pub fn for_tag<'a, F: Problem>(
    f: &'a F,
    tag: &str,
    param: f64,
) -> Result<Box<dyn DualMethod<F::Primal> + 'a>, Error> {
    match tag {
        "SG 1/k" => Ok(Box::new(Subgradient::with_options(
            f,
            subgradient_options(StepSizeRule::Diminishing, param),
        ))),
        "SG const" => Ok(Box::new(Subgradient::with_options(
            f,
            subgradient_options(StepSizeRule::Constant, param),
        ))),
        "SG 1/sqrt(k)" => Ok(Box::new(Subgradient::with_options(
            f,
            subgradient_options(StepSizeRule::InverseSqrt, param),
        ))),
        "UPGM" => Ok(Box::new(UniversalPGM::with_options(
            f,
            universal_options(param),
        ))),
        "UDGM" => Ok(Box::new(UniversalDGM::with_options(
            f,
            universal_options(param),
        ))),
        "UFGM" => Ok(Box::new(UniversalFGM::with_options(
            f,
            universal_options(param),
        ))),
        "DSA" => {
            let mut options = AveragingOptions::default();
            if param != 0.0 {
                options.set_gamma(param);
            }
            Ok(Box::new(DoubleSimpleAveraging::with_options(f, options)))
        }
        "TA 1" => Ok(Box::new(TripleAveraging::with_options(
            f,
            triple_averaging_options(TripleAveragingVariant::V1, param),
        ))),
        "TA 2" => Ok(Box::new(TripleAveraging::with_options(
            f,
            triple_averaging_options(TripleAveragingVariant::V2, param),
        ))),
        "CP" => {
            let mut options = CuttingPlanesOptions::default();
            if param != 0.0 {
                options.set_epsilon(param);
            }
            Ok(Box::new(CuttingPlanes::with_options(f, options)))
        }
        "bundle" => {
            let mut options = BundleOptions::default();
            if param != 0.0 {
                options.set_epsilon(param);
            }
            Ok(Box::new(Bundle::with_options(f, options)))
        }
        other => Err(Error::UnknownMethod(other.to_string())),
    }
}

fn subgradient_options(rule: StepSizeRule, param: f64) -> SubgradientOptions {
    let mut options = SubgradientOptions::default();
    options.set_step_size_rule(rule);
    if param != 0.0 {
        options.set_initial_step_size(param);
    }
    options
}

fn universal_options(param: f64) -> UniversalOptions {
    let mut options = UniversalOptions::default();
    if param != 0.0 {
        options.set_epsilon(param);
    }
    options
}

fn triple_averaging_options(variant: TripleAveragingVariant, param: f64) -> TripleAveragingOptions {
    let mut options = TripleAveragingOptions::default();
    options.set_variant(variant);
    if param != 0.0 {
        options.set_gamma(param);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::TwoInequalityExample;

    #[test]
    fn all_tags_construct_and_step() {
        let f = TwoInequalityExample;

        for tag in AVAILABLE_METHODS {
            let mut method = for_tag(&f, tag, 0.0).unwrap();
            method.step().unwrap();
            assert!(method.oracle_calls() >= 1, "no oracle call for {tag}");
            assert_eq!(method.lambda().len(), 2, "wrong dimension for {tag}");
            assert!(method.value().is_finite(), "no dual value for {tag}");
            assert!(method.iteration() >= 1, "no iteration count for {tag}");
        }
    }

    #[test]
    fn parameter_overrides_default() {
        let f = TwoInequalityExample;

        let method = for_tag(&f, "UPGM", 0.25).unwrap();
        assert_eq!(method.description(), "UPGM, epsilon = 0.25");

        let method = for_tag(&f, "SG const", 1.5).unwrap();
        assert_eq!(method.description(), "SG constant, s0 = 1.5");
    }

    #[test]
    fn unknown_tag() {
        let f = TwoInequalityExample;

        assert!(matches!(
            for_tag(&f, "SG 1/j", 0.0),
            Err(Error::UnknownMethod(_))
        ));
    }
}
