//! Universal gradient methods.
//!
//! Parameter-free methods that adapt a local Lipschitz estimate on the fly
//! via a doubling search, interpolating between subgradient-type and
//! gradient-type behavior depending on the smoothness the dual function
//! actually exhibits. The accuracy parameter ε trades precision for speed.
//!
//! Three variants are provided: the primal ([`UniversalPGM`]), dual
//! ([`UniversalDGM`]) and fast ([`UniversalFGM`]) gradient method. The
//! Euclidean prox ‖y − x‖² is used throughout.
//!
//! # References
//!
//! \[1\] [Universal Gradient Methods for Convex Optimization
//! Problems](https://doi.org/10.1007/s10107-014-0790-0) (Yu. Nesterov, CORE
//! Discussion Paper, 2013)

use std::cell::RefCell;
use std::rc::Rc;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{
    projected_origin, DualMethod, Error, IterationState, Observer, Observers, Problem,
};

/// Default accuracy parameter ε.
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Default initial Lipschitz estimate L₀.
pub const DEFAULT_INIT_LIPSCHITZ: f64 = 1.1;

/// Options shared by all universal gradient methods.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct UniversalOptions {
    /// Accuracy parameter ε of the inexact oracle model. Default: `1.0`.
    epsilon: f64,
    /// Report the averaged iterate carrying the theoretical guarantees
    /// instead of the raw one. Costs one extra oracle call per iteration.
    /// Default: `false`.
    averaging: bool,
    /// Initial local Lipschitz estimate L₀. Default: `1.1`.
    init_lipschitz: f64,
    /// Cap on the doubling-search exponent per iteration; exceeding it is an
    /// error. `None` leaves the search unbounded. Default: `None`.
    max_doubling: Option<u32>,
}

impl Default for UniversalOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            averaging: false,
            init_lipschitz: DEFAULT_INIT_LIPSCHITZ,
            max_doubling: None,
        }
    }
}

impl UniversalOptions {
    fn check_doubling(&self, exponent: i32) -> Result<(), Error> {
        match self.max_doubling {
            Some(max) if exponent as u32 > max => Err(Error::DoublingSearchExhausted { max }),
            _ => Ok(()),
        }
    }
}

/// Gradient-type step: moves `lambda` along the subgradient with step 1/m
/// and projects back.
fn bregman_map<F: Problem>(
    f: &F,
    m: f64,
    lambda: &DVector<f64>,
    subgradient: &DVector<f64>,
) -> DVector<f64> {
    let mut mapped = lambda + subgradient / m;
    f.project(&mut mapped);
    mapped
}

/// Universal primal gradient method (Algorithm 2.16 in \[1\]).
pub struct UniversalPGM<'a, F: Problem> {
    f: &'a F,
    options: UniversalOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    hat_lambda: DVector<f64>,
    hat_value: f64,
    hat_subgradient: DVector<f64>,
    hat_primal: Option<F::Primal>,
    lipschitz: f64,
    weight_sum: f64,
    averaged_lambda_sum: DVector<f64>,
    averaged_lambda: DVector<f64>,
    averaged_value_sum: f64,
    averaged_value: f64,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> UniversalPGM<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, UniversalOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: UniversalOptions) -> Self {
        let lambda = projected_origin(f);
        let lipschitz = options.init_lipschitz();

        Self {
            f,
            lambda: lambda.clone(),
            value: 0.0,
            primal: None,
            hat_lambda: lambda.clone(),
            hat_value: 0.0,
            hat_subgradient: DVector::zeros(f.dim()),
            hat_primal: None,
            lipschitz,
            weight_sum: 1.0 / lipschitz,
            averaged_lambda_sum: lambda.clone(),
            averaged_lambda: lambda,
            averaged_value_sum: 0.0,
            averaged_value: 0.0,
            iteration: 1,
            oracle_calls: 0,
            observers: Observers::new(),
            options,
        }
    }

    /// Moves the starting point to the projection of `lambda`.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.hat_lambda = lambda.clone();
        self.averaged_lambda_sum = lambda.clone();
        self.averaged_lambda = lambda.clone();
        self.lambda = lambda;
        self
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for UniversalPGM<'a, F> {
    fn name(&self) -> &'static str {
        "UPGM"
    }

    fn description(&self) -> String {
        format!("UPGM, epsilon = {}", self.options.epsilon())
    }

    fn step(&mut self) -> Result<(), Error> {
        // The method assumes the oracle data is known for every iterate
        // including the starting point.
        if self.iteration == 1 {
            let output = self.f.oracle(&self.hat_lambda);
            self.oracle_calls += 1;
            self.hat_value = output.value;
            self.hat_subgradient = output.subgradient;
            self.hat_primal = Some(output.primal);
            self.value = self.hat_value;
            self.primal = self.hat_primal.clone();
            self.observers.notify(&self.state());
        }

        let epsilon = self.options.epsilon();
        let mut i: i32 = 0;

        let (candidate, output) = loop {
            let m = 2f64.powi(i) * self.lipschitz;
            let candidate = bregman_map(self.f, m, &self.hat_lambda, &self.hat_subgradient);
            let output = self.f.oracle(&candidate);
            self.oracle_calls += 1;

            let delta = &candidate - &self.hat_lambda;
            let bound = -self.hat_value - self.hat_subgradient.dot(&delta)
                + 2f64.powi(i - 1) * self.lipschitz * delta.norm_squared()
                + 0.5 * epsilon;

            if -output.value <= bound {
                break (candidate, output);
            }

            i += 1;
            self.options.check_doubling(i)?;
        };

        debug!(
            "iteration {}: accepted exponent {}, L = {}",
            self.iteration, i, self.lipschitz
        );

        self.iteration += 1;
        self.lipschitz *= 2f64.powi(i - 1);

        self.weight_sum += 1.0 / self.lipschitz;
        self.averaged_lambda_sum
            .axpy(1.0 / self.lipschitz, &self.hat_lambda, 1.0);
        self.averaged_lambda = &self.averaged_lambda_sum / self.weight_sum;
        self.averaged_value_sum += self.hat_value / self.lipschitz;
        self.averaged_value = self.averaged_value_sum / self.weight_sum;

        self.hat_lambda = candidate;
        self.hat_value = output.value;
        self.hat_subgradient = output.subgradient;
        self.hat_primal = Some(output.primal);

        if self.options.averaging() {
            // Projection guards against numerical drift of the convex
            // combination.
            let mut lambda = self.averaged_lambda.clone();
            self.f.project(&mut lambda);
            let output = self.f.oracle(&lambda);
            self.oracle_calls += 1;
            self.lambda = lambda;
            self.value = output.value;
            self.primal = Some(output.primal);
        } else {
            self.lambda = self.hat_lambda.clone();
            self.value = self.hat_value;
            self.primal = self.hat_primal.clone();
        }

        self.observers.notify(&self.state());

        Ok(())
    }

    fn state(&self) -> IterationState<'_, F::Primal> {
        IterationState::new(
            &self.lambda,
            self.value,
            self.primal.as_ref(),
            self.iteration,
            self.oracle_calls,
        )
        .with_lipschitz(self.lipschitz)
        .with_averages(&self.averaged_lambda, self.averaged_value)
    }

    fn register(&mut self, observer: Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.register(observer);
    }

    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.remove(observer);
    }
}

/// Universal dual gradient method (Algorithm 3.2 in \[1\]).
pub struct UniversalDGM<'a, F: Problem> {
    f: &'a F,
    options: UniversalOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    hat_lambda: DVector<f64>,
    hat_value: f64,
    hat_subgradient: DVector<f64>,
    hat_primal: Option<F::Primal>,
    phi: DVector<f64>,
    lipschitz: f64,
    weight_sum: f64,
    averaged_lambda_sum: DVector<f64>,
    averaged_lambda: DVector<f64>,
    averaged_value_sum: f64,
    averaged_value: f64,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> UniversalDGM<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, UniversalOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: UniversalOptions) -> Self {
        let lambda = projected_origin(f);
        let lipschitz = options.init_lipschitz();

        Self {
            f,
            lambda: lambda.clone(),
            value: 0.0,
            primal: None,
            hat_lambda: lambda.clone(),
            hat_value: 0.0,
            hat_subgradient: DVector::zeros(f.dim()),
            hat_primal: None,
            phi: lambda.clone(),
            lipschitz,
            weight_sum: 1.0 / lipschitz,
            averaged_lambda_sum: lambda.clone(),
            averaged_lambda: lambda,
            averaged_value_sum: 0.0,
            averaged_value: 0.0,
            iteration: 1,
            oracle_calls: 0,
            observers: Observers::new(),
            options,
        }
    }

    /// Moves the starting point to the projection of `lambda`.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.hat_lambda = lambda.clone();
        self.phi = lambda.clone();
        self.averaged_lambda_sum = lambda.clone();
        self.averaged_lambda = lambda.clone();
        self.lambda = lambda;
        self
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for UniversalDGM<'a, F> {
    fn name(&self) -> &'static str {
        "UDGM"
    }

    fn description(&self) -> String {
        format!("UDGM, epsilon = {}", self.options.epsilon())
    }

    fn step(&mut self) -> Result<(), Error> {
        if self.iteration == 1 {
            let output = self.f.oracle(&self.hat_lambda);
            self.oracle_calls += 1;
            self.hat_value = output.value;
            self.hat_subgradient = output.subgradient;
            self.hat_primal = Some(output.primal);
            self.value = self.hat_value;
            self.primal = self.hat_primal.clone();
            self.observers.notify(&self.state());
        }

        let epsilon = self.options.epsilon();
        let mut i: i32 = 0;

        let (test, test_output, bregman, bregman_output) = loop {
            let m = 2f64.powi(i) * self.lipschitz;

            let mut test = &self.phi + &self.hat_subgradient / m;
            self.f.project(&mut test);
            let test_output = self.f.oracle(&test);
            self.oracle_calls += 1;

            let bregman = bregman_map(self.f, m, &test, &test_output.subgradient);
            let bregman_output = self.f.oracle(&bregman);
            self.oracle_calls += 1;

            let delta = &bregman - &test;
            let bound = -test_output.value - test_output.subgradient.dot(&delta)
                + m / 2.0 * delta.norm_squared()
                + 0.5 * epsilon;

            if -bregman_output.value <= bound {
                break (test, test_output, bregman, bregman_output);
            }

            i += 1;
            self.options.check_doubling(i)?;
        };

        debug!(
            "iteration {}: accepted exponent {}, L = {}",
            self.iteration, i, self.lipschitz
        );

        self.iteration += 1;
        self.lipschitz *= 2f64.powi(i - 1);

        self.weight_sum += 1.0 / self.lipschitz;
        self.averaged_lambda_sum
            .axpy(1.0 / self.lipschitz, &bregman, 1.0);
        self.averaged_lambda = &self.averaged_lambda_sum / self.weight_sum;
        self.averaged_value_sum += bregman_output.value / self.lipschitz;
        self.averaged_value = self.averaged_value_sum / self.weight_sum;

        self.hat_lambda = test;
        // The model point accumulates the previous subgradient, weighted by
        // the updated Lipschitz estimate.
        self.phi
            .axpy(1.0 / (2.0 * self.lipschitz), &self.hat_subgradient, 1.0);
        self.hat_value = test_output.value;
        self.hat_subgradient = test_output.subgradient;
        self.hat_primal = Some(test_output.primal);

        if self.options.averaging() {
            let mut lambda = self.averaged_lambda.clone();
            self.f.project(&mut lambda);
            let output = self.f.oracle(&lambda);
            self.oracle_calls += 1;
            self.lambda = lambda;
            self.value = output.value;
            self.primal = Some(output.primal);
        } else {
            self.lambda = self.hat_lambda.clone();
            self.value = self.hat_value;
            self.primal = self.hat_primal.clone();
        }

        self.observers.notify(&self.state());

        Ok(())
    }

    fn state(&self) -> IterationState<'_, F::Primal> {
        IterationState::new(
            &self.lambda,
            self.value,
            self.primal.as_ref(),
            self.iteration,
            self.oracle_calls,
        )
        .with_lipschitz(self.lipschitz)
        .with_averages(&self.averaged_lambda, self.averaged_value)
    }

    fn register(&mut self, observer: Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.register(observer);
    }

    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.remove(observer);
    }
}

/// Universal fast gradient method (Algorithm 4.1 in \[1\]).
pub struct UniversalFGM<'a, F: Problem> {
    f: &'a F,
    options: UniversalOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    hat_lambda: DVector<f64>,
    hat_value: f64,
    hat_subgradient: DVector<f64>,
    hat_primal: Option<F::Primal>,
    phi: DVector<f64>,
    y: DVector<f64>,
    step_weight_sum: f64,
    lipschitz: f64,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> UniversalFGM<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, UniversalOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: UniversalOptions) -> Self {
        let lambda = projected_origin(f);

        Self {
            f,
            lambda: lambda.clone(),
            value: 0.0,
            primal: None,
            hat_lambda: lambda.clone(),
            hat_value: 0.0,
            hat_subgradient: DVector::zeros(f.dim()),
            hat_primal: None,
            phi: lambda.clone(),
            y: lambda,
            step_weight_sum: 0.0,
            lipschitz: options.init_lipschitz(),
            iteration: 1,
            oracle_calls: 0,
            observers: Observers::new(),
            options,
        }
    }

    /// Moves the starting point to the projection of `lambda`.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.hat_lambda = lambda.clone();
        self.phi = lambda.clone();
        self.y = lambda.clone();
        self.lambda = lambda;
        self
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for UniversalFGM<'a, F> {
    fn name(&self) -> &'static str {
        "UFGM"
    }

    fn description(&self) -> String {
        format!("UFGM, epsilon = {}", self.options.epsilon())
    }

    fn step(&mut self) -> Result<(), Error> {
        let mut v = self.phi.clone();
        self.f.project(&mut v);

        let epsilon = self.options.epsilon();
        let mut i: i32 = 0;

        let (weight, tau, test, test_output, y) = loop {
            let m = 2f64.powi(i + 1) * self.lipschitz;
            let weight =
                (1.0 + (1.0 + self.step_weight_sum * 2f64.powi(i + 2) * self.lipschitz).sqrt()) / m;
            let tau = weight / (self.step_weight_sum + weight);

            let test = tau * &v + (1.0 - tau) * &self.y;
            let test_output = self.f.oracle(&test);
            self.oracle_calls += 1;

            let mut hat = &v + weight * &test_output.subgradient;
            self.f.project(&mut hat);
            let y = tau * hat + (1.0 - tau) * &self.y;
            let y_output = self.f.oracle(&y);
            self.oracle_calls += 1;

            let delta = &y - &test;
            let bound = -test_output.value - test_output.subgradient.dot(&delta)
                + 2f64.powi(i - 1) * self.lipschitz * delta.norm_squared()
                + 0.5 * epsilon * tau;

            if -y_output.value <= bound {
                break (weight, tau, test, test_output, y);
            }

            i += 1;
            self.options.check_doubling(i)?;
        };

        debug!(
            "iteration {}: accepted exponent {}, tau = {}, L = {}",
            self.iteration, i, tau, self.lipschitz
        );

        self.iteration += 1;
        self.hat_lambda = test;
        self.y = y;
        self.step_weight_sum += weight;
        self.lipschitz *= 2f64.powi(i - 1);
        // Accumulates the previous subgradient before it is replaced below.
        self.phi.axpy(weight, &self.hat_subgradient, 1.0);

        self.hat_value = test_output.value;
        self.hat_subgradient = test_output.subgradient;
        self.hat_primal = Some(test_output.primal);

        if self.options.averaging() {
            self.lambda = self.y.clone();
            let output = self.f.oracle(&self.lambda);
            self.oracle_calls += 1;
            self.value = output.value;
            self.primal = Some(output.primal);
        } else {
            self.lambda = self.hat_lambda.clone();
            self.value = self.hat_value;
            self.primal = self.hat_primal.clone();
        }

        self.observers.notify(&self.state());

        Ok(())
    }

    fn state(&self) -> IterationState<'_, F::Primal> {
        IterationState::new(
            &self.lambda,
            self.value,
            self.primal.as_ref(),
            self.iteration,
            self.oracle_calls,
        )
        .with_lipschitz(self.lipschitz)
    }

    fn register(&mut self, observer: Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.register(observer);
    }

    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.remove(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    use crate::testing::{run, EqualityInequalityExample, TwoInequalityExample};

    #[test]
    fn pgm_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.01);
        let mut method = UniversalPGM::with_options(&f, options);

        run(&mut method, 20).unwrap();
        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 1.0], epsilon = 0.1);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
        assert!(method.state().lipschitz.is_some());
    }

    #[test]
    fn pgm_averaging_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.01).set_averaging(true);
        let mut method = UniversalPGM::with_options(&f, options);

        run(&mut method, 50).unwrap();
        // The reported point is the averaged iterate: feasible, with a value
        // between the starting point's and the optimum.
        assert!(method.lambda().iter().all(|v| *v >= 0.0));
        assert!(method.value() <= -0.5 + 1e-9);
        assert!(method.value() > -1.3);
        assert_abs_diff_eq!(
            method.value(),
            f.oracle(method.lambda()).value,
            epsilon = 1e-12
        );
    }

    #[test]
    fn pgm_equality_inequality_example() {
        let f = EqualityInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.01);
        let mut method = UniversalPGM::with_options(&f, options);

        run(&mut method, 40).unwrap();
        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 0.0], epsilon = 0.1);
        assert_abs_diff_eq!(method.value(), -1.0, epsilon = 0.1);
    }

    #[test]
    fn dgm_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.01);
        let mut method = UniversalDGM::with_options(&f, options);

        run(&mut method, 20).unwrap();
        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 1.0], epsilon = 0.1);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn dgm_averaging_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.01).set_averaging(true);
        let mut method = UniversalDGM::with_options(&f, options);

        run(&mut method, 20).unwrap();
        assert!(method.lambda().iter().all(|v| *v >= 0.0));
        assert!(method.value() <= -0.5 + 1e-9);
        assert!(method.value() > -1.3);
        assert_abs_diff_eq!(
            method.value(),
            f.oracle(method.lambda()).value,
            epsilon = 1e-12
        );
    }

    #[test]
    fn fgm_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = UniversalOptions::default();
        options.set_epsilon(0.1);
        let mut method = UniversalFGM::with_options(&f, options);

        run(&mut method, 40).unwrap();
        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 1.0], epsilon = 0.1);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn averaging_costs_one_extra_oracle_call_per_step() {
        let f = TwoInequalityExample;

        let calls = |averaging: bool| {
            let mut options = UniversalOptions::default();
            options.set_epsilon(0.01).set_averaging(averaging);
            let mut method = UniversalPGM::with_options(&f, options);
            run(&mut method, 10).unwrap();
            method.oracle_calls()
        };

        assert_eq!(calls(true), calls(false) + 10);
    }

    #[test]
    fn doubling_cap_exhaustion() {
        // A constant oracle with a huge subgradient keeps failing the
        // acceptance inequality until the estimate grows to ~|g|²/ε.
        struct Steep;

        impl Problem for Steep {
            type Primal = ();

            fn dim(&self) -> usize {
                1
            }

            fn oracle(&self, _lambda: &DVector<f64>) -> crate::core::OracleOutput<()> {
                crate::core::OracleOutput {
                    primal: (),
                    value: 0.0,
                    subgradient: dvector![1000.0],
                }
            }

            fn project(&self, _lambda: &mut DVector<f64>) {}
        }

        let f = Steep;
        let mut options = UniversalOptions::default();
        options.set_max_doubling(Some(3));
        let mut method = UniversalPGM::with_options(&f, options);

        assert!(matches!(
            method.step(),
            Err(Error::DoublingSearchExhausted { max: 3 })
        ));
    }
}
