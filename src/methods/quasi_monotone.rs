//! Quasi-monotone subgradient methods based on dual averaging.
//!
//! Unlike the plain subgradient method, these methods average the whole
//! subgradient history, which makes the trajectory of dual values
//! quasi-monotone and removes the need to tune a step size. The only tuning
//! parameter is the aggressiveness γ.
//!
//! # References
//!
//! \[1\] [Quasi-monotone Subgradient Methods for Nonsmooth Convex
//! Minimization](https://link.springer.com/article/10.1007/s10957-014-0677-5)

use std::cell::RefCell;
use std::rc::Rc;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{
    projected_origin, DualMethod, Error, IterationState, Observer, Observers, Problem,
};

/// Default aggressiveness γ.
pub const DEFAULT_GAMMA: f64 = 1.0;

/// Options of the dual averaging methods.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct AveragingOptions {
    /// Aggressiveness γ. Lower values take bolder averaged steps. Default:
    /// `1.0`.
    gamma: f64,
}

impl Default for AveragingOptions {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
        }
    }
}

/// Double simple averaging: the iterate is a running average of projected
/// scaled subgradient sums.
pub struct DoubleSimpleAveraging<'a, F: Problem> {
    f: &'a F,
    options: AveragingOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    subgradient_sum: DVector<f64>,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> DoubleSimpleAveraging<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, AveragingOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: AveragingOptions) -> Self {
        Self {
            f,
            options,
            lambda: projected_origin(f),
            value: 0.0,
            primal: None,
            subgradient_sum: DVector::zeros(f.dim()),
            iteration: 0,
            oracle_calls: 0,
            observers: Observers::new(),
        }
    }

    /// Moves the starting point to the projection of `lambda`.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.lambda = lambda;
        self
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for DoubleSimpleAveraging<'a, F> {
    fn name(&self) -> &'static str {
        "DSA"
    }

    fn description(&self) -> String {
        format!("DSA, gamma = {}", self.options.gamma())
    }

    fn step(&mut self) -> Result<(), Error> {
        let output = self.f.oracle(&self.lambda);
        self.oracle_calls += 1;
        self.value = output.value;
        self.primal = Some(output.primal);

        self.observers.notify(&self.state());

        self.subgradient_sum += &output.subgradient;

        let t = self.iteration as f64;
        let gamma_next = self.options.gamma() * (t + 1.0).sqrt();
        let mut candidate = &self.subgradient_sum / gamma_next;
        self.f.project(&mut candidate);
        debug!("iteration {}: d = {}", self.iteration, self.value);

        self.lambda = (t + 1.0) / (t + 2.0) * &self.lambda + 1.0 / (t + 2.0) * candidate;
        self.iteration += 1;

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
    }

    fn register(&mut self, observer: Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.register(observer);
    }

    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.remove(observer);
    }
}

/// Weight sequence of the triple averaging method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TripleAveragingVariant {
    /// Unit weights, γ_t = γ √(t+1).
    V1,
    /// Linear weights a_t = t+1, γ_t = γ (t+1)^(3/2).
    V2,
}

/// Options of the triple averaging method.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct TripleAveragingOptions {
    /// Weight sequence variant. Default: [`TripleAveragingVariant::V1`].
    variant: TripleAveragingVariant,
    /// Aggressiveness γ. Default: `1.0`.
    gamma: f64,
}

impl Default for TripleAveragingOptions {
    fn default() -> Self {
        Self {
            variant: TripleAveragingVariant::V1,
            gamma: DEFAULT_GAMMA,
        }
    }
}

/// Triple averaging: like [`DoubleSimpleAveraging`], with the projected
/// point additionally blended towards the fixed anchor λ₀.
pub struct TripleAveraging<'a, F: Problem> {
    f: &'a F,
    options: TripleAveragingOptions,
    lambda: DVector<f64>,
    anchor: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    subgradient_sum: DVector<f64>,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> TripleAveraging<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, TripleAveragingOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: TripleAveragingOptions) -> Self {
        let lambda = projected_origin(f);

        Self {
            f,
            options,
            anchor: lambda.clone(),
            lambda,
            value: 0.0,
            primal: None,
            subgradient_sum: DVector::zeros(f.dim()),
            iteration: 0,
            oracle_calls: 0,
            observers: Observers::new(),
        }
    }

    /// Moves the starting point (and the anchor λ₀) to the projection of
    /// `lambda`.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.anchor = lambda.clone();
        self.lambda = lambda;
        self
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for TripleAveraging<'a, F> {
    fn name(&self) -> &'static str {
        "TA"
    }

    fn description(&self) -> String {
        let variant = match self.options.variant() {
            TripleAveragingVariant::V1 => 1,
            TripleAveragingVariant::V2 => 2,
        };
        format!("TA {}, gamma = {}", variant, self.options.gamma())
    }

    fn step(&mut self) -> Result<(), Error> {
        let output = self.f.oracle(&self.lambda);
        self.oracle_calls += 1;
        self.value = output.value;
        self.primal = Some(output.primal);

        self.observers.notify(&self.state());

        let t = self.iteration as f64;
        let gamma = self.options.gamma();

        let (gamma_t, gamma_next, tau) = match self.options.variant() {
            TripleAveragingVariant::V1 => {
                self.subgradient_sum += &output.subgradient;
                (
                    gamma * (t + 1.0).sqrt(),
                    gamma * (t + 2.0).sqrt(),
                    1.0 / (t + 2.0),
                )
            }
            TripleAveragingVariant::V2 => {
                self.subgradient_sum.axpy(t + 1.0, &output.subgradient, 1.0);
                (
                    gamma * (t + 1.0).powf(1.5),
                    gamma * (t + 2.0).powf(1.5),
                    // a_{t+1} / A_{t+1} with a_t = t+1 and A_t the weight sum.
                    (t + 1.0) / ((t + 1.0) * (t + 2.0) / 2.0),
                )
            }
        };

        let mut candidate = &self.subgradient_sum / gamma_t;
        self.f.project(&mut candidate);
        debug!("iteration {}: d = {}", self.iteration, self.value);

        let ratio = gamma_t / gamma_next;
        let blended = ratio * candidate + (1.0 - ratio) * &self.anchor;
        self.lambda = (1.0 - tau) * &self.lambda + tau * blended;
        self.iteration += 1;

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

    use crate::testing::{run, TwoInequalityExample};

    #[test]
    fn double_simple_averaging_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = AveragingOptions::default();
        options.set_gamma(0.5);
        let mut method = DoubleSimpleAveraging::with_options(&f, options);

        run(&mut method, 20).unwrap();

        let lambda = method.lambda();
        assert!(lambda[0] > 0.95 && lambda[0] < 1.05);
        assert!(lambda[1] > 0.95 && lambda[1] < 1.55);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn triple_averaging_v1_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = TripleAveragingOptions::default();
        options.set_gamma(0.5);
        let mut method = TripleAveraging::with_options(&f, options);

        run(&mut method, 20).unwrap();

        let lambda = method.lambda();
        assert!(lambda[0] > 0.95 && lambda[0] < 1.05);
        assert!(lambda[1] > 0.95 && lambda[1] < 1.55);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn triple_averaging_v2_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut options = TripleAveragingOptions::default();
        options.set_variant(TripleAveragingVariant::V2);
        let mut method = TripleAveraging::with_options(&f, options);

        run(&mut method, 60).unwrap();

        let lambda = method.lambda();
        assert!(lambda[0] > 0.95 && lambda[0] < 1.05);
        assert!(lambda[1] > 0.95 && lambda[1] < 1.55);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn deterministic_rerun() {
        let f = TwoInequalityExample;

        let trajectory = |steps: usize| {
            let mut method = DoubleSimpleAveraging::new(&f);
            let mut lambdas = Vec::new();
            for _ in 0..steps {
                method.step().unwrap();
                lambdas.push(method.lambda().clone());
            }
            lambdas
        };

        assert_eq!(trajectory(15), trajectory(15));
    }

    #[test]
    fn counters_start_at_zero() {
        let f = TwoInequalityExample;
        let mut method = DoubleSimpleAveraging::new(&f);

        assert_eq!(method.iteration(), 0);
        run(&mut method, 5).unwrap();
        assert_eq!(method.iteration(), 5);
        assert_eq!(method.oracle_calls(), 5);
    }
}
