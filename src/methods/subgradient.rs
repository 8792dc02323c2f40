//! Projected subgradient method.
//!
//! The classical workhorse of Lagrangian dual maximization: take a step
//! along a subgradient, project back onto the feasible multiplier set. Cheap
//! per iteration and robust, but the convergence is slow and never monotone.
//!
//! # References
//!
//! \[1\] [Subgradient
//! methods](https://web.stanford.edu/class/ee392o/subgrad_method.pdf) (lecture
//! notes by S. Boyd)

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{
    projected_origin, DualMethod, Error, IterationState, Observer, Observers, Problem,
};

/// Step-size schedule of the subgradient method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepSizeRule {
    /// Diminishing steps `s0 / k`. Guarantees convergence.
    Diminishing,
    /// Constant steps `s0`. Converges only to a neighborhood of the optimum.
    Constant,
    /// Steps `s0 / sqrt(k)`.
    InverseSqrt,
}

impl FromStr for StepSizeRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1/k" => Ok(StepSizeRule::Diminishing),
            "constant" => Ok(StepSizeRule::Constant),
            "1/sqrt(k)" => Ok(StepSizeRule::InverseSqrt),
            other => Err(Error::UnknownStepSizeRule(other.to_string())),
        }
    }
}

/// Options of the subgradient method.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct SubgradientOptions {
    /// Step-size schedule. Default: diminishing (`s0 / k`).
    step_size_rule: StepSizeRule,
    /// Initial step size `s0`. Default: `1.0`.
    initial_step_size: f64,
}

impl Default for SubgradientOptions {
    fn default() -> Self {
        Self {
            step_size_rule: StepSizeRule::Diminishing,
            initial_step_size: 1.0,
        }
    }
}

/// Projected subgradient method.
pub struct Subgradient<'a, F: Problem> {
    f: &'a F,
    options: SubgradientOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> Subgradient<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, SubgradientOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: SubgradientOptions) -> Self {
        Self {
            f,
            options,
            lambda: projected_origin(f),
            value: 0.0,
            primal: None,
            iteration: 1,
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

    /// Mutable access to the options, e.g. for switching the step-size rule
    /// mid-run.
    pub fn options_mut(&mut self) -> &mut SubgradientOptions {
        &mut self.options
    }

    fn step_size(&self) -> f64 {
        let s0 = self.options.initial_step_size();
        let k = self.iteration as f64;

        match self.options.step_size_rule() {
            StepSizeRule::Diminishing => s0 / k,
            StepSizeRule::Constant => s0,
            StepSizeRule::InverseSqrt => s0 / k.sqrt(),
        }
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for Subgradient<'a, F> {
    fn name(&self) -> &'static str {
        "SG"
    }

    fn description(&self) -> String {
        let rule = match self.options.step_size_rule() {
            StepSizeRule::Diminishing => "1/k",
            StepSizeRule::Constant => "constant",
            StepSizeRule::InverseSqrt => "1/sqrt(k)",
        };
        format!(
            "SG {}, s0 = {}",
            rule,
            self.options.initial_step_size()
        )
    }

    fn step(&mut self) -> Result<(), Error> {
        let output = self.f.oracle(&self.lambda);
        self.oracle_calls += 1;
        self.value = output.value;
        self.primal = Some(output.primal);

        self.observers.notify(&self.state());

        let step_size = self.step_size();
        debug!(
            "iteration {}: d = {}, step size = {}",
            self.iteration, self.value, step_size
        );

        self.lambda.axpy(step_size, &output.subgradient, 1.0);
        self.f.project(&mut self.lambda);
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
