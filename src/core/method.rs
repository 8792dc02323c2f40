use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use thiserror::Error;

use super::observer::Observer;

/// Error while constructing or advancing a dual method.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The factory was given a tag that does not name any method.
    #[error("unknown method tag `{0}`")]
    UnknownMethod(String),
    /// A step-size rule string did not name any supported rule.
    #[error("unknown step size rule `{0}`")]
    UnknownStepSizeRule(String),
    /// The doubling search of a universal gradient method did not find an
    /// acceptable Lipschitz estimate within the configured number of
    /// exponents.
    #[error("doubling search exhausted after {max} exponents")]
    DoublingSearchExhausted {
        /// The configured cap on doubling exponents.
        max: u32,
    },
    /// The cutting-plane subproblem solver terminated without an optimal
    /// solution.
    #[error("subproblem solver terminated with status {0}")]
    Subproblem(String),
    /// The dual domain of a bundle-type method was configured after the
    /// first step had already been taken.
    #[error("dual domain must be configured before the first step")]
    DomainConfiguredLate,
}

/// A snapshot of the public state of a method, broadcast to observers once
/// per completed iteration.
#[derive(Debug)]
pub struct IterationState<'a, P> {
    /// Current multiplier iterate. Always a projection output.
    pub lambda: &'a DVector<f64>,
    /// Dual value at the iterate known to the method.
    pub value: f64,
    /// Inner solution from the most recent oracle call, if any was made yet.
    pub primal: Option<&'a P>,
    /// Iteration counter.
    pub iteration: usize,
    /// Total number of oracle calls made so far. Exact: incremented
    /// immediately after every oracle invocation.
    pub oracle_calls: usize,
    /// Current local Lipschitz estimate. Published by the universal gradient
    /// methods only.
    pub lipschitz: Option<f64>,
    /// Weighted-average iterate λ̃. Published by UPGM and UDGM only.
    pub averaged_lambda: Option<&'a DVector<f64>>,
    /// Weighted-average dual value d̃. Published by UPGM and UDGM only.
    pub averaged_value: Option<f64>,
}

impl<'a, P> IterationState<'a, P> {
    pub(crate) fn new(
        lambda: &'a DVector<f64>,
        value: f64,
        primal: Option<&'a P>,
        iteration: usize,
        oracle_calls: usize,
    ) -> Self {
        Self {
            lambda,
            value,
            primal,
            iteration,
            oracle_calls,
            lipschitz: None,
            averaged_lambda: None,
            averaged_value: None,
        }
    }

    pub(crate) fn with_lipschitz(mut self, lipschitz: f64) -> Self {
        self.lipschitz = Some(lipschitz);
        self
    }

    pub(crate) fn with_averages(mut self, lambda: &'a DVector<f64>, value: f64) -> Self {
        self.averaged_lambda = Some(lambda);
        self.averaged_value = Some(value);
        self
    }
}

/// Common interface of all dual maximization methods.
///
/// A method owns its iterate and advances it one iteration per [`step`]
/// call. Termination is deliberately left to the caller: non-smooth concave
/// maximization has no universally reliable stopping test, so the caller
/// decides when the trajectory is good enough (see
/// [`Driver`](crate::driver::Driver) for a convenience loop).
///
/// The trait is object safe so that methods can be constructed behind
/// `Box<dyn DualMethod<_>>` by the [factory](crate::factory).
///
/// [`step`]: DualMethod::step
pub trait DualMethod<P> {
    /// Short identifier of the method (matches its factory tag).
    fn name(&self) -> &'static str;

    /// Human-readable description including the tuning parameters.
    fn description(&self) -> String;

    /// Advances the iterate by one iteration.
    fn step(&mut self) -> Result<(), Error>;

    /// Returns a snapshot of the current public state.
    fn state(&self) -> IterationState<'_, P>;

    /// Registers an observer to be notified after every completed step.
    fn register(&mut self, observer: Rc<RefCell<dyn Observer<P>>>);

    /// Removes a previously registered observer (by pointer identity).
    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<P>>>);

    /// Current multiplier iterate.
    fn lambda<'a>(&'a self) -> &'a DVector<f64>
    where
        P: 'a,
    {
        self.state().lambda
    }

    /// Dual value at the current iterate.
    fn value<'a>(&'a self) -> f64
    where
        P: 'a,
    {
        self.state().value
    }

    /// Iteration counter.
    fn iteration<'a>(&'a self) -> usize
    where
        P: 'a,
    {
        self.state().iteration
    }

    /// Total number of oracle calls made so far.
    fn oracle_calls<'a>(&'a self) -> usize
    where
        P: 'a,
    {
        self.state().oracle_calls
    }
}
