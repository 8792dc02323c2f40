//! Ready-made observers recording the optimization trajectory.
//!
//! All loggers implement [`Observer`] and are meant to be shared with a
//! method through `Rc<RefCell<_>>`:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use dualopt::loggers::MinimalLogger;
//! use dualopt::methods::Subgradient;
//! use dualopt::nalgebra::{dvector, DVector};
//! use dualopt::{DualMethod, OracleOutput, Problem};
//!
//! # struct Toy;
//! # impl Problem for Toy {
//! #     type Primal = ();
//! #     fn dim(&self) -> usize { 1 }
//! #     fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<()> {
//! #         OracleOutput {
//! #             primal: (),
//! #             value: -(lambda[0] - 1.0).powi(2),
//! #             subgradient: dvector![-2.0 * (lambda[0] - 1.0)],
//! #         }
//! #     }
//! #     fn project(&self, _lambda: &mut DVector<f64>) {}
//! # }
//! let f = Toy;
//! let mut method = Subgradient::new(&f);
//! let logger = Rc::new(RefCell::new(MinimalLogger::new()));
//! method.register(logger.clone());
//!
//! for _ in 0..5 {
//!     method.step().unwrap();
//! }
//!
//! assert_eq!(logger.borrow().values().len(), 5);
//! ```

use std::time::{Duration, Instant};

use nalgebra::DVector;

use crate::core::{IterationState, Observer};

/// Records dual values and oracle-call counts only. Suitable for large
/// problems where copying iterates every iteration is too costly.
#[derive(Debug, Default)]
pub struct MinimalLogger {
    values: Vec<f64>,
    oracle_calls: Vec<usize>,
}

impl MinimalLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded dual values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Recorded oracle-call counts.
    pub fn oracle_calls(&self) -> &[usize] {
        &self.oracle_calls
    }
}

impl<P> Observer<P> for MinimalLogger {
    fn on_update(&mut self, state: &IterationState<'_, P>) {
        self.values.push(state.value);
        self.oracle_calls.push(state.oracle_calls);
    }
}

/// Records the full trajectory: multipliers, dual values and primal
/// solutions.
#[derive(Debug)]
pub struct GenericLogger<P> {
    lambdas: Vec<DVector<f64>>,
    values: Vec<f64>,
    primals: Vec<Option<P>>,
}

impl<P> Default for GenericLogger<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> GenericLogger<P> {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self {
            lambdas: Vec::new(),
            values: Vec::new(),
            primals: Vec::new(),
        }
    }

    /// Recorded multiplier iterates.
    pub fn lambdas(&self) -> &[DVector<f64>] {
        &self.lambdas
    }

    /// Recorded dual values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Recorded primal solutions.
    pub fn primals(&self) -> &[Option<P>] {
        &self.primals
    }
}

impl<P: Clone> Observer<P> for GenericLogger<P> {
    fn on_update(&mut self, state: &IterationState<'_, P>) {
        self.lambdas.push(state.lambda.clone());
        self.values.push(state.value);
        self.primals.push(state.primal.cloned());
    }
}

/// Like [`GenericLogger`], additionally recording elapsed wall-clock time
/// and oracle-call counts per notification.
#[derive(Debug)]
pub struct EnhancedLogger<P> {
    start: Option<Instant>,
    lambdas: Vec<DVector<f64>>,
    values: Vec<f64>,
    primals: Vec<Option<P>>,
    elapsed: Vec<Duration>,
    oracle_calls: Vec<usize>,
}

impl<P> Default for EnhancedLogger<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EnhancedLogger<P> {
    /// Creates an empty logger. The clock starts at the first notification.
    pub fn new() -> Self {
        Self {
            start: None,
            lambdas: Vec::new(),
            values: Vec::new(),
            primals: Vec::new(),
            elapsed: Vec::new(),
            oracle_calls: Vec::new(),
        }
    }

    /// Recorded multiplier iterates.
    pub fn lambdas(&self) -> &[DVector<f64>] {
        &self.lambdas
    }

    /// Recorded dual values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Recorded primal solutions.
    pub fn primals(&self) -> &[Option<P>] {
        &self.primals
    }

    /// Wall-clock time elapsed since the first notification, per
    /// notification.
    pub fn elapsed(&self) -> &[Duration] {
        &self.elapsed
    }

    /// Recorded oracle-call counts.
    pub fn oracle_calls(&self) -> &[usize] {
        &self.oracle_calls
    }
}

impl<P: Clone> Observer<P> for EnhancedLogger<P> {
    fn on_update(&mut self, state: &IterationState<'_, P>) {
        let start = *self.start.get_or_insert_with(Instant::now);
        self.elapsed.push(start.elapsed());
        self.lambdas.push(state.lambda.clone());
        self.values.push(state.value);
        self.primals.push(state.primal.cloned());
        self.oracle_calls.push(state.oracle_calls);
    }
}

/// Logger for the universal gradient methods, additionally capturing the
/// adaptive Lipschitz estimate and the averaged iterate pair when the
/// method publishes them.
#[derive(Debug)]
pub struct AdaptiveLogger<P> {
    lambdas: Vec<DVector<f64>>,
    values: Vec<f64>,
    primals: Vec<Option<P>>,
    lipschitz: Vec<f64>,
    averaged_lambdas: Vec<DVector<f64>>,
    averaged_values: Vec<f64>,
}

impl<P> Default for AdaptiveLogger<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> AdaptiveLogger<P> {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self {
            lambdas: Vec::new(),
            values: Vec::new(),
            primals: Vec::new(),
            lipschitz: Vec::new(),
            averaged_lambdas: Vec::new(),
            averaged_values: Vec::new(),
        }
    }

    /// Recorded multiplier iterates.
    pub fn lambdas(&self) -> &[DVector<f64>] {
        &self.lambdas
    }

    /// Recorded dual values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Recorded primal solutions.
    pub fn primals(&self) -> &[Option<P>] {
        &self.primals
    }

    /// Recorded Lipschitz estimates. Empty unless the method publishes
    /// them.
    pub fn lipschitz(&self) -> &[f64] {
        &self.lipschitz
    }

    /// Recorded averaged iterates. Empty unless the method publishes them.
    pub fn averaged_lambdas(&self) -> &[DVector<f64>] {
        &self.averaged_lambdas
    }

    /// Recorded averaged dual values. Empty unless the method publishes
    /// them.
    pub fn averaged_values(&self) -> &[f64] {
        &self.averaged_values
    }
}

impl<P: Clone> Observer<P> for AdaptiveLogger<P> {
    fn on_update(&mut self, state: &IterationState<'_, P>) {
        self.lambdas.push(state.lambda.clone());
        self.values.push(state.value);
        self.primals.push(state.primal.cloned());
        if let Some(lipschitz) = state.lipschitz {
            self.lipschitz.push(lipschitz);
        }
        if let (Some(lambda), Some(value)) = (state.averaged_lambda, state.averaged_value) {
            self.averaged_lambdas.push(lambda.clone());
            self.averaged_values.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::core::DualMethod;
    use crate::methods::{Subgradient, UniversalPGM};
    use crate::testing::{run, TwoInequalityExample};

    #[test]
    fn enhanced_logger_counts_and_time() {
        let f = TwoInequalityExample;
        let mut method = Subgradient::new(&f);
        let logger = Rc::new(RefCell::new(EnhancedLogger::new()));
        method.register(logger.clone());

        run(&mut method, 10).unwrap();

        let log = logger.borrow();
        assert_eq!(log.values().len(), 10);
        assert_eq!(log.oracle_calls().last(), Some(&10));
        assert!(log
            .elapsed()
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn adaptive_logger_captures_universal_state() {
        let f = TwoInequalityExample;
        let mut method = UniversalPGM::new(&f);
        let logger = Rc::new(RefCell::new(AdaptiveLogger::new()));
        method.register(logger.clone());

        run(&mut method, 5).unwrap();

        let log = logger.borrow();
        // One extra notification from the first-iteration initialization.
        assert_eq!(log.values().len(), 6);
        assert_eq!(log.lipschitz().len(), 6);
        assert_eq!(log.averaged_lambdas().len(), 6);
        assert!(log.lipschitz().iter().all(|estimate| *estimate > 0.0));
    }

    #[test]
    fn observer_removal_stops_recording() {
        let f = TwoInequalityExample;
        let mut method = Subgradient::new(&f);

        let kept = Rc::new(RefCell::new(MinimalLogger::new()));
        let removed = Rc::new(RefCell::new(MinimalLogger::new()));
        method.register(kept.clone());
        method.register(removed.clone());

        run(&mut method, 3).unwrap();
        let removed_dyn: Rc<RefCell<dyn crate::core::Observer<_>>> = removed.clone();
        method.remove(&removed_dyn);
        run(&mut method, 3).unwrap();

        assert_eq!(kept.borrow().values().len(), 6);
        assert_eq!(removed.borrow().values().len(), 3);
    }
}
