//! Convenience layer for running methods.
//!
//! Dual maximization has no universally reliable stopping test, so the
//! methods themselves never terminate; the driver packages the loop while
//! leaving the stopping decision to a caller-supplied closure.
//!
//! ```rust
//! use dualopt::nalgebra::{dvector, DVector};
//! use dualopt::methods::Subgradient;
//! use dualopt::{Driver, OracleOutput, Problem};
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
//! #     fn project(&self, lambda: &mut DVector<f64>) {
//! #         lambda[0] = lambda[0].max(0.0);
//! #     }
//! # }
//! let f = Toy;
//! let mut driver = Driver::new(Subgradient::new(&f));
//! let value = driver
//!     .find(|state| state.iteration > 40)
//!     .unwrap();
//!
//! assert!(value.abs() < 0.1);
//! ```

use crate::core::{DualMethod, Error, IterationState};

/// Runs a method until a caller-supplied stopping criterion is met.
pub struct Driver<M> {
    method: M,
}

impl<M> Driver<M> {
    /// Wraps a method.
    pub fn new(method: M) -> Self {
        Self { method }
    }

    /// The wrapped method.
    pub fn method(&self) -> &M {
        &self.method
    }

    /// The wrapped method, mutably.
    pub fn method_mut(&mut self) -> &mut M {
        &mut self.method
    }

    /// Unwraps the method.
    pub fn into_method(self) -> M {
        self.method
    }

    /// Performs one step and returns the iteration counter and the dual
    /// value afterwards.
    pub fn next<P>(&mut self) -> Result<(usize, f64), Error>
    where
        M: DualMethod<P>,
    {
        self.method.step()?;
        let state = self.method.state();
        Ok((state.iteration, state.value))
    }

    /// Steps the method until `stop` returns true for the post-step state,
    /// then returns the dual value at that point.
    pub fn find<P, S>(&mut self, mut stop: S) -> Result<f64, Error>
    where
        M: DualMethod<P>,
        S: FnMut(&IterationState<'_, P>) -> bool,
    {
        loop {
            self.method.step()?;
            let state = self.method.state();
            if stop(&state) {
                return Ok(state.value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    use crate::methods::Subgradient;
    use crate::testing::TwoInequalityExample;

    #[test]
    fn find_with_iteration_limit() {
        let f = TwoInequalityExample;
        let mut driver = Driver::new(Subgradient::new(&f));

        let value = driver.find(|state| state.iteration > 10).unwrap();
        assert_abs_diff_eq!(value, -0.54, epsilon = 0.01);
        assert_eq!(driver.method().iteration(), 11);
    }

    #[test]
    fn next_reports_progress() {
        let f = TwoInequalityExample;
        let mut driver = Driver::new(Subgradient::new(&f));

        let (iteration, _) = driver.next().unwrap();
        assert_eq!(iteration, 2);
        let (iteration, _) = driver.next().unwrap();
        assert_eq!(iteration, 3);
    }
}
