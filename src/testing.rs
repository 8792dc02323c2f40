//! Analytical dual problems useful for benchmarking, debugging and smoke
//! testing.
//!
//! Each problem is a small linear program with relaxed constraints whose
//! inner problem is solvable by inspection, so the dual function and its
//! optimum are known exactly.

#![allow(unused)]

use nalgebra::{dvector, DVector};

use crate::core::{DualMethod, Error, OracleOutput, Problem};

/// Dual of
///
/// ```text
/// min  -0.5 x1 - x2 + x3
/// s.t. 0.5 x1 + 0.5 x2 + x3 >= 1    (λ1)
///      x1 + x2 <= 1                 (λ2)
///      0 <= x1, x2, x3 <= 1
/// ```
///
/// with both inequalities dualized. The optimum is d* = −0.5 at λ1* = 1,
/// λ2* ∈ \[1, 1.5\] (the optimizer is not unique).
pub struct TwoInequalityExample;

impl TwoInequalityExample {
    /// The optimal dual value.
    pub fn optimal_value(&self) -> f64 {
        -0.5
    }
}

impl Problem for TwoInequalityExample {
    type Primal = DVector<f64>;

    fn dim(&self) -> usize {
        2
    }

    fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<DVector<f64>> {
        // The inner problem minimizes over the unit cube, so each variable
        // is 1 exactly when its objective coefficient is negative.
        let c = dvector![
            -0.5 - 0.5 * lambda[0] + lambda[1],
            -1.0 - 0.5 * lambda[0] + lambda[1],
            1.0 - lambda[0]
        ];
        let x = c.map(|coeff| if coeff < 0.0 { 1.0 } else { 0.0 });

        let subgradient = dvector![
            1.0 - 0.5 * x[0] - 0.5 * x[1] - x[2],
            x[0] + x[1] - 1.0
        ];
        let value = c.dot(&x) + lambda[0] - lambda[1];

        OracleOutput {
            primal: x,
            value,
            subgradient,
        }
    }

    fn project(&self, lambda: &mut DVector<f64>) {
        lambda.apply(|v| *v = v.max(0.0));
    }
}

/// Dual of
///
/// ```text
/// min  -x1 - x2
/// s.t. x1 - x2 + 0.5 = 0    (λ2, free)
///      x1 + x2 <= 1         (λ1)
///      0 <= x1, x2 <= 1
/// ```
///
/// with the equality and the inequality dualized. The optimum is d* = −1 at
/// λ* = (1, 0).
pub struct EqualityInequalityExample;

impl EqualityInequalityExample {
    /// The optimal dual value.
    pub fn optimal_value(&self) -> f64 {
        -1.0
    }
}

impl Problem for EqualityInequalityExample {
    type Primal = DVector<f64>;

    fn dim(&self) -> usize {
        2
    }

    fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<DVector<f64>> {
        let c = dvector![
            -1.0 + lambda[0] + lambda[1],
            -1.0 + lambda[0] - lambda[1]
        ];
        let x = c.map(|coeff| if coeff < 0.0 { 1.0 } else { 0.0 });

        let subgradient = dvector![x[0] + x[1] - 1.0, x[0] - x[1] + 0.5];
        let value = c.dot(&x) - lambda[0] + 0.5 * lambda[1];

        OracleOutput {
            primal: x,
            value,
            subgradient,
        }
    }

    fn project(&self, lambda: &mut DVector<f64>) {
        // The multiplier of the equality is free.
        lambda[0] = lambda[0].max(0.0);
    }
}

/// A problem whose dual function is defined only on the line λ1 + λ2 = 1/2:
/// off the line the oracle reports −∞ with an infinite subgradient. The
/// projection maps onto the line; the optimum is d* = −1, attained on the
/// segment λ1 ∈ \[0, 0.5\].
///
/// Exercises how methods cope with constrained dual sets and undefined
/// oracle points.
pub struct ConstrainedDualExample;

impl ConstrainedDualExample {
    /// The optimal dual value.
    pub fn optimal_value(&self) -> f64 {
        -1.0
    }

    /// Tolerated distance from the feasible line before the oracle reports
    /// an undefined point.
    pub const LINE_TOLERANCE: f64 = 0.01;
}

impl Problem for ConstrainedDualExample {
    type Primal = DVector<f64>;

    fn dim(&self) -> usize {
        2
    }

    fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<DVector<f64>> {
        // Inner variables: x1, x2, y1, y2, y.
        let c = dvector![
            -1.0,
            1.0,
            lambda[0],
            lambda[1],
            0.5 - lambda[0] - lambda[1]
        ];

        let mut x = DVector::zeros(5);
        x[0] = 1.0;
        x[2] = if c[2] < 0.0 { 1.0 } else { 0.0 };
        x[3] = if c[3] < 0.0 { 1.0 } else { 0.0 };
        x[4] = (x[2] + x[3]) / 2.0;

        if c[4].abs() > Self::LINE_TOLERANCE {
            // The inner minimization over the unbounded y diverges.
            return OracleOutput {
                primal: x,
                value: f64::NEG_INFINITY,
                subgradient: dvector![f64::INFINITY, f64::INFINITY],
            };
        }

        let subgradient = dvector![x[2] - x[4], x[3] - x[4]];
        let value = c.dot(&x);

        OracleOutput {
            primal: x,
            value,
            subgradient,
        }
    }

    fn project(&self, lambda: &mut DVector<f64>) {
        let (a, b) = (lambda[0], lambda[1]);
        lambda[0] = (a - b) / 2.0 + 0.25;
        lambda[1] = (b - a) / 2.0 + 0.25;
    }
}

/// Advances a method by the given number of steps.
pub fn run<P, M: DualMethod<P>>(method: &mut M, steps: usize) -> Result<(), Error> {
    for _ in 0..steps {
        method.step()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn two_inequality_oracle_at_optimum() {
        let f = TwoInequalityExample;
        let output = f.oracle(&dvector![1.0, 1.25]);
        assert_abs_diff_eq!(output.value, f.optimal_value(), epsilon = 1e-12);
    }

    #[test]
    fn equality_inequality_oracle_at_optimum() {
        let f = EqualityInequalityExample;
        let output = f.oracle(&dvector![1.0, 0.0]);
        assert_abs_diff_eq!(output.value, f.optimal_value(), epsilon = 1e-12);
    }

    #[test]
    fn constrained_dual_sentinel_off_the_line() {
        let f = ConstrainedDualExample;
        let output = f.oracle(&dvector![1.0, 1.0]);
        assert_eq!(output.value, f64::NEG_INFINITY);

        let mut lambda = dvector![1.0, 1.0];
        f.project(&mut lambda);
        assert_abs_diff_eq!(lambda[0] + lambda[1], 0.5, epsilon = 1e-12);
        assert!(f.oracle(&lambda).value.is_finite());
    }

    #[test]
    fn projections_are_idempotent() {
        let f = ConstrainedDualExample;
        let mut lambda = dvector![-3.0, 7.0];
        f.project(&mut lambda);
        let once = lambda.clone();
        f.project(&mut lambda);
        assert_eq!(lambda, once);
    }
}
