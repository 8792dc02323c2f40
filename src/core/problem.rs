use nalgebra::DVector;

/// The result of a single dual-function evaluation.
///
/// Besides the dual value and a subgradient, the oracle reports the inner
/// (primal) solution that attains the value. The primal type is opaque to the
/// methods; it is only carried along so that observers can record it.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOutput<P> {
    /// Inner solution attaining the dual value at the queried point.
    pub primal: P,
    /// Dual function value. May be [`f64::NEG_INFINITY`] when the dual
    /// function is not defined at the queried point.
    pub value: f64,
    /// A subgradient of the dual function at the queried point.
    pub subgradient: DVector<f64>,
}

/// The dual problem: a first-order oracle for a non-smooth concave function
/// together with a projection onto the feasible multiplier set.
///
/// The dual function typically arises from a Lagrangian relaxation
///
/// ```text
/// d(λ) = min_x L(x, λ),
/// ```
///
/// which is concave in λ regardless of the structure of the inner problem.
/// Evaluating `d` at a point amounts to solving the inner problem, which also
/// yields a subgradient for free.
///
/// # Examples
///
/// ```rust
/// use dualopt::nalgebra as na;
/// use dualopt::{OracleOutput, Problem};
/// use na::{dvector, DVector};
///
/// // d(λ) = -(λ - 1)^2, maximized over λ >= 0.
/// struct Parabola;
///
/// impl Problem for Parabola {
///     type Primal = ();
///
///     fn dim(&self) -> usize {
///         1
///     }
///
///     fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<()> {
///         OracleOutput {
///             primal: (),
///             value: -(lambda[0] - 1.0).powi(2),
///             subgradient: dvector![-2.0 * (lambda[0] - 1.0)],
///         }
///     }
///
///     fn project(&self, lambda: &mut DVector<f64>) {
///         lambda[0] = lambda[0].max(0.0);
///     }
/// }
/// ```
pub trait Problem {
    /// Type of the inner solution reported by the oracle.
    type Primal: Clone;

    /// Dimension of the multiplier vector (number of relaxed constraints).
    fn dim(&self) -> usize;

    /// Evaluates the dual function at `lambda`, returning the value, a
    /// subgradient and the attaining inner solution.
    fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<Self::Primal>;

    /// Projects `lambda` onto the feasible multiplier set, in place.
    ///
    /// Must be idempotent: projecting an already feasible point leaves it
    /// unchanged.
    fn project(&self, lambda: &mut DVector<f64>);
}

impl<F: Problem> Problem for &F {
    type Primal = F::Primal;

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<Self::Primal> {
        (**self).oracle(lambda)
    }

    fn project(&self, lambda: &mut DVector<f64>) {
        (**self).project(lambda)
    }
}

/// Returns the projection of the zero vector, the default starting point of
/// every method.
pub(crate) fn projected_origin<F: Problem>(f: &F) -> DVector<f64> {
    let mut lambda = DVector::zeros(f.dim());
    f.project(&mut lambda);
    lambda
}
