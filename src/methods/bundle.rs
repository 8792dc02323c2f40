//! Cutting-plane and bundle methods.
//!
//! Model-based methods: every oracle call yields a linear overestimate of
//! the dual function, and the collected cuts form a piecewise-linear outer
//! model whose maximum is tractable. Cutting planes maximizes the bare model
//! over a search box; the bundle method adds a proximal term around a
//! stability center, updated on serious steps.
//!
//! Unlike the subgradient-type methods, these can detect optimality: once
//! the gap between the model and the oracle drops below ε, the iterate is
//! frozen and later steps only bump the iteration counter.
//!
//! # References
//!
//! \[1\] [Lecture Notes for IAP 2005 Course Introduction to Bundle
//! Methods](https://faculty.fuqua.duke.edu/~abn5/LecturesIntroBundle.pdf)
//! (A. Belloni)

use std::cell::RefCell;
use std::rc::Rc;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::DVector;

use crate::core::{
    projected_origin, DualMethod, Error, IterationState, Observer, Observers, Problem,
};
use crate::subproblem::{CutModel, DualDomain};

/// Default optimality gap tolerance ε.
pub const DEFAULT_EPSILON: f64 = 0.01;

/// Default proximal weight μ of the bundle method.
pub const DEFAULT_MU: f64 = 0.5;

/// Search box half-width of the cutting-planes LP.
const SEARCH_BOX: f64 = 10.0;

/// Fraction of ε the dual value must improve by for a serious step.
const SERIOUS_STEP_RATIO: f64 = 0.5;

/// Options of the cutting-planes method.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct CuttingPlanesOptions {
    /// Optimality gap tolerance ε. Default: `0.01`.
    epsilon: f64,
}

impl Default for CuttingPlanesOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Cutting-planes method (Algorithm (CP) in \[1\], p. 19).
pub struct CuttingPlanes<'a, F: Problem> {
    f: &'a F,
    options: CuttingPlanesOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    model: CutModel,
    model_value: f64,
    found: bool,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> CuttingPlanes<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, CuttingPlanesOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: CuttingPlanesOptions) -> Self {
        Self {
            f,
            options,
            lambda: projected_origin(f),
            value: 0.0,
            primal: None,
            model: CutModel::with_box(f.dim(), -SEARCH_BOX, SEARCH_BOX),
            model_value: f64::NEG_INFINITY,
            found: false,
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

    /// Declares the shape of the feasible multiplier set to the model
    /// subproblem. Must be called before the first step.
    pub fn set_dual_domain(&mut self, domain: DualDomain) -> Result<(), Error> {
        if self.iteration != 1 {
            return Err(Error::DomainConfiguredLate);
        }
        self.model.set_domain(&domain);
        Ok(())
    }

    /// Whether the optimality gap has dropped below ε and the iterate is
    /// frozen.
    pub fn optimizer_found(&self) -> bool {
        self.found
    }

    /// Number of cuts collected so far.
    pub fn bundle_size(&self) -> usize {
        self.model.cuts()
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for CuttingPlanes<'a, F> {
    fn name(&self) -> &'static str {
        "CP"
    }

    fn description(&self) -> String {
        format!("Cutting Planes, epsilon = {}", self.options.epsilon())
    }

    fn step(&mut self) -> Result<(), Error> {
        if !self.found {
            let output = self.f.oracle(&self.lambda);
            self.oracle_calls += 1;
            self.value = output.value;
            self.primal = Some(output.primal);

            let gap = -self.value - self.model_value;

            if gap < self.options.epsilon() {
                debug!(
                    "iteration {}: gap {} below tolerance, freezing iterate",
                    self.iteration, gap
                );
                self.found = true;
            } else {
                let slope = -&output.subgradient;
                let intercept = -self.value - slope.dot(&self.lambda);
                self.model.add_cut(slope, intercept);

                let (model_value, lambda) = self.model.solve()?;
                debug!(
                    "iteration {}: gap {}, {} cuts, model value {}",
                    self.iteration,
                    gap,
                    self.model.cuts(),
                    model_value
                );
                self.model_value = model_value;
                self.lambda = lambda;
            }
        }

        self.iteration += 1;
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
    }

    fn register(&mut self, observer: Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.register(observer);
    }

    fn remove(&mut self, observer: &Rc<RefCell<dyn Observer<F::Primal>>>) {
        self.observers.remove(observer);
    }
}

/// Options of the bundle method.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct BundleOptions {
    /// Optimality gap tolerance ε. Default: `0.01`.
    epsilon: f64,
    /// Proximal weight μ. Default: `0.5`.
    mu: f64,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            mu: DEFAULT_MU,
        }
    }
}

/// Proximal bundle method (Algorithm (BA) in \[1\], p. 21).
pub struct Bundle<'a, F: Problem> {
    f: &'a F,
    options: BundleOptions,
    lambda: DVector<f64>,
    value: f64,
    primal: Option<F::Primal>,
    center: DVector<f64>,
    center_value: f64,
    model: CutModel,
    found: bool,
    iteration: usize,
    oracle_calls: usize,
    observers: Observers<F::Primal>,
}

impl<'a, F: Problem> Bundle<'a, F> {
    /// Initializes the method with default options, starting from the
    /// projection of the origin.
    pub fn new(f: &'a F) -> Self {
        Self::with_options(f, BundleOptions::default())
    }

    /// Initializes the method with given options.
    pub fn with_options(f: &'a F, options: BundleOptions) -> Self {
        let lambda = projected_origin(f);

        Self {
            f,
            options,
            center: lambda.clone(),
            lambda,
            value: 0.0,
            primal: None,
            center_value: 0.0,
            model: CutModel::new(f.dim()),
            found: false,
            iteration: 1,
            oracle_calls: 0,
            observers: Observers::new(),
        }
    }

    /// Moves the starting point to the projection of `lambda`. The initial
    /// stability center stays at the projection of the origin.
    pub fn with_initial(mut self, mut lambda: DVector<f64>) -> Self {
        self.f.project(&mut lambda);
        self.lambda = lambda;
        self
    }

    /// Declares the shape of the feasible multiplier set to the model
    /// subproblem. Must be called before the first step.
    pub fn set_dual_domain(&mut self, domain: DualDomain) -> Result<(), Error> {
        if self.iteration != 1 {
            return Err(Error::DomainConfiguredLate);
        }
        self.model.set_domain(&domain);
        Ok(())
    }

    /// Whether the optimality gap has dropped below ε and the iterate is
    /// frozen.
    pub fn optimizer_found(&self) -> bool {
        self.found
    }

    /// Number of cuts collected so far.
    pub fn bundle_size(&self) -> usize {
        self.model.cuts()
    }

    fn add_cut(&mut self, subgradient: &DVector<f64>) {
        let slope = -subgradient;
        let intercept = -self.value - slope.dot(&self.lambda);
        self.model.add_cut(slope, intercept);
    }
}

impl<'a, F: Problem> DualMethod<F::Primal> for Bundle<'a, F> {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn description(&self) -> String {
        format!(
            "Bundle Method, epsilon = {}, mu = {}",
            self.options.epsilon(),
            self.options.mu()
        )
    }

    fn step(&mut self) -> Result<(), Error> {
        if self.iteration == 1 {
            let output = self.f.oracle(&self.lambda);
            self.oracle_calls += 1;
            self.value = output.value;
            self.primal = Some(output.primal);
            self.center_value = self.value;
            self.add_cut(&output.subgradient);
        }

        if !self.found {
            self.model
                .set_proximal(self.options.mu(), self.center.clone());
            let (model_value, lambda) = self.model.solve()?;
            self.lambda = lambda;

            let gap = (-self.value - model_value).abs();

            if gap < self.options.epsilon() {
                debug!(
                    "iteration {}: gap {} below tolerance, freezing iterate",
                    self.iteration, gap
                );
                self.found = true;
            } else {
                let output = self.f.oracle(&self.lambda);
                self.oracle_calls += 1;
                self.value = output.value;
                self.primal = Some(output.primal);
                self.add_cut(&output.subgradient);

                if self.value - self.center_value >= SERIOUS_STEP_RATIO * self.options.epsilon() {
                    debug!(
                        "iteration {}: serious step, center value {} -> {}",
                        self.iteration, self.center_value, self.value
                    );
                    self.center_value = self.value;
                    self.center = self.lambda.clone();
                } else {
                    debug!("iteration {}: null step", self.iteration);
                }
            }
        }

        self.iteration += 1;
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

    use crate::testing::{
        run, ConstrainedDualExample, EqualityInequalityExample, TwoInequalityExample,
    };

    #[test]
    fn cutting_planes_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut method = CuttingPlanes::new(&f);
        method
            .set_dual_domain(DualDomain::NonNegativeOrthant)
            .unwrap();

        run(&mut method, 12).unwrap();

        assert!(method.optimizer_found());
        let lambda = method.lambda();
        assert_abs_diff_eq!(lambda[0], 1.0, epsilon = 0.02);
        assert!(lambda[1] > 0.98 && lambda[1] < 1.52);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.02);
    }

    #[test]
    fn cutting_planes_equality_inequality_example() {
        let f = EqualityInequalityExample;
        let mut method = CuttingPlanes::new(&f);

        run(&mut method, 5).unwrap();

        assert!(method.optimizer_found());
        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 0.0], epsilon = 0.01);
        assert_abs_diff_eq!(method.value(), -1.0, epsilon = 0.02);
    }

    #[test]
    fn cutting_planes_constrained_dual_example() {
        let f = ConstrainedDualExample;
        let mut method =
            CuttingPlanes::new(&f).with_initial(dvector![-2.0, 2.0]);
        method.set_dual_domain(DualDomain::SumTo(0.5)).unwrap();

        run(&mut method, 6).unwrap();

        assert!(method.optimizer_found());
        let lambda = method.lambda();
        assert!(lambda[0] > -0.01 && lambda[0] < 0.51);
        assert_abs_diff_eq!(lambda[0] + lambda[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(method.value(), -1.0, epsilon = 0.01);
    }

    #[test]
    fn cutting_planes_freezes_after_optimum() {
        let f = EqualityInequalityExample;
        let mut method = CuttingPlanes::new(&f);

        run(&mut method, 10).unwrap();

        assert!(method.optimizer_found());
        let frozen_lambda = method.lambda().clone();
        let frozen_size = method.bundle_size();
        let calls = method.oracle_calls();
        let iteration = method.iteration();

        run(&mut method, 3).unwrap();
        assert_eq!(method.lambda(), &frozen_lambda);
        assert_eq!(method.bundle_size(), frozen_size);
        assert_eq!(method.oracle_calls(), calls);
        assert_eq!(method.iteration(), iteration + 3);
    }

    #[test]
    fn bundle_two_inequality_example() {
        let f = TwoInequalityExample;
        let mut method = Bundle::new(&f);
        method
            .set_dual_domain(DualDomain::NonNegativeOrthant)
            .unwrap();

        run(&mut method, 10).unwrap();

        let lambda = method.lambda();
        assert_abs_diff_eq!(lambda[0], 1.0, epsilon = 0.05);
        assert!(lambda[1] > 0.95 && lambda[1] < 1.55);
        assert_abs_diff_eq!(method.value(), -0.5, epsilon = 0.05);
    }

    #[test]
    fn bundle_equality_inequality_example() {
        let f = EqualityInequalityExample;
        let mut method = Bundle::new(&f);

        run(&mut method, 8).unwrap();

        assert_abs_diff_eq!(method.lambda().clone(), dvector![1.0, 0.0], epsilon = 0.05);
        assert_abs_diff_eq!(method.value(), -1.0, epsilon = 0.05);
    }

    #[test]
    fn bundle_constrained_dual_example() {
        let f = ConstrainedDualExample;
        let mut method = Bundle::new(&f).with_initial(dvector![-2.0, 2.0]);
        method.set_dual_domain(DualDomain::SumTo(0.5)).unwrap();

        run(&mut method, 5).unwrap();

        assert!(method.optimizer_found());
        let lambda = method.lambda();
        assert!(lambda[0] > -0.01 && lambda[0] < 0.51);
        assert_abs_diff_eq!(lambda[0] + lambda[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(method.value(), -1.0, epsilon = 0.01);
    }

    #[test]
    fn domain_configured_late() {
        let f = TwoInequalityExample;
        let mut method = CuttingPlanes::new(&f);
        method.step().unwrap();

        assert!(matches!(
            method.set_dual_domain(DualDomain::NonNegativeOrthant),
            Err(Error::DomainConfiguredLate)
        ));

        let mut method = Bundle::new(&f);
        method.step().unwrap();

        assert!(matches!(
            method.set_dual_domain(DualDomain::Free),
            Err(Error::DomainConfiguredLate)
        ));
    }

    #[test]
    fn cut_count_grows_until_found() {
        let f = TwoInequalityExample;
        let mut method = CuttingPlanes::new(&f);
        method
            .set_dual_domain(DualDomain::NonNegativeOrthant)
            .unwrap();

        let mut previous = method.bundle_size();
        for _ in 0..12 {
            method.step().unwrap();
            let size = method.bundle_size();
            if method.optimizer_found() {
                assert_eq!(size, previous);
            } else {
                assert_eq!(size, previous + 1);
            }
            previous = size;
        }
    }
}
