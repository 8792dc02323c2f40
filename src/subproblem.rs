//! Piecewise-linear model subproblem of the bundle-type methods.
//!
//! Both [cutting planes](crate::methods::bundle::CuttingPlanes) and the
//! [bundle method](crate::methods::bundle::Bundle) maintain an outer
//! approximation of −d built from linear cuts and minimize it each
//! iteration, as an LP or a proximal QP respectively. The model is solved
//! with the [Clarabel](https://clarabel.org) interior-point solver.

use clarabel::algebra::CscMatrix;
use clarabel::solver::SupportedConeT::{NonnegativeConeT, ZeroConeT};
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus};
use nalgebra::DVector;

use crate::core::Error;

/// Shape of the feasible multiplier set, declared to a bundle-type method
/// before the first step so that the model subproblem searches the right
/// set.
///
/// The shape must agree with [`Problem::project`](crate::Problem::project);
/// the methods have no way to verify that.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum DualDomain {
    /// No constraints on the multipliers.
    Free,
    /// All multipliers non-negative (dualized inequalities).
    NonNegativeOrthant,
    /// Multipliers sum to the given constant.
    SumTo(f64),
    /// Multipliers form `blocks` consecutive blocks of length `block`;
    /// corresponding positions summed across blocks equal zero. Arises from
    /// scenario decomposition of two-stage stochastic programs.
    BlockSumToZero {
        /// Length of one block (first-stage variable count).
        block: usize,
        /// Number of blocks (scenario count).
        blocks: usize,
    },
    /// Each multiplier in the first half plus its counterpart in the second
    /// half equals zero. Arises from pairwise decompositions of Markov
    /// random fields.
    SymmetricPairsToZero,
}

/// Sparse linear row over the multiplier variables.
type Row = Vec<(usize, f64)>;

/// Incremental model over the variables (λ, r): linear cuts r ≥ ⟨a, λ⟩ + b,
/// domain rows on λ and an optional proximal term. Cuts are never removed.
pub struct CutModel {
    dim: usize,
    cuts: Vec<(DVector<f64>, f64)>,
    eq_rows: Vec<(Row, f64)>,
    ineq_rows: Vec<(Row, f64)>,
    proximal: Option<(f64, DVector<f64>)>,
}

impl CutModel {
    /// Creates an empty model over `dim` multipliers.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            cuts: Vec::new(),
            eq_rows: Vec::new(),
            ineq_rows: Vec::new(),
            proximal: None,
        }
    }

    /// Creates an empty model with a box `lo <= λ_i <= hi` on every
    /// multiplier.
    pub fn with_box(dim: usize, lo: f64, hi: f64) -> Self {
        let mut model = Self::new(dim);
        for j in 0..dim {
            model.ineq_rows.push((vec![(j, 1.0)], hi));
            model.ineq_rows.push((vec![(j, -1.0)], -lo));
        }
        model
    }

    /// Adds the linear rows describing the feasible multiplier set.
    pub fn set_domain(&mut self, domain: &DualDomain) {
        match *domain {
            DualDomain::Free => {}
            DualDomain::NonNegativeOrthant => {
                for j in 0..self.dim {
                    self.ineq_rows.push((vec![(j, -1.0)], 0.0));
                }
            }
            DualDomain::SumTo(total) => {
                let row = (0..self.dim).map(|j| (j, 1.0)).collect();
                self.eq_rows.push((row, total));
            }
            DualDomain::BlockSumToZero { block, blocks } => {
                for i in 0..block {
                    let row = (0..blocks).map(|s| (i + s * block, 1.0)).collect();
                    self.eq_rows.push((row, 0.0));
                }
            }
            DualDomain::SymmetricPairsToZero => {
                let half = self.dim / 2;
                for i in 0..half {
                    self.eq_rows.push((vec![(i, 1.0), (i + half, 1.0)], 0.0));
                }
            }
        }
    }

    /// Appends the cut r ≥ ⟨slope, λ⟩ + intercept.
    pub fn add_cut(&mut self, slope: DVector<f64>, intercept: f64) {
        self.cuts.push((slope, intercept));
    }

    /// Number of cuts in the model.
    pub fn cuts(&self) -> usize {
        self.cuts.len()
    }

    /// Sets the proximal term (μ/2)‖λ − center‖² added to the objective,
    /// replacing any previous one.
    pub fn set_proximal(&mut self, mu: f64, center: DVector<f64>) {
        self.proximal = Some((mu, center));
    }

    /// Minimizes the model, returning its optimal value (including the
    /// proximal term, if set) and the minimizing multipliers.
    pub fn solve(&self) -> Result<(f64, DVector<f64>), Error> {
        // Variable order: λ_0, ..., λ_{dim-1}, r. Equality rows come first
        // (zero cone), then inequalities and cuts (non-negative cone), all
        // in the form row · (λ, r) <= rhs.
        let ncols = self.dim + 1;
        let mut rows: Vec<Row> = Vec::new();
        let mut rhs: Vec<f64> = Vec::new();

        for (row, total) in &self.eq_rows {
            rows.push(row.clone());
            rhs.push(*total);
        }
        let eq_count = rows.len();

        for (row, bound) in &self.ineq_rows {
            rows.push(row.clone());
            rhs.push(*bound);
        }
        for (slope, intercept) in &self.cuts {
            let mut row: Row = slope
                .iter()
                .enumerate()
                .filter(|(_, coeff)| **coeff != 0.0)
                .map(|(j, coeff)| (j, *coeff))
                .collect();
            row.push((self.dim, -1.0));
            rows.push(row);
            rhs.push(-intercept);
        }

        let a = csc_from_rows(rows.len(), ncols, &rows);

        let mut q = vec![0.0; ncols];
        q[self.dim] = 1.0;
        let p = match &self.proximal {
            Some((mu, center)) => {
                for (j, c) in center.iter().enumerate() {
                    q[j] = -mu * c;
                }
                diagonal(ncols, self.dim, *mu)
            }
            None => CscMatrix::zeros((ncols, ncols)),
        };

        let mut cones = Vec::new();
        if eq_count > 0 {
            cones.push(ZeroConeT(eq_count));
        }
        if rows.len() > eq_count {
            cones.push(NonnegativeConeT(rows.len() - eq_count));
        }

        let mut settings = DefaultSettings::default();
        settings.verbose = false;

        let mut solver = DefaultSolver::new(&p, &q, &a, &rhs, &cones, settings);
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            status => return Err(Error::Subproblem(format!("{status:?}"))),
        }

        let solution = &solver.solution.x;
        let optimizer = DVector::from_iterator(self.dim, solution[..self.dim].iter().copied());

        // The model value is recomputed from the optimizer so that dropped
        // constant terms of the proximal objective do not skew it.
        let mut value = solution[self.dim];
        if let Some((mu, center)) = &self.proximal {
            value += mu / 2.0 * (&optimizer - center).norm_squared();
        }

        Ok((value, optimizer))
    }
}

fn csc_from_rows(nrows: usize, ncols: usize, rows: &[Row]) -> CscMatrix<f64> {
    let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); ncols];
    for (i, row) in rows.iter().enumerate() {
        for &(j, coeff) in row {
            columns[j].push((i, coeff));
        }
    }

    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for column in &mut columns {
        column.sort_unstable_by_key(|&(i, _)| i);
        for &(i, coeff) in column.iter() {
            rowval.push(i);
            nzval.push(coeff);
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Diagonal matrix with `value` on the first `dim` entries, zero elsewhere.
fn diagonal(ncols: usize, dim: usize, value: f64) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for j in 0..ncols {
        if j < dim {
            rowval.push(j);
            nzval.push(value);
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(ncols, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    #[test]
    fn linear_model() {
        let mut model = CutModel::with_box(1, -10.0, 10.0);
        model.add_cut(dvector![1.0], 0.0);
        model.add_cut(dvector![-1.0], 2.0);

        let (value, optimizer) = model.solve().unwrap();
        assert_abs_diff_eq!(value, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(optimizer[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn proximal_model() {
        let mut model = CutModel::new(1);
        model.add_cut(dvector![1.0], 0.0);
        model.set_proximal(2.0, dvector![3.0]);

        // min λ + (λ - 3)² over r >= λ has the optimum at λ = 2.5.
        let (value, optimizer) = model.solve().unwrap();
        assert_abs_diff_eq!(optimizer[0], 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(value, 2.75, epsilon = 1e-6);
    }

    #[test]
    fn equality_domain() {
        let mut model = CutModel::with_box(2, -10.0, 10.0);
        model.set_domain(&DualDomain::SumTo(1.0));
        model.add_cut(dvector![1.0, 0.0], 0.0);

        // The box caps λ_1 at 10, so λ_0 cannot go below -9.
        let (value, optimizer) = model.solve().unwrap();
        assert_abs_diff_eq!(value, -9.0, epsilon = 1e-5);
        assert_abs_diff_eq!(optimizer[0], -9.0, epsilon = 1e-5);
        assert_abs_diff_eq!(optimizer[1], 10.0, epsilon = 1e-5);
    }

    #[test]
    fn symmetric_pairs_domain() {
        let mut model = CutModel::with_box(2, -10.0, 10.0);
        model.set_domain(&DualDomain::SymmetricPairsToZero);
        model.add_cut(dvector![1.0, 0.0], 0.0);

        let (_, optimizer) = model.solve().unwrap();
        assert_abs_diff_eq!(optimizer[0] + optimizer[1], 0.0, epsilon = 1e-6);
    }
}
