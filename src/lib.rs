#![warn(missing_docs)]

//! # dualopt
//!
//! A pure Rust framework and implementation of first-order and bundle
//! methods for maximizing non-smooth concave dual functions arising from
//! Lagrangian relaxation.
//!
//! Relaxing the complicating constraints of an optimization problem yields
//! a dual function that is concave but in general non-differentiable, so
//! none of the usual smooth machinery applies. This library provides the
//! standard toolbox for maximizing such functions: all it needs from the
//! user is a first-order oracle (evaluate the dual function and produce a
//! subgradient, which the inner problem yields for free) and a projection
//! onto the feasible multiplier set. All methods implement the same
//! interface which is designed to give full control over the process;
//! in particular, stopping always belongs to the caller.
//!
//! ## Methods
//!
//! * [Subgradient](methods::subgradient) -- The classical method with
//!   diminishing, constant or square-root summable step sizes. Cheap and
//!   robust, slow.
//! * [Quasi-monotone dual averaging](methods::quasi_monotone) -- Averaging
//!   methods with essentially no tuning.
//! * [Universal gradient methods](methods::universal) -- Parameter-free
//!   methods adapting a local Lipschitz estimate on the fly.
//! * [Cutting planes and bundle](methods::bundle) -- Model-based methods
//!   that can detect optimality; each iteration solves a small LP or QP.
//!
//! ## Problem
//!
//! The problem is any type implementing the [`Problem`] trait: the dual
//! dimension, the oracle and the projection.
//!
//! ```rust
//! use dualopt::nalgebra as na;
//! use dualopt::{DualMethod, OracleOutput, Problem};
//! use dualopt::methods::Subgradient;
//! use na::{dvector, DVector};
//!
//! // d(λ) = -(λ - 1)², maximized over λ >= 0.
//! struct Parabola;
//!
//! impl Problem for Parabola {
//!     type Primal = ();
//!
//!     fn dim(&self) -> usize {
//!         1
//!     }
//!
//!     fn oracle(&self, lambda: &DVector<f64>) -> OracleOutput<()> {
//!         OracleOutput {
//!             primal: (),
//!             value: -(lambda[0] - 1.0).powi(2),
//!             subgradient: dvector![-2.0 * (lambda[0] - 1.0)],
//!         }
//!     }
//!
//!     fn project(&self, lambda: &mut DVector<f64>) {
//!         lambda[0] = lambda[0].max(0.0);
//!     }
//! }
//!
//! let f = Parabola;
//! let mut method = Subgradient::new(&f);
//!
//! for _ in 0..10 {
//!     method.step().unwrap();
//! }
//!
//! assert!((method.lambda()[0] - 1.0).abs() < 1e-12);
//! ```
//!
//! Trajectories can be recorded by registering [loggers](loggers) (or any
//! custom [`Observer`]), and the [`Driver`] offers a stop-condition loop
//! when manual stepping is not needed.
//!
//! ## Roadmap
//!
//! Planned features are dynamic bundle management (cut aggregation and
//! dropping) and deflected subgradient directions.
//!
//! ## License
//!
//! Licensed under [MIT](https://opensource.org/licenses/MIT).

mod core;

pub mod driver;
pub mod factory;
pub mod loggers;
pub mod methods;
pub mod subproblem;

pub use crate::core::*;
pub use driver::Driver;
pub use subproblem::DualDomain;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
