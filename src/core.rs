//! Core abstractions and types for dualopt.
//!
//! *Users* are mainly interested in implementing the [`Problem`] trait and,
//! optionally, the [`Observer`] trait for recording the trajectory.
//!
//! Methods *developers* are interested in implementing the [`DualMethod`]
//! trait and broadcasting [`IterationState`] snapshots through
//! [`Observers`].

mod method;
mod observer;
mod problem;

pub use method::*;
pub use observer::*;
pub use problem::*;
