//! The collection of dual maximization methods.

pub mod bundle;
pub mod quasi_monotone;
pub mod subgradient;
pub mod universal;

pub use bundle::{Bundle, CuttingPlanes};
pub use quasi_monotone::{DoubleSimpleAveraging, TripleAveraging};
pub use subgradient::Subgradient;
pub use universal::{UniversalDGM, UniversalFGM, UniversalPGM};
