//! Core model builder and solver boundary.

pub mod error;
pub mod model;
pub mod solver;
pub mod types;

pub use error::ModelError;
pub use model::Model;
pub use solver::{Solution, Solver, SolverConfig, SolverError, SolverStatus};
pub use types::{Bounds, Constraint, Objective, Sense, Variable};
