//! Bridge from the reparto model builder to the HiGHS solver.
//!
//! The model's column-first (CSC) storage maps onto HiGHS columns with a
//! single pass, so conversion copies each coefficient exactly once.

pub mod ffi;
pub mod solver;
mod status;

pub use ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus, ObjectiveSense};
pub use solver::HighsSolver;
