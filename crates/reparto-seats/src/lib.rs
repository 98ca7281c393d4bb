//! Counterfactual D'Hondt seat reallocation as a MILP.
//!
//! The sequential highest-averages process is first replayed exactly
//! ([`Baseline`]), then encoded statically with big-M disjunctions so
//! that vote movement between parties becomes a decision the solver
//! optimizes over. Districts are independent blocks tied together by
//! national aggregates.
//!
//! # Overview
//!
//! - [`ElectionConfig`]: declarative input (districts, settings tree)
//! - [`Baseline`]: exact replay of the observed allocation
//! - [`District`]: per-district variables and constraint blocks
//! - [`NationalModel`]: composed model plus solve entry point
//! - [`Outcome`]: per-unit results read back from a solution

pub mod baseline;
pub mod config;
pub mod district;
pub mod error;
pub mod national;
pub mod outcome;

mod vars;

pub use baseline::Baseline;
pub use config::{
    DistrictData, DistrictSettings, ElectionConfig, GlobalPermeability, GlobalSettings,
    ObjectiveWeights, PartyData, Settings, SettingsRef, Weight,
};
pub use district::District;
pub use error::{BuildError, ConfigError, SolveError};
pub use national::NationalModel;
pub use outcome::{DistrictOutcome, Outcome, UnitOutcome};
