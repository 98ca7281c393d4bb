//! Solver abstraction: the [`Solver`] trait plus the status, solution,
//! and configuration types shared by all backends.

use crate::model::Model;

/// Termination status reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Time limit reached before optimality.
    TimeLimit,
    /// Iteration limit reached before optimality.
    IterationLimit,
    /// Status could not be determined.
    Unknown,
}

impl SolverStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }

    /// Whether a (possibly suboptimal) feasible point may be available.
    pub fn is_feasible(&self) -> bool {
        matches!(
            self,
            SolverStatus::Optimal | SolverStatus::TimeLimit | SolverStatus::IterationLimit
        )
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolverStatus::Infeasible)
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, SolverStatus::Unbounded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::TimeLimit => "time_limit",
            SolverStatus::IterationLimit => "iteration_limit",
            SolverStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while solving a model.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The model has no variables.
    EmptyModel,
    /// The model has no objective.
    NoObjective,
    /// The model referenced a variable the backend does not know.
    InvalidVariableId(u32),
    /// The backend is not usable in this build.
    SolverNotAvailable(String),
    /// The solve terminated without a usable solution.
    SolveFailure { status: SolverStatus },
    /// Backend-specific failure.
    SolverSpecific(String),
}

impl SolverError {
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::EmptyModel => "SOLVER_EMPTY_MODEL",
            SolverError::NoObjective => "SOLVER_NO_OBJECTIVE",
            SolverError::InvalidVariableId(_) => "SOLVER_INVALID_VARIABLE",
            SolverError::SolverNotAvailable(_) => "SOLVER_NOT_AVAILABLE",
            SolverError::SolveFailure { .. } => "SOLVER_SOLVE_FAILURE",
            SolverError::SolverSpecific(_) => "SOLVER_BACKEND_ERROR",
        }
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::EmptyModel => {
                write!(f, "[{}] Model has no variables to solve", self.code())
            }
            SolverError::NoObjective => {
                write!(f, "[{}] Model has no objective function", self.code())
            }
            SolverError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} is unknown to the backend",
                self.code(),
                id
            ),
            SolverError::SolverNotAvailable(name) => {
                write!(f, "[{}] Solver '{}' is not available", self.code(), name)
            }
            SolverError::SolveFailure { status } => write!(
                f,
                "[{}] Solve terminated without a solution: {}",
                self.code(),
                status
            ),
            SolverError::SolverSpecific(msg) => {
                write!(f, "[{}] Backend error: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// A primal solution returned by a backend.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Primal values, indexed by variable declaration order.
    pub primal_values: Vec<f64>,
    /// Objective value at the returned point.
    pub objective_value: f64,
    /// Termination status.
    pub status: SolverStatus,
    /// Wall-clock solve time in seconds.
    pub solve_time_seconds: f64,
}

impl Solution {
    /// Primal value of the variable at `index` (declaration order).
    pub fn get_primal(&self, index: usize) -> Option<f64> {
        self.primal_values.get(index).copied()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// Backend-independent solver configuration.
///
/// All fields are optional; `None` leaves the backend default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverConfig {
    /// Time limit in seconds.
    pub time_limit: Option<f64>,
    /// Relative MIP gap tolerance.
    pub mip_gap: Option<f64>,
    /// Backend verbosity level (0 = silent).
    pub verbosity: Option<u32>,
    /// Number of threads.
    pub threads: Option<u32>,
    /// Primal/dual feasibility tolerance.
    pub tolerance: Option<f64>,
    /// Whether to echo backend log output to the console.
    pub log_to_console: Option<bool>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }

    pub fn with_verbosity(mut self, level: u32) -> Self {
        self.verbosity = Some(level);
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = Some(enabled);
        self
    }

    /// True when every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == SolverConfig::default()
    }
}

/// A backend capable of solving a [`Model`].
pub trait Solver {
    fn solve(&mut self, model: &Model) -> Result<Solution, SolverError>;
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(SolverStatus::Optimal.is_optimal());
        assert!(SolverStatus::Optimal.is_feasible());
        assert!(SolverStatus::TimeLimit.is_feasible());
        assert!(!SolverStatus::Infeasible.is_feasible());
        assert!(SolverStatus::Infeasible.is_infeasible());
        assert!(SolverStatus::Unbounded.is_unbounded());
        assert!(!SolverStatus::Unknown.is_optimal());
    }

    #[test]
    fn status_display() {
        assert_eq!(SolverStatus::Optimal.to_string(), "optimal");
        assert_eq!(SolverStatus::IterationLimit.to_string(), "iteration_limit");
    }

    #[test]
    fn config_builder_chain() {
        let config = SolverConfig::new()
            .with_time_limit(30.0)
            .with_mip_gap(1e-4)
            .with_threads(4)
            .with_log_to_console(false);
        assert_eq!(config.time_limit, Some(30.0));
        assert_eq!(config.mip_gap, Some(1e-4));
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.log_to_console, Some(false));
        assert!(config.verbosity.is_none());
        assert!(!config.is_empty());
        assert!(SolverConfig::default().is_empty());
    }

    #[test]
    fn solution_lookup() {
        let solution = Solution {
            primal_values: vec![1.0, 2.5],
            objective_value: 3.5,
            status: SolverStatus::Optimal,
            solve_time_seconds: 0.01,
        };
        assert_eq!(solution.get_primal(1), Some(2.5));
        assert_eq!(solution.get_primal(2), None);
        assert!(solution.is_optimal());
    }

    #[test]
    fn error_codes_and_display() {
        let err = SolverError::SolveFailure {
            status: SolverStatus::Infeasible,
        };
        assert_eq!(err.code(), "SOLVER_SOLVE_FAILURE");
        assert!(err.to_string().contains("infeasible"));
    }
}
