//! Error types for configuration, model construction, and solving.

use reparto_core::{ModelError, SolverError};

/// Malformed input, detected before any variable is declared.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration names no districts.
    NoDistricts,
    /// A district has no parties.
    NoParties { district: String },
    /// A district has zero seats.
    ZeroSeats { district: String },
    /// A party has a negative vote count.
    NegativeVotes {
        district: String,
        party: String,
        votes: f64,
    },
    /// A party names no wing.
    MissingWing { district: String, party: String },
    /// `first_contested_seat` outside `[1, num_seats]`.
    BadFirstContestedSeat {
        district: String,
        first_contested_seat: u32,
        num_seats: u32,
    },
    /// A district's settings reference a group that does not exist.
    UnknownGroup { district: String, group: String },
}

impl ConfigError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::NoDistricts => "CONFIG_NO_DISTRICTS",
            ConfigError::NoParties { .. } => "CONFIG_NO_PARTIES",
            ConfigError::ZeroSeats { .. } => "CONFIG_ZERO_SEATS",
            ConfigError::NegativeVotes { .. } => "CONFIG_NEGATIVE_VOTES",
            ConfigError::MissingWing { .. } => "CONFIG_MISSING_WING",
            ConfigError::BadFirstContestedSeat { .. } => "CONFIG_BAD_FIRST_CONTESTED",
            ConfigError::UnknownGroup { .. } => "CONFIG_UNKNOWN_GROUP",
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoDistricts => {
                write!(f, "[{}] Configuration names no districts", self.code())
            }
            ConfigError::NoParties { district } => {
                write!(f, "[{}] District '{}' has no parties", self.code(), district)
            }
            ConfigError::ZeroSeats { district } => {
                write!(f, "[{}] District '{}' has zero seats", self.code(), district)
            }
            ConfigError::NegativeVotes {
                district,
                party,
                votes,
            } => write!(
                f,
                "[{}] Party '{}' in district '{}' has negative votes ({})",
                self.code(),
                party,
                district,
                votes
            ),
            ConfigError::MissingWing { district, party } => write!(
                f,
                "[{}] Party '{}' in district '{}' names no wing",
                self.code(),
                party,
                district
            ),
            ConfigError::BadFirstContestedSeat {
                district,
                first_contested_seat,
                num_seats,
            } => write!(
                f,
                "[{}] District '{}': first_contested_seat {} outside [1, {}]",
                self.code(),
                district,
                first_contested_seat,
                num_seats
            ),
            ConfigError::UnknownGroup { district, group } => write!(
                f,
                "[{}] District '{}' references unknown settings group '{}'",
                self.code(),
                district,
                group
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure while constructing the model.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Input rejected before construction.
    Config(ConfigError),
    /// Invariant violated during variable declaration or constraint
    /// emission.
    Model(ModelError),
}

impl BuildError {
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::Config(_) => "BUILD_CONFIG",
            BuildError::Model(_) => "BUILD_MODEL",
        }
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Config(err) => write!(f, "[{}] {}", self.code(), err),
            BuildError::Model(err) => write!(f, "[{}] {}", self.code(), err),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Config(err) => Some(err),
            BuildError::Model(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(err: ConfigError) -> Self {
        BuildError::Config(err)
    }
}

impl From<ModelError> for BuildError {
    fn from(err: ModelError) -> Self {
        BuildError::Model(err)
    }
}

/// Failure while solving or reading back the solution.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The backend reported a terminal non-solution outcome
    /// (infeasible, unbounded, or an unusable status).
    Solver(SolverError),
    /// A declared variable has no value in the returned solution.
    MissingValue { variable: String },
}

impl SolveError {
    pub fn code(&self) -> &'static str {
        match self {
            SolveError::Solver(_) => "SOLVE_BACKEND",
            SolveError::MissingValue { .. } => "SOLVE_MISSING_VALUE",
        }
    }
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Solver(err) => write!(f, "[{}] {}", self.code(), err),
            SolveError::MissingValue { variable } => write!(
                f,
                "[{}] Variable '{}' has no value in the solution",
                self.code(),
                variable
            ),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Solver(err) => Some(err),
            SolveError::MissingValue { .. } => None,
        }
    }
}

impl From<SolverError> for SolveError {
    fn from(err: SolverError) -> Self {
        SolveError::Solver(err)
    }
}
