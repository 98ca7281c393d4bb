//! Read-only solution snapshots.

use reparto_core::SolverStatus;
use std::collections::BTreeMap;

/// One unit's (party or wing) resolved state, per district or
/// nationally.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub initial_votes: f64,
    pub final_votes: f64,
    /// Seats under the unmodified baseline.
    pub initial_seats: u32,
    pub final_seats: u32,
    /// Votes moved to each other unit at the same level.
    pub outflow: BTreeMap<String, f64>,
}

/// All units of one district.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictOutcome {
    pub parties: BTreeMap<String, UnitOutcome>,
    pub wings: BTreeMap<String, UnitOutcome>,
}

/// The full solved reallocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub objective_value: f64,
    pub status: SolverStatus,
    pub districts: BTreeMap<String, DistrictOutcome>,
    /// National aggregates per party.
    pub parties: BTreeMap<String, UnitOutcome>,
    /// National aggregates per wing.
    pub wings: BTreeMap<String, UnitOutcome>,
}

impl Outcome {
    pub fn district(&self, name: &str) -> Option<&DistrictOutcome> {
        self.districts.get(name)
    }

    /// Total seats across all districts, from the per-district party
    /// outcomes.
    pub fn total_final_seats(&self) -> u32 {
        self.districts
            .values()
            .flat_map(|d| d.parties.values())
            .map(|p| p.final_seats)
            .sum()
    }
}
