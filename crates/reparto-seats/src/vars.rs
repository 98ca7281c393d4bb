//! Per-unit decision-variable tables.
//!
//! All variables are declared eagerly during construction, keyed by
//! stable identifiers (party index, round, candidate seat count), never
//! created as a side effect of constraint emission. Round indices `k`
//! are 1-based seat numbers.

use crate::error::BuildError;
use reparto_core::Model;
use reparto_expr::VariableId;
use std::collections::BTreeMap;

/// Variable table for one party in one district.
#[derive(Debug, Clone)]
pub(crate) struct PartyVars {
    /// Final vote count, `[0, district_total]`.
    pub votes: VariableId,
    /// Final seat count, integer `[0, num_seats]`.
    pub seats: VariableId,
    /// Votes lost to each other party, `[0, own_initial_votes]`.
    pub outflow: BTreeMap<usize, VariableId>,
    /// Votes gained from each other party, `[0, their_initial_votes]`.
    pub inflow: BTreeMap<usize, VariableId>,
    /// Whether this party takes seat `k`, for contested `k`.
    pub assigned: BTreeMap<u32, VariableId>,
    /// Count of pairwise wins in round `k`, integer `[0, P-1]`.
    pub round_wins: BTreeMap<u32, VariableId>,
    /// Whether this party's round-`k` quotient beats party `q`'s.
    pub beats: BTreeMap<(u32, usize), VariableId>,
    /// Seats held entering round `k`, integer `[0, k-1]`; declared for
    /// rounds after the first contested one.
    pub seats_before: BTreeMap<u32, VariableId>,
    /// Divisor-adjusted vote figure for round `k`.
    pub quotient: BTreeMap<u32, VariableId>,
    /// Selector: seats held entering round `k` equal exactly `m`,
    /// `m` in `[seats_already_held, k)`.
    pub seats_before_ind: BTreeMap<(u32, u32), VariableId>,
}

impl PartyVars {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn declare(
        model: &mut Model,
        district: &str,
        party: usize,
        party_names: &[String],
        initial_votes: &[f64],
        total_votes: f64,
        num_seats: u32,
        first_contested_seat: u32,
        seats_already_held: u32,
    ) -> Result<PartyVars, BuildError> {
        let name = &party_names[party];
        let num_parties = party_names.len();

        let votes = model.add_continuous(
            0.0,
            total_votes,
            format!("votes_{}_{}", name, district),
        )?;
        let seats = model.add_integer(
            0.0,
            num_seats as f64,
            format!("seats_{}_{}", name, district),
        )?;

        let mut outflow = BTreeMap::new();
        let mut inflow = BTreeMap::new();
        for other in 0..num_parties {
            if other == party {
                continue;
            }
            let other_name = &party_names[other];
            outflow.insert(
                other,
                model.add_continuous(
                    0.0,
                    initial_votes[party],
                    format!("outflow_{}_{}_{}", name, other_name, district),
                )?,
            );
            inflow.insert(
                other,
                model.add_continuous(
                    0.0,
                    initial_votes[other],
                    format!("inflow_{}_{}_{}", name, other_name, district),
                )?,
            );
        }

        let mut assigned = BTreeMap::new();
        let mut round_wins = BTreeMap::new();
        let mut beats = BTreeMap::new();
        for k in first_contested_seat..=num_seats {
            assigned.insert(
                k,
                model.add_binary(format!("assigned_{}_{}_{}", k, name, district))?,
            );
            round_wins.insert(
                k,
                model.add_integer(
                    0.0,
                    (num_parties - 1) as f64,
                    format!("round_wins_{}_{}_{}", k, name, district),
                )?,
            );
            for other in 0..num_parties {
                if other == party {
                    continue;
                }
                beats.insert(
                    (k, other),
                    model.add_binary(format!(
                        "beats_{}_{}_{}_{}",
                        k, name, party_names[other], district
                    ))?,
                );
            }
        }

        let mut seats_before = BTreeMap::new();
        let mut quotient = BTreeMap::new();
        let mut seats_before_ind = BTreeMap::new();
        for k in (first_contested_seat + 1)..=num_seats {
            seats_before.insert(
                k,
                model.add_integer(
                    0.0,
                    (k - 1) as f64,
                    format!("seats_before_{}_{}_{}", k, name, district),
                )?,
            );
            quotient.insert(
                k,
                model.add_continuous(
                    0.0,
                    total_votes,
                    format!("quotient_{}_{}_{}", k, name, district),
                )?,
            );
            for m in seats_already_held..k {
                seats_before_ind.insert(
                    (k, m),
                    model.add_binary(format!(
                        "seats_before_{}_is_{}_{}_{}",
                        k, m, name, district
                    ))?,
                );
            }
        }

        Ok(PartyVars {
            votes,
            seats,
            outflow,
            inflow,
            assigned,
            round_wins,
            beats,
            seats_before,
            quotient,
            seats_before_ind,
        })
    }
}

/// Variable table for one wing in one district. Same shape as a party's
/// flow variables; flows are forced equal to the sum of member-party
/// pairwise flows by the district's constraints.
#[derive(Debug, Clone)]
pub(crate) struct WingVars {
    pub votes: VariableId,
    pub seats: VariableId,
    pub outflow: BTreeMap<usize, VariableId>,
    pub inflow: BTreeMap<usize, VariableId>,
}

impl WingVars {
    pub(crate) fn declare(
        model: &mut Model,
        district: &str,
        wing: usize,
        wing_names: &[String],
        wing_initial_votes: &[f64],
        total_votes: f64,
        num_seats: u32,
    ) -> Result<WingVars, BuildError> {
        let name = &wing_names[wing];

        let votes = model.add_continuous(
            0.0,
            total_votes,
            format!("votes_{}_{}", name, district),
        )?;
        let seats = model.add_integer(
            0.0,
            num_seats as f64,
            format!("seats_{}_{}", name, district),
        )?;

        let mut outflow = BTreeMap::new();
        let mut inflow = BTreeMap::new();
        for other in 0..wing_names.len() {
            if other == wing {
                continue;
            }
            let other_name = &wing_names[other];
            outflow.insert(
                other,
                model.add_continuous(
                    0.0,
                    wing_initial_votes[wing],
                    format!("outflow_{}_{}_{}", name, other_name, district),
                )?,
            );
            inflow.insert(
                other,
                model.add_continuous(
                    0.0,
                    wing_initial_votes[other],
                    format!("inflow_{}_{}_{}", name, other_name, district),
                )?,
            );
        }

        Ok(WingVars {
            votes,
            seats,
            outflow,
            inflow,
        })
    }
}
