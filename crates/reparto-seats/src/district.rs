//! One electoral district: baseline, variable tables, and all
//! intra-district constraints.
//!
//! The D'Hondt recurrence is encoded statically: for each contested
//! round, pairwise big-M win indicators decide the winner, and a second
//! disjunction over candidate prior seat counts pins each party's
//! round quotient to `votes / (m + 1)` for the selected `m`. Rounds
//! before `first_contested_seat` are fixed to the baseline outcome, with
//! ordering constraints keeping that history valid for the re-optimized
//! vote totals.

use crate::baseline::Baseline;
use crate::config::{DistrictData, DistrictSettings};
use crate::error::{BuildError, ConfigError};
use crate::vars::{PartyVars, WingVars};
use reparto_core::Model;
use reparto_expr::{Expr, VariableId};
use std::collections::BTreeMap;
use tracing::debug;

pub struct District {
    name: String,
    num_seats: u32,
    first_contested_seat: u32,
    parties: Vec<String>,
    wings: Vec<String>,
    party_wing: Vec<usize>,
    initial_votes: Vec<f64>,
    wing_initial_votes: Vec<f64>,
    total_votes: f64,
    big_m: f64,
    baseline: Baseline,
    seats_already_held: Vec<u32>,
    party_vars: Vec<PartyVars>,
    wing_vars: Vec<WingVars>,
    settings: DistrictSettings,
}

impl District {
    /// Run the baseline and declare every decision variable on `model`.
    /// Constraints are emitted separately by [`District::emit_constraints`].
    pub fn build(
        name: &str,
        data: &DistrictData,
        settings: &DistrictSettings,
        model: &mut Model,
    ) -> Result<District, BuildError> {
        if data.num_seats == 0 {
            return Err(ConfigError::ZeroSeats {
                district: name.to_string(),
            }
            .into());
        }
        if data.parties.is_empty() {
            return Err(ConfigError::NoParties {
                district: name.to_string(),
            }
            .into());
        }
        let first_contested_seat = settings.first_contested_seat;
        if first_contested_seat < 1 || first_contested_seat > data.num_seats {
            return Err(ConfigError::BadFirstContestedSeat {
                district: name.to_string(),
                first_contested_seat,
                num_seats: data.num_seats,
            }
            .into());
        }

        // BTreeMap iteration fixes the lexicographic party order that
        // both the baseline tie-break and variable naming rely on.
        let parties: Vec<String> = data.parties.keys().cloned().collect();
        let initial_votes: Vec<f64> = parties
            .iter()
            .map(|p| data.parties[p].votes)
            .collect();
        let total_votes: f64 = initial_votes.iter().sum();

        let mut wings: Vec<String> = parties
            .iter()
            .map(|p| data.parties[p].wing.clone())
            .collect();
        wings.sort();
        wings.dedup();
        // wings was just built from these same parties, so every wing
        // name is present in the index.
        let wing_index: BTreeMap<&str, usize> = wings
            .iter()
            .enumerate()
            .map(|(index, wing)| (wing.as_str(), index))
            .collect();
        let party_wing: Vec<usize> = parties
            .iter()
            .map(|p| wing_index[data.parties[p].wing.as_str()])
            .collect();
        let mut wing_initial_votes = vec![0.0; wings.len()];
        for (party, &wing) in party_wing.iter().enumerate() {
            wing_initial_votes[wing] += initial_votes[party];
        }

        let baseline = Baseline::simulate(name, &parties, &initial_votes, data.num_seats)?;
        let seats_already_held = baseline.seats_entering(first_contested_seat).to_vec();

        // M must dominate every quotient difference and every count the
        // disjunctions compare; derive it from the instance rather than
        // fixing a global constant.
        let big_m = total_votes
            .max(data.num_seats as f64)
            .max(parties.len().saturating_sub(1) as f64);

        let mut party_vars = Vec::with_capacity(parties.len());
        for party in 0..parties.len() {
            party_vars.push(PartyVars::declare(
                model,
                name,
                party,
                &parties,
                &initial_votes,
                total_votes,
                data.num_seats,
                first_contested_seat,
                seats_already_held[party],
            )?);
        }
        let mut wing_vars = Vec::with_capacity(wings.len());
        for wing in 0..wings.len() {
            wing_vars.push(WingVars::declare(
                model,
                name,
                wing,
                &wings,
                &wing_initial_votes,
                total_votes,
                data.num_seats,
            )?);
        }

        debug!(
            component = "district",
            operation = "build",
            status = "success",
            district = name,
            parties = parties.len(),
            wings = wings.len(),
            num_seats = data.num_seats,
            first_contested_seat,
            big_m,
            "Declared district variables"
        );

        Ok(District {
            name: name.to_string(),
            num_seats: data.num_seats,
            first_contested_seat,
            parties,
            wings,
            party_wing,
            initial_votes,
            wing_initial_votes,
            total_votes,
            big_m,
            baseline,
            seats_already_held,
            party_vars,
            wing_vars,
            settings: settings.clone(),
        })
    }

    /// Emit every intra-district constraint on `model`.
    pub fn emit_constraints(&self, model: &mut Model) -> Result<(), BuildError> {
        let before = model.num_constraints();
        self.emit_predecided_ordering(model)?;
        self.emit_vote_totals(model)?;
        self.emit_flow_conservation(model)?;
        self.emit_permeability(model)?;
        self.emit_seat_assignment(model)?;
        self.emit_wing_seats(model)?;

        debug!(
            component = "district",
            operation = "emit_constraints",
            status = "success",
            district = self.name.as_str(),
            constraints = model.num_constraints() - before,
            "Emitted district constraints"
        );
        Ok(())
    }

    /// Baseline ordering must stay valid for the re-optimized vote
    /// totals: for every pre-decided round, the recorded winner's
    /// divisor-adjusted votes dominate every other party's.
    fn emit_predecided_ordering(&self, model: &mut Model) -> Result<(), BuildError> {
        for round in 1..self.first_contested_seat {
            let winner = self.baseline.winners()[(round - 1) as usize];
            let seats = self.baseline.seats_entering(round);
            for other in 0..self.parties.len() {
                if other == winner {
                    continue;
                }
                let expr = Expr::term(
                    self.party_vars[winner].votes,
                    1.0 / (1.0 + seats[winner] as f64),
                ) - Expr::term(
                    self.party_vars[other].votes,
                    1.0 / (1.0 + seats[other] as f64),
                );
                model.add_constraint_expr(expr.ge_scalar(0.0))?;
            }
        }
        Ok(())
    }

    fn emit_vote_totals(&self, model: &mut Model) -> Result<(), BuildError> {
        let all_votes = Expr::sum(self.party_vars.iter().map(|p| p.votes), 1.0);
        model.add_constraint_expr(all_votes.eq_scalar(self.total_votes))?;

        for (wing, wing_vars) in self.wing_vars.iter().enumerate() {
            let members = Expr::sum(
                self.members_of(wing).map(|p| self.party_vars[p].votes),
                1.0,
            );
            let expr = members - Expr::var(wing_vars.votes);
            model.add_constraint_expr(expr.eq_scalar(0.0))?;
        }
        Ok(())
    }

    fn emit_flow_conservation(&self, model: &mut Model) -> Result<(), BuildError> {
        // final = initial - sum(outflow) + sum(inflow), written with the
        // flows on the left.
        for (party, vars) in self.party_vars.iter().enumerate() {
            let mut expr = Expr::var(vars.votes);
            for (_, &inflow) in &vars.inflow {
                expr.push(inflow, -1.0);
            }
            for (_, &outflow) in &vars.outflow {
                expr.push(outflow, 1.0);
            }
            model.add_constraint_expr(expr.eq_scalar(self.initial_votes[party]))?;
        }

        // A flow leaving p for q is q's inflow from p.
        for (party, vars) in self.party_vars.iter().enumerate() {
            for (&other, &inflow) in &vars.inflow {
                let expr =
                    Expr::var(inflow) - Expr::var(self.party_vars[other].outflow[&party]);
                model.add_constraint_expr(expr.eq_scalar(0.0))?;
            }
        }

        // Wing flows equal the sum of member-party pairwise flows.
        for (w1, wing_vars) in self.wing_vars.iter().enumerate() {
            for w2 in 0..self.wings.len() {
                if w2 == w1 {
                    continue;
                }
                let mut out_sum = Expr::new();
                let mut in_sum = Expr::new();
                for p in self.members_of(w1) {
                    for q in self.members_of(w2) {
                        out_sum.push(self.party_vars[p].outflow[&q], 1.0);
                        in_sum.push(self.party_vars[p].inflow[&q], 1.0);
                    }
                }
                let expr = out_sum - Expr::var(wing_vars.outflow[&w2]);
                model.add_constraint_expr(expr.eq_scalar(0.0))?;
                let expr = in_sum - Expr::var(wing_vars.inflow[&w2]);
                model.add_constraint_expr(expr.eq_scalar(0.0))?;
            }
        }
        Ok(())
    }

    fn emit_permeability(&self, model: &mut Model) -> Result<(), BuildError> {
        for (party, vars) in self.party_vars.iter().enumerate() {
            for (&other, &outflow) in &vars.outflow {
                let cap = self
                    .settings
                    .party_permeability(&self.parties[party], &self.parties[other])
                    * self.initial_votes[party];
                model.add_constraint_expr(Expr::var(outflow).le_scalar(cap))?;
            }
        }
        for (wing, vars) in self.wing_vars.iter().enumerate() {
            for (&other, &outflow) in &vars.outflow {
                let cap = self
                    .settings
                    .wing_permeability(&self.wings[wing], &self.wings[other])
                    * self.wing_initial_votes[wing];
                model.add_constraint_expr(Expr::var(outflow).le_scalar(cap))?;
            }
        }
        Ok(())
    }

    /// The two-stage disjunctive seat-assignment encoding.
    fn emit_seat_assignment(&self, model: &mut Model) -> Result<(), BuildError> {
        let m_big = self.big_m;
        let first = self.first_contested_seat;
        let num_parties = self.parties.len();

        // Pairwise win indicators: beats[(k, q)] == 1 exactly when p's
        // round-k quotient is >= q's. The first contested round still
        // has known divisors from the baseline; later rounds compare the
        // pinned quotient variables.
        for (party, vars) in self.party_vars.iter().enumerate() {
            for other in 0..num_parties {
                if other == party {
                    continue;
                }
                let first_round_diff = Expr::term(
                    vars.votes,
                    1.0 / (1.0 + self.seats_already_held[party] as f64),
                ) - Expr::term(
                    self.party_vars[other].votes,
                    1.0 / (1.0 + self.seats_already_held[other] as f64),
                );
                let beats = vars.beats[&(first, other)];
                let expr = first_round_diff.clone() - Expr::term(beats, m_big);
                model.add_constraint_expr(expr.ge_scalar(-m_big))?;
                let expr = first_round_diff - Expr::term(beats, m_big);
                model.add_constraint_expr(expr.le_scalar(0.0))?;

                for k in (first + 1)..=self.num_seats {
                    let diff = Expr::var(vars.quotient[&k])
                        - Expr::var(self.party_vars[other].quotient[&k]);
                    let beats = vars.beats[&(k, other)];
                    let expr = diff.clone() - Expr::term(beats, m_big);
                    model.add_constraint_expr(expr.ge_scalar(-m_big))?;
                    let expr = diff - Expr::term(beats, m_big);
                    model.add_constraint_expr(expr.le_scalar(0.0))?;
                }
            }
        }

        // round_wins[k] counts the pairwise wins; the round's seat is
        // forced to whoever beats all other parties.
        for vars in &self.party_vars {
            for k in first..=self.num_seats {
                let mut expr = Expr::var(vars.round_wins[&k]);
                for other in 0..num_parties {
                    if let Some(&beats) = vars.beats.get(&(k, other)) {
                        expr.push(beats, -1.0);
                    }
                }
                model.add_constraint_expr(expr.eq_scalar(0.0))?;

                let expr = Expr::var(vars.round_wins[&k]) - Expr::term(vars.assigned[&k], m_big);
                model.add_constraint_expr(
                    expr.ge_scalar((num_parties - 1) as f64 - m_big),
                )?;
            }
        }

        // Exactly one party takes each contested seat.
        for k in first..=self.num_seats {
            let expr = Expr::sum(self.party_vars.iter().map(|p| p.assigned[&k]), 1.0);
            model.add_constraint_expr(expr.eq_scalar(1.0))?;
        }

        // seats_before[k] = contested wins so far + fixed history.
        for (party, vars) in self.party_vars.iter().enumerate() {
            let held = self.seats_already_held[party] as f64;
            for k in (first + 1)..=self.num_seats {
                let mut expr = Expr::new();
                for t in first..k {
                    expr.push(vars.assigned[&t], 1.0);
                }
                expr.push(vars.seats_before[&k], -1.0);
                model.add_constraint_expr(expr.eq_scalar(-held))?;
            }
        }

        // Selector disjunction: exactly one candidate count m is active
        // per (party, k), and it pins seats_before[k] to m.
        for (party, vars) in self.party_vars.iter().enumerate() {
            let held = self.seats_already_held[party];
            for k in (first + 1)..=self.num_seats {
                for m in held..k {
                    let ind = vars.seats_before_ind[&(k, m)];
                    let expr =
                        Expr::var(vars.seats_before[&k]) - Expr::term(ind, m_big);
                    model.add_constraint_expr(expr.ge_scalar(m as f64 - m_big))?;
                    let expr =
                        Expr::var(vars.seats_before[&k]) + Expr::term(ind, m_big);
                    model.add_constraint_expr(expr.le_scalar(m as f64 + m_big))?;
                }
                let expr = Expr::sum(
                    (held..k).map(|m| vars.seats_before_ind[&(k, m)]),
                    1.0,
                );
                model.add_constraint_expr(expr.eq_scalar(1.0))?;

                // Quotient pinning: with indicator m active,
                // quotient[k] == votes / (m + 1).
                for m in held..k {
                    let ind = vars.seats_before_ind[&(k, m)];
                    let diff = Expr::var(vars.quotient[&k])
                        - Expr::term(vars.votes, 1.0 / (m as f64 + 1.0));
                    let expr = diff.clone() - Expr::term(ind, m_big);
                    model.add_constraint_expr(expr.ge_scalar(-m_big))?;
                    let expr = diff + Expr::term(ind, m_big);
                    model.add_constraint_expr(expr.le_scalar(m_big))?;
                }
            }
        }

        // Final seat totals: contested wins plus fixed history.
        for (party, vars) in self.party_vars.iter().enumerate() {
            let mut expr = Expr::sum((first..=self.num_seats).map(|k| vars.assigned[&k]), 1.0);
            expr.push(vars.seats, -1.0);
            model.add_constraint_expr(
                expr.eq_scalar(-(self.seats_already_held[party] as f64)),
            )?;
        }
        Ok(())
    }

    fn emit_wing_seats(&self, model: &mut Model) -> Result<(), BuildError> {
        for (wing, wing_vars) in self.wing_vars.iter().enumerate() {
            let mut expr = Expr::sum(
                self.members_of(wing).map(|p| self.party_vars[p].seats),
                1.0,
            );
            expr.push(wing_vars.seats, -1.0);
            model.add_constraint_expr(expr.eq_scalar(0.0))?;
        }
        Ok(())
    }

    /// Objective contributions: seat weights per unit and movement
    /// penalties per outflow pair, with `auto` weights scaled by this
    /// district's seats-per-vote ratio.
    pub fn objective_terms(&self) -> Vec<(VariableId, f64)> {
        let mut terms = Vec::new();
        let weights = &self.settings.weights;

        for (party, vars) in self.party_vars.iter().enumerate() {
            terms.push((vars.seats, weights.party_seat_weight(&self.parties[party])));
        }
        for (wing, vars) in self.wing_vars.iter().enumerate() {
            terms.push((vars.seats, weights.wing_seat_weight(&self.wings[wing])));
        }
        for (party, vars) in self.party_vars.iter().enumerate() {
            for (&other, &outflow) in &vars.outflow {
                let weight = weights
                    .party_movement_weight(&self.parties[party], &self.parties[other])
                    .resolve(self.num_seats, self.total_votes);
                terms.push((outflow, weight));
            }
        }
        for (wing, vars) in self.wing_vars.iter().enumerate() {
            for (&other, &outflow) in &vars.outflow {
                let weight = weights
                    .wing_movement_weight(&self.wings[wing], &self.wings[other])
                    .resolve(self.num_seats, self.total_votes);
                terms.push((outflow, weight));
            }
        }
        terms
    }

    fn members_of(&self, wing: usize) -> impl Iterator<Item = usize> + '_ {
        self.party_wing
            .iter()
            .enumerate()
            .filter(move |(_, &w)| w == wing)
            .map(|(p, _)| p)
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parties(&self) -> &[String] {
        &self.parties
    }

    pub fn wings(&self) -> &[String] {
        &self.wings
    }

    pub fn num_seats(&self) -> u32 {
        self.num_seats
    }

    pub fn first_contested_seat(&self) -> u32 {
        self.first_contested_seat
    }

    pub fn total_votes(&self) -> f64 {
        self.total_votes
    }

    pub fn initial_votes(&self) -> &[f64] {
        &self.initial_votes
    }

    pub fn wing_initial_votes(&self) -> &[f64] {
        &self.wing_initial_votes
    }

    /// Seats fixed by the baseline before the first contested round.
    pub fn seats_already_held(&self) -> &[u32] {
        &self.seats_already_held
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub(crate) fn party_vars(&self) -> &[PartyVars] {
        &self.party_vars
    }

    pub(crate) fn wing_vars(&self) -> &[WingVars] {
        &self.wing_vars
    }

    pub(crate) fn wing_of(&self, party: usize) -> usize {
        self.party_wing[party]
    }
}
