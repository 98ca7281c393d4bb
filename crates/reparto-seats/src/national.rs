//! National composition: many districts against one owned model.
//!
//! The model context is owned here; districts and the aggregate layer
//! register variables and rows against it, and a solve is one blocking
//! call on a caller-supplied backend.

use crate::config::ElectionConfig;
use crate::district::District;
use crate::error::{BuildError, SolveError};
use crate::outcome::{DistrictOutcome, Outcome, UnitOutcome};
use reparto_core::{Model, Solution, Solver};
use reparto_expr::{Expr, VariableId};
use std::collections::BTreeMap;
use tracing::debug;

/// National aggregate variables for one party or wing.
#[derive(Debug, Clone)]
struct NationalVars {
    votes: VariableId,
    seats: VariableId,
    outflow: BTreeMap<String, VariableId>,
}

/// Where a unit appears and what it brings in.
#[derive(Debug, Clone)]
struct UnitInfo {
    votes: f64,
    baseline_seats: u32,
    /// (district index, unit index within that district).
    districts: Vec<(usize, usize)>,
}

impl UnitInfo {
    fn district_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.districts.iter().map(|(d, _)| *d)
    }

    fn co_occurs_with(&self, other: &UnitInfo) -> bool {
        self.district_indices()
            .any(|d| other.district_indices().any(|e| e == d))
    }
}

/// The composed national MILP.
pub struct NationalModel {
    model: Model,
    district_names: Vec<String>,
    districts: Vec<District>,
    party_info: BTreeMap<String, UnitInfo>,
    wing_info: BTreeMap<String, UnitInfo>,
    national_parties: BTreeMap<String, NationalVars>,
    national_wings: BTreeMap<String, NationalVars>,
}

impl NationalModel {
    /// Validate the configuration, build every district, wire the
    /// national aggregates, and assemble the maximized objective.
    pub fn build(config: &ElectionConfig) -> Result<NationalModel, BuildError> {
        config.validate()?;

        let mut model = Model::new();
        let mut district_names = Vec::new();
        let mut districts = Vec::new();
        for (name, data) in &config.districts {
            let settings = config.settings_for(name)?;
            let district = District::build(name, data, settings, &mut model)?;
            district_names.push(name.clone());
            districts.push(district);
        }

        let (party_info, wing_info) = collect_unit_info(&districts);
        let all_votes: f64 = party_info.values().map(|info| info.votes).sum();
        let all_seats: u32 = districts.iter().map(|d| d.num_seats()).sum();

        let national_parties =
            declare_national_vars(&mut model, "party", &party_info, all_votes, all_seats)?;
        let national_wings =
            declare_national_vars(&mut model, "wing", &wing_info, all_votes, all_seats)?;

        for district in &districts {
            district.emit_constraints(&mut model)?;
        }

        let mut composed = NationalModel {
            model,
            district_names,
            districts,
            party_info,
            wing_info,
            national_parties,
            national_wings,
        };
        composed.emit_national_constraints(config)?;
        composed.assemble_objective()?;

        debug!(
            component = "national",
            operation = "build",
            status = "success",
            districts = composed.districts.len(),
            parties = composed.party_info.len(),
            wings = composed.wing_info.len(),
            variables = composed.model.num_variables(),
            constraints = composed.model.num_constraints(),
            "Composed national model"
        );
        Ok(composed)
    }

    fn emit_national_constraints(&mut self, config: &ElectionConfig) -> Result<(), BuildError> {
        self.equate_aggregates(true)?;
        self.equate_aggregates(false)?;

        if let Some(global) = &config.settings.global {
            self.emit_global_permeability(true, &global.parties)?;
            self.emit_global_permeability(false, &global.wings)?;
        }
        Ok(())
    }

    /// Each national aggregate equals the sum of its per-district
    /// counterparts; movement pairs are restricted to districts where
    /// both endpoints co-occur (an empty sum pins the aggregate to
    /// zero).
    fn equate_aggregates(&mut self, parties: bool) -> Result<(), BuildError> {
        let (info, national) = if parties {
            (&self.party_info, &self.national_parties)
        } else {
            (&self.wing_info, &self.national_wings)
        };

        for (name, unit) in info {
            let vars = &national[name];

            let mut votes_sum = Expr::new();
            let mut seats_sum = Expr::new();
            for &(district, index) in &unit.districts {
                let (votes, seats) = if parties {
                    let v = &self.districts[district].party_vars()[index];
                    (v.votes, v.seats)
                } else {
                    let v = &self.districts[district].wing_vars()[index];
                    (v.votes, v.seats)
                };
                votes_sum.push(votes, 1.0);
                seats_sum.push(seats, 1.0);
            }
            votes_sum.push(vars.votes, -1.0);
            seats_sum.push(vars.seats, -1.0);
            self.model.add_constraint_expr(votes_sum.eq_scalar(0.0))?;
            self.model.add_constraint_expr(seats_sum.eq_scalar(0.0))?;

            for (other, &national_outflow) in &vars.outflow {
                let mut flow_sum = Expr::new();
                for &(district, index) in &unit.districts {
                    let d = &self.districts[district];
                    let other_index = if parties {
                        d.parties().iter().position(|p| p == other)
                    } else {
                        d.wings().iter().position(|w| w == other)
                    };
                    if let Some(other_index) = other_index {
                        let outflow = if parties {
                            d.party_vars()[index].outflow[&other_index]
                        } else {
                            d.wing_vars()[index].outflow[&other_index]
                        };
                        flow_sum.push(outflow, 1.0);
                    }
                }
                flow_sum.push(national_outflow, -1.0);
                self.model.add_constraint_expr(flow_sum.eq_scalar(0.0))?;
            }
        }
        Ok(())
    }

    /// Cap cumulative cross-district outflow between co-occurring
    /// pairs.
    fn emit_global_permeability(
        &mut self,
        parties: bool,
        permeability: &crate::config::GlobalPermeability,
    ) -> Result<(), BuildError> {
        let (info, national) = if parties {
            (&self.party_info, &self.national_parties)
        } else {
            (&self.wing_info, &self.national_wings)
        };

        for (name, unit) in info {
            let vars = &national[name];
            for (other, &outflow) in &vars.outflow {
                if !unit.co_occurs_with(&info[other]) {
                    continue;
                }
                let cap = permeability.get(name, other) * unit.votes;
                self.model
                    .add_constraint_expr(Expr::var(outflow).le_scalar(cap))?;
            }
        }
        Ok(())
    }

    fn assemble_objective(&mut self) -> Result<(), BuildError> {
        let mut terms = Vec::new();
        for district in &self.districts {
            terms.extend(district.objective_terms());
        }
        self.model.maximize(Expr::from_terms(terms))?;
        Ok(())
    }

    /// One blocking solve; infeasible and unbounded outcomes are
    /// terminal, with no retry or relaxation.
    pub fn solve_with<S: Solver>(&self, solver: &mut S) -> Result<Outcome, SolveError> {
        let solution = solver.solve(&self.model)?;

        debug!(
            component = "national",
            operation = "solve",
            status = "success",
            solver_status = %solution.status,
            objective_value = solution.objective_value,
            duration_ms = solution.solve_time_seconds * 1000.0,
            "Solve completed"
        );

        self.read_outcome(&solution)
    }

    fn read_outcome(&self, solution: &Solution) -> Result<Outcome, SolveError> {
        let mut districts = BTreeMap::new();
        for (index, district) in self.districts.iter().enumerate() {
            let mut party_outcomes = BTreeMap::new();
            for (party, vars) in district.party_vars().iter().enumerate() {
                let mut outflow = BTreeMap::new();
                for (&other, &var) in &vars.outflow {
                    outflow.insert(
                        district.parties()[other].clone(),
                        self.value(solution, var)?,
                    );
                }
                party_outcomes.insert(
                    district.parties()[party].clone(),
                    UnitOutcome {
                        initial_votes: district.initial_votes()[party],
                        final_votes: self.value(solution, vars.votes)?,
                        initial_seats: district.baseline().wins(party),
                        final_seats: self.seat_count(solution, vars.seats)?,
                        outflow,
                    },
                );
            }

            let mut wing_outcomes = BTreeMap::new();
            for (wing, vars) in district.wing_vars().iter().enumerate() {
                let mut outflow = BTreeMap::new();
                for (&other, &var) in &vars.outflow {
                    outflow.insert(
                        district.wings()[other].clone(),
                        self.value(solution, var)?,
                    );
                }
                let baseline_seats: u32 = (0..district.parties().len())
                    .filter(|&p| district.wing_of(p) == wing)
                    .map(|p| district.baseline().wins(p))
                    .sum();
                wing_outcomes.insert(
                    district.wings()[wing].clone(),
                    UnitOutcome {
                        initial_votes: district.wing_initial_votes()[wing],
                        final_votes: self.value(solution, vars.votes)?,
                        initial_seats: baseline_seats,
                        final_seats: self.seat_count(solution, vars.seats)?,
                        outflow,
                    },
                );
            }

            districts.insert(
                self.district_names[index].clone(),
                DistrictOutcome {
                    parties: party_outcomes,
                    wings: wing_outcomes,
                },
            );
        }

        let parties = self.read_national_units(solution, &self.party_info, &self.national_parties)?;
        let wings = self.read_national_units(solution, &self.wing_info, &self.national_wings)?;

        Ok(Outcome {
            objective_value: solution.objective_value,
            status: solution.status,
            districts,
            parties,
            wings,
        })
    }

    fn read_national_units(
        &self,
        solution: &Solution,
        info: &BTreeMap<String, UnitInfo>,
        national: &BTreeMap<String, NationalVars>,
    ) -> Result<BTreeMap<String, UnitOutcome>, SolveError> {
        let mut outcomes = BTreeMap::new();
        for (name, unit) in info {
            let vars = &national[name];
            let mut outflow = BTreeMap::new();
            for (other, &var) in &vars.outflow {
                outflow.insert(other.clone(), self.value(solution, var)?);
            }
            outcomes.insert(
                name.clone(),
                UnitOutcome {
                    initial_votes: unit.votes,
                    final_votes: self.value(solution, vars.votes)?,
                    initial_seats: unit.baseline_seats,
                    final_seats: self.seat_count(solution, vars.seats)?,
                    outflow,
                },
            );
        }
        Ok(outcomes)
    }

    fn value(&self, solution: &Solution, var: VariableId) -> Result<f64, SolveError> {
        solution
            .get_primal(var.index())
            .ok_or_else(|| SolveError::MissingValue {
                variable: self
                    .model
                    .variable_name(var)
                    .unwrap_or("unnamed")
                    .to_string(),
            })
    }

    fn seat_count(&self, solution: &Solution, var: VariableId) -> Result<u32, SolveError> {
        Ok(self.value(solution, var)?.round().max(0.0) as u32)
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn districts(&self) -> &[District] {
        &self.districts
    }
}

fn collect_unit_info(
    districts: &[District],
) -> (BTreeMap<String, UnitInfo>, BTreeMap<String, UnitInfo>) {
    let mut party_info: BTreeMap<String, UnitInfo> = BTreeMap::new();
    let mut wing_info: BTreeMap<String, UnitInfo> = BTreeMap::new();

    for (index, district) in districts.iter().enumerate() {
        for (party, name) in district.parties().iter().enumerate() {
            let entry = party_info.entry(name.clone()).or_insert_with(|| UnitInfo {
                votes: 0.0,
                baseline_seats: 0,
                districts: Vec::new(),
            });
            entry.votes += district.initial_votes()[party];
            entry.baseline_seats += district.baseline().wins(party);
            entry.districts.push((index, party));
        }
        for (wing, name) in district.wings().iter().enumerate() {
            let entry = wing_info.entry(name.clone()).or_insert_with(|| UnitInfo {
                votes: 0.0,
                baseline_seats: 0,
                districts: Vec::new(),
            });
            entry.votes += district.wing_initial_votes()[wing];
            entry.baseline_seats += (0..district.parties().len())
                .filter(|&p| district.wing_of(p) == wing)
                .map(|p| district.baseline().wins(p))
                .sum::<u32>();
            entry.districts.push((index, wing));
        }
    }

    (party_info, wing_info)
}

fn declare_national_vars(
    model: &mut Model,
    level: &str,
    info: &BTreeMap<String, UnitInfo>,
    all_votes: f64,
    all_seats: u32,
) -> Result<BTreeMap<String, NationalVars>, BuildError> {
    let mut national = BTreeMap::new();
    for (name, unit) in info {
        let votes = model.add_continuous(
            0.0,
            all_votes,
            format!("national_{}_votes_{}", level, name),
        )?;
        let seats = model.add_integer(
            0.0,
            all_seats as f64,
            format!("national_{}_seats_{}", level, name),
        )?;
        let mut outflow = BTreeMap::new();
        for other in info.keys() {
            if other == name {
                continue;
            }
            outflow.insert(
                other.clone(),
                model.add_continuous(
                    0.0,
                    unit.votes,
                    format!("national_{}_outflow_{}_{}", level, name, other),
                )?,
            );
        }
        national.insert(
            name.clone(),
            NationalVars {
                votes,
                seats,
                outflow,
            },
        );
    }
    Ok(national)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reparto_core::Sense;

    fn config_json(json: serde_json::Value) -> ElectionConfig {
        serde_json::from_value(json).unwrap()
    }

    fn two_district_config() -> ElectionConfig {
        config_json(serde_json::json!({
            "districts": {
                "north": {
                    "num_seats": 5,
                    "parties": {
                        "a": { "votes": 100.0, "wing": "left" },
                        "b": { "votes": 80.0, "wing": "right" },
                        "c": { "votes": 50.0, "wing": "left" }
                    }
                },
                "south": {
                    "num_seats": 3,
                    "parties": {
                        "a": { "votes": 60.0, "wing": "left" },
                        "b": { "votes": 40.0, "wing": "right" }
                    }
                }
            }
        }))
    }

    #[test]
    fn build_composes_all_districts() {
        let national = NationalModel::build(&two_district_config()).unwrap();
        assert_eq!(national.districts().len(), 2);
        assert_eq!(national.party_info.len(), 3);
        assert_eq!(national.wing_info.len(), 2);
        assert_eq!(national.model().objective().sense, Some(Sense::Maximize));
        assert!(national.model().num_constraints() > 0);
    }

    #[test]
    fn unit_info_tracks_co_occurrence() {
        let national = NationalModel::build(&two_district_config()).unwrap();
        let a = &national.party_info["a"];
        let c = &national.party_info["c"];
        assert_eq!(a.districts.len(), 2);
        assert_eq!(c.districts.len(), 1);
        assert!(a.co_occurs_with(c));
        assert_eq!(a.votes, 160.0);
    }

    #[test]
    fn invalid_config_is_rejected_before_building() {
        let config = config_json(serde_json::json!({ "districts": {} }));
        assert!(matches!(
            NationalModel::build(&config),
            Err(BuildError::Config(_))
        ));
    }
}
