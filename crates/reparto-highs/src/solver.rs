//! HiGHS implementation of the core [`Solver`] trait.

use crate::ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus, ObjectiveSense};
use crate::status::{highs_has_solution, highs_to_core_status};
use reparto_core::{Model, Sense, Solution, Solver, SolverConfig, SolverError};
use reparto_expr::{ConstraintId, VariableId};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Bridge from [`Model`] to HiGHS.
///
/// The model's column-first storage maps directly onto HiGHS columns, so
/// the bridge copies each coefficient exactly once.
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    config: SolverConfig,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        HighsSolver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    fn update_config(&mut self, update: impl FnOnce(SolverConfig) -> SolverConfig) {
        self.config = update(std::mem::take(&mut self.config));
    }

    /// Set a time limit in seconds for subsequent solves.
    pub fn set_time_limit(&mut self, seconds: f64) {
        self.update_config(|config| config.with_time_limit(seconds));
    }

    /// Set a relative MIP gap for subsequent solves.
    pub fn set_mip_gap(&mut self, gap: f64) {
        self.update_config(|config| config.with_mip_gap(gap));
    }

    /// Set verbosity level for subsequent solves.
    pub fn set_verbosity(&mut self, level: u32) {
        self.update_config(|config| config.with_verbosity(level));
    }

    /// Enable or disable HiGHS logging to console.
    pub fn set_log_to_console(&mut self, enabled: bool) {
        self.update_config(|config| config.with_log_to_console(enabled));
    }
}

impl Solver for HighsSolver {
    fn solve(&mut self, model: &Model) -> Result<Solution, SolverError> {
        solve_model(model, &self.config)
    }
}

fn highs_model_error_to_solver_error(err: HighsModelError) -> SolverError {
    SolverError::SolverSpecific(err.to_string())
}

fn validate_model(model: &Model) -> Result<(), SolverError> {
    if model.num_variables() == 0 {
        return Err(SolverError::EmptyModel);
    }
    Ok(())
}

fn collect_objective_coefficients(
    model: &Model,
) -> Result<(Sense, BTreeMap<VariableId, f64>), SolverError> {
    let objective = model.objective();
    let Some(sense) = objective.sense else {
        return Err(SolverError::NoObjective);
    };

    let mut objective_coeffs: BTreeMap<VariableId, f64> = BTreeMap::new();
    for (var_id, coeff) in &objective.terms {
        model
            .get_variable(*var_id)
            .map_err(|_| SolverError::InvalidVariableId(var_id.inner()))?;
        *objective_coeffs.entry(*var_id).or_insert(0.0) += *coeff;
    }

    Ok((sense, objective_coeffs))
}

fn apply_solver_config(highs_model: &mut HighsModel, config: &SolverConfig) {
    highs_model.set_log_to_console(config.log_to_console.unwrap_or(false));

    if let Some(limit) = config.time_limit {
        highs_model.set_option("time_limit", HighsOption::Float(limit));
    }
    if let Some(gap) = config.mip_gap {
        highs_model.set_option("mip_rel_gap", HighsOption::Float(gap));
    }
    if let Some(level) = config.verbosity {
        highs_model.set_verbosity(level);
    }
    if let Some(threads) = config.threads {
        highs_model.set_option("threads", HighsOption::Int(threads as i32));
    }
    if let Some(tolerance) = config.tolerance {
        highs_model.set_option(
            "primal_feasibility_tolerance",
            HighsOption::Float(tolerance),
        );
        highs_model.set_option("dual_feasibility_tolerance", HighsOption::Float(tolerance));
    }
}

fn add_variables_to_highs(
    model: &Model,
    highs_model: &mut HighsModel,
    objective_coeffs: &BTreeMap<VariableId, f64>,
) -> BTreeMap<VariableId, usize> {
    let mut var_id_to_col = BTreeMap::new();

    for index in 0..model.num_variables() {
        let var_id = VariableId::new(index as u32);

        if let Ok(var) = model.get_variable(var_id) {
            let obj_coeff = objective_coeffs.get(&var_id).copied().unwrap_or(0.0);

            let col_idx = if var.is_integer {
                highs_model.add_integer_col(var.bounds.lower, var.bounds.upper, obj_coeff)
            } else {
                highs_model.add_col(var.bounds.lower, var.bounds.upper, obj_coeff)
            };
            var_id_to_col.insert(var_id, col_idx);

            trace!(
                component = "solver",
                operation = "add_variable",
                status = "success",
                var_id = var_id.inner(),
                col_idx,
                lower = var.bounds.lower,
                upper = var.bounds.upper,
                obj_coeff,
                is_integer = var.is_integer,
                "Added variable to HiGHS"
            );
        }
    }

    debug!(
        component = "solver",
        operation = "add_variables",
        status = "success",
        num_vars = model.num_variables(),
        "Added all variables to HiGHS"
    );

    var_id_to_col
}

type ConstraintEntries = BTreeMap<ConstraintId, (Vec<usize>, Vec<f64>)>;

fn build_constraint_entries(
    model: &Model,
    var_id_to_col: &BTreeMap<VariableId, usize>,
) -> ConstraintEntries {
    let matrix_build_started = Instant::now();
    let mut constraint_entries: ConstraintEntries = BTreeMap::new();

    for (var_id, column) in model.columns() {
        let Some(&col_idx) = var_id_to_col.get(&var_id) else {
            warn!(
                component = "solver",
                operation = "build_rows",
                status = "warn",
                var_id = var_id.inner(),
                "Variable missing HiGHS column index; skipping coefficients"
            );
            continue;
        };

        for (constraint_id, coeff) in column {
            let entry = constraint_entries
                .entry(*constraint_id)
                .or_insert_with(|| (Vec::new(), Vec::new()));
            entry.0.push(col_idx);
            entry.1.push(*coeff);
        }
    }

    let duration_ms = matrix_build_started.elapsed().as_secs_f64() * 1000.0;
    debug!(
        component = "solver",
        operation = "build_rows",
        status = "success",
        num_constraints = constraint_entries.len(),
        duration_ms = duration_ms,
        "Built constraint matrix"
    );

    constraint_entries
}

fn add_constraints_to_highs(
    model: &Model,
    highs_model: &mut HighsModel,
    constraint_entries: &mut ConstraintEntries,
) -> Result<(), SolverError> {
    for index in 0..model.num_constraints() {
        let constraint_id = ConstraintId::new(index as u32);

        if let Ok(constraint) = model.get_constraint(constraint_id) {
            let (col_indices, coefficients) = constraint_entries
                .remove(&constraint_id)
                .unwrap_or_else(|| (Vec::new(), Vec::new()));

            highs_model
                .add_row(
                    constraint.bounds.lower,
                    constraint.bounds.upper,
                    &col_indices,
                    &coefficients,
                )
                .map_err(highs_model_error_to_solver_error)?;

            trace!(
                component = "solver",
                operation = "add_constraint",
                status = "success",
                constraint_id = constraint_id.inner(),
                lower = constraint.bounds.lower,
                upper = constraint.bounds.upper,
                num_coeffs = col_indices.len(),
                "Added constraint to HiGHS"
            );
        }
    }

    debug!(
        component = "solver",
        operation = "add_constraints",
        status = "success",
        num_constraints = model.num_constraints(),
        "Added all constraints to HiGHS"
    );

    Ok(())
}

fn solve_model(model: &Model, config: &SolverConfig) -> Result<Solution, SolverError> {
    validate_model(model)?;

    let solve_started = Instant::now();

    debug!(
        component = "solver",
        operation = "solve",
        status = "success",
        solver = "highs",
        variables = model.num_variables() as u64,
        constraints = model.num_constraints() as u64,
        nnz = model.num_coefficients() as u64,
        "Starting solve process"
    );

    let (sense, objective_coeffs) = collect_objective_coefficients(model)?;

    let mut highs_model = HighsModel::new();
    apply_solver_config(&mut highs_model, config);

    let highs_sense = match sense {
        Sense::Minimize => ObjectiveSense::Minimize,
        Sense::Maximize => ObjectiveSense::Maximize,
    };
    highs_model.set_objective_sense(highs_sense);

    let var_id_to_col = add_variables_to_highs(model, &mut highs_model, &objective_coeffs);

    let mut constraint_entries = build_constraint_entries(model, &var_id_to_col);
    add_constraints_to_highs(model, &mut highs_model, &mut constraint_entries)?;

    let status = highs_model.solve();
    let solve_seconds = solve_started.elapsed().as_secs_f64();

    if !highs_has_solution(status) {
        warn!(
            component = "solver",
            operation = "solve",
            status = "warn",
            solver = "highs",
            solver_status = ?status,
            duration_ms = solve_seconds * 1000.0,
            "Solver did not find a solution"
        );
        return Err(SolverError::SolveFailure {
            status: highs_to_core_status(status),
        });
    }

    if status != HighsStatus::Optimal {
        warn!(
            component = "solver",
            operation = "solve",
            status = "warn",
            solver = "highs",
            solver_status = ?status,
            duration_ms = solve_seconds * 1000.0,
            "Solver hit limit but returning best solution found"
        );
    }

    let primal_values = highs_model
        .primal_values()
        .map_err(highs_model_error_to_solver_error)?;
    let objective_value = highs_model
        .objective_value()
        .map_err(highs_model_error_to_solver_error)?;

    debug!(
        component = "solver",
        operation = "extract_solution",
        status = "success",
        objective_value,
        num_primal_values = primal_values.len(),
        duration_ms = solve_seconds * 1000.0,
        "Solution extracted"
    );

    Ok(Solution {
        primal_values,
        objective_value,
        status: highs_to_core_status(status),
        solve_time_seconds: solve_seconds,
    })
}
