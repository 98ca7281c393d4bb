//! The [`Model`] builder for linear and mixed-integer programs.
//!
//! Variables and constraints are registered eagerly against a single
//! model instance; the internal representation is column-first sparse
//! storage (variable -> rows it appears in). Solver backends consume
//! the model read-only through [`crate::solver::Solver`].

use crate::error::ModelError;
use crate::types::{Bounds, Constraint, Objective, Sense, Variable};
use reparto_expr::{ComparisonSense, ConstraintExpr, Expr};
use reparto_expr::{ConstraintId, VariableId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Model {
    variables: BTreeMap<VariableId, Variable>,
    constraints: BTreeMap<ConstraintId, Constraint>,
    objective: Objective,
    // Column-first sparse storage: variable -> vec of (constraint, coefficient).
    columns: BTreeMap<VariableId, Vec<(ConstraintId, f64)>>,
    next_variable_id: u32,
    next_constraint_id: u32,
    variable_names: BTreeMap<VariableId, String>,
    constraint_names: BTreeMap<ConstraintId, String>,
}

impl Model {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Variable declaration ────────────────────────────────

    /// Add a variable to the model.
    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, ModelError> {
        if variable.bounds.lower.is_nan()
            || variable.bounds.upper.is_nan()
            || variable.bounds.lower > variable.bounds.upper
        {
            return Err(ModelError::InvalidVariableBounds {
                lower: variable.bounds.lower,
                upper: variable.bounds.upper,
            });
        }

        let id = VariableId::new(self.next_variable_id);
        self.next_variable_id += 1;
        self.variables.insert(id, variable);
        Ok(id)
    }

    /// Declare a named continuous variable with `[lower, upper]` bounds.
    pub fn add_continuous(
        &mut self,
        lower: f64,
        upper: f64,
        name: impl Into<String>,
    ) -> Result<VariableId, ModelError> {
        let id = self.add_variable(Variable::continuous(Bounds::new(lower, upper)))?;
        self.variable_names.insert(id, name.into());
        Ok(id)
    }

    /// Declare a named integer variable with `[lower, upper]` bounds.
    pub fn add_integer(
        &mut self,
        lower: f64,
        upper: f64,
        name: impl Into<String>,
    ) -> Result<VariableId, ModelError> {
        let id = self.add_variable(Variable::integer(Bounds::new(lower, upper)))?;
        self.variable_names.insert(id, name.into());
        Ok(id)
    }

    /// Declare a named binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> Result<VariableId, ModelError> {
        let id = self.add_variable(Variable::binary())?;
        self.variable_names.insert(id, name.into());
        Ok(id)
    }

    // ── Constraint registration ─────────────────────────────

    /// Add a constraint row to the model.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, ModelError> {
        if constraint.bounds.lower.is_nan()
            || constraint.bounds.upper.is_nan()
            || constraint.bounds.lower > constraint.bounds.upper
        {
            return Err(ModelError::InvalidConstraintBounds {
                lower: constraint.bounds.lower,
                upper: constraint.bounds.upper,
            });
        }

        let id = ConstraintId::new(self.next_constraint_id);
        self.next_constraint_id += 1;
        self.constraints.insert(id, constraint);
        Ok(id)
    }

    /// Add a constraint from an expression and explicit row bounds.
    pub fn add_expr_constraint(
        &mut self,
        expr: Expr,
        bounds: Bounds,
    ) -> Result<ConstraintId, ModelError> {
        let constraint_id = self.add_constraint(Constraint { bounds })?;
        for (var_id, coeff) in expr.normalized_terms() {
            self.set_coefficient(var_id, constraint_id, coeff)?;
        }
        Ok(constraint_id)
    }

    /// Add a constraint from a comparison expression (e.g. `x + y <= 10`).
    pub fn add_constraint_expr(
        &mut self,
        constraint: ConstraintExpr,
    ) -> Result<ConstraintId, ModelError> {
        let (expr, sense, rhs) = constraint.into_parts();
        let bounds = match sense {
            ComparisonSense::LessEqual => Bounds::new(f64::NEG_INFINITY, rhs),
            ComparisonSense::GreaterEqual => Bounds::new(rhs, f64::INFINITY),
            ComparisonSense::Equal => Bounds::new(rhs, rhs),
        };
        self.add_expr_constraint(expr, bounds)
    }

    /// Add a named constraint from a comparison expression.
    pub fn add_named_constraint(
        &mut self,
        constraint: ConstraintExpr,
        name: impl Into<String>,
    ) -> Result<ConstraintId, ModelError> {
        let id = self.add_constraint_expr(constraint)?;
        self.constraint_names.insert(id, name.into());
        Ok(id)
    }

    /// Set a coefficient at the intersection of a variable column and a
    /// constraint row.
    pub fn set_coefficient(
        &mut self,
        var_id: VariableId,
        constraint_id: ConstraintId,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !coefficient.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient });
        }
        self.ensure_variable_exists(var_id)?;
        self.ensure_constraint_exists(constraint_id)?;

        let column = self.columns.entry(var_id).or_default();
        match column.iter_mut().find(|(cid, _)| *cid == constraint_id) {
            Some((_, existing)) => *existing = coefficient,
            None => column.push((constraint_id, coefficient)),
        }
        Ok(())
    }

    // ── Objective ───────────────────────────────────────────

    /// Set the objective function, replacing any existing one.
    pub fn set_objective(&mut self, objective: Objective) -> Result<(), ModelError> {
        let sense = objective.sense.ok_or(ModelError::NoObjective)?;
        for (var_id, coeff) in &objective.terms {
            self.ensure_variable_exists(*var_id)?;
            if !coeff.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coeff,
                });
            }
        }

        let terms = Expr::from_terms(objective.terms).normalized_terms();
        tracing::debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            sense = ?sense,
            terms = terms.len(),
            "Set objective function"
        );
        self.objective = Objective {
            sense: Some(sense),
            terms,
        };
        Ok(())
    }

    /// Minimize a linear expression.
    ///
    /// Returns an error if the model already has an objective.
    pub fn minimize(&mut self, expr: Expr) -> Result<(), ModelError> {
        if self.objective.sense.is_some() {
            return Err(ModelError::MultipleObjectives);
        }
        self.set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: expr.into_terms(),
        })
    }

    /// Maximize a linear expression.
    ///
    /// Returns an error if the model already has an objective.
    pub fn maximize(&mut self, expr: Expr) -> Result<(), ModelError> {
        if self.objective.sense.is_some() {
            return Err(ModelError::MultipleObjectives);
        }
        self.set_objective(Objective {
            sense: Some(Sense::Maximize),
            terms: expr.into_terms(),
        })
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_coefficients(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn get_variable(&self, id: VariableId) -> Result<&Variable, ModelError> {
        self.variables
            .get(&id)
            .ok_or(ModelError::InvalidVariableId(id))
    }

    pub fn get_constraint(&self, id: ConstraintId) -> Result<&Constraint, ModelError> {
        self.constraints
            .get(&id)
            .ok_or(ModelError::InvalidConstraintId(id))
    }

    /// Column-first iteration: each variable with the rows it appears in.
    pub fn columns(&self) -> impl Iterator<Item = (VariableId, &Vec<(ConstraintId, f64)>)> {
        self.columns.iter().map(|(id, col)| (*id, col))
    }

    pub fn variable_name(&self, id: VariableId) -> Option<&str> {
        self.variable_names.get(&id).map(String::as_str)
    }

    pub fn constraint_name(&self, id: ConstraintId) -> Option<&str> {
        self.constraint_names.get(&id).map(String::as_str)
    }

    fn ensure_variable_exists(&self, id: VariableId) -> Result<(), ModelError> {
        if self.variables.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidVariableId(id))
        }
    }

    fn ensure_constraint_exists(&self, id: ConstraintId) -> Result<(), ModelError> {
        if self.constraints.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidConstraintId(id))
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn new_model_is_empty() {
        let model = Model::new();
        assert_eq!(model.num_variables(), 0);
        assert_eq!(model.num_constraints(), 0);
        assert_eq!(model.num_coefficients(), 0);
    }

    #[test]
    fn named_variable_declaration() {
        let mut model = Model::new();
        let x = model.add_continuous(0.0, 10.0, "x").unwrap();
        let n = model.add_integer(0.0, 5.0, "n").unwrap();
        let b = model.add_binary("b").unwrap();

        assert_eq!(model.num_variables(), 3);
        assert_eq!(model.variable_name(x), Some("x"));
        assert!(!model.get_variable(x).unwrap().is_integer);
        assert!(model.get_variable(n).unwrap().is_integer);
        let b_var = model.get_variable(b).unwrap();
        assert!(b_var.is_integer);
        assert_eq!(b_var.bounds.upper, 1.0);
    }

    #[test]
    fn variable_bounds_validation() {
        let mut model = Model::new();
        let result = model.add_continuous(5.0, 1.0, "bad");
        assert!(matches!(
            result,
            Err(ModelError::InvalidVariableBounds { .. })
        ));
    }

    #[test]
    fn constraint_bounds_validation() {
        let mut model = Model::new();
        let result = model.add_constraint(Constraint {
            bounds: Bounds::new(10.0, 0.0),
        });
        assert!(matches!(
            result,
            Err(ModelError::InvalidConstraintBounds { .. })
        ));
    }

    #[test]
    fn constraint_from_comparison() {
        let mut model = Model::new();
        let x = model.add_continuous(0.0, 1.0, "x").unwrap();
        let con = model
            .add_constraint_expr(Expr::var(x).ge_scalar(2.0))
            .unwrap();
        let stored = model.get_constraint(con).unwrap();
        assert_eq!(stored.bounds.lower, 2.0);
        assert!(stored.bounds.upper.is_infinite());
    }

    #[test]
    fn equality_constraint_pins_both_bounds() {
        let mut model = Model::new();
        let x = model.add_continuous(0.0, 10.0, "x").unwrap();
        let y = model.add_continuous(0.0, 10.0, "y").unwrap();
        let con = model
            .add_constraint_expr((Expr::var(x) + Expr::var(y)).eq_scalar(4.0))
            .unwrap();
        let stored = model.get_constraint(con).unwrap();
        assert_eq!(stored.bounds.lower, 4.0);
        assert_eq!(stored.bounds.upper, 4.0);
        assert_eq!(model.num_coefficients(), 2);
    }

    #[test]
    fn coefficients_persist_in_columns() {
        let mut model = Model::new();
        let v1 = model.add_continuous(0.0, 10.0, "v1").unwrap();
        let v2 = model.add_integer(-5.0, 5.0, "v2").unwrap();
        let c1 = model
            .add_constraint(Constraint {
                bounds: Bounds::new(0.0, 15.0),
            })
            .unwrap();
        let c2 = model
            .add_constraint(Constraint {
                bounds: Bounds::new(-10.0, 10.0),
            })
            .unwrap();

        model.set_coefficient(v1, c1, 1.5).unwrap();
        model.set_coefficient(v1, c2, -2.0).unwrap();
        model.set_coefficient(v2, c2, 3.5).unwrap();

        let cols: BTreeMap<_, _> = model.columns().collect();
        assert_eq!(cols[&v1], &vec![(c1, 1.5), (c2, -2.0)]);
        assert_eq!(cols[&v2], &vec![(c2, 3.5)]);
    }

    #[test]
    fn set_coefficient_rejects_unknown_ids() {
        let mut model = Model::new();
        let c = model
            .add_constraint(Constraint {
                bounds: Bounds::new(0.0, 1.0),
            })
            .unwrap();
        let ghost = VariableId::new(99);
        assert_eq!(
            model.set_coefficient(ghost, c, 1.0),
            Err(ModelError::InvalidVariableId(ghost))
        );
    }

    #[test]
    fn objective_terms_are_normalized() {
        let mut model = Model::new();
        let x = model.add_continuous(0.0, 10.0, "x").unwrap();
        model
            .maximize(Expr::term(x, 1.0) + Expr::term(x, 2.0))
            .unwrap();
        assert_eq!(model.objective().terms, vec![(x, 3.0)]);
        assert_eq!(model.objective().sense, Some(Sense::Maximize));
    }

    #[test]
    fn second_objective_rejected() {
        let mut model = Model::new();
        let x = model.add_continuous(0.0, 10.0, "x").unwrap();
        model.minimize(Expr::var(x)).unwrap();
        assert_eq!(
            model.maximize(Expr::var(x)),
            Err(ModelError::MultipleObjectives)
        );
    }
}
