#![allow(clippy::float_cmp)]

use reparto_core::{Bounds, Constraint, Model, Objective, Sense, Solver, SolverError, Variable};
use reparto_highs::HighsSolver;

/// Test: minimize 2x + 3y subject to x + y >= 5, x,y >= 0
#[test]
fn test_simple_lp() {
    let mut model = Model::new();

    let x = model
        .add_variable(Variable::continuous(Bounds::new(0.0, f64::INFINITY)))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous(Bounds::new(0.0, f64::INFINITY)))
        .unwrap();

    let constraint = model
        .add_constraint(Constraint {
            bounds: Bounds::new(5.0, f64::INFINITY),
        })
        .unwrap();
    model.set_coefficient(x, constraint, 1.0).unwrap();
    model.set_coefficient(y, constraint, 1.0).unwrap();

    model
        .set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: vec![(x, 2.0), (y, 3.0)],
        })
        .unwrap();

    let mut solver = HighsSolver::new();
    let solution = solver.solve(&model).expect("Failed to solve");

    // Expected optimal solution: x = 5, y = 0, objective = 10.
    assert!(
        (solution.objective_value - 10.0).abs() < 1e-6,
        "Expected objective value 10.0, got {}",
        solution.objective_value
    );
    assert!(solution.is_optimal());
}

/// Test: maximize integer x subject to x <= 1.5, x integer
#[test]
fn test_integer_variable_solution() {
    let mut model = Model::new();

    let x = model.add_integer(0.0, 10.0, "x").unwrap();

    let constraint = model
        .add_constraint(Constraint {
            bounds: Bounds::new(f64::NEG_INFINITY, 1.5),
        })
        .unwrap();
    model.set_coefficient(x, constraint, 1.0).unwrap();

    model
        .set_objective(Objective {
            sense: Some(Sense::Maximize),
            terms: vec![(x, 1.0)],
        })
        .unwrap();

    let mut solver = HighsSolver::new();
    let solution = solver.solve(&model).expect("Failed to solve");

    let x_value = solution
        .get_primal(x.index())
        .expect("missing primal value");
    assert!(
        (x_value - 1.0).abs() < 1e-6,
        "Expected integer x = 1.0, got {}",
        x_value
    );
    assert!(
        (solution.objective_value - 1.0).abs() < 1e-6,
        "Expected integer objective value 1.0, got {}",
        solution.objective_value
    );
}

/// Infeasible and unbounded problems surface as SolveFailure.
#[test]
fn test_solve_failure_statuses() {
    // x >= 10 and x <= 5 simultaneously.
    let mut model = Model::new();
    let x = model.add_continuous(0.0, 10.0, "x").unwrap();
    let c1 = model
        .add_constraint(Constraint {
            bounds: Bounds::new(10.0, f64::INFINITY),
        })
        .unwrap();
    let c2 = model
        .add_constraint(Constraint {
            bounds: Bounds::new(f64::NEG_INFINITY, 5.0),
        })
        .unwrap();
    model.set_coefficient(x, c1, 1.0).unwrap();
    model.set_coefficient(x, c2, 1.0).unwrap();
    model
        .set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: vec![(x, 1.0)],
        })
        .unwrap();

    let mut solver = HighsSolver::new();
    let result = solver.solve(&model);
    assert!(
        matches!(result, Err(SolverError::SolveFailure { .. })),
        "Infeasible problem should fail to solve"
    );

    // Maximize an unbounded variable.
    let mut unbounded = Model::new();
    let y = unbounded.add_continuous(0.0, f64::INFINITY, "y").unwrap();
    unbounded
        .set_objective(Objective {
            sense: Some(Sense::Maximize),
            terms: vec![(y, 1.0)],
        })
        .unwrap();

    let result = solver.solve(&unbounded);
    assert!(
        matches!(result, Err(SolverError::SolveFailure { .. })),
        "Unbounded problem should fail to solve"
    );
}

/// A constraint with no coefficients is passed through as an empty row.
#[test]
fn test_empty_constraint_row() {
    let mut model = Model::new();
    let x = model.add_continuous(0.0, 10.0, "x").unwrap();
    model
        .add_constraint(Constraint {
            bounds: Bounds::new(f64::NEG_INFINITY, 1.0),
        })
        .unwrap();
    model
        .set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: vec![(x, 1.0)],
        })
        .unwrap();

    let mut solver = HighsSolver::new();
    let solution = solver.solve(&model).expect("Failed to solve");
    assert!((solution.objective_value - 0.0).abs() < 1e-6);
}

/// Solving the same model twice yields the same result.
#[test]
fn test_repeat_solve_is_deterministic() {
    let mut model = Model::new();
    let x = model.add_continuous(0.0, 10.0, "x").unwrap();
    let y = model.add_continuous(0.0, 10.0, "y").unwrap();
    let c = model
        .add_constraint(Constraint {
            bounds: Bounds::new(4.0, 4.0),
        })
        .unwrap();
    model.set_coefficient(x, c, 1.0).unwrap();
    model.set_coefficient(y, c, 1.0).unwrap();
    model
        .set_objective(Objective {
            sense: Some(Sense::Minimize),
            terms: vec![(x, 1.0), (y, 2.0)],
        })
        .unwrap();

    let mut solver = HighsSolver::new();
    let first = solver.solve(&model).unwrap();
    let second = solver.solve(&model).unwrap();
    assert_eq!(first.objective_value, second.objective_value);
    assert_eq!(first.primal_values, second.primal_values);
}
