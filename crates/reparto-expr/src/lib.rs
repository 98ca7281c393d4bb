//! Typed identifiers and linear expressions for reparto models.

pub mod expr;
pub mod ids;

pub use expr::{ComparisonSense, ConstraintExpr, Expr};
pub use ids::{ConstraintId, VariableId};
