//! A conflict-driven solver for linear integer arithmetic: given integer
//! variables and a conjunction of linear inequalities (with clause and
//! cardinality constraints as specializations), decide satisfiability and
//! produce a satisfying assignment.

pub mod arguments;
pub mod basic_types;
pub mod constraints;
pub mod engine;
pub(crate) mod gourd_asserts;
pub mod heuristics;
pub mod parsers;
pub mod propagators;
pub mod result;

pub use crate::basic_types::{BoolLiteral, IntegerLiteral, Variable, VariableType};
pub use crate::engine::{Solver, SolverOptions, SolverStatus, Verbosity};
pub use crate::result::{GourdError, GourdResult};
