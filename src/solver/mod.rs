//! # Stratified Datalog-with-Negation Solver
//!
//! The reasoning backend for least-common-ancestor computation. The
//! pipeline renders facts and rules into the concrete syntax at one narrow
//! boundary ([`solve`] takes program text); everything above operates on
//! typed atoms.
//!
//! The accepted language is Datalog with stratified negation. Programs the
//! pipeline emits are stratified by construction, so the perfect model
//! computed here is the unique stable model.
//!
//! ## Pipeline
//!
//! ```text
//! program text
//!     ↓
//! [parser]     → Program (facts + rules)
//! [stratify]   → evaluation layers (negative edges strictly downward)
//! [eval]       → semi-naive fixpoint per stratum
//!     ↓
//! StableModel (read out via atoms_of)
//! ```

pub mod ast;
pub mod eval;
pub mod parser;
pub mod stratify;

pub use ast::{Atom, BodyPredicate, Program, Rule, Term};
pub use eval::StableModel;
pub use stratify::{DependencyGraph, DependencyType, Stratification};

use thiserror::Error;

/// Errors raised by the solver layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// Program text did not parse
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A rule is not range-restricted
    #[error("unsafe rule: {0}")]
    UnsafeRule(String),

    /// Negation cycles through the given relation
    #[error("program is not stratifiable: negative cycle through '{0}'")]
    Unstratifiable(String),
}

/// Ground and solve a program, returning its unique stable model
pub fn solve(program: &str) -> Result<StableModel, SolverError> {
    let parsed = parser::parse_program(program)?;
    eval::evaluate(&parsed)
}
