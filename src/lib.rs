//! # neXSim Explanation Engine
//!
//! Explains why a unit of knowledge-graph entities belongs together. Given
//! an ordered tuple of entity identifiers, the pipeline derives four
//! artifacts: per-entity relational summaries, least common ancestors over
//! the two taxonomic relations, a symbolic characterization of the unit,
//! and a kernel explanation over LCA-rewritten summaries.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! unit (validated entity ids)
//!     ↓
//! [Summary Engine]        → per-entity transitively-closed summaries
//!     ↓
//! [LCA Engine]            → is_a / part_of least common ancestors
//!     │                     (taxonomic subgraphs rendered into the
//!     │                      stratified Datalog solver)
//!     ↓
//! [Characterization]      → anti-unification with bound variables
//!     ↓
//! [Kernel Rewriter]       → characterization of LCA-rewritten summaries
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nexsim::{characterization, graph::MemoryGraph, lca, model, summary};
//!
//! let mut response = model::UnitResponse::new(unit);
//! summary::full_summary(&graph, &mut response).await?;
//! lca::lca(&graph, &mut response, style).await?;
//! characterization::characterize(&mut response)?;
//! kernel::kernel_explanation(&mut response)?;
//! ```
//!
//! The pipeline is deterministic given the graph snapshot: every
//! externally visible atom list is canonically sorted, so equal requests
//! produce byte-identical responses.
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `model` | Entity ids, variables, atoms, summaries, response carrier |
//! | `solver` | Stratified Datalog-with-negation evaluation |
//! | `graph` | Read-only graph access (HTTP adapter + in-memory store) |
//! | `summary` | Summary extraction |
//! | `lca` | Least-common-ancestor computation |
//! | `characterization` | Pairwise anti-unification |
//! | `kernel` | Kernel explanation rewrite |
//! | `report` | Text/json unit reports |
//! | `http` | Axum endpoint surface |
//! | `config` | Layered configuration |

pub mod characterization;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod kernel;
pub mod lca;
pub mod model;
pub mod report;
pub mod solver;
pub mod summary;

// Re-export the types most callers need
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use model::{
    Atom, Entity, EntityId, EntityType, PredicateStyle, Summary, Term, UnitResponse, Variable,
};
