//! # Kernel Rewriter
//!
//! Builds the kernel explanation: each summary is rewritten into a
//! "summary-tilde" whose taxonomic edges are replaced by the unit's LCA
//! edges, then the characterization engine runs over the rewrites. A
//! target reached by several predicates keeps a synthetic taxonomic atom
//! as a redundancy signal.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::characterization::compute_characterization;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{Atom, Summary, Term, UnitResponse};

/// Rewrite one summary: keep non-taxonomic atoms, re-source the LCA atoms
/// at the entity, and add synthetic `is_a`/`part_of` atoms for targets
/// with a multi-predicate taxonomic signal
fn summary_tilde(summary: &Summary, lca: &[Atom]) -> Summary {
    let entity = Term::Entity(summary.entity.clone());

    // Predicates observed per target, across all atoms of the summary
    let mut names: BTreeMap<String, (Term, BTreeSet<String>)> = BTreeMap::new();
    let mut atoms: Vec<Atom> = Vec::new();

    for atom in &summary.atoms {
        names
            .entry(atom.target.to_string())
            .or_insert_with(|| (atom.target.clone(), BTreeSet::new()))
            .1
            .insert(atom.predicate.clone());
        if !atom.is_taxonomic() {
            atoms.push(atom.clone());
        }
    }

    for atom in lca {
        atoms.push(Atom::new(
            entity.clone(),
            atom.target.clone(),
            atom.predicate.clone(),
        ));
    }

    for (target, predicates) in names.values() {
        if predicates.len() > 1 {
            if predicates.contains("IS_A") || predicates.contains("is_a") {
                let spelling = if predicates.contains("IS_A") { "IS_A" } else { "is_a" };
                atoms.push(Atom::new(entity.clone(), target.clone(), spelling));
            }
            if predicates.contains("PART_OF") || predicates.contains("part_of") {
                let spelling = if predicates.contains("PART_OF") {
                    "PART_OF"
                } else {
                    "part_of"
                };
                atoms.push(Atom::new(entity.clone(), target.clone(), spelling));
            }
        }
    }

    Summary::from_atoms(summary.entity.clone(), atoms)
}

/// Populate `response.kernel_explanation`; requires both summaries and lca
pub fn kernel_explanation(response: &mut UnitResponse) -> PipelineResult<()> {
    let started = Instant::now();

    let summaries = response
        .summaries
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidInput("summaries are missing".to_string()))?;
    let lca = response
        .lca
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidInput("lca is missing".to_string()))?;

    let tildes: Vec<Summary> = summaries
        .iter()
        .map(|summary| summary_tilde(summary, lca))
        .collect();

    let kernel = compute_characterization(&tildes, &response.unit)?;

    response.kernel_explanation = Some(kernel);
    response.record_time("ker", started);
    Ok(())
}
