//! Stratification for solver programs.
//!
//! Groups rules into evaluation layers so that a negated relation is fully
//! computed before any rule that negates it runs. A program with a
//! negative dependency cycle has no stratification and is rejected.

use std::collections::{BTreeMap, BTreeSet};

use super::ast::Program;
use super::SolverError;

/// Type of dependency between relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// Head depends on relation via a positive atom; may share a stratum
    Positive,
    /// Head negates relation; the negated relation must sit strictly lower
    Negative,
}

/// Dependency graph with positive/negative edges between relations
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// head relation -> (body relation, dependency type)
    pub edges: BTreeMap<String, Vec<(String, DependencyType)>>,
    /// All relations in the program
    pub relations: BTreeSet<String>,
}

impl DependencyGraph {
    pub fn from_program(program: &Program) -> Self {
        let mut edges: BTreeMap<String, Vec<(String, DependencyType)>> = BTreeMap::new();
        let mut relations = BTreeSet::new();

        for rule in &program.rules {
            relations.insert(rule.head.relation.clone());
            let entry = edges.entry(rule.head.relation.clone()).or_default();
            for pred in &rule.body {
                let relation = pred.atom().relation.clone();
                relations.insert(relation.clone());
                let dep = if pred.is_negated() {
                    DependencyType::Negative
                } else {
                    DependencyType::Positive
                };
                entry.push((relation, dep));
            }
        }

        DependencyGraph { edges, relations }
    }
}

/// A stratification: stratum index per relation plus rule indices grouped
/// by the stratum of their head
#[derive(Debug, Clone)]
pub struct Stratification {
    pub stratum_of: BTreeMap<String, usize>,
    /// Rule indices into the program, one bucket per stratum, ascending
    pub strata: Vec<Vec<usize>>,
}

/// Assign strata by relaxation: a positive dependency pulls the head to at
/// least the body's stratum, a negative one to strictly above it. A
/// stratum exceeding the relation count witnesses a negative cycle.
pub fn stratify(program: &Program) -> Result<Stratification, SolverError> {
    let graph = DependencyGraph::from_program(program);
    let max_stratum = graph.relations.len();

    let mut stratum_of: BTreeMap<String, usize> =
        graph.relations.iter().map(|r| (r.clone(), 0)).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for (head, deps) in &graph.edges {
            for (body, dep) in deps {
                let required = match dep {
                    DependencyType::Positive => stratum_of[body],
                    DependencyType::Negative => stratum_of[body] + 1,
                };
                if stratum_of[head] < required {
                    if required > max_stratum {
                        return Err(SolverError::Unstratifiable(head.clone()));
                    }
                    stratum_of.insert(head.clone(), required);
                    changed = true;
                }
            }
        }
    }

    let top = stratum_of.values().copied().max().unwrap_or(0);
    let mut strata: Vec<Vec<usize>> = vec![Vec::new(); top + 1];
    for (index, rule) in program.rules.iter().enumerate() {
        strata[stratum_of[&rule.head.relation]].push(index);
    }

    Ok(Stratification { stratum_of, strata })
}
