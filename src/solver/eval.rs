//! Bottom-up evaluation.
//!
//! Stratum-by-stratum semi-naive evaluation. Within a stratum, rules that
//! read a relation derived in the same stratum are re-fired with a delta
//! at each such occurrence until no new tuple appears; negated atoms only
//! ever consult strictly lower strata, so the computed perfect model is
//! the program's unique stable model.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::ast::{Atom, BodyPredicate, Program, Rule, Term};
use super::stratify::stratify;
use super::SolverError;

type Tuple = Vec<String>;
type Tuples = HashSet<Tuple>;
type Database = HashMap<String, Tuples>;

/// The unique stable model of a stratified program
#[derive(Debug, Clone, Default)]
pub struct StableModel {
    relations: BTreeMap<String, BTreeSet<Tuple>>,
}

impl StableModel {
    /// Tuples of the designated relation, in canonical (sorted) order
    pub fn atoms_of(&self, relation: &str) -> Vec<Tuple> {
        self.relations
            .get(relation)
            .map(|tuples| tuples.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, relation: &str, tuple: &[String]) -> bool {
        self.relations
            .get(relation)
            .is_some_and(|tuples| tuples.contains(tuple))
    }

    /// Total number of ground atoms in the model
    pub fn fact_count(&self) -> usize {
        self.relations.values().map(BTreeSet::len).sum()
    }
}

/// Evaluate a program to its stable model
pub fn evaluate(program: &Program) -> Result<StableModel, SolverError> {
    for rule in &program.rules {
        if !rule.is_safe() {
            return Err(SolverError::UnsafeRule(rule.to_string()));
        }
    }

    let stratification = stratify(program)?;
    let mut db: Database = HashMap::new();

    for bucket in &stratification.strata {
        let rules: Vec<&Rule> = bucket.iter().map(|&i| &program.rules[i]).collect();

        // Ground facts land directly; they seed the delta of their stratum.
        let mut delta: Database = HashMap::new();
        for rule in rules.iter().filter(|r| r.is_fact()) {
            let tuple: Tuple = rule
                .head
                .args
                .iter()
                .map(|t| match t {
                    Term::Constant(c) => c.clone(),
                    Term::Variable(_) | Term::Placeholder => unreachable!("facts are ground"),
                })
                .collect();
            if db
                .entry(rule.head.relation.clone())
                .or_default()
                .insert(tuple.clone())
            {
                delta
                    .entry(rule.head.relation.clone())
                    .or_default()
                    .insert(tuple);
            }
        }

        let derived: Vec<&Rule> = rules.iter().copied().filter(|r| !r.is_fact()).collect();
        if derived.is_empty() {
            continue;
        }

        let idb: HashSet<&str> = derived.iter().map(|r| r.head.relation.as_str()).collect();

        // First round: fire every rule against the full database.
        for rule in &derived {
            for tuple in fire(rule, &db, None) {
                if db
                    .entry(rule.head.relation.clone())
                    .or_default()
                    .insert(tuple.clone())
                {
                    delta
                        .entry(rule.head.relation.clone())
                        .or_default()
                        .insert(tuple);
                }
            }
        }

        // Delta rounds: re-fire with the delta substituted at each
        // occurrence of a same-stratum relation.
        while !delta.is_empty() {
            let mut next: Database = HashMap::new();
            for rule in &derived {
                let occurrences: Vec<usize> = positive_atoms(rule)
                    .iter()
                    .enumerate()
                    .filter(|(_, atom)| idb.contains(atom.relation.as_str()))
                    .map(|(i, _)| i)
                    .collect();

                for occurrence in occurrences {
                    for tuple in fire(rule, &db, Some((occurrence, &delta))) {
                        if db
                            .entry(rule.head.relation.clone())
                            .or_default()
                            .insert(tuple.clone())
                        {
                            next.entry(rule.head.relation.clone())
                                .or_default()
                                .insert(tuple);
                        }
                    }
                }
            }
            delta = next;
        }
    }

    let relations = db
        .into_iter()
        .map(|(name, tuples)| (name, tuples.into_iter().collect()))
        .collect();
    Ok(StableModel { relations })
}

fn positive_atoms<'a>(rule: &'a Rule) -> Vec<&'a Atom> {
    rule.body
        .iter()
        .filter_map(|pred| match pred {
            BodyPredicate::Positive(atom) => Some(atom),
            BodyPredicate::Negated(_) => None,
        })
        .collect()
}

fn negated_atoms<'a>(rule: &'a Rule) -> Vec<&'a Atom> {
    rule.body
        .iter()
        .filter_map(|pred| match pred {
            BodyPredicate::Negated(atom) => Some(atom),
            BodyPredicate::Positive(_) => None,
        })
        .collect()
}

/// Derive all head tuples of one rule. `delta_at` pins one positive-atom
/// occurrence to the delta relation set instead of the full database.
fn fire(rule: &Rule, db: &Database, delta_at: Option<(usize, &Database)>) -> Vec<Tuple> {
    let positives = positive_atoms(rule);
    let negatives = negated_atoms(rule);
    let mut results = Vec::new();
    let mut bindings: HashMap<String, String> = HashMap::new();
    join(
        rule,
        &positives,
        &negatives,
        0,
        db,
        delta_at,
        &mut bindings,
        &mut results,
    );
    results
}

#[allow(clippy::too_many_arguments)]
fn join(
    rule: &Rule,
    positives: &[&Atom],
    negatives: &[&Atom],
    depth: usize,
    db: &Database,
    delta_at: Option<(usize, &Database)>,
    bindings: &mut HashMap<String, String>,
    results: &mut Vec<Tuple>,
) {
    if depth == positives.len() {
        if negatives
            .iter()
            .all(|atom| !pattern_holds(atom, db, bindings))
        {
            results.push(instantiate_head(rule, bindings));
        }
        return;
    }

    let atom = positives[depth];
    let source = match delta_at {
        Some((occurrence, delta)) if occurrence == depth => delta.get(&atom.relation),
        _ => db.get(&atom.relation),
    };
    let Some(tuples) = source else {
        return;
    };

    for tuple in tuples {
        if tuple.len() != atom.args.len() {
            continue;
        }
        let mut bound_here: Vec<String> = Vec::new();
        let mut matched = true;
        for (arg, value) in atom.args.iter().zip(tuple) {
            match arg {
                Term::Constant(c) => {
                    if c != value {
                        matched = false;
                        break;
                    }
                }
                Term::Placeholder => {}
                Term::Variable(name) => match bindings.get(name) {
                    Some(existing) => {
                        if existing != value {
                            matched = false;
                            break;
                        }
                    }
                    None => {
                        bindings.insert(name.clone(), value.clone());
                        bound_here.push(name.clone());
                    }
                },
            }
        }

        if matched {
            join(
                rule, positives, negatives, depth + 1, db, delta_at, bindings, results,
            );
        }
        for name in bound_here {
            bindings.remove(&name);
        }
    }
}

/// Check whether any stored tuple matches a (possibly placeholder-holed)
/// negated pattern under the current bindings
fn pattern_holds(atom: &Atom, db: &Database, bindings: &HashMap<String, String>) -> bool {
    let Some(tuples) = db.get(&atom.relation) else {
        return false;
    };

    let pattern: Vec<Option<&String>> = atom
        .args
        .iter()
        .map(|arg| match arg {
            Term::Constant(c) => Some(c),
            // Safety guarantees negated variables are bound
            Term::Variable(name) => bindings.get(name),
            Term::Placeholder => None,
        })
        .collect();

    tuples.iter().any(|tuple| {
        tuple.len() == pattern.len()
            && pattern
                .iter()
                .zip(tuple)
                .all(|(expected, value)| expected.is_none_or(|e| e == value))
    })
}

fn instantiate_head(rule: &Rule, bindings: &HashMap<String, String>) -> Tuple {
    rule.head
        .args
        .iter()
        .map(|arg| match arg {
            Term::Constant(c) => c.clone(),
            Term::Variable(name) => bindings[name].clone(),
            Term::Placeholder => unreachable!("safe rules have no head placeholders"),
        })
        .collect()
}
