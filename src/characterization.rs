//! # Characterization Engine
//!
//! Anti-unification of the unit's summaries. Conjuncts shared verbatim
//! survive as-is; predicate signatures that reach distinct-but-parallel
//! constants on both sides are abstracted into fresh bound variables. The
//! summaries are folded pairwise, smallest first.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::{PipelineError, PipelineResult};
use crate::model::{canonicalize, Atom, EntityId, Summary, Term, UnitResponse, Variable};

/// A signature: the set of common predicates reaching one target
pub(crate) type PredicateSet = BTreeSet<String>;

/// Order signature sets canonically (cardinality descending, then
/// lexicographic) and drop duplicates. Bound-variable numbering follows
/// this order, which makes it stable across runs.
fn canonical_set_order(mut sets: Vec<PredicateSet>) -> Vec<PredicateSet> {
    sets.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.iter().cmp(b.iter()))
    });
    sets.dedup();
    sets
}

/// Remove every set that is a strict subset of another set in the list
pub(crate) fn clean_strict_subsets(sets: Vec<PredicateSet>) -> Vec<PredicateSet> {
    let sets = canonical_set_order(sets);
    let mut kept: Vec<PredicateSet> = Vec::new();
    for (i, candidate) in sets.iter().enumerate() {
        // Cardinality-descending order puts any strict superset earlier
        let covered = sets[..i]
            .iter()
            .any(|other| other.len() > candidate.len() && candidate.is_subset(other));
        if !covered {
            kept.push(candidate.clone());
        }
    }
    kept
}

/// All pairwise intersections between the two signature families,
/// duplicates collapsed
pub(crate) fn pairwise_intersections(
    left: &[PredicateSet],
    right: &[PredicateSet],
) -> Vec<PredicateSet> {
    let mut out: Vec<PredicateSet> = Vec::new();
    for l in left {
        for r in right {
            let intersection: PredicateSet = l.intersection(r).cloned().collect();
            if !out.contains(&intersection) {
                out.push(intersection);
            }
        }
    }
    out
}

/// Group atoms with an allowed predicate by target, collecting the
/// predicate set reaching each target. Variables key by printed form.
fn relation_map(atoms: &[Atom], allowed: &PredicateSet) -> BTreeMap<String, PredicateSet> {
    let mut map: BTreeMap<String, PredicateSet> = BTreeMap::new();
    for atom in atoms {
        if allowed.contains(&atom.predicate) {
            map.entry(atom.target.to_string())
                .or_default()
                .insert(atom.predicate.clone());
        }
    }
    map
}

/// The pairwise anti-unification operator.
///
/// Keeps atoms identical on both sides, then abstracts the remaining
/// shared predicate signatures into bound variables: maximal pairwise
/// intersections of the per-target signatures, minus the signatures
/// already covered by shared constants.
pub fn pairwise_characterization(
    left: &[Atom],
    right: &[Atom],
    free: &Variable,
) -> Vec<Atom> {
    let left_predicates: PredicateSet = left.iter().map(|a| a.predicate.clone()).collect();
    let right_predicates: PredicateSet = right.iter().map(|a| a.predicate.clone()).collect();
    let common_predicates: PredicateSet = left_predicates
        .intersection(&right_predicates)
        .cloned()
        .collect();

    let right_set: BTreeSet<&Atom> = right.iter().collect();
    let common: Vec<Atom> = canonicalize(
        left.iter()
            .filter(|a| right_set.contains(a))
            .cloned()
            .collect(),
    );

    let left_map = relation_map(left, &common_predicates);
    let right_map = relation_map(right, &common_predicates);
    let common_map = relation_map(&common, &common_predicates);

    let left_values: Vec<PredicateSet> = left_map.into_values().collect();
    let right_values: Vec<PredicateSet> = right_map.into_values().collect();
    let common_values = clean_strict_subsets(common_map.into_values().collect());

    let maximal = clean_strict_subsets(pairwise_intersections(&left_values, &right_values));

    // Signatures already present through shared constants stay constants
    let variables: Vec<PredicateSet> = maximal
        .into_iter()
        .filter(|signature| !common_values.contains(signature))
        .collect();

    let mut result = common;
    for (nominal, signature) in variables.iter().enumerate() {
        let bound = Variable::bound(nominal as u32);
        for predicate in signature {
            result.push(Atom::new(
                Term::Variable(free.clone()),
                Term::Variable(bound.clone()),
                predicate.clone(),
            ));
        }
    }

    canonicalize(result)
}

/// Substitute every occurrence of the summarized entity by the free
/// variable
fn normalize_summary(summary: &Summary, free: &Variable) -> Vec<Atom> {
    let entity = Term::Entity(summary.entity.clone());
    summary
        .atoms
        .iter()
        .map(|atom| {
            let mut atom = atom.clone();
            if atom.source == entity {
                atom.source = Term::Variable(free.clone());
            }
            if atom.target == entity {
                atom.target = Term::Variable(free.clone());
            }
            atom
        })
        .collect()
}

/// Fold the summaries (smallest first) through the pairwise operator
pub fn compute_characterization(
    summaries: &[Summary],
    unit: &[EntityId],
) -> PipelineResult<Vec<Atom>> {
    if summaries.len() <= 1 {
        return Err(PipelineError::InsufficientUnit);
    }

    let mut sorted: Vec<&Summary> = summaries.iter().collect();
    sorted.sort_by_key(|s| s.atoms.len());

    let free = Variable::free(unit.to_vec());

    let mut normalized = sorted.iter().map(|s| normalize_summary(s, &free));
    let mut acc = canonicalize(normalized.next().unwrap_or_default());
    for atoms in normalized {
        acc = pairwise_characterization(&acc, &atoms, &free);
    }

    Ok(acc)
}

/// Populate `response.characterization` and the global `tops`
pub fn characterize(response: &mut UnitResponse) -> PipelineResult<()> {
    let started = Instant::now();

    let summaries = response
        .summaries
        .as_ref()
        .ok_or_else(|| PipelineError::InvalidInput("summaries are missing".to_string()))?;

    let characterization = compute_characterization(summaries, &response.unit)?;

    let mut tops: BTreeSet<String> = BTreeSet::new();
    for atom in &characterization {
        tops.insert(atom.source.to_string());
        tops.insert(atom.target.to_string());
    }

    response.characterization = Some(characterization);
    response.tops = Some(tops.into_iter().collect());
    response.record_time("characterization", started);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn set(items: &[&str]) -> PredicateSet {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn summary(entity: &str, atoms: Vec<Atom>) -> Summary {
        Summary::from_atoms(eid(entity), atoms)
    }

    #[test]
    fn test_clean_strict_subsets_removes_covered_sets() {
        let cleaned = clean_strict_subsets(vec![
            set(&["is_a", "p"]),
            set(&["p"]),
            set(&["is_a"]),
            set(&["q"]),
        ]);
        assert_eq!(cleaned, vec![set(&["is_a", "p"]), set(&["q"])]);
    }

    #[test]
    fn test_clean_strict_subsets_keeps_equal_sets_once() {
        let cleaned = clean_strict_subsets(vec![set(&["p"]), set(&["p"])]);
        assert_eq!(cleaned, vec![set(&["p"])]);
    }

    #[test]
    fn test_pairwise_intersections_collapse_duplicates() {
        let out = pairwise_intersections(
            &[set(&["is_a", "p"]), set(&["is_a"])],
            &[set(&["is_a", "p"])],
        );
        assert_eq!(out, vec![set(&["is_a", "p"]), set(&["is_a"])]);
    }

    #[test]
    fn test_identical_single_atom_summaries_share_the_constant() {
        // Both entities is_a the same target: no bound variable appears.
        let target = eid("bn:00000010n");
        let a = summary(
            "bn:00000001n",
            vec![Atom::new(eid("bn:00000001n"), target.clone(), "is_a")],
        );
        let b = summary(
            "bn:00000002n",
            vec![Atom::new(eid("bn:00000002n"), target.clone(), "is_a")],
        );

        let unit = vec![eid("bn:00000001n"), eid("bn:00000002n")];
        let result = compute_characterization(&[a, b], &unit).unwrap();

        assert_eq!(result.len(), 1);
        let atom = &result[0];
        assert_eq!(atom.predicate, "is_a");
        assert_eq!(atom.source.to_string(), "X_0");
        assert_eq!(atom.target, Term::Entity(target));
    }

    #[test]
    fn test_parallel_constants_become_one_bound_variable() {
        // is_a and p reach c1 on one side and c2 on the other: one Y_0
        // carrying both predicates.
        let e1 = eid("bn:00000001n");
        let e2 = eid("bn:00000002n");
        let c1 = eid("bn:00000011n");
        let c2 = eid("bn:00000012n");
        let a = summary(
            "bn:00000001n",
            vec![
                Atom::new(e1.clone(), c1.clone(), "is_a"),
                Atom::new(e1.clone(), c1.clone(), "p"),
            ],
        );
        let b = summary(
            "bn:00000002n",
            vec![
                Atom::new(e2.clone(), c2.clone(), "is_a"),
                Atom::new(e2.clone(), c2.clone(), "p"),
            ],
        );

        let unit = vec![e1, e2];
        let result = compute_characterization(&[a, b], &unit).unwrap();

        assert_eq!(result.len(), 2);
        for atom in &result {
            assert_eq!(atom.source.to_string(), "X_0");
            assert_eq!(atom.target.to_string(), "Y_0");
        }
        let predicates: BTreeSet<&str> =
            result.iter().map(|a| a.predicate.as_str()).collect();
        assert_eq!(predicates, BTreeSet::from(["is_a", "p"]));
    }

    #[test]
    fn test_weaker_signature_is_stripped() {
        // One side has an extra lone is_a target; the {is_a} intersection
        // is a strict subset of {is_a, p} and disappears.
        let e1 = eid("bn:00000001n");
        let e2 = eid("bn:00000002n");
        let a = summary(
            "bn:00000001n",
            vec![
                Atom::new(e1.clone(), eid("bn:00000011n"), "is_a"),
                Atom::new(e1.clone(), eid("bn:00000011n"), "p"),
                Atom::new(e1.clone(), eid("bn:00000013n"), "is_a"),
            ],
        );
        let b = summary(
            "bn:00000002n",
            vec![
                Atom::new(e2.clone(), eid("bn:00000012n"), "is_a"),
                Atom::new(e2.clone(), eid("bn:00000012n"), "p"),
            ],
        );

        let unit = vec![e1, e2];
        let result = compute_characterization(&[a, b], &unit).unwrap();

        // Only Y_0 with both predicates; no second variable for {is_a}.
        let targets: BTreeSet<String> =
            result.iter().map(|a| a.target.to_string()).collect();
        assert_eq!(targets, BTreeSet::from(["Y_0".to_string()]));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_signature_covered_by_shared_constant_is_dropped() {
        // Both sides share is_a(X, c) verbatim and also reach private
        // constants with {is_a}: the signature is covered by the shared
        // constant, so no bound variable is added for it.
        let e1 = eid("bn:00000001n");
        let e2 = eid("bn:00000002n");
        let shared = eid("bn:00000010n");
        let a = summary(
            "bn:00000001n",
            vec![
                Atom::new(e1.clone(), shared.clone(), "is_a"),
                Atom::new(e1.clone(), eid("bn:00000011n"), "is_a"),
            ],
        );
        let b = summary(
            "bn:00000002n",
            vec![
                Atom::new(e2.clone(), shared.clone(), "is_a"),
                Atom::new(e2.clone(), eid("bn:00000012n"), "is_a"),
            ],
        );

        let unit = vec![e1, e2];
        let result = compute_characterization(&[a, b], &unit).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, Term::Entity(shared));
    }

    #[test]
    fn test_characterize_requires_two_summaries() {
        let unit = vec![eid("bn:00000001n")];
        let only = summary("bn:00000001n", vec![]);
        assert!(matches!(
            compute_characterization(&[only], &unit),
            Err(PipelineError::InsufficientUnit)
        ));
    }

    #[test]
    fn test_characterize_populates_tops_and_time() {
        let target = eid("bn:00000010n");
        let mut response =
            UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        response.summaries = Some(vec![
            summary(
                "bn:00000001n",
                vec![Atom::new(eid("bn:00000001n"), target.clone(), "is_a")],
            ),
            summary(
                "bn:00000002n",
                vec![Atom::new(eid("bn:00000002n"), target.clone(), "is_a")],
            ),
        ]);

        characterize(&mut response).unwrap();

        assert_eq!(
            response.tops,
            Some(vec!["X_0".to_string(), "bn:00000010n".to_string()])
        );
        assert!(response
            .computation_times
            .unwrap()
            .contains_key("characterization"));
    }

    #[test]
    fn test_characterize_is_idempotent() {
        let target = eid("bn:00000010n");
        let mut response =
            UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        response.summaries = Some(vec![
            summary(
                "bn:00000001n",
                vec![Atom::new(eid("bn:00000001n"), target.clone(), "is_a")],
            ),
            summary(
                "bn:00000002n",
                vec![Atom::new(eid("bn:00000002n"), target.clone(), "is_a")],
            ),
        ]);

        characterize(&mut response).unwrap();
        let first = response.characterization.clone();
        characterize(&mut response).unwrap();
        assert_eq!(first, response.characterization);
    }

    #[test]
    fn test_common_and_variable_atoms_are_disjoint() {
        let e1 = eid("bn:00000001n");
        let e2 = eid("bn:00000002n");
        let shared = eid("bn:00000010n");
        let a = summary(
            "bn:00000001n",
            vec![
                Atom::new(e1.clone(), shared.clone(), "lives_with"),
                Atom::new(e1.clone(), eid("bn:00000011n"), "has_trait"),
            ],
        );
        let b = summary(
            "bn:00000002n",
            vec![
                Atom::new(e2.clone(), shared.clone(), "lives_with"),
                Atom::new(e2.clone(), eid("bn:00000012n"), "has_trait"),
            ],
        );

        let unit = vec![e1, e2];
        let result = compute_characterization(&[a, b], &unit).unwrap();

        let constants: Vec<&Atom> = result
            .iter()
            .filter(|a| !a.target.is_variable())
            .collect();
        let variables: Vec<&Atom> =
            result.iter().filter(|a| a.target.is_variable()).collect();
        assert_eq!(constants.len(), 1);
        assert_eq!(constants[0].predicate, "lives_with");
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].predicate, "has_trait");
    }
}
