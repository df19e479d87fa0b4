//! # LCA Engine
//!
//! Least common ancestors of the unit under the two taxonomic relations.
//! The taxonomic subgraphs are fetched through the graph contract, rendered
//! as facts into the solver syntax, and solved against the ancestor
//! programs below; `leastCommon` atoms come back as edges from the unit's
//! free variable `X_0`.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::time::Instant;

use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::graph::{Edge, GraphAccess};
use crate::model::{canonicalize, Atom, EntityId, PredicateStyle, Term, UnitResponse, Variable};
use crate::solver;

/// Closure rules for the hypernym case: `instance_of` composes with
/// `subclass_of`, both collapse into `is_a`
const HYPERNYM_TRANSITIVE_CLOSURE: &str = "\
instance_of(X,Z) :- instance_of(X,Y), subclass_of(Y,Z).\n\
subclass_of(X,Z) :- subclass_of(X,Y), subclass_of(Y,Z).\n\
is_a(X,Y) :- instance_of(X,Y).\n\
is_a(X,Y) :- subclass_of(X,Y).\n";

/// Closure rule for the meronym case
const MERONYM_TRANSITIVE_CLOSURE: &str = "part_of(X,Z) :- part_of(X,Y), part_of(Y,Z).\n";

/// The ancestor program over relation `r`: common ancestors are entities
/// no seed fails to reach; least ones have no strictly lower common
/// ancestor, where mutual reachability (`equiv`) does not count as lower.
fn lca_rules(relation: &str) -> String {
    format!(
        "entity(X) :- {r}(X,_).\n\
         entity(X) :- {r}(_,X).\n\
         notAncestor(E) :- seed(S), entity(E), not {r}(S,E).\n\
         common(E) :- entity(E), not notAncestor(E).\n\
         equiv(X,Y) :- {r}(X,Y), {r}(Y,X).\n\
         noLeastCommon(E) :- common(E), {r}(C,E), common(C), not equiv(C,E).\n\
         leastCommon(X) :- common(X), not noLeastCommon(X).\n",
        r = relation
    )
}

/// Normalize a graph predicate to a solver relation name
fn solver_relation(predicate: &str) -> String {
    predicate.replace(' ', "_").to_lowercase()
}

/// Render seeds and edges as ground facts
fn render_facts(unit: &[EntityId], edges: &BTreeSet<Edge>) -> String {
    let mut facts = String::new();
    for entity in unit {
        let _ = writeln!(facts, "seed(\"{entity}\").");
    }
    for edge in edges {
        let _ = writeln!(
            facts,
            "{}(\"{}\",\"{}\").",
            solver_relation(&edge.predicate),
            edge.source,
            edge.target
        );
    }
    facts
}

/// Solve one ancestor program and lift `leastCommon` answers into atoms
/// sourced at the unit's free variable
fn solve_lca(program: &str, unit: &[EntityId], out_predicate: &str) -> PipelineResult<Vec<Atom>> {
    let model = solver::solve(program)?;
    let free = Variable::free(unit.to_vec());

    model
        .atoms_of("leastCommon")
        .into_iter()
        .filter_map(|tuple| tuple.into_iter().next())
        .map(|ancestor| {
            let target = EntityId::new(ancestor.clone()).map_err(|_| {
                PipelineError::Internal(format!("solver emitted malformed entity id: {ancestor}"))
            })?;
            Ok(Atom::new(
                Term::Variable(free.clone()),
                target,
                out_predicate,
            ))
        })
        .collect()
}

/// Seeds of the hypernym subgraph: the unit plus the targets of its
/// direct `instance_of` edges
pub(crate) fn hypernym_seeds(unit: &[EntityId], direct_instances: &[Edge]) -> Vec<EntityId> {
    let mut seeds: Vec<EntityId> = unit.to_vec();
    for edge in direct_instances {
        if edge.predicate.eq_ignore_ascii_case("instance_of") && !seeds.contains(&edge.target) {
            seeds.push(edge.target.clone());
        }
    }
    seeds
}

/// Populate `response.lca` with the hypernym and meronym least common
/// ancestors of the unit
pub async fn lca<G: GraphAccess>(
    graph: &G,
    response: &mut UnitResponse,
    style: PredicateStyle,
) -> PipelineResult<()> {
    let overall = Instant::now();
    let unit = response.unit.clone();

    let started = Instant::now();
    let direct_instances = graph.direct_instances(&unit).await?;
    response.record_time("direct_instances", started);

    let started = Instant::now();
    let direct_part_of = graph.direct_part_of(&unit).await?;
    response.record_time("direct_part_of", started);

    let started = Instant::now();
    let seeds = hypernym_seeds(&unit, &direct_instances);
    let mut raw_hypernyms: BTreeSet<Edge> = direct_instances.into_iter().collect();
    raw_hypernyms.extend(graph.hypernym_subgraph(&seeds).await?);
    response.record_time("subgraph_hypernyms", started);

    let started = Instant::now();
    let program = format!(
        "{}{}{}",
        render_facts(&unit, &raw_hypernyms),
        lca_rules("is_a"),
        HYPERNYM_TRANSITIVE_CLOSURE
    );
    let mut atoms = solve_lca(&program, &unit, style.is_a())?;
    debug!(hypernym_lca = atoms.len(), "hypernym_lca_done");
    response.record_time("hypernym_lca", started);

    // An empty direct part_of set skips the subgraph fetch; the seeds-only
    // program below still runs and yields no ancestors.
    let started = Instant::now();
    let raw_meronyms: BTreeSet<Edge> = if direct_part_of.is_empty() {
        BTreeSet::new()
    } else {
        graph.meronym_subgraph(&unit).await?.into_iter().collect()
    };
    response.record_time("subgraph_meronyms", started);

    let started = Instant::now();
    let program = format!(
        "{}{}{}",
        render_facts(&unit, &raw_meronyms),
        lca_rules("part_of"),
        MERONYM_TRANSITIVE_CLOSURE
    );
    let meronym_atoms = solve_lca(&program, &unit, style.part_of())?;
    debug!(meronym_lca = meronym_atoms.len(), "meronym_lca_done");
    atoms.extend(meronym_atoms);
    response.record_time("meronym_lca", started);

    response.lca = Some(canonicalize(atoms));
    response.record_time("lca", overall);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;

    fn eid(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    /// dog and cat meet at mammal; paw and tail are both part of body
    fn fixture() -> MemoryGraph {
        let mut g = MemoryGraph::new(PredicateStyle::new(false));
        // bn:00000001n dog, bn:00000002n cat
        g.add_edge("bn:00000001n", "subclass_of", "bn:00000011n").unwrap(); // canine
        g.add_edge("bn:00000011n", "subclass_of", "bn:00000013n").unwrap(); // mammal
        g.add_edge("bn:00000002n", "subclass_of", "bn:00000012n").unwrap(); // feline
        g.add_edge("bn:00000012n", "subclass_of", "bn:00000013n").unwrap();
        g.add_edge("bn:00000013n", "subclass_of", "bn:00000014n").unwrap(); // animal
        g
    }

    #[test]
    fn test_render_facts_quotes_and_normalizes() {
        let mut edges = BTreeSet::new();
        edges.insert(Edge::new(
            eid("bn:00000001n"),
            "SUBCLASS_OF",
            eid("bn:00000002n"),
        ));
        let facts = render_facts(&[eid("bn:00000001n")], &edges);
        assert!(facts.contains("seed(\"bn:00000001n\")."));
        assert!(facts.contains("subclass_of(\"bn:00000001n\",\"bn:00000002n\")."));
    }

    #[test]
    fn test_hypernym_seeds_extend_with_instance_targets() {
        let unit = vec![eid("bn:00000001n")];
        let direct = vec![
            Edge::new(eid("bn:00000001n"), "instance_of", eid("bn:00000004n")),
            Edge::new(eid("bn:00000001n"), "subclass_of", eid("bn:00000005n")),
        ];
        let seeds = hypernym_seeds(&unit, &direct);
        assert_eq!(seeds, vec![eid("bn:00000001n"), eid("bn:00000004n")]);
    }

    #[tokio::test]
    async fn test_lca_finds_nearest_common_hypernym() {
        let g = fixture();
        let mut response = UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        lca(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();

        let atoms = response.lca.unwrap();
        assert_eq!(atoms.len(), 1);
        let atom = &atoms[0];
        assert_eq!(atom.predicate, "is_a");
        assert_eq!(atom.target, Term::Entity(eid("bn:00000013n")));
        match &atom.source {
            Term::Variable(v) => {
                assert!(v.is_free);
                assert_eq!(v.to_string(), "X_0");
                assert_eq!(v.origin, vec![eid("bn:00000001n"), eid("bn:00000002n")]);
            }
            Term::Entity(_) => panic!("lca source must be the free variable"),
        }
    }

    #[tokio::test]
    async fn test_lca_upper_spelling() {
        let g = fixture();
        let mut response = UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        lca(&g, &mut response, PredicateStyle::new(true))
            .await
            .unwrap();
        assert_eq!(response.lca.unwrap()[0].predicate, "IS_A");
    }

    #[tokio::test]
    async fn test_lca_meronym_case() {
        let mut g = fixture();
        g.add_edge("bn:00000001n", "part_of", "bn:00000021n").unwrap();
        g.add_edge("bn:00000002n", "part_of", "bn:00000021n").unwrap();
        g.add_edge("bn:00000021n", "part_of", "bn:00000022n").unwrap();

        let mut response = UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        lca(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();

        let atoms = response.lca.unwrap();
        let part_of: Vec<&Atom> = atoms.iter().filter(|a| a.predicate == "part_of").collect();
        assert_eq!(part_of.len(), 1);
        assert_eq!(part_of[0].target, Term::Entity(eid("bn:00000021n")));
    }

    #[tokio::test]
    async fn test_lca_without_taxonomy_is_empty() {
        let mut g = MemoryGraph::new(PredicateStyle::new(false));
        g.add_edge("bn:00000001n", "color", "bn:00000008n").unwrap();

        let mut response = UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        lca(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();
        assert!(response.lca.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lca_records_step_timings() {
        let g = fixture();
        let mut response = UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        lca(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();
        let times = response.computation_times.unwrap();
        for key in [
            "direct_instances",
            "direct_part_of",
            "subgraph_hypernyms",
            "subgraph_meronyms",
            "hypernym_lca",
            "meronym_lca",
            "lca",
        ] {
            assert!(times.contains_key(key), "missing timing for {key}");
        }
    }
}
