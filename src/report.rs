//! # Unit Report
//!
//! Renders a plain-text explanation of a unit, resolving entity labels
//! through the graph, and drives the full pipeline for the json report
//! mode. Atoms print as `predicate(source,target)` with main senses
//! substituted for known entity ids.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::time::Instant;

use crate::characterization::characterize;
use crate::error::PipelineResult;
use crate::graph::GraphAccess;
use crate::kernel::kernel_explanation;
use crate::lca::{hypernym_seeds, lca};
use crate::model::{Atom, Entity, EntityId, PredicateStyle, Term, UnitResponse};
use crate::summary::full_summary;

fn entity_label(id: &EntityId, involved: &BTreeMap<EntityId, Entity>) -> String {
    match involved.get(id) {
        Some(entity) if !entity.main_sense.is_empty() => {
            format!("\"{}[{}]\"", entity.main_sense, entity.id)
        }
        Some(entity) => format!("\"{}\"", entity.id),
        None => id.to_string(),
    }
}

fn term_label(term: &Term, involved: &BTreeMap<EntityId, Entity>) -> String {
    match term {
        Term::Entity(id) => entity_label(id, involved),
        Term::Variable(v) => v.to_string(),
    }
}

fn atom_label(atom: &Atom, involved: &BTreeMap<EntityId, Entity>) -> String {
    format!(
        "{}({},{})",
        atom.predicate,
        term_label(&atom.source, involved),
        term_label(&atom.target, involved)
    )
}

/// Render the full text report, computing any missing stage along the way
pub async fn report_text<G: GraphAccess>(
    graph: &G,
    response: &mut UnitResponse,
    style: PredicateStyle,
) -> PipelineResult<String> {
    let started = Instant::now();

    if response.unit.is_empty() {
        return Ok("Empty unit!".to_string());
    }

    let unit = response.unit.clone();
    let mut involved: BTreeMap<EntityId, Entity> = graph
        .entities_by_id(&unit)
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    let mut output = String::from("Unit: ");
    let labels: Vec<String> = unit.iter().map(|e| entity_label(e, &involved)).collect();
    output.push_str(&labels.join(", "));
    output.push_str("\n \n");

    if response.summaries.is_none() {
        full_summary(graph, response).await?;
    }

    // Pull in labels for every top outside the unit
    let mut outside: BTreeSet<EntityId> = BTreeSet::new();
    if let Some(summaries) = &response.summaries {
        for summary in summaries {
            for top in &summary.tops {
                if !unit.contains(top) {
                    outside.insert(top.clone());
                }
            }
        }
    }
    let outside: Vec<EntityId> = outside.into_iter().collect();
    for entity in graph.entities_by_id(&outside).await? {
        involved.insert(entity.id.clone(), entity);
    }

    if let Some(summaries) = &response.summaries {
        for summary in summaries {
            let _ = writeln!(
                output,
                "Summary for {}: ",
                entity_label(&summary.entity, &involved)
            );
            for atom in &summary.atoms {
                let _ = writeln!(output, "{}", atom_label(atom, &involved));
            }
            output.push('\n');
        }
    }

    if response.lca.is_none() {
        lca(graph, response, style).await?;
    }

    output.push_str("LCA: \n");
    if let Some(atoms) = &response.lca {
        for atom in atoms {
            let _ = writeln!(output, "{}", atom_label(atom, &involved));
        }
    }
    output.push('\n');

    let direct_instances = graph.direct_instances(&unit).await?;
    let direct_part_of = graph.direct_part_of(&unit).await?;
    let seeds = hypernym_seeds(&unit, &direct_instances);
    let raw_hypernyms = graph.hypernym_subgraph(&seeds).await?;
    let raw_meronyms = if direct_part_of.is_empty() {
        Vec::new()
    } else {
        graph.meronym_subgraph(&unit).await?
    };

    output.push_str("Direct Instances: \n");
    for edge in &direct_instances {
        let _ = writeln!(output, "{}", atom_label(&edge.to_atom(), &involved));
    }
    output.push_str("Raw Subgraph Hypernyms: \n");
    for edge in &raw_hypernyms {
        let _ = writeln!(output, "{}", atom_label(&edge.to_atom(), &involved));
    }
    output.push_str("Raw Subgraph Meronyms: \n");
    for edge in &raw_meronyms {
        let _ = writeln!(output, "{}", atom_label(&edge.to_atom(), &involved));
    }

    if response.characterization.is_none() {
        characterize(response)?;
    }

    output.push_str("Characterization: \n");
    if let Some(atoms) = &response.characterization {
        for atom in atoms {
            let _ = writeln!(output, "{}", atom_label(atom, &involved));
        }
    }
    output.push('\n');

    if response.kernel_explanation.is_none() {
        kernel_explanation(response)?;
    }

    output.push_str("Kernel Explanation: \n");
    if let Some(atoms) = &response.kernel_explanation {
        for atom in atoms {
            let _ = writeln!(output, "{}", atom_label(atom, &involved));
        }
    }
    output.push('\n');

    if let Some(times) = &response.computation_times {
        output.push_str("###############################\n");
        output.push_str("Computation Times: \n");
        for (stage, seconds) in times {
            let _ = writeln!(output, "{stage}: {seconds} s");
        }
        let _ = writeln!(
            output,
            "Total Computation Time: {} s",
            started.elapsed().as_secs_f64()
        );
        output.push_str("###############################");
    }

    Ok(output)
}

/// Run the whole pipeline for a fresh unit and return the populated
/// carrier
pub async fn report_json<G: GraphAccess>(
    graph: &G,
    unit: Vec<EntityId>,
    style: PredicateStyle,
) -> PipelineResult<UnitResponse> {
    let started = Instant::now();
    let mut response = UnitResponse::new(unit);

    full_summary(graph, &mut response).await?;
    characterize(&mut response)?;
    lca(graph, &mut response, style).await?;
    kernel_explanation(&mut response)?;

    response.record_time("total", started);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::model::EntityType;

    fn eid(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn named(id: &str, sense: &str) -> Entity {
        Entity {
            id: eid(id),
            main_sense: sense.to_string(),
            description: String::new(),
            synonyms: vec![],
            entity_type: EntityType::Concept,
            image_url: String::new(),
        }
    }

    fn fixture() -> MemoryGraph {
        let mut g = MemoryGraph::new(PredicateStyle::new(false));
        g.add_edge("bn:00000001n", "subclass_of", "bn:00000011n").unwrap();
        g.add_edge("bn:00000011n", "subclass_of", "bn:00000013n").unwrap();
        g.add_edge("bn:00000002n", "subclass_of", "bn:00000012n").unwrap();
        g.add_edge("bn:00000012n", "subclass_of", "bn:00000013n").unwrap();
        g.add_entity(named("bn:00000001n", "dog"));
        g.add_entity(named("bn:00000002n", "cat"));
        g.add_entity(named("bn:00000013n", "mammal"));
        g
    }

    #[test]
    fn test_entity_label_uses_main_sense() {
        let mut involved = BTreeMap::new();
        involved.insert(eid("bn:00000001n"), named("bn:00000001n", "dog"));
        assert_eq!(
            entity_label(&eid("bn:00000001n"), &involved),
            "\"dog[bn:00000001n]\""
        );
        assert_eq!(entity_label(&eid("bn:00000099n"), &involved), "bn:00000099n");
    }

    #[tokio::test]
    async fn test_empty_unit_report() {
        let g = fixture();
        let mut response = UnitResponse::new(vec![]);
        let report = report_text(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();
        assert_eq!(report, "Empty unit!");
    }

    #[tokio::test]
    async fn test_text_report_sections() {
        let g = fixture();
        let mut response =
            UnitResponse::new(vec![eid("bn:00000001n"), eid("bn:00000002n")]);
        let report = report_text(&g, &mut response, PredicateStyle::new(false))
            .await
            .unwrap();

        assert!(report.starts_with("Unit: \"dog[bn:00000001n]\", \"cat[bn:00000002n]\""));
        for section in [
            "Summary for",
            "LCA: ",
            "Direct Instances: ",
            "Raw Subgraph Hypernyms: ",
            "Raw Subgraph Meronyms: ",
            "Characterization: ",
            "Kernel Explanation: ",
            "Computation Times: ",
        ] {
            assert!(report.contains(section), "missing section {section}");
        }
        assert!(report.contains("is_a(X_0,\"mammal[bn:00000013n]\")"));
    }

    #[tokio::test]
    async fn test_json_report_populates_all_stages() {
        let g = fixture();
        let response = report_json(
            &g,
            vec![eid("bn:00000001n"), eid("bn:00000002n")],
            PredicateStyle::new(false),
        )
        .await
        .unwrap();

        assert!(response.summaries.is_some());
        assert!(response.lca.is_some());
        assert!(response.characterization.is_some());
        assert!(response.kernel_explanation.is_some());
        let times = response.computation_times.unwrap();
        assert!(times.contains_key("total"));
        assert!(times.contains_key("summary"));
        assert!(times.contains_key("ker"));
    }
}
