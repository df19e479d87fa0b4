//! In-process graph store.
//!
//! Backs tests and demos with the same read contract as the HTTP adapter.
//! The summary union is composed here from the primitive queries: direct
//! taxonomic hops, `subclass_of` closure (alone and behind one
//! `instance_of` hop), `part_of` closure with its predicate preserved, and
//! pass-through of all other outgoing predicates.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Edge, GraphAccess};
use crate::error::PipelineResult;
use crate::model::{Entity, EntityId, PredicateStyle};

/// A small in-memory edge store
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    edges: Vec<Edge>,
    entities: BTreeMap<EntityId, Entity>,
    style: PredicateStyle,
}

impl MemoryGraph {
    pub fn new(style: PredicateStyle) -> Self {
        MemoryGraph {
            edges: Vec::new(),
            entities: BTreeMap::new(),
            style,
        }
    }

    /// Insert one edge; identifiers are validated like any other input
    pub fn add_edge(
        &mut self,
        source: &str,
        predicate: &str,
        target: &str,
    ) -> PipelineResult<()> {
        let edge = Edge::new(
            EntityId::new(source)?,
            predicate,
            EntityId::new(target)?,
        );
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    fn outgoing<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.source == entity)
    }

    /// Targets reachable from `start` along `predicate`, one hop or more
    fn closure(&self, start: &EntityId, predicate: &str) -> BTreeSet<EntityId> {
        let mut reached = BTreeSet::new();
        let mut queue: VecDeque<EntityId> = VecDeque::new();
        queue.push_back(start.clone());
        let mut visited = BTreeSet::new();
        visited.insert(start.clone());

        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(&current) {
                if edge.predicate == predicate && visited.insert(edge.target.clone()) {
                    reached.insert(edge.target.clone());
                    queue.push_back(edge.target.clone());
                }
            }
        }
        // A cycle can lead back to the start; length >= 1 keeps it
        if self
            .edges
            .iter()
            .any(|e| e.predicate == predicate && e.target == *start && reached.contains(&e.source))
        {
            reached.insert(start.clone());
        }
        reached
    }

    /// All `predicate` edges reachable from the seeds following that
    /// predicate
    fn reachable_edges(&self, seeds: &[EntityId], predicate: &str) -> Vec<Edge> {
        let mut collected: BTreeSet<Edge> = BTreeSet::new();
        let mut queue: VecDeque<EntityId> = seeds.iter().cloned().collect();
        let mut visited: BTreeSet<EntityId> = seeds.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(&current) {
                if edge.predicate == predicate {
                    collected.insert(edge.clone());
                    if visited.insert(edge.target.clone()) {
                        queue.push_back(edge.target.clone());
                    }
                }
            }
        }
        collected.into_iter().collect()
    }
}

impl GraphAccess for MemoryGraph {
    async fn entities_by_id(&self, ids: &[EntityId]) -> PipelineResult<Vec<Entity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect())
    }

    async fn direct_instances(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        let names = [
            self.style.instance_of(),
            self.style.is_a(),
            self.style.subclass_of(),
        ];
        Ok(unit
            .iter()
            .flat_map(|e| self.outgoing(e))
            .filter(|edge| names.contains(&edge.predicate.as_str()))
            .cloned()
            .collect())
    }

    async fn direct_part_of(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        Ok(unit
            .iter()
            .flat_map(|e| self.outgoing(e))
            .filter(|edge| edge.predicate == self.style.part_of())
            .cloned()
            .collect())
    }

    async fn hypernym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        Ok(self.reachable_edges(seeds, self.style.subclass_of()))
    }

    async fn meronym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        Ok(self.reachable_edges(seeds, self.style.part_of()))
    }

    async fn full_summary(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        let style = self.style;
        let taxonomic = [
            style.instance_of(),
            style.subclass_of(),
            style.is_a(),
            style.part_of(),
        ];
        let mut rows: BTreeSet<Edge> = BTreeSet::new();

        for entity in unit {
            // Direct is_a / instance_of hops, relabeled is_a
            for edge in self.outgoing(entity) {
                if edge.predicate == style.is_a() || edge.predicate == style.instance_of() {
                    rows.insert(Edge::new(
                        entity.clone(),
                        style.is_a(),
                        edge.target.clone(),
                    ));
                }
            }

            // subclass_of closure, relabeled is_a
            for target in self.closure(entity, style.subclass_of()) {
                rows.insert(Edge::new(entity.clone(), style.is_a(), target));
            }

            // One instance_of hop, then the subclass_of closure
            for edge in self.outgoing(entity) {
                if edge.predicate == style.instance_of() {
                    for target in self.closure(&edge.target, style.subclass_of()) {
                        rows.insert(Edge::new(entity.clone(), style.is_a(), target));
                    }
                }
            }

            // part_of closure with its predicate preserved
            for target in self.closure(entity, style.part_of()) {
                rows.insert(Edge::new(entity.clone(), style.part_of(), target));
            }

            // Everything else passes through untouched
            for edge in self.outgoing(entity) {
                if !taxonomic.contains(&edge.predicate.as_str()) {
                    rows.insert(edge.clone());
                }
            }
        }

        Ok(rows.into_iter().collect())
    }
}
