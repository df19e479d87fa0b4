//! # Graph Access
//!
//! Read-only view of the knowledge graph behind a narrow trait: the six
//! queries the pipeline depends on. Adapters are constructed at startup
//! and injected into the engines via the shared application state; there
//! is no module-level connection singleton.

pub mod http;
pub mod memory;

pub use http::HttpGraphStore;
pub use memory::MemoryGraph;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::model::{Atom, Entity, EntityId};

/// A labeled directed edge of the knowledge graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityId,
    pub predicate: String,
    pub target: EntityId,
}

impl Edge {
    pub fn new(source: EntityId, predicate: impl Into<String>, target: EntityId) -> Self {
        Edge {
            source,
            predicate: predicate.into(),
            target,
        }
    }

    pub fn to_atom(&self) -> Atom {
        Atom::new(
            self.source.clone(),
            self.target.clone(),
            self.predicate.clone(),
        )
    }
}

/// The read queries the pipeline issues against the knowledge graph.
///
/// Graph reads are the pipeline's only suspension points besides solver
/// invocations, hence the async surface.
#[allow(async_fn_in_trait)]
pub trait GraphAccess {
    /// Resolve entities for report enrichment
    async fn entities_by_id(&self, ids: &[EntityId]) -> PipelineResult<Vec<Entity>>;

    /// One-hop `instance_of`/`is_a`/`subclass_of` edges out of the unit
    async fn direct_instances(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>>;

    /// One-hop `part_of` edges out of the unit
    async fn direct_part_of(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>>;

    /// All `subclass_of` edges reachable from the seeds, de-duplicated
    async fn hypernym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>>;

    /// All `part_of` edges reachable from the seeds, de-duplicated
    async fn meronym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>>;

    /// The assembled per-entity summary union: every returned edge has a
    /// unit member as its source
    async fn full_summary(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>>;
}

/// The configured graph adapter, selected at startup
#[derive(Debug, Clone)]
pub enum GraphStore {
    Http(HttpGraphStore),
    Memory(MemoryGraph),
}

impl GraphAccess for GraphStore {
    async fn entities_by_id(&self, ids: &[EntityId]) -> PipelineResult<Vec<Entity>> {
        match self {
            GraphStore::Http(store) => store.entities_by_id(ids).await,
            GraphStore::Memory(store) => store.entities_by_id(ids).await,
        }
    }

    async fn direct_instances(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        match self {
            GraphStore::Http(store) => store.direct_instances(unit).await,
            GraphStore::Memory(store) => store.direct_instances(unit).await,
        }
    }

    async fn direct_part_of(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        match self {
            GraphStore::Http(store) => store.direct_part_of(unit).await,
            GraphStore::Memory(store) => store.direct_part_of(unit).await,
        }
    }

    async fn hypernym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        match self {
            GraphStore::Http(store) => store.hypernym_subgraph(seeds).await,
            GraphStore::Memory(store) => store.hypernym_subgraph(seeds).await,
        }
    }

    async fn meronym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        match self {
            GraphStore::Http(store) => store.meronym_subgraph(seeds).await,
            GraphStore::Memory(store) => store.meronym_subgraph(seeds).await,
        }
    }

    async fn full_summary(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        match self {
            GraphStore::Http(store) => store.full_summary(unit).await,
            GraphStore::Memory(store) => store.full_summary(unit).await,
        }
    }
}
