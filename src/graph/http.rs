//! HTTP adapter for a Neo4j-compatible graph database.
//!
//! Issues the read queries over the transaction endpoint
//! (`POST {uri}/db/{database}/tx/commit`) with basic auth. Connection
//! failures and server-side errors surface as `Upstream` so the pipeline
//! aborts at the request boundary.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Edge, GraphAccess};
use crate::config::GraphConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{Entity, EntityId, EntityType, PredicateStyle};

/// Graph adapter over the HTTP transaction endpoint
#[derive(Debug, Clone)]
pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoint: String,
    user: String,
    password: String,
    style: PredicateStyle,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpGraphStore {
    pub fn new(config: &GraphConfig, style: PredicateStyle) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::Upstream(e.to_string()))?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        Ok(HttpGraphStore {
            client,
            endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
            style,
        })
    }

    /// Run one statement and return its rows as column-name maps
    async fn run(
        &self,
        statement: String,
        parameters: Value,
    ) -> PipelineResult<Vec<BTreeMap<String, Value>>> {
        debug!(endpoint = %self.endpoint, "graph_query");
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Upstream(format!(
                "graph database answered {status}"
            )));
        }

        let parsed: TxResponse = response.json().await?;
        if let Some(error) = parsed.errors.first() {
            return Err(PipelineError::Upstream(format!(
                "graph query failed: {} {}",
                error.code, error.message
            )));
        }

        let Some(result) = parsed.results.into_iter().next() else {
            return Ok(Vec::new());
        };

        Ok(result
            .data
            .into_iter()
            .map(|row| result.columns.iter().cloned().zip(row.row).collect())
            .collect())
    }

    async fn run_edges(
        &self,
        statement: String,
        parameters: Value,
    ) -> PipelineResult<Vec<Edge>> {
        self.run(statement, parameters)
            .await?
            .iter()
            .map(edge_from_row)
            .collect()
    }

    fn ids_param(ids: &[EntityId]) -> Value {
        json!({ "ids": ids.iter().map(EntityId::as_str).collect::<Vec<_>>() })
    }
}

fn row_string(row: &BTreeMap<String, Value>, column: &str) -> String {
    row.get(column)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn row_entity_id(row: &BTreeMap<String, Value>, column: &str) -> PipelineResult<EntityId> {
    let raw = row_string(row, column);
    EntityId::new(raw.clone())
        .map_err(|_| PipelineError::Upstream(format!("graph returned malformed id: {raw}")))
}

fn edge_from_row(row: &BTreeMap<String, Value>) -> PipelineResult<Edge> {
    Ok(Edge::new(
        row_entity_id(row, "source")?,
        row_string(row, "relation"),
        row_entity_id(row, "target")?,
    ))
}

fn entity_from_row(row: &BTreeMap<String, Value>) -> PipelineResult<Entity> {
    let entity_type = match row.get("entity_type").and_then(Value::as_str) {
        Some("CONCEPT") => EntityType::Concept,
        _ => EntityType::NamedEntity,
    };
    let synonyms = row
        .get("synonyms")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Entity {
        id: row_entity_id(row, "id")?,
        main_sense: row_string(row, "main_sense"),
        description: row_string(row, "description"),
        synonyms,
        entity_type,
        image_url: String::new(),
    })
}

/// The five-union summary query: direct taxonomic hops, `subclass_of`
/// closure, `instance_of` composed with the closure, `part_of` closure,
/// and pass-through of every other outgoing predicate.
fn summary_statement(style: PredicateStyle) -> String {
    format!(
        "UNWIND $ids AS _id \
         MATCH (a:Synset {{id:_id}}) \
         CALL {{ \
           WITH a MATCH (a)-[:{is_a}|{instance_of}]->(b:Synset) \
           RETURN DISTINCT a.id AS source, \"{is_a}\" AS relation, b.id AS target \
           UNION ALL \
           WITH a MATCH (a)-[:{subclass_of}*1..]->(b:Synset) \
           RETURN DISTINCT a.id AS source, \"{is_a}\" AS relation, b.id AS target \
           UNION ALL \
           WITH a MATCH (a)-[:{instance_of}]->(mid)-[:{subclass_of}*1..]->(b:Synset) \
           RETURN DISTINCT a.id AS source, \"{is_a}\" AS relation, b.id AS target \
           UNION ALL \
           WITH a MATCH (a)-[:{part_of}*1..]->(b:Synset) \
           RETURN DISTINCT a.id AS source, \"{part_of}\" AS relation, b.id AS target \
           UNION ALL \
           WITH a MATCH (a)-[r]->(b:Synset) \
           WHERE NOT type(r) IN [\"{instance_of}\", \"{subclass_of}\", \"{is_a}\", \"{part_of}\"] \
           RETURN DISTINCT a.id AS source, type(r) AS relation, b.id AS target \
         }} \
         RETURN DISTINCT source, relation, target;",
        is_a = style.is_a(),
        instance_of = style.instance_of(),
        subclass_of = style.subclass_of(),
        part_of = style.part_of(),
    )
}

/// One-hop edges for an explicit list of relation types
fn direct_statement(names: &[&str]) -> String {
    format!(
        "UNWIND $ids AS _id \
         MATCH (a:Synset {{id:_id}})-[r:{names}]->(b:Synset) \
         RETURN DISTINCT a.id AS source, type(r) AS relation, b.id AS target;",
        names = names.join("|"),
    )
}

/// Relation-filtered reachable subgraph from the seeds
fn subgraph_statement(relation: &str) -> String {
    format!(
        "UNWIND $ids AS _id \
         MATCH (s:Synset {{id:_id}}) \
         CALL apoc.path.subgraphAll(s, {{ \
           relationshipFilter: '{relation}>', \
           uniqueness: 'RELATIONSHIP_GLOBAL', \
           bfs: true \
         }}) YIELD relationships \
         UNWIND relationships AS r \
         WITH DISTINCT r \
         WHERE type(r) = '{relation}' \
         RETURN DISTINCT startNode(r).id AS source, type(r) AS relation, endNode(r).id AS target;",
    )
}

const ENTITY_STATEMENT: &str = "MATCH (x:Synset) WHERE x.id IN $ids \
     RETURN x.id AS id, x.mainSense AS main_sense, x.description AS description, \
     x.synonyms AS synonyms, x.type AS entity_type;";

impl GraphAccess for HttpGraphStore {
    async fn entities_by_id(&self, ids: &[EntityId]) -> PipelineResult<Vec<Entity>> {
        self.run(ENTITY_STATEMENT.to_string(), Self::ids_param(ids))
            .await?
            .iter()
            .map(entity_from_row)
            .collect()
    }

    async fn direct_instances(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        let names = [
            self.style.instance_of(),
            self.style.is_a(),
            self.style.subclass_of(),
        ];
        self.run_edges(direct_statement(&names), Self::ids_param(unit))
            .await
    }

    async fn direct_part_of(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        self.run_edges(direct_statement(&[self.style.part_of()]), Self::ids_param(unit))
            .await
    }

    async fn hypernym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        self.run_edges(
            subgraph_statement(self.style.subclass_of()),
            Self::ids_param(seeds),
        )
        .await
    }

    async fn meronym_subgraph(&self, seeds: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        self.run_edges(
            subgraph_statement(self.style.part_of()),
            Self::ids_param(seeds),
        )
        .await
    }

    async fn full_summary(&self, unit: &[EntityId]) -> PipelineResult<Vec<Edge>> {
        self.run_edges(summary_statement(self.style), Self::ids_param(unit))
            .await
    }
}
