//! # Summary Engine
//!
//! Builds the transitively-closed relational summary of every unit member
//! from the graph's assembled summary union. An entity with no rows gets
//! an empty summary; that is a valid answer, not a failure.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use crate::error::PipelineResult;
use crate::graph::GraphAccess;
use crate::model::{Atom, Summary, UnitResponse};

/// Populate `response.summaries` with one summary per unit member, in
/// unit order
pub async fn full_summary<G: GraphAccess>(
    graph: &G,
    response: &mut UnitResponse,
) -> PipelineResult<()> {
    let started = Instant::now();

    let rows = graph.full_summary(&response.unit).await?;
    debug!(unit = response.unit.len(), rows = rows.len(), "summary_rows");

    let mut grouped: BTreeMap<&str, Vec<Atom>> = BTreeMap::new();
    for edge in &rows {
        grouped
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.to_atom());
    }

    let summaries = response
        .unit
        .iter()
        .map(|entity| {
            let atoms = grouped.remove(entity.as_str()).unwrap_or_default();
            Summary::from_atoms(entity.clone(), atoms)
        })
        .collect();

    response.summaries = Some(summaries);
    response.record_time("summary", started);
    Ok(())
}
