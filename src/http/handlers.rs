//! Pipeline Endpoint Handlers
//!
//! One handler per pipeline stage plus the report, entity lookup, and
//! health endpoints. Handlers validate preconditions, run the stage under
//! the per-request deadline, and return the populated carrier.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::info;

use crate::characterization::characterize;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::graph::{GraphAccess, GraphStore};
use crate::http::dto::{EntityListDto, HealthDto};
use crate::http::error::RestError;
use crate::kernel::kernel_explanation;
use crate::lca::lca;
use crate::model::{EntityId, PredicateStyle, UnitResponse};
use crate::report::{report_json, report_text};
use crate::summary::full_summary;

/// Shared application state: configuration plus the injected graph
/// adapter. Constructed once at startup.
pub struct AppState {
    pub graph: GraphStore,
    pub config: Config,
}

impl AppState {
    pub fn new(graph: GraphStore, config: Config) -> Self {
        AppState { graph, config }
    }

    pub fn style(&self) -> PredicateStyle {
        PredicateStyle::new(self.config.predicates.upper)
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.http.request_deadline_secs.max(1))
    }
}

/// Unwrap the request body, turning deserialization failures (including
/// identifier validation) into a 400 naming the offending detail
fn parse_request(
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<UnitResponse, RestError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => Err(RestError::bad_request(rejection.body_text())),
    }
}

/// Run a pipeline future under the per-request deadline. An expired
/// deadline surfaces as `Timeout`; no partial response is emitted.
async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = PipelineResult<T>>,
) -> Result<T, RestError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(RestError::from),
        Err(_) => Err(PipelineError::Timeout { elapsed: deadline }.into()),
    }
}

/// POST /summary
pub async fn summary(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<Json<UnitResponse>, RestError> {
    let mut request = parse_request(payload)?;
    info!(unit = request.unit.len(), "summary_request");

    with_deadline(state.deadline(), full_summary(&state.graph, &mut request)).await?;
    Ok(Json(request))
}

/// POST /lca
pub async fn lca_endpoint(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<Json<UnitResponse>, RestError> {
    let mut request = parse_request(payload)?;
    info!(unit = request.unit.len(), "lca_request");

    if !request.has_summary_for_unit() {
        return Err(RestError::bad_request(
            "Unit has no summary. Cannot proceed to the lca computation",
        ));
    }

    let style = state.style();
    with_deadline(state.deadline(), lca(&state.graph, &mut request, style)).await?;
    Ok(Json(request))
}

/// POST /characterize
pub async fn characterize_endpoint(
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<Json<UnitResponse>, RestError> {
    let mut request = parse_request(payload)?;
    info!(unit = request.unit.len(), "characterize_request");

    if !request.has_summary_for_unit() {
        return Err(RestError::bad_request(
            "Unit has no summary. Cannot proceed to the characterization",
        ));
    }

    characterize(&mut request)?;
    Ok(Json(request))
}

/// POST /kernel
pub async fn kernel_endpoint(
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<Json<UnitResponse>, RestError> {
    let mut request = parse_request(payload)?;
    info!(unit = request.unit.len(), "kernel_request");

    if !request.has_summary_for_unit() {
        return Err(RestError::bad_request(
            "Unit has no summary. Cannot proceed to the kernel explanation",
        ));
    }
    if !request.has_lca() {
        return Err(RestError::bad_request(
            "Unit has no lca. Cannot proceed to the kernel explanation",
        ));
    }

    kernel_explanation(&mut request)?;
    Ok(Json(request))
}

/// POST /report/:mode with mode in {text, json}
pub async fn report(
    Extension(state): Extension<Arc<AppState>>,
    Path(mode): Path<String>,
    payload: Result<Json<UnitResponse>, JsonRejection>,
) -> Result<Response, RestError> {
    let request = parse_request(payload)?;
    info!(unit = request.unit.len(), mode = %mode, "report_request");
    let style = state.style();

    match mode.as_str() {
        "text" => {
            let mut request = request;
            let text = with_deadline(
                state.deadline(),
                report_text(&state.graph, &mut request, style),
            )
            .await?;
            Ok(text.into_response())
        }
        "json" => {
            let response = with_deadline(
                state.deadline(),
                report_json(&state.graph, request.unit, style),
            )
            .await?;
            Ok(Json(response).into_response())
        }
        other => Err(RestError::bad_request(format!(
            "{other} is not a valid mode. Valid modes are 'text' and 'json'"
        ))),
    }
}

/// GET /entities/:ids with a comma-separated id list
pub async fn entities(
    Extension(state): Extension<Arc<AppState>>,
    Path(ids): Path<String>,
) -> Result<Json<EntityListDto>, RestError> {
    let ids: Vec<EntityId> = ids
        .split(',')
        .map(EntityId::new)
        .collect::<PipelineResult<_>>()?;

    let entities =
        with_deadline(state.deadline(), state.graph.entities_by_id(&ids)).await?;
    Ok(Json(EntityListDto { entities }))
}

/// GET /health
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
