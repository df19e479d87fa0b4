//! HTTP API Data Transfer Objects
//!
//! The pipeline endpoints speak the response carrier directly; these are
//! the remaining small shapes.

use serde::Serialize;

use crate::model::Entity;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
}

/// Entity lookup response
#[derive(Debug, Serialize)]
pub struct EntityListDto {
    pub entities: Vec<Entity>,
}
