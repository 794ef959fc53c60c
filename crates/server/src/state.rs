use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use library::{DiskStorage, OrderBy, PathResolver, RedbCatalog};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<DiskStorage>,
    pub catalog: RedbCatalog,
    pub resolver: Arc<PathResolver>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaListQuery {
    pub order: Option<OrderBy>,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
