use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use common::{MediaDraft, MediaPatch, MediaType};
use library::{CatalogStore, MediaFilter, MediaView, OrderBy};
use tracing::info;

use crate::state::{AppState, JsonResult, MediaListQuery, MessageResponse};
use crate::utils::{catalog_error, json_error, not_found};

pub async fn list_media(
    State(state): State<AppState>,
    Query(params): Query<MediaListQuery>,
) -> JsonResult<Vec<MediaView>> {
    query_views(&state, MediaFilter::All, params.order.unwrap_or_default())
}

pub async fn list_favorites(State(state): State<AppState>) -> JsonResult<Vec<MediaView>> {
    query_views(&state, MediaFilter::Favorites, OrderBy::Title)
}

pub async fn search_media(
    State(state): State<AppState>,
    AxumPath(query): AxumPath<String>,
) -> JsonResult<Vec<MediaView>> {
    query_views(&state, MediaFilter::Search(query), OrderBy::Title)
}

pub async fn list_by_type(
    State(state): State<AppState>,
    AxumPath(media_type): AxumPath<String>,
) -> JsonResult<Vec<MediaView>> {
    let media_type = MediaType::parse(&media_type).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "type must be 'video' or 'audio'",
        )
    })?;
    query_views(&state, MediaFilter::Type(media_type), OrderBy::Title)
}

/// Registers a record whose file lives elsewhere, typically an external URL.
pub async fn create_media(
    State(state): State<AppState>,
    Json(draft): Json<MediaDraft>,
) -> JsonResult<MediaView> {
    let record = state.catalog.create(draft).map_err(catalog_error)?;
    info!("Registered media {} ({})", record.id, record.filename);
    Ok(Json(state.resolver.resolve(&record)))
}

pub async fn get_media(
    State(state): State<AppState>,
    AxumPath(media_id): AxumPath<u64>,
) -> JsonResult<MediaView> {
    let record = state
        .catalog
        .get(media_id)
        .map_err(catalog_error)?
        .ok_or_else(|| not_found("media"))?;
    Ok(Json(state.resolver.resolve(&record)))
}

pub async fn update_media(
    State(state): State<AppState>,
    AxumPath(media_id): AxumPath<u64>,
    Json(patch): Json<MediaPatch>,
) -> JsonResult<MediaView> {
    let record = state
        .catalog
        .update(media_id, patch)
        .map_err(catalog_error)?
        .ok_or_else(|| not_found("media"))?;
    Ok(Json(state.resolver.resolve(&record)))
}

pub async fn delete_media(
    State(state): State<AppState>,
    AxumPath(media_id): AxumPath<u64>,
) -> JsonResult<MessageResponse> {
    library::delete_media(state.storage.as_ref(), &state.catalog, media_id)
        .map_err(catalog_error)?
        .ok_or_else(|| not_found("media"))?;
    Ok(Json(MessageResponse {
        message: "media deleted".to_string(),
    }))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    AxumPath(media_id): AxumPath<u64>,
) -> JsonResult<MediaView> {
    let current = state
        .catalog
        .get(media_id)
        .map_err(catalog_error)?
        .ok_or_else(|| not_found("media"))?;
    let record = state
        .catalog
        .update(media_id, MediaPatch::favorite(!current.is_favorite))
        .map_err(catalog_error)?
        .ok_or_else(|| not_found("media"))?;
    Ok(Json(state.resolver.resolve(&record)))
}

fn query_views(state: &AppState, filter: MediaFilter, order: OrderBy) -> JsonResult<Vec<MediaView>> {
    let records = state.catalog.query(&filter, order).map_err(catalog_error)?;
    Ok(Json(state.resolver.resolve_all(&records)))
}
