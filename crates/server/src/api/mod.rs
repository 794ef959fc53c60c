pub mod files;
pub mod media;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;

use crate::state::{AppState, HealthResponse, RootResponse};

pub fn api_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/media", get(media::list_media).post(media::create_media))
        .route("/media/upload", post(upload::upload_media))
        .route("/media/favorites", get(media::list_favorites))
        .route("/media/search/:query", get(media::search_media))
        .route("/media/type/:media_type", get(media::list_by_type))
        .route("/media/file/:media_id", get(files::get_media_file))
        .route(
            "/media/:media_id",
            get(media::get_media)
                .put(media::update_media)
                .delete(media::delete_media),
        )
        .route("/media/:media_id/toggle-favorite", post(media::toggle_favorite))
        .route("/uploads/covers/:filename", get(files::get_cover))
        .route("/uploads/thumbnails/:filename", get(files::get_thumbnail))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Media catalog API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc(),
    })
}
