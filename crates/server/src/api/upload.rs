use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use library::{ingest_upload, IngestError, MediaView, Upload};
use tracing::{debug, error};

use crate::state::{AppState, JsonResult};
use crate::utils::json_error;

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Multipart upload with a required `file` part and an optional `thumbnail`
/// part. Other parts are ignored.
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> JsonResult<MediaView> {
    let mut file: Option<UploadedFile> = None;
    let mut thumbnail: Option<Bytes> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(json_error(
                    StatusCode::BAD_REQUEST,
                    format!("invalid multipart body: {}", err),
                ))
            }
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|err| {
                    json_error(
                        StatusCode::BAD_REQUEST,
                        format!("failed to read file: {}", err),
                    )
                })?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("thumbnail") => {
                let data = field.bytes().await.map_err(|err| {
                    json_error(
                        StatusCode::BAD_REQUEST,
                        format!("failed to read thumbnail: {}", err),
                    )
                })?;
                if !data.is_empty() {
                    thumbnail = Some(data);
                }
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let file = file.ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "file is required"))?;
    let storage = Arc::clone(&state.storage);
    let catalog = state.catalog.clone();
    let result = tokio::task::spawn_blocking(move || {
        ingest_upload(
            storage.as_ref(),
            &catalog,
            Upload {
                filename: &file.filename,
                content_type: file.content_type.as_deref(),
                data: &file.data,
                thumbnail: thumbnail.as_deref(),
            },
        )
    })
    .await;

    match result {
        Ok(Ok(record)) => Ok(Json(state.resolver.resolve(&record))),
        Ok(Err(IngestError::InvalidFilename(name))) => Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("invalid file name: {:?}", name),
        )),
        Ok(Err(err)) => {
            error!("Upload failed: {}", err);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("upload failed: {}", err),
            ))
        }
        Err(err) => {
            error!("Upload task failed: {}", err);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upload task failed",
            ))
        }
    }
}
