use std::io::SeekFrom;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Path as AxumPath, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use common::{is_external_url, percent_decode, COVERS_DIR, THUMBNAILS_DIR};
use library::CatalogStore;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

use crate::range::{ByteRange, RangeError};
use crate::state::AppState;
use crate::utils::{catalog_error, json_error_response};

const MEDIA_CONTENT_TYPE: &str = "application/octet-stream";
const ASSET_CONTENT_TYPE: &str = "image/jpeg";

/// Streams the primary file of a record from its stored path.
pub async fn get_media_file(
    State(state): State<AppState>,
    AxumPath(media_id): AxumPath<u64>,
    headers: HeaderMap,
) -> Response {
    let record = match state.catalog.get(media_id) {
        Ok(Some(record)) => record,
        Ok(None) => return json_error_response(StatusCode::NOT_FOUND, "media not found"),
        Err(err) => return catalog_error(err).into_response(),
    };
    if is_external_url(&record.path) {
        return json_error_response(StatusCode::NOT_FOUND, "file not found");
    }
    let local = match state.storage.local_path(&record.path) {
        Ok(local) => local,
        Err(err) => {
            warn!("Refusing to serve {}: {}", record.path, err);
            return json_error_response(StatusCode::NOT_FOUND, "file not found");
        }
    };
    serve_file(local, MEDIA_CONTENT_TYPE, &headers, "file not found").await
}

/// Cover names arrive encoded once by the URL and once more by the resolver,
/// so the routed name is decoded again here.
pub async fn get_cover(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    let name = percent_decode(&filename);
    serve_asset(&state, COVERS_DIR, &name, &headers, "cover").await
}

pub async fn get_thumbnail(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    serve_asset(&state, THUMBNAILS_DIR, &filename, &headers, "thumbnail").await
}

async fn serve_asset(
    state: &AppState,
    dir: &str,
    name: &str,
    headers: &HeaderMap,
    kind: &str,
) -> Response {
    let missing = format!("{} not found: {}", kind, name);
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return json_error_response(StatusCode::NOT_FOUND, missing);
    }
    match state.storage.local_path(&format!("{}/{}", dir, name)) {
        Ok(local) => serve_file(local, ASSET_CONTENT_TYPE, headers, &missing).await,
        Err(_) => json_error_response(StatusCode::NOT_FOUND, missing),
    }
}

async fn serve_file(path: PathBuf, mime: &'static str, headers: &HeaderMap, missing: &str) -> Response {
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return json_error_response(StatusCode::NOT_FOUND, missing),
    };
    let size = match file.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return json_error_response(StatusCode::NOT_FOUND, missing),
    };

    let range_header = headers.get(header::RANGE).and_then(|value| value.to_str().ok());
    let range = match range_header.map(|value| ByteRange::parse(value, size)) {
        None | Some(Err(RangeError::Invalid)) => None,
        Some(Ok(range)) => Some(range),
        Some(Err(RangeError::Unsatisfiable)) => return unsatisfiable_response(size),
    };

    match range {
        Some(range) => {
            if let Err(err) = file.seek(SeekFrom::Start(range.start)).await {
                error!("Failed to seek {:?}: {}", path, err);
                return json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read file");
            }
            let body = Body::from_stream(ReaderStream::new(file.take(range.len())));
            partial_response(body, mime, range, size)
        }
        None => {
            let body = Body::from_stream(ReaderStream::new(file));
            let mut response = Response::new(body);
            set_common_headers(&mut response, mime, size);
            response
        }
    }
}

fn partial_response(body: Body, mime: &'static str, range: ByteRange, size: u64) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::PARTIAL_CONTENT;
    set_common_headers(&mut response, mime, range.len());
    if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn unsatisfiable_response(size: u64) -> Response {
    let mut response = json_error_response(StatusCode::RANGE_NOT_SATISFIABLE, "range not satisfiable");
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn set_common_headers(response: &mut Response, mime: &'static str, length: u64) {
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
}
