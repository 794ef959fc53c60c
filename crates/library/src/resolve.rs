//! Turns stored paths into URLs a client can fetch. Records keep local
//! storage paths; only the views built here ever leave the process.
//!
//! Covers and thumbnails are encoded differently on purpose. Cover names keep
//! `/` unescaped and the cover route decodes its file name once more after
//! routing; thumbnail names escape everything but unreserved characters and
//! their route does not decode again.

use common::{
    file_name, is_external_url, normalize_slashes, MediaRecord, MediaType, COVERS_DIR,
    THUMBNAILS_DIR,
};
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
pub struct PathResolver {
    base_url: String,
}

/// A record as handed to clients, with every path already resolved.
#[derive(Clone, Debug, Serialize)]
pub struct MediaView {
    pub id: u64,
    pub filename: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub duration: f64,
    pub size: u64,
    pub path: String,
    pub thumbnail_path: Option<String>,
    pub cover: Option<String>,
    pub is_favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PathResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Primary files are only ever served by id; the stored path is not
    /// revealed. External URLs pass through.
    pub fn media_url(&self, id: u64, path: &str) -> String {
        if is_external_url(path) {
            return path.to_string();
        }
        format!("{}/media/file/{}", self.base_url, id)
    }

    pub fn cover_url(&self, cover: &str) -> String {
        match asset_name(cover, COVERS_DIR) {
            Some(name) => format!(
                "{}/{}/{}",
                self.base_url,
                COVERS_DIR,
                quote_path(name)
            ),
            None => cover.to_string(),
        }
    }

    pub fn thumbnail_url(&self, thumbnail: &str) -> String {
        match asset_name(thumbnail, THUMBNAILS_DIR) {
            Some(name) => format!(
                "{}/{}/{}",
                self.base_url,
                THUMBNAILS_DIR,
                urlencoding::encode(name)
            ),
            None => thumbnail.to_string(),
        }
    }

    pub fn resolve(&self, record: &MediaRecord) -> MediaView {
        MediaView {
            id: record.id,
            filename: record.filename.clone(),
            title: record.title.clone(),
            artist: record.artist.clone(),
            media_type: record.media_type,
            duration: record.duration,
            size: record.size,
            path: self.media_url(record.id, &record.path),
            thumbnail_path: record.thumbnail_path.as_deref().map(|p| self.thumbnail_url(p)),
            cover: record.cover.as_deref().map(|p| self.cover_url(p)),
            is_favorite: record.is_favorite,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn resolve_all(&self, records: &[MediaRecord]) -> Vec<MediaView> {
        records.iter().map(|record| self.resolve(record)).collect()
    }
}

/// File name of `path` when it sits in the `dir` asset namespace.
fn asset_name<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let normalized = normalize_slashes(path);
    let rest = normalized.strip_prefix(dir)?;
    if !rest.starts_with('/') {
        return None;
    }
    let name = file_name(path);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Percent-encodes everything except unreserved characters and `/`.
fn quote_path(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b'/') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
