//! Derived image assets. An asset belongs to a record only through its file
//! name: the stem of the primary file plus a fixed `.jpg` extension. Two
//! uploads sharing a stem share the asset, and the later write wins.

use common::{asset_relpath, path_stem, percent_decode, COVERS_DIR, THUMBNAILS_DIR};
use tracing::{debug, warn};

use crate::storage::{MediaStorage, StorageError};

/// Stores embedded cover art next to the other covers and returns its
/// storage path. Failures are logged and reported as `None`.
pub fn persist_cover<S>(storage: &S, image: &[u8], primary_path: &str) -> Option<String>
where
    S: MediaStorage + ?Sized,
{
    let base_name = cover_base_name(primary_path);
    match write_asset(storage, COVERS_DIR, &base_name, image) {
        Ok(path) => {
            debug!("Saved cover {}", path);
            Some(path)
        }
        Err(err) => {
            warn!("Failed to save cover for {}: {}", primary_path, err);
            None
        }
    }
}

/// Stores a client-supplied thumbnail under the primary file's raw stem.
pub fn persist_thumbnail<S>(storage: &S, image: &[u8], primary_path: &str) -> Option<String>
where
    S: MediaStorage + ?Sized,
{
    let base_name = path_stem(primary_path);
    match write_asset(storage, THUMBNAILS_DIR, &base_name, image) {
        Ok(path) => {
            debug!("Saved thumbnail {}", path);
            Some(path)
        }
        Err(err) => {
            warn!("Failed to save thumbnail for {}: {}", primary_path, err);
            None
        }
    }
}

pub fn cover_base_name(primary_path: &str) -> String {
    percent_decode(&path_stem(primary_path))
}

fn write_asset<S>(storage: &S, dir: &str, base_name: &str, image: &[u8]) -> Result<String, StorageError>
where
    S: MediaStorage + ?Sized,
{
    if base_name.is_empty() || base_name.contains(['/', '\\']) {
        return Err(StorageError::InvalidPath(base_name.to_string()));
    }
    storage.ensure_dir(dir)?;
    let path = asset_relpath(dir, base_name);
    storage.write(&path, image)?;
    Ok(path)
}
