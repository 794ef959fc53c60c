use common::{percent_decode, MediaRecord};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, CatalogStore};
use crate::storage::MediaStorage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub primary_removed: bool,
    pub cover_removed: bool,
}

/// Best-effort removal of a record's primary file and cover. Thumbnails are
/// left in place.
pub fn remove_media_files<S>(storage: &S, record: &MediaRecord) -> CleanupReport
where
    S: MediaStorage + ?Sized,
{
    let primary_removed = remove_stored(storage, &record.path, "media file");
    let cover_removed = match record.cover.as_deref() {
        Some(cover) => remove_stored(storage, cover, "cover"),
        None => false,
    };
    CleanupReport {
        primary_removed,
        cover_removed,
    }
}

/// Removes the files of record `id`, then the record itself. `Ok(None)` means
/// there was no such record.
pub fn delete_media<S, C>(
    storage: &S,
    catalog: &C,
    id: u64,
) -> Result<Option<CleanupReport>, CatalogError>
where
    S: MediaStorage + ?Sized,
    C: CatalogStore + ?Sized,
{
    let record = match catalog.get(id)? {
        Some(record) => record,
        None => return Ok(None),
    };
    let report = remove_media_files(storage, &record);
    catalog.delete(id)?;
    info!("Deleted media {} ({})", id, record.filename);
    Ok(Some(report))
}

// Stored paths may carry percent-encoding; the decoded form is tried first,
// then the path exactly as stored.
fn remove_stored<S>(storage: &S, stored: &str, kind: &str) -> bool
where
    S: MediaStorage + ?Sized,
{
    let decoded = percent_decode(stored);
    let target = if storage.exists(&decoded) {
        decoded
    } else if storage.exists(stored) {
        stored.to_string()
    } else {
        debug!("No {} to delete at {}", kind, stored);
        return false;
    };
    match storage.delete(&target) {
        Ok(()) => {
            info!("Deleted {} {}", kind, target);
            true
        }
        Err(err) if err.is_not_found() => {
            debug!("{} {} vanished before delete", kind, target);
            false
        }
        Err(err) => {
            warn!("Failed to delete {} {}: {}", kind, target, err);
            false
        }
    }
}
