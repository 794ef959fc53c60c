use std::env;
use std::fs;
use std::path::PathBuf;

use common::{COVERS_DIR, THUMBNAILS_DIR, UPLOADS_DIR};
use library::{ingest_upload, DiskStorage, MediaStorage, RedbCatalog, Upload};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Ingests every audio and video file under a directory as if it had been
/// uploaded.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let source = args
        .next()
        .or_else(|| env::var("IMPORT_ROOT").ok())
        .ok_or("IMPORT_ROOT not set and no path argument")?;
    let data_root = args
        .next()
        .or_else(|| env::var("DATA_ROOT").ok())
        .unwrap_or_else(|| ".".to_string());
    let catalog_path = args
        .next()
        .or_else(|| env::var("CATALOG_PATH").ok())
        .unwrap_or_else(|| "media.redb".to_string());

    let storage = DiskStorage::new(PathBuf::from(&data_root));
    for dir in [UPLOADS_DIR, COVERS_DIR, THUMBNAILS_DIR] {
        storage.ensure_dir(dir)?;
    }
    let catalog = RedbCatalog::open(&PathBuf::from(&catalog_path))?;

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for entry in WalkDir::new(&source).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let mime = match mime_guess::from_path(entry.path()).first() {
            Some(mime) if matches!(mime.type_().as_str(), "audio" | "video") => mime,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let filename = entry.file_name().to_string_lossy().to_string();
        let data = match fs::read(entry.path()) {
            Ok(data) => data,
            Err(err) => {
                warn!("Failed to read {:?}: {}", entry.path(), err);
                skipped += 1;
                continue;
            }
        };
        let upload = Upload {
            filename: &filename,
            content_type: Some(mime.essence_str()),
            data: &data,
            thumbnail: None,
        };
        match ingest_upload(&storage, &catalog, upload) {
            Ok(record) => {
                info!("Imported {:?} as media {}", entry.path(), record.id);
                imported += 1;
            }
            Err(err) => {
                warn!("Failed to import {:?}: {}", entry.path(), err);
                skipped += 1;
            }
        }
    }

    println!("Imported {} files, skipped {}", imported, skipped);
    Ok(())
}
