//! Ingestion and asset lifecycle for the media catalog.

pub mod assets;
pub mod catalog;
pub mod cleanup;
pub mod extract;
pub mod ingest;
pub mod resolve;
pub mod storage;

pub use assets::{persist_cover, persist_thumbnail};
pub use catalog::{CatalogError, CatalogStore, MediaFilter, OrderBy, RedbCatalog};
pub use cleanup::{delete_media, remove_media_files, CleanupReport};
pub use extract::{extract_audio_metadata, ExtractedMetadata};
pub use ingest::{ingest_upload, IngestError, Upload};
pub use resolve::{MediaView, PathResolver};
pub use storage::{DiskStorage, MediaStorage, StorageError};
