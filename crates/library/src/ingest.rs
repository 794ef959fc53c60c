use common::{percent_decode, strip_extension, MediaDraft, MediaRecord, MediaType, UPLOADS_DIR};
use tracing::{debug, info};

use crate::assets::persist_thumbnail;
use crate::catalog::{CatalogError, CatalogStore};
use crate::extract::{extract_audio_metadata, ExtractedMetadata};
use crate::storage::{MediaStorage, StorageError};

/// One uploaded file as received from a client.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// Client-supplied name, possibly percent-encoded.
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
    pub thumbnail: Option<&'a [u8]>,
}

/// Persists an upload, derives what it can from it and creates its record.
///
/// The primary file is written to `uploads/<raw filename>`, replacing any
/// earlier file of the same name. No record is created unless that write
/// succeeds; a failure after the write leaves the file behind without a
/// record.
pub fn ingest_upload<S, C>(
    storage: &S,
    catalog: &C,
    upload: Upload<'_>,
) -> Result<MediaRecord, IngestError>
where
    S: MediaStorage + ?Sized,
    C: CatalogStore + ?Sized,
{
    let raw_name = upload_file_name(upload.filename)?;
    let display_name = percent_decode(raw_name);
    let path = format!("{}/{}", UPLOADS_DIR, raw_name);

    storage.ensure_dir(UPLOADS_DIR)?;
    storage.write(&path, upload.data)?;
    debug!("Stored upload {} ({} bytes)", path, upload.data.len());

    let thumbnail_path = upload
        .thumbnail
        .and_then(|image| persist_thumbnail(storage, image, &path));

    let media_type = MediaType::classify(upload.content_type);
    let extracted = match media_type {
        MediaType::Audio => extract_audio_metadata(storage, &path),
        MediaType::Video => ExtractedMetadata::default(),
    };

    let title = extracted
        .title
        .unwrap_or_else(|| strip_extension(&display_name).to_string());
    let size = storage.size(&path)?;
    let draft = MediaDraft {
        filename: display_name,
        title: Some(title),
        artist: extracted.artist,
        media_type,
        duration: extracted.duration.unwrap_or(0.0),
        size,
        path,
        thumbnail_path,
        cover: extracted.cover,
        is_favorite: false,
    };
    let record = catalog.create(draft)?;
    info!(
        "Ingested {} as media {} ({})",
        record.filename,
        record.id,
        record.media_type.as_str()
    );
    Ok(record)
}

/// Keeps only the final path component of a client file name.
fn upload_file_name(filename: &str) -> Result<&str, IngestError> {
    let name = common::file_name(filename.trim());
    if name.is_empty() || name == "." || name == ".." {
        return Err(IngestError::InvalidFilename(filename.to_string()));
    }
    Ok(name)
}

#[derive(Debug)]
pub enum IngestError {
    InvalidFilename(String),
    Storage(StorageError),
    Catalog(CatalogError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::InvalidFilename(name) => write!(f, "invalid file name: {:?}", name),
            IngestError::Storage(err) => write!(f, "storage error: {}", err),
            IngestError::Catalog(err) => write!(f, "catalog error: {}", err),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        IngestError::Storage(err)
    }
}

impl From<CatalogError> for IngestError {
    fn from(err: CatalogError) -> Self {
        IngestError::Catalog(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MediaFilter, OrderBy, RedbCatalog};
    use crate::storage::DiskStorage;
    use metadata::fixtures::{tag_file, write_wav, FAKE_JPEG};

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: DiskStorage,
        catalog: RedbCatalog,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().join("data"));
        storage.ensure_dir("").unwrap();
        let catalog = RedbCatalog::open(&dir.path().join("media.redb")).unwrap();
        Fixture {
            _dir: dir,
            storage,
            catalog,
        }
    }

    fn tagged_wav(title: Option<&str>, artist: Option<&str>, cover: Option<&[u8]>) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.wav");
        write_wav(&path, 1).unwrap();
        if title.is_some() || artist.is_some() || cover.is_some() {
            tag_file(&path, title, artist, cover).unwrap();
        }
        std::fs::read(&path).unwrap()
    }

    #[test]
    fn untagged_audio_falls_back_to_filename() {
        let fx = fixture();
        let upload = Upload {
            filename: "Caf%C3%A9%20Session.mp3",
            content_type: Some("audio/mpeg"),
            data: b"no tags in here",
            thumbnail: None,
        };
        let record = ingest_upload(&fx.storage, &fx.catalog, upload).unwrap();

        assert_eq!(record.filename, "Café Session.mp3");
        assert_eq!(record.title.as_deref(), Some("Café Session"));
        assert_eq!(record.artist, None);
        assert_eq!(record.duration, 0.0);
        assert_eq!(record.size, 15);
        assert_eq!(record.media_type, MediaType::Audio);
        assert_eq!(record.path, "uploads/Caf%C3%A9%20Session.mp3");
        assert_eq!(record.cover, None);
        assert!(fx.storage.exists(&record.path));
    }

    #[test]
    fn tagged_audio_uses_tags_and_saves_cover() {
        let fx = fixture();
        let data = tagged_wav(Some("Real Title"), Some("Real Artist"), Some(FAKE_JPEG));
        let upload = Upload {
            filename: "My%20Song.wav",
            content_type: Some("audio/wav"),
            data: &data,
            thumbnail: None,
        };
        let record = ingest_upload(&fx.storage, &fx.catalog, upload).unwrap();

        assert_eq!(record.title.as_deref(), Some("Real Title"));
        assert_eq!(record.artist.as_deref(), Some("Real Artist"));
        assert!(record.duration > 0.0);
        assert_eq!(record.size, data.len() as u64);
        assert_eq!(record.cover.as_deref(), Some("uploads/covers/My Song.jpg"));
        assert_eq!(fx.storage.read("uploads/covers/My Song.jpg").unwrap(), FAKE_JPEG);
    }

    #[test]
    fn video_skips_extraction_and_keeps_thumbnail() {
        let fx = fixture();
        let data = tagged_wav(Some("Ignored"), None, Some(FAKE_JPEG));
        let upload = Upload {
            filename: "clip.mp4",
            content_type: Some("video/mp4"),
            data: &data,
            thumbnail: Some(&b"thumb"[..]),
        };
        let record = ingest_upload(&fx.storage, &fx.catalog, upload).unwrap();

        assert_eq!(record.media_type, MediaType::Video);
        assert_eq!(record.title.as_deref(), Some("clip"));
        assert_eq!(record.cover, None);
        assert_eq!(record.thumbnail_path.as_deref(), Some("uploads/thumbnails/clip.jpg"));
        assert_eq!(fx.storage.read("uploads/thumbnails/clip.jpg").unwrap(), b"thumb");
        assert!(!fx.storage.exists("uploads/covers/clip.jpg"));
    }

    #[test]
    fn same_stem_uploads_share_one_cover() {
        let fx = fixture();
        let first_art: &[u8] = &[0xFF, 0xD8, 0xFF, 0x01];
        let second_art: &[u8] = &[0xFF, 0xD8, 0xFF, 0x02];
        let first = tagged_wav(Some("One"), None, Some(first_art));
        let second = tagged_wav(Some("Two"), None, Some(second_art));

        let a = ingest_upload(&fx.storage, &fx.catalog, Upload {
            filename: "My%20Track.wav",
            content_type: Some("audio/wav"),
            data: &first,
            thumbnail: None,
        })
        .unwrap();
        let b = ingest_upload(&fx.storage, &fx.catalog, Upload {
            filename: "My Track.wav",
            content_type: Some("audio/wav"),
            data: &second,
            thumbnail: None,
        })
        .unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.path, b.path);
        assert_eq!(a.cover.as_deref(), Some("uploads/covers/My Track.jpg"));
        assert_eq!(a.cover, b.cover);
        let cover = a.cover.unwrap();
        assert_eq!(fx.storage.read(&cover).unwrap(), second_art);
    }

    #[test]
    fn failed_write_creates_no_record() {
        let fx = fixture();
        // A plain file where the uploads directory should be.
        fx.storage.write("uploads", b"blocker").unwrap();
        let upload = Upload {
            filename: "song.mp3",
            content_type: Some("audio/mpeg"),
            data: b"bytes",
            thumbnail: None,
        };
        let err = ingest_upload(&fx.storage, &fx.catalog, upload).unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));
        assert!(fx
            .catalog
            .query(&MediaFilter::All, OrderBy::Title)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn path_components_are_stripped() {
        let fx = fixture();
        let upload = Upload {
            filename: "../../etc/evil.mp3",
            content_type: None,
            data: b"x",
            thumbnail: None,
        };
        let record = ingest_upload(&fx.storage, &fx.catalog, upload).unwrap();
        assert_eq!(record.path, "uploads/evil.mp3");

        let upload = Upload {
            filename: "..",
            content_type: None,
            data: b"x",
            thumbnail: None,
        };
        assert!(matches!(
            ingest_upload(&fx.storage, &fx.catalog, upload),
            Err(IngestError::InvalidFilename(_))
        ));
    }
}
