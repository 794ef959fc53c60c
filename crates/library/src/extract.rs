use std::io::Cursor;

use tracing::{debug, warn};

use crate::assets::persist_cover;
use crate::storage::MediaStorage;

/// What tag extraction contributed to a record. Every field is optional; an
/// unreadable file simply yields the default.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<f64>,
    pub cover: Option<String>,
}

pub fn extract_audio_metadata<S>(storage: &S, path: &str) -> ExtractedMetadata
where
    S: MediaStorage + ?Sized,
{
    let bytes = match storage.read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed to open {} for tag reading: {}", path, err);
            return ExtractedMetadata::default();
        }
    };
    let tags = match metadata::read_audio_from(Cursor::new(bytes)) {
        Ok(tags) => tags,
        Err(err) => {
            warn!("Failed to read tags from {}: {:?}", path, err);
            return ExtractedMetadata::default();
        }
    };

    let cover = tags
        .cover
        .and_then(|image| persist_cover(storage, &image, path));
    let extracted = ExtractedMetadata {
        title: tags.title,
        artist: tags.artist,
        duration: tags.duration_secs,
        cover,
    };
    debug!("Extracted metadata for {}: {:?}", path, extracted);
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskStorage;
    use metadata::fixtures::{tag_file, write_wav, FAKE_JPEG};

    #[test]
    fn garbage_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().to_path_buf());
        storage.write("noise.mp3", b"not audio at all").unwrap();
        assert_eq!(extract_audio_metadata(&storage, "noise.mp3"), ExtractedMetadata::default());
    }

    #[test]
    fn missing_file_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().to_path_buf());
        assert_eq!(extract_audio_metadata(&storage, "gone.mp3"), ExtractedMetadata::default());
    }

    #[test]
    fn tagged_file_with_picture_gets_cover() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().to_path_buf());
        storage.ensure_dir("uploads").unwrap();
        let local = storage.local_path("uploads/Night%20Drive.wav").unwrap();
        write_wav(&local, 1).unwrap();
        tag_file(&local, Some("Night Drive"), Some("Driver"), Some(FAKE_JPEG)).unwrap();

        let extracted = extract_audio_metadata(&storage, "uploads/Night%20Drive.wav");
        assert_eq!(extracted.title.as_deref(), Some("Night Drive"));
        assert_eq!(extracted.artist.as_deref(), Some("Driver"));
        assert!(extracted.duration.unwrap() > 0.0);
        assert_eq!(extracted.cover.as_deref(), Some("uploads/covers/Night Drive.jpg"));
        assert_eq!(storage.read("uploads/covers/Night Drive.jpg").unwrap(), FAKE_JPEG);
    }
}
