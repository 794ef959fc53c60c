use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const UPLOADS_DIR: &str = "uploads";
pub const COVERS_DIR: &str = "uploads/covers";
pub const THUMBNAILS_DIR: &str = "uploads/thumbnails";
pub const ASSET_EXT: &str = "jpg";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    /// Anything whose content type starts with `video` is a video; everything
    /// else, including a missing hint, is treated as audio.
    pub fn classify(content_type: Option<&str>) -> Self {
        match content_type {
            Some(value) if value.starts_with("video") => MediaType::Video,
            _ => MediaType::Audio,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "audio" => Some(MediaType::Audio),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

/// Catalog entry for one imported file. `path`, `thumbnail_path` and `cover`
/// hold storage-relative paths (or external URLs) and are never handed to a
/// client without going through the resolver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaRecord {
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

/// A record that has not been assigned an id yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaDraft {
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub size: u64,
    pub path: String,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl MediaDraft {
    pub fn into_record(self, id: u64, now: OffsetDateTime) -> MediaRecord {
        MediaRecord {
            id,
            filename: self.filename,
            title: self.title,
            artist: self.artist,
            media_type: self.media_type,
            duration: self.duration.max(0.0),
            size: self.size,
            path: self.path,
            thumbnail_path: self.thumbnail_path,
            cover: self.cover,
            is_favorite: self.is_favorite,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. For the text fields an absent key leaves the value alone
/// and an explicit `null` clears it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MediaPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub artist: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub cover: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

// Only runs when the key is present, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl MediaPatch {
    pub fn favorite(value: bool) -> Self {
        Self {
            is_favorite: Some(value),
            ..Self::default()
        }
    }

    pub fn apply(self, record: &mut MediaRecord, now: OffsetDateTime) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(artist) = self.artist {
            record.artist = artist;
        }
        if let Some(cover) = self.cover {
            record.cover = cover;
        }
        if let Some(is_favorite) = self.is_favorite {
            record.is_favorite = is_favorite;
        }
        record.updated_at = now;
    }
}

/// Reverses percent-encoding. Invalid UTF-8 in the decoded bytes is replaced
/// rather than rejected.
pub fn percent_decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    let bytes = urlencoding::decode_binary(value.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Drops everything from the last `.` on; a name without a dot is returned whole.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((head, _)) => head,
        None => name,
    }
}

/// Stem of the final component of a slash- or backslash-separated path.
pub fn path_stem(path: &str) -> String {
    let name = file_name(path);
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn asset_relpath(dir: &str, base_name: &str) -> String {
    format!("{}/{}.{}", dir, base_name, ASSET_EXT)
}

pub fn is_external_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

pub fn join_relpath(root: &Path, relpath: &str) -> PathBuf {
    let mut out = PathBuf::from(root);
    for part in relpath.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        out.push(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> MediaRecord {
        let draft = MediaDraft {
            filename: "song.mp3".to_string(),
            title: Some("Song".to_string()),
            artist: None,
            media_type: MediaType::Audio,
            duration: -3.0,
            size: 10,
            path: "uploads/song.mp3".to_string(),
            thumbnail_path: None,
            cover: None,
            is_favorite: false,
        };
        draft.into_record(1, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn decoded_names_have_no_escapes_left() {
        for raw in ["My%20Song.mp3", "caf%C3%A9%20%26%20bar.flac", "100%25.mp3"] {
            let decoded = percent_decode(raw);
            let residual = decoded
                .as_bytes()
                .windows(3)
                .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit());
            assert!(!residual, "{} still escaped", decoded);
        }
        assert_eq!(percent_decode("My%20Song.mp3"), "My Song.mp3");
        assert_eq!(percent_decode("caf%C3%A9.mp3"), "café.mp3");
    }

    #[test]
    fn plain_names_pass_through_decode() {
        assert_eq!(percent_decode("plain name.mp3"), "plain name.mp3");
        assert_eq!(percent_decode("a+b.mp3"), "a+b.mp3");
    }

    #[test]
    fn classifies_by_content_type_prefix() {
        assert_eq!(MediaType::classify(Some("video/mp4")), MediaType::Video);
        assert_eq!(MediaType::classify(Some("audio/mpeg")), MediaType::Audio);
        assert_eq!(MediaType::classify(Some("application/octet-stream")), MediaType::Audio);
        assert_eq!(MediaType::classify(None), MediaType::Audio);
    }

    #[test]
    fn stems() {
        assert_eq!(strip_extension("My Song.mp3"), "My Song");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(path_stem("uploads/My%20Song.mp3"), "My%20Song");
        assert_eq!(path_stem("uploads\\clip.mp4"), "clip");
        assert_eq!(file_name("uploads/covers/a.jpg"), "a.jpg");
    }

    #[test]
    fn draft_clamps_negative_duration() {
        assert_eq!(sample_record().duration, 0.0);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut record = sample_record();
        let later = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(60);
        MediaPatch {
            artist: Some(Some("Someone".to_string())),
            ..MediaPatch::default()
        }
        .apply(&mut record, later);
        assert_eq!(record.title.as_deref(), Some("Song"));
        assert_eq!(record.artist.as_deref(), Some("Someone"));
        assert!(!record.is_favorite);
        assert_eq!(record.updated_at, later);
        assert_eq!(record.created_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let mut record = sample_record();
        record.artist = Some("Someone".to_string());
        record.cover = Some("uploads/covers/a.jpg".to_string());

        let patch: MediaPatch = serde_json::from_str(r#"{"cover": null}"#).unwrap();
        assert_eq!(patch.cover, Some(None));
        assert_eq!(patch.artist, None);
        patch.apply(&mut record, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.cover, None);
        assert_eq!(record.artist.as_deref(), Some("Someone"));
        assert_eq!(record.title.as_deref(), Some("Song"));

        let patch: MediaPatch =
            serde_json::from_str(r#"{"artist": null, "title": "Renamed"}"#).unwrap();
        patch.apply(&mut record, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.artist, None);
        assert_eq!(record.title.as_deref(), Some("Renamed"));
    }

    #[test]
    fn type_field_serializes_lowercase() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["type"], "audio");
    }

    #[test]
    fn join_relpath_skips_empty_segments() {
        let joined = join_relpath(Path::new("/data"), "uploads//covers/a.jpg");
        assert_eq!(joined, PathBuf::from("/data/uploads/covers/a.jpg"));
    }
}
