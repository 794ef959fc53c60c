use std::io::{Read, Seek};

use lofty::error::LoftyError;
use lofty::file::TaggedFile;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

/// One place a field may live: the tag scheme and the item inside it.
/// `label` is the scheme's native key, kept for logs.
#[derive(Debug, Clone)]
pub struct TagProbe {
    pub scheme: TagType,
    pub key: ItemKey,
    pub label: &'static str,
}

pub static TITLE_PROBES: [TagProbe; 4] = [
    TagProbe { scheme: TagType::Id3v2, key: ItemKey::TrackTitle, label: "TIT2" },
    TagProbe { scheme: TagType::VorbisComments, key: ItemKey::TrackTitle, label: "TITLE" },
    TagProbe { scheme: TagType::Ape, key: ItemKey::TrackTitle, label: "Title" },
    TagProbe { scheme: TagType::Mp4Ilst, key: ItemKey::TrackTitle, label: "\u{a9}nam" },
];

pub static ARTIST_PROBES: [TagProbe; 4] = [
    TagProbe { scheme: TagType::Id3v2, key: ItemKey::TrackArtist, label: "TPE1" },
    TagProbe { scheme: TagType::VorbisComments, key: ItemKey::TrackArtist, label: "ARTIST" },
    TagProbe { scheme: TagType::Ape, key: ItemKey::TrackArtist, label: "Artist" },
    TagProbe { scheme: TagType::Mp4Ilst, key: ItemKey::TrackArtist, label: "\u{a9}ART" },
];

/// Tag schemes searched for embedded artwork, in order. Any other tag in the
/// file is tried after these.
pub const COVER_SCHEMES: [TagType; 4] = [
    TagType::Id3v2,
    TagType::VorbisComments,
    TagType::Ape,
    TagType::Mp4Ilst,
];

#[derive(Debug, Default, Clone)]
pub struct AudioTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_secs: Option<f64>,
    /// Raw bytes of the embedded picture.
    pub cover: Option<Vec<u8>>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Detects the container from content, not from a file extension.
pub fn read_audio_from<R: Read + Seek>(reader: R) -> Result<AudioTags, MetadataError> {
    let tagged_file = Probe::new(reader).guess_file_type()?.read()?;
    let mut tags = AudioTags::default();

    let duration = tagged_file.properties().duration();
    if !duration.is_zero() {
        tags.duration_secs = Some(duration.as_secs_f64());
    }

    let lookup = |scheme: TagType| tagged_file.tag(scheme);
    tags.title = probe_text(lookup, &TITLE_PROBES);
    tags.artist = probe_text(lookup, &ARTIST_PROBES);
    tags.cover = find_cover(&tagged_file).map(|picture| picture.data().to_vec());

    Ok(tags)
}

/// Walks `probes` in order and returns the first non-blank value.
pub fn probe_text<'a, F>(lookup: F, probes: &[TagProbe]) -> Option<String>
where
    F: Fn(TagType) -> Option<&'a Tag>,
{
    probes.iter().find_map(|probe| {
        let value = lookup(probe.scheme)?.get_string(&probe.key)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

fn find_cover(tagged_file: &TaggedFile) -> Option<&Picture> {
    for scheme in COVER_SCHEMES {
        if let Some(tag) = tagged_file.tag(scheme) {
            if let Some(picture) = pick_picture(tag.pictures()) {
                return Some(picture);
            }
        }
    }
    tagged_file
        .tags()
        .iter()
        .find_map(|tag| pick_picture(tag.pictures()))
}

fn pick_picture(pictures: &[Picture]) -> Option<&Picture> {
    for picture in pictures {
        if picture.pic_type() == PictureType::CoverFront {
            return Some(picture);
        }
    }
    pictures.first()
}
