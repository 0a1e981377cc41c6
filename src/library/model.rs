use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::error::SessionError;

/// A single playable item and its metadata.
///
/// `id` is the canonical path string and must be unique within a catalog.
/// `play_count` and `last_played_at` are bumped by the playback session on
/// load; `favorite` only changes through an explicit user toggle.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: String,
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// `None` means the duration could not be probed yet.
    pub duration: Option<Duration>,
    pub display: String,
    pub play_count: u64,
    pub favorite: bool,
    pub last_played_at: Option<SystemTime>,
}

/// Ordered collection of tracks. Insertion order is display order.
#[derive(Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Build a catalog from scanned tracks, dropping any duplicate ids.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut catalog = Self::new();
        for t in tracks {
            // Scans can legitimately yield the same file twice (symlinks).
            let _ = catalog.append(t);
        }
        catalog
    }

    /// Append a track at the end of the catalog.
    pub fn append(&mut self, track: Track) -> Result<(), SessionError> {
        if self.tracks.iter().any(|t| t.id == track.id) {
            return Err(SessionError::DuplicateId(track.id));
        }
        self.tracks.push(track);
        Ok(())
    }

    /// Remove and return the track at `index`.
    ///
    /// The catalog does not own playback resources; releasing whatever the
    /// transport loaded for this track is the caller's job.
    pub fn remove_at(&mut self, index: usize) -> Result<Track, SessionError> {
        if index >= self.tracks.len() {
            return Err(SessionError::IndexOutOfRange(index));
        }
        Ok(self.tracks.remove(index))
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut()
    }
}
