use std::path::Path;
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::ItemKey;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::Track;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Probe tags and duration for a single file.
///
/// Tag reading is best-effort: files with broken or missing tags still
/// import with the filename as title and an unknown duration.
fn probe(path: &Path) -> (String, Option<String>, Option<String>, Option<Duration>) {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist: Option<String> = None;
    let mut album: Option<String> = None;
    let mut duration: Option<Duration> = None;

    if let Ok(tagged) = lofty::read_from_path(path) {
        duration = Some(tagged.properties().duration());

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = tag.get_string(&ItemKey::TrackTitle) {
                if !v.trim().is_empty() {
                    title = v.to_string();
                }
            }
            if let Some(v) = tag.get_string(&ItemKey::TrackArtist) {
                let v = v.trim();
                if !v.is_empty() {
                    artist = Some(v.to_string());
                }
            }
            if let Some(v) = tag.get_string(&ItemKey::AlbumTitle) {
                let v = v.trim();
                if !v.is_empty() {
                    album = Some(v.to_string());
                }
            }
        }
    }

    (title, artist, album, duration)
}

/// Import every audio file under `dir` as a fresh `Track`.
///
/// Play counts and favorites start at their defaults here; the persisted
/// stats store re-attaches them by track id after the scan.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            let (title, artist, album, duration) = probe(path);

            let display = display_from_fields(
                path,
                &title,
                artist.as_deref(),
                album.as_deref(),
                &settings.display_fields,
                &settings.display_separator,
            );

            tracks.push(Track {
                id: path.display().to_string(),
                path: path.to_path_buf(),
                title,
                artist,
                album,
                duration,
                display,
                play_count: 0,
                favorite: false,
                last_played_at: None,
            });
        }
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    tracks
}
