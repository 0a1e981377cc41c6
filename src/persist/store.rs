use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::library::Catalog;
use crate::session::RepeatMode;

/// The session fields that survive a restart: exactly these, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    pub shuffled: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    pub muted: bool,
}

impl Default for SavedSession {
    fn default() -> Self {
        Self {
            current_index: None,
            shuffled: false,
            repeat: RepeatMode::default(),
            volume: 0.7,
            muted: false,
        }
    }
}

/// Listening stats for one track, keyed by track id in the state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackStats {
    pub play_count: u64,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_played_unix: Option<u64>,
}

/// Everything the state file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedState {
    pub session: SavedSession,
    pub tracks: BTreeMap<String, TrackStats>,
}

/// Resolve the state path from `MAREA_STATE_PATH` or XDG defaults.
pub fn resolve_state_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("MAREA_STATE_PATH") {
        return Some(PathBuf::from(p));
    }

    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".local").join("state"))
    } else {
        None
    };

    state_home.map(|d| d.join("marea").join("state.toml"))
}

/// Write the state file, creating parent directories as needed.
pub fn save(path: &Path, state: &SavedState) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(state)?;
    fs::write(path, body)?;
    Ok(())
}

/// Read the state file. A missing file is a fresh start, not an error.
pub fn load(path: &Path) -> Result<Option<SavedState>, PersistError> {
    let body = match fs::read_to_string(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let state: SavedState = toml::from_str(&body)?;
    Ok(Some(state))
}

/// Snapshot per-track stats out of the catalog.
pub fn collect_stats(catalog: &Catalog) -> BTreeMap<String, TrackStats> {
    catalog
        .iter()
        .map(|t| {
            (
                t.id.clone(),
                TrackStats {
                    play_count: t.play_count,
                    favorite: t.favorite,
                    last_played_unix: t
                        .last_played_at
                        .and_then(|ts| ts.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_secs()),
                },
            )
        })
        .collect()
}

/// Re-attach persisted stats to a freshly imported catalog by id. Tracks
/// without an entry keep their defaults.
pub fn apply_stats(catalog: &mut Catalog, stats: &BTreeMap<String, TrackStats>) {
    for track in catalog.iter_mut() {
        if let Some(s) = stats.get(&track.id) {
            track.play_count = s.play_count;
            track.favorite = s.favorite;
            track.last_played_at = s
                .last_played_unix
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
        }
    }
}
