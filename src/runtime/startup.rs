use std::path::Path;

use crate::audio::Transport;
use crate::config::{RepeatSetting, Settings};
use crate::persist::{self, SavedState};
use crate::session::{RepeatMode, Session};

/// Read the previous session's state file, if restoring is enabled.
pub fn load_saved_state(path: Option<&Path>, settings: &Settings) -> Option<SavedState> {
    if !settings.playback.restore_session {
        return None;
    }
    let path = path?;
    match persist::load(path) {
        Ok(state) => state,
        Err(e) => {
            // A corrupt state file means a fresh start, not a crash.
            eprintln!("marea: failed to read state file, starting fresh: {e}");
            None
        }
    }
}

/// Apply either the previous session or the configured playback defaults.
/// Restored sessions win over config so the player reopens where it left off.
pub fn apply_session_defaults<T: Transport>(
    session: &mut Session<T>,
    settings: &Settings,
    saved: Option<&SavedState>,
) {
    match saved {
        Some(state) => session.restore(&state.session),
        None => {
            if settings.playback.shuffle {
                session.toggle_shuffle();
            }
            session.set_repeat(match settings.playback.repeat {
                RepeatSetting::Off => RepeatMode::Off,
                RepeatSetting::All => RepeatMode::All,
                RepeatSetting::One => RepeatMode::One,
            });
            session.set_volume(settings.playback.volume);
        }
    }
}
