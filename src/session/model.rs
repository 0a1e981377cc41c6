use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::audio::{Transport, TransportEvent};
use crate::error::SessionError;
use crate::library::{Catalog, Track};
use crate::persist::SavedSession;

use super::shuffle;

/// Volume restored when unmuting with the slider at zero.
const UNMUTE_FALLBACK_VOLUME: f32 = 0.7;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    Off,
    /// Wrap around at the end of the catalog.
    All,
    /// Replay the current track when it ends.
    One,
}

impl Default for RepeatMode {
    fn default() -> Self {
        Self::Off
    }
}

/// Read-only projection of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub current_index: Option<usize>,
    pub playing: bool,
    pub shuffled: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    pub muted: bool,
    pub position: Duration,
}

/// Commands deferred while a `play()` acknowledgement is in flight.
#[derive(Debug, Clone, Copy)]
enum Queued {
    Play,
    Pause,
    TogglePlay,
    Load(usize),
    Next,
    Previous,
    Seek(i64),
    Ended,
}

/// The playback session. Owns the catalog and the transport; every mutation
/// goes through the operations below and bumps `revision`, which the UI
/// polls as its state-changed notification.
pub struct Session<T: Transport> {
    catalog: Catalog,
    transport: T,
    rng: StdRng,

    current: Option<usize>,
    /// Playback intent; may briefly disagree with the hardware while a
    /// `play()` acknowledgement is pending.
    playing: bool,
    shuffled: bool,
    repeat: RepeatMode,
    volume: f32,
    muted: bool,
    /// Whether the active mute came from dragging the volume to zero.
    muted_by_volume: bool,

    /// Previously played indices, newest first, capped at
    /// `min(5, len - 1)`. Feeds the shuffle policy.
    recent: VecDeque<usize>,
    position: Duration,

    play_pending: bool,
    queued: VecDeque<Queued>,

    last_error: Option<String>,
    revision: u64,
}

impl<T: Transport> Session<T> {
    pub fn new(catalog: Catalog, transport: T) -> Self {
        Self::with_rng(catalog, transport, StdRng::from_os_rng())
    }

    /// Deterministic constructor; tests seed the RNG.
    pub fn with_rng(catalog: Catalog, transport: T, rng: StdRng) -> Self {
        Self {
            catalog,
            transport,
            rng,
            current: None,
            playing: false,
            shuffled: false,
            repeat: RepeatMode::default(),
            volume: UNMUTE_FALLBACK_VOLUME,
            muted: false,
            muted_by_volume: false,
            recent: VecDeque::new(),
            position: Duration::ZERO,
            play_pending: false,
            queued: VecDeque::new(),
            last_error: None,
            revision: 0,
        }
    }

    // --- reads ---------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.catalog.get(i))
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_index: self.current,
            playing: self.playing,
            shuffled: self.shuffled,
            repeat: self.repeat,
            volume: self.volume,
            muted: self.muted,
            position: self.position,
        }
    }

    /// Bumped on every mutation; the UI redraws and persists on change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Take the most recent playback/transport failure, if any.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[cfg(test)]
    pub(crate) fn recent_history(&self) -> Vec<usize> {
        self.recent.iter().copied().collect()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    // --- transport event pump ------------------------------------------

    /// Drain and apply pending transport events. Called once per UI tick.
    pub fn pump(&mut self) {
        while let Some(ev) = self.transport.poll() {
            self.handle_event(ev);
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::LoadedMetadata { duration } => {
                if let Some(track) = self.current.and_then(|i| self.catalog.get_mut(i)) {
                    if track.duration.is_none() {
                        track.duration = Some(duration);
                        self.touch();
                    }
                }
            }
            TransportEvent::TimeUpdate { position } => {
                self.position = position;
            }
            TransportEvent::Ended => {
                if self.play_pending {
                    self.queued.push_back(Queued::Ended);
                } else {
                    self.handle_ended();
                }
            }
            TransportEvent::PlaySettled(result) => {
                self.play_pending = false;
                if let Err(reason) = result {
                    // Autoplay/permission/decode refusal: roll the optimistic
                    // intent back and surface the failure.
                    self.playing = false;
                    self.transport.pause();
                    self.last_error = Some(reason);
                    self.touch();
                }
                self.drain_queued();
            }
            TransportEvent::Error(reason) => {
                self.playing = false;
                self.last_error = Some(reason);
                self.touch();
            }
        }
    }

    fn drain_queued(&mut self) {
        // Queued commands run in arrival order; if one re-enters the pending
        // window the rest wait for the next settle.
        while !self.play_pending {
            let Some(cmd) = self.queued.pop_front() else {
                break;
            };
            match cmd {
                Queued::Play => {
                    let _ = self.play_now();
                }
                Queued::Pause => self.pause_now(),
                Queued::TogglePlay => {
                    if self.playing {
                        self.pause_now();
                    } else {
                        let _ = self.play_now();
                    }
                }
                Queued::Load(i) => {
                    let _ = self.load_now(i);
                }
                Queued::Next => {
                    let _ = self.next_now();
                }
                Queued::Previous => {
                    let _ = self.previous_now();
                }
                Queued::Seek(secs) => self.seek_now(secs),
                Queued::Ended => self.handle_ended(),
            }
        }
    }

    // --- operations ----------------------------------------------------

    /// Make the track at `index` current and hand its source to the
    /// transport. Does not start playback.
    pub fn load(&mut self, index: usize) -> Result<(), SessionError> {
        if self.play_pending {
            self.queued.push_back(Queued::Load(index));
            return Ok(());
        }
        self.load_now(index)
    }

    fn load_now(&mut self, index: usize) -> Result<(), SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        let Some(track) = self.catalog.get_mut(index) else {
            return Err(SessionError::IndexOutOfRange(index));
        };
        track.play_count += 1;
        track.last_played_at = Some(SystemTime::now());
        let path = track.path.clone();

        self.current = Some(index);
        self.position = Duration::ZERO;
        self.transport.load(&path);
        self.transport.set_volume(self.effective_volume());
        self.touch();
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        if self.play_pending {
            self.queued.push_back(Queued::Play);
            return Ok(());
        }
        self.play_now()
    }

    fn play_now(&mut self) -> Result<(), SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        if self.current.is_none() {
            self.load_now(0)?;
        }
        // Optimistic: rolled back if the platform rejects the play.
        self.playing = true;
        self.play_pending = true;
        self.transport.play();
        self.touch();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.play_pending {
            self.queued.push_back(Queued::Pause);
            return;
        }
        self.pause_now();
    }

    fn pause_now(&mut self) {
        self.playing = false;
        self.transport.pause();
        self.touch();
    }

    pub fn toggle_play(&mut self) -> Result<(), SessionError> {
        if self.play_pending {
            self.queued.push_back(Queued::TogglePlay);
            return Ok(());
        }
        if self.playing {
            self.pause_now();
            Ok(())
        } else {
            self.play_now()
        }
    }

    pub fn next(&mut self) -> Result<(), SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        if self.play_pending {
            self.queued.push_back(Queued::Next);
            return Ok(());
        }
        self.next_now()
    }

    fn next_now(&mut self) -> Result<(), SessionError> {
        let len = self.catalog.len();
        if len == 0 {
            return Err(SessionError::EmptyCatalog);
        }
        if let Some(cur) = self.current {
            self.remember(cur);
        }

        let target = if self.shuffled {
            let recent: Vec<usize> = self.recent.iter().copied().collect();
            shuffle::pick_next(len, self.current, &recent, &mut self.rng)?
        } else {
            self.current.map(|c| (c + 1) % len).unwrap_or(0)
        };

        let was_playing = self.playing;
        self.load_now(target)?;
        if was_playing {
            self.play_now()?;
        }
        Ok(())
    }

    fn remember(&mut self, index: usize) {
        self.recent.retain(|&i| i != index);
        self.recent.push_front(index);
        self.recent
            .truncate(shuffle::HISTORY_CAP.min(self.catalog.len().saturating_sub(1)));
    }

    /// Previous is always sequential, even under shuffle.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        if self.play_pending {
            self.queued.push_back(Queued::Previous);
            return Ok(());
        }
        self.previous_now()
    }

    fn previous_now(&mut self) -> Result<(), SessionError> {
        let len = self.catalog.len();
        if len == 0 {
            return Err(SessionError::EmptyCatalog);
        }
        let target = (self.current.unwrap_or(0) + len - 1) % len;
        let was_playing = self.playing;
        self.load_now(target)?;
        if was_playing {
            self.play_now()?;
        }
        Ok(())
    }

    fn handle_ended(&mut self) {
        let Some(cur) = self.current else {
            self.playing = false;
            self.touch();
            return;
        };

        match self.repeat {
            RepeatMode::One => {
                // Replay in place: no load, so no play count bump.
                self.position = Duration::ZERO;
                self.transport.seek(Duration::ZERO);
                self.playing = true;
                self.play_pending = true;
                self.transport.play();
                self.touch();
            }
            RepeatMode::All => {
                self.playing = true;
                let _ = self.next_now();
            }
            RepeatMode::Off => {
                if cur + 1 < self.catalog.len() {
                    self.playing = true;
                    let _ = self.next_now();
                } else {
                    // End of catalog: stay on the last track, no wraparound.
                    self.playing = false;
                    self.touch();
                }
            }
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffled = !self.shuffled;
        self.touch();
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        self.touch();
    }

    pub fn cycle_repeat(&mut self) {
        self.repeat = match self.repeat {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        };
        self.touch();
    }

    /// Set the base volume. Dragging to zero mutes; raising it again only
    /// clears a mute that came from the slider, never an explicit one.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume == 0.0 {
            self.muted = true;
            self.muted_by_volume = true;
        } else if self.muted && self.muted_by_volume {
            self.muted = false;
            self.muted_by_volume = false;
        }
        self.transport.set_volume(self.effective_volume());
        self.touch();
    }

    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            self.muted_by_volume = false;
            if self.volume == 0.0 {
                self.volume = UNMUTE_FALLBACK_VOLUME;
            }
        } else {
            self.muted = true;
            self.muted_by_volume = false;
        }
        self.transport.set_volume(self.effective_volume());
        self.touch();
    }

    /// Remove a track from the catalog, keeping `current` valid.
    ///
    /// The catalog shrinks immediately; transport commands the removal would
    /// trigger (loading a successor, the final pause) honor the pending-play
    /// queue like every other operation.
    pub fn remove_track(&mut self, index: usize) -> Result<Track, SessionError> {
        let removed = self.catalog.remove_at(index)?;
        let len = self.catalog.len();

        // Fix up history: drop the removed slot, shift the ones behind it,
        // re-apply the cap for the shrunken catalog.
        self.recent.retain(|&i| i != index);
        for i in self.recent.iter_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        self.recent
            .truncate(shuffle::HISTORY_CAP.min(len.saturating_sub(1)));

        // Deferred loads point into the old index space; remap them.
        self.queued
            .retain(|cmd| !matches!(cmd, Queued::Load(i) if *i == index));
        for cmd in self.queued.iter_mut() {
            if let Queued::Load(i) = cmd {
                if *i > index {
                    *i -= 1;
                }
            }
        }

        match self.current {
            Some(cur) if index < cur => {
                self.current = Some(cur - 1);
                self.touch();
            }
            Some(cur) if index == cur => {
                if len == 0 {
                    self.current = None;
                    self.playing = false;
                    self.position = Duration::ZERO;
                    if self.play_pending {
                        self.queued.push_back(Queued::Pause);
                    } else {
                        self.transport.pause();
                    }
                    self.touch();
                } else {
                    let successor = index.min(len - 1);
                    let was_playing = self.playing;
                    self.current = None;
                    if self.play_pending {
                        self.queued.push_back(Queued::Load(successor));
                        if was_playing {
                            self.queued.push_back(Queued::Play);
                        }
                        self.touch();
                    } else {
                        self.load_now(successor)?;
                        if was_playing {
                            self.play_now()?;
                        }
                    }
                }
            }
            _ => self.touch(),
        }

        Ok(removed)
    }

    pub fn toggle_favorite(&mut self, index: usize) -> Result<bool, SessionError> {
        let Some(track) = self.catalog.get_mut(index) else {
            return Err(SessionError::IndexOutOfRange(index));
        };
        track.favorite = !track.favorite;
        let now_favorite = track.favorite;
        self.touch();
        Ok(now_favorite)
    }

    /// Scrub by `secs` relative to the current position.
    pub fn seek_by(&mut self, secs: i64) {
        if self.current.is_none() {
            return;
        }
        if self.play_pending {
            self.queued.push_back(Queued::Seek(secs));
            return;
        }
        self.seek_now(secs);
    }

    fn seek_now(&mut self, secs: i64) {
        if self.current.is_none() {
            return;
        }
        let cur = self.position.as_secs() as i64;
        let target = Duration::from_secs((cur + secs).max(0) as u64);
        self.position = target;
        self.transport.seek(target);
        self.touch();
    }

    pub fn append_track(&mut self, track: Track) -> Result<(), SessionError> {
        self.catalog.append(track)?;
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.catalog.clear();
        self.current = None;
        self.playing = false;
        self.recent.clear();
        self.position = Duration::ZERO;
        // Anything still queued referenced the dropped catalog. The pending
        // flag stays set until the transport's settle event actually arrives.
        self.queued.clear();
        if self.play_pending {
            self.queued.push_back(Queued::Pause);
        } else {
            self.transport.pause();
        }
        self.touch();
    }

    // --- persistence ---------------------------------------------------

    /// The whitelisted fields that survive a restart. Source paths are
    /// deliberately not part of this.
    pub fn saved_state(&self) -> SavedSession {
        SavedSession {
            current_index: self.current,
            shuffled: self.shuffled,
            repeat: self.repeat,
            volume: self.volume,
            muted: self.muted,
        }
    }

    /// Re-apply a saved session on startup. The stored index is validated
    /// against the freshly imported catalog; restoring does not count as a
    /// play, so `play_count` stays untouched.
    pub fn restore(&mut self, saved: &SavedSession) {
        self.shuffled = saved.shuffled;
        self.repeat = saved.repeat;
        self.volume = saved.volume.clamp(0.0, 1.0);
        self.muted = saved.muted;
        self.muted_by_volume = self.muted && self.volume == 0.0;

        if let Some(i) = saved.current_index.filter(|&i| i < self.catalog.len()) {
            self.current = Some(i);
            self.position = Duration::ZERO;
            if let Some(path) = self.catalog.get(i).map(|t| t.path.clone()) {
                self.transport.load(&path);
            }
        }

        self.transport.set_volume(self.effective_volume());
        self.touch();
    }
}
