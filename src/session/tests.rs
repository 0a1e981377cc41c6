use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::audio::{Transport, TransportEvent};
use crate::error::SessionError;
use crate::library::{Catalog, Track};
use crate::persist::SavedSession;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Load(PathBuf),
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
}

/// Scripted transport: records every command and lets tests decide when a
/// `play()` settles.
#[derive(Default)]
struct FakeTransport {
    calls: Vec<Call>,
    events: VecDeque<TransportEvent>,
    /// When set, `play()` does not settle on its own.
    manual_settle: bool,
    reject_next_play: Option<String>,
}

impl FakeTransport {
    fn manual() -> Self {
        Self {
            manual_settle: true,
            ..Self::default()
        }
    }

    fn settle_ok(&mut self) {
        self.events.push_back(TransportEvent::PlaySettled(Ok(())));
    }

    fn settle_err(&mut self, reason: &str) {
        self.events
            .push_back(TransportEvent::PlaySettled(Err(reason.to_string())));
    }

    fn emit(&mut self, ev: TransportEvent) {
        self.events.push_back(ev);
    }
}

impl Transport for FakeTransport {
    fn load(&mut self, source: &Path) {
        self.calls.push(Call::Load(source.to_path_buf()));
    }

    fn play(&mut self) {
        self.calls.push(Call::Play);
        if !self.manual_settle {
            match self.reject_next_play.take() {
                Some(reason) => self.events.push_back(TransportEvent::PlaySettled(Err(reason))),
                None => self.events.push_back(TransportEvent::PlaySettled(Ok(()))),
            }
        }
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
    }

    fn seek(&mut self, position: Duration) {
        self.calls.push(Call::Seek(position));
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(Call::SetVolume(volume));
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

fn t(id: &str) -> Track {
    Track {
        id: id.into(),
        path: PathBuf::from(format!("/music/{id}.mp3")),
        title: id.into(),
        artist: None,
        album: None,
        duration: None,
        display: id.into(),
        play_count: 0,
        favorite: false,
        last_played_at: None,
    }
}

fn session_of(n: usize) -> Session<FakeTransport> {
    session_with(n, FakeTransport::default())
}

fn session_with(n: usize, transport: FakeTransport) -> Session<FakeTransport> {
    let catalog = Catalog::from_tracks((0..n).map(|i| t(&format!("t{i}"))).collect());
    Session::with_rng(catalog, transport, StdRng::seed_from_u64(42))
}

// --- scenarios from the state machine table -----------------------------

#[test]
fn fresh_play_loads_track_zero_and_counts_the_play() {
    let mut s = session_of(3);

    s.play().unwrap();
    s.pump();

    assert_eq!(s.current_index(), Some(0));
    assert!(s.is_playing());
    assert_eq!(s.catalog().get(0).unwrap().play_count, 1);
    assert!(s.catalog().get(0).unwrap().last_played_at.is_some());
    assert_eq!(s.catalog().get(1).unwrap().play_count, 0);
}

#[test]
fn sequential_next_walks_the_catalog_in_order() {
    let mut s = session_of(3);
    s.play().unwrap();
    s.pump();

    s.next().unwrap();
    s.pump();
    assert_eq!(s.current_index(), Some(1));

    s.next().unwrap();
    s.pump();
    assert_eq!(s.current_index(), Some(2));
    assert!(s.is_playing());
}

#[test]
fn ended_on_last_track_without_repeat_stops() {
    let mut s = session_of(3);
    s.load(2).unwrap();
    s.play().unwrap();
    s.pump();

    s.handle_event(TransportEvent::Ended);

    assert_eq!(s.current_index(), Some(2));
    assert!(!s.is_playing());
}

#[test]
fn ended_on_last_track_with_repeat_all_wraps_to_start() {
    let mut s = session_of(3);
    s.load(2).unwrap();
    s.play().unwrap();
    s.pump();
    s.cycle_repeat(); // off -> all

    s.handle_event(TransportEvent::Ended);
    s.pump();

    assert_eq!(s.current_index(), Some(0));
    assert!(s.is_playing());
}

#[test]
fn ended_with_repeat_one_replays_in_place() {
    let mut s = session_of(3);
    s.load(1).unwrap();
    s.play().unwrap();
    s.pump();
    s.cycle_repeat(); // off -> all
    s.cycle_repeat(); // all -> one
    let count_before = s.catalog().get(1).unwrap().play_count;
    s.transport_mut().calls.clear();

    s.handle_event(TransportEvent::Ended);
    s.pump();

    assert_eq!(s.current_index(), Some(1));
    assert!(s.is_playing());
    // Replay is seek-then-play on the same source, not a reload.
    assert_eq!(
        s.transport_mut().calls,
        vec![Call::Seek(Duration::ZERO), Call::Play]
    );
    assert_eq!(s.catalog().get(1).unwrap().play_count, count_before);
}

#[test]
fn removing_the_only_track_empties_the_session() {
    let mut s = session_of(1);
    s.play().unwrap();
    s.pump();
    assert!(s.is_playing());

    let removed = s.remove_track(0).unwrap();
    assert_eq!(removed.id, "t0");
    assert!(s.catalog().is_empty());
    assert_eq!(s.current_index(), None);
    assert!(!s.is_playing());
}

// --- invariants and idempotence -----------------------------------------

#[test]
fn operations_on_an_empty_catalog_are_rejected() {
    let mut s = session_of(0);

    assert!(matches!(s.play(), Err(SessionError::EmptyCatalog)));
    assert!(matches!(s.next(), Err(SessionError::EmptyCatalog)));
    assert!(matches!(s.previous(), Err(SessionError::EmptyCatalog)));
    assert!(matches!(s.load(0), Err(SessionError::EmptyCatalog)));
    assert_eq!(s.current_index(), None);
    assert!(!s.is_playing());
}

#[test]
fn load_rejects_out_of_range_indices_without_side_effects() {
    let mut s = session_of(2);
    s.load(0).unwrap();

    assert!(matches!(s.load(5), Err(SessionError::IndexOutOfRange(5))));
    assert_eq!(s.current_index(), Some(0));
    assert_eq!(s.catalog().get(0).unwrap().play_count, 1);
}

#[test]
fn play_count_increments_once_per_load() {
    let mut s = session_of(2);
    s.load(0).unwrap();
    s.load(0).unwrap();
    s.load(1).unwrap();

    assert_eq!(s.catalog().get(0).unwrap().play_count, 2);
    assert_eq!(s.catalog().get(1).unwrap().play_count, 1);
}

#[test]
fn pause_is_idempotent() {
    let mut s = session_of(2);
    s.play().unwrap();
    s.pump();

    s.pause();
    let once = s.snapshot();
    s.pause();
    let twice = s.snapshot();

    assert_eq!(once, twice);
    assert!(!twice.playing);
}

#[test]
fn cycle_repeat_round_trips_in_three_steps() {
    let mut s = session_of(1);
    let start = s.snapshot().repeat;

    s.cycle_repeat();
    assert_eq!(s.snapshot().repeat, RepeatMode::All);
    s.cycle_repeat();
    assert_eq!(s.snapshot().repeat, RepeatMode::One);
    s.cycle_repeat();
    assert_eq!(s.snapshot().repeat, start);
}

#[test]
fn toggle_shuffle_keeps_the_current_track() {
    let mut s = session_of(3);
    s.load(1).unwrap();

    s.toggle_shuffle();
    assert!(s.snapshot().shuffled);
    assert_eq!(s.current_index(), Some(1));

    s.toggle_shuffle();
    assert!(!s.snapshot().shuffled);
}

// --- shuffle and history -------------------------------------------------

#[test]
fn next_records_history_newest_first_with_dedup() {
    let mut s = session_of(10);
    s.load(0).unwrap();
    for _ in 0..3 {
        s.next().unwrap();
    }
    // current went 0 -> 1 -> 2 -> 3
    assert_eq!(s.recent_history(), vec![2, 1, 0]);

    s.load(1).unwrap();
    s.next().unwrap();
    assert_eq!(s.recent_history(), vec![1, 2, 0]);
}

#[test]
fn history_is_capped_at_five_entries() {
    let mut s = session_of(10);
    s.load(0).unwrap();
    for _ in 0..8 {
        s.next().unwrap();
    }
    assert_eq!(s.recent_history().len(), 5);
}

#[test]
fn shuffled_next_avoids_current_and_recent_tracks() {
    let mut s = session_of(10);
    s.load(0).unwrap();
    s.toggle_shuffle();

    for _ in 0..50 {
        let before = s.current_index().unwrap();
        let recent = s.recent_history();
        s.next().unwrap();
        let picked = s.current_index().unwrap();

        assert_ne!(picked, before);
        assert!(
            !recent.contains(&picked),
            "picked {picked} out of recent {recent:?}"
        );
    }
}

#[test]
fn previous_is_sequential_even_under_shuffle() {
    let mut s = session_of(4);
    s.load(0).unwrap();
    s.toggle_shuffle();

    s.previous().unwrap();
    assert_eq!(s.current_index(), Some(3));
    s.previous().unwrap();
    assert_eq!(s.current_index(), Some(2));
}

// --- volume and mute -----------------------------------------------------

#[test]
fn set_volume_clamps_and_drives_the_transport() {
    let mut s = session_of(1);
    s.set_volume(1.7);
    assert_eq!(s.snapshot().volume, 1.0);

    s.set_volume(-0.3);
    assert_eq!(s.snapshot().volume, 0.0);
    assert!(s.snapshot().muted);

    assert_eq!(
        s.transport_mut().calls,
        vec![Call::SetVolume(1.0), Call::SetVolume(0.0)]
    );
}

#[test]
fn raising_the_slider_clears_only_a_volume_derived_mute() {
    let mut s = session_of(1);

    s.set_volume(0.0);
    assert!(s.snapshot().muted);
    s.set_volume(0.5);
    assert!(!s.snapshot().muted);

    // An explicit mute survives slider movement.
    s.toggle_mute();
    s.set_volume(0.8);
    assert!(s.snapshot().muted);
    assert_eq!(s.snapshot().volume, 0.8);
}

#[test]
fn mute_is_an_output_override_that_preserves_volume() {
    let mut s = session_of(1);
    s.set_volume(0.6);
    s.transport_mut().calls.clear();

    s.toggle_mute();
    assert!(s.snapshot().muted);
    assert_eq!(s.snapshot().volume, 0.6);
    assert_eq!(s.transport_mut().calls, vec![Call::SetVolume(0.0)]);

    s.toggle_mute();
    assert!(!s.snapshot().muted);
    assert_eq!(s.snapshot().volume, 0.6);
}

#[test]
fn unmuting_at_zero_volume_restores_a_sensible_default() {
    let mut s = session_of(1);
    s.set_volume(0.0);

    s.toggle_mute();
    assert!(!s.snapshot().muted);
    assert!(s.snapshot().volume > 0.0);
}

// --- removal -------------------------------------------------------------

#[test]
fn removing_before_current_shifts_the_index_down() {
    let mut s = session_of(4);
    s.load(2).unwrap();

    s.remove_track(0).unwrap();
    assert_eq!(s.current_index(), Some(1));
    assert_eq!(s.current_track().unwrap().id, "t2");
}

#[test]
fn removing_the_current_track_loads_the_clamped_successor() {
    let mut s = session_of(3);
    s.load(2).unwrap();
    s.play().unwrap();
    s.pump();

    s.remove_track(2).unwrap();
    s.pump();

    assert_eq!(s.current_index(), Some(1));
    assert_eq!(s.current_track().unwrap().id, "t1");
    assert!(s.is_playing());
}

#[test]
fn removal_rewrites_history_indices() {
    let mut s = session_of(6);
    s.load(0).unwrap();
    for _ in 0..4 {
        s.next().unwrap();
    }
    assert_eq!(s.recent_history(), vec![3, 2, 1, 0]);

    s.remove_track(2).unwrap();
    // Index 2 is gone; 3 shifted down to 2.
    assert_eq!(s.recent_history(), vec![2, 1, 0]);
}

// --- pending play linearization ------------------------------------------

#[test]
fn commands_during_a_pending_play_apply_in_arrival_order() {
    let mut s = session_with(3, FakeTransport::manual());
    s.play().unwrap();
    assert!(s.is_playing());

    // Arrives while the play acknowledgement is outstanding.
    s.pause();
    assert!(s.is_playing(), "pause must wait for the pending play");

    s.transport_mut().settle_ok();
    s.pump();

    assert!(!s.is_playing());
    assert_eq!(
        s.transport_mut().calls.last(),
        Some(&Call::Pause),
        "queued pause runs after settle"
    );
}

#[test]
fn rejected_play_rolls_back_the_optimistic_intent() {
    let mut s = session_with(3, FakeTransport::manual());
    s.play().unwrap();
    assert!(s.is_playing());

    s.transport_mut().settle_err("autoplay policy");
    s.pump();

    assert!(!s.is_playing());
    assert_eq!(s.take_error().as_deref(), Some("autoplay policy"));
    assert_eq!(s.current_index(), Some(0));
}

#[test]
fn queued_next_runs_after_the_pending_play_settles() {
    let mut s = session_with(3, FakeTransport::manual());
    s.play().unwrap();
    s.next().unwrap();
    assert_eq!(s.current_index(), Some(0), "next is deferred");

    s.transport_mut().settle_ok();
    s.pump();
    // The queued next loads track 1 and re-enters the pending window.
    assert_eq!(s.current_index(), Some(1));

    s.transport_mut().settle_ok();
    s.pump();
    assert!(s.is_playing());
}

#[test]
fn removing_the_current_track_during_a_pending_play_defers_transport_commands() {
    let mut s = session_with(3, FakeTransport::manual());
    s.play().unwrap();
    let calls_before = s.transport_mut().calls.len();

    s.remove_track(0).unwrap();
    assert_eq!(s.catalog().len(), 2);
    assert_eq!(
        s.transport_mut().calls.len(),
        calls_before,
        "no transport traffic while the play is unsettled"
    );

    s.transport_mut().settle_ok();
    s.pump();

    // The successor load and resume ran only after the settle.
    assert_eq!(s.current_index(), Some(0));
    assert_eq!(s.current_track().unwrap().id, "t1");
    assert_eq!(s.transport_mut().calls.last(), Some(&Call::Play));
    assert!(
        s.transport_mut()
            .calls
            .contains(&Call::Load(PathBuf::from("/music/t1.mp3")))
    );
}

#[test]
fn removing_the_only_track_during_a_pending_play_defers_the_pause() {
    let mut s = session_with(1, FakeTransport::manual());
    s.play().unwrap();
    let calls_before = s.transport_mut().calls.len();

    s.remove_track(0).unwrap();
    assert!(s.catalog().is_empty());
    assert!(!s.is_playing());
    assert_eq!(s.transport_mut().calls.len(), calls_before);

    s.transport_mut().settle_ok();
    s.pump();
    assert_eq!(s.transport_mut().calls.last(), Some(&Call::Pause));
}

#[test]
fn removal_remaps_loads_queued_behind_a_pending_play() {
    let mut s = session_with(4, FakeTransport::manual());
    s.play().unwrap();
    s.load(2).unwrap();

    // t2 shifts down to index 1 while the load is still queued.
    s.remove_track(1).unwrap();

    s.transport_mut().settle_ok();
    s.pump();

    assert_eq!(s.current_index(), Some(1));
    assert_eq!(s.current_track().unwrap().id, "t2");
}

#[test]
fn removal_drops_a_queued_load_of_the_removed_track() {
    let mut s = session_with(3, FakeTransport::manual());
    s.play().unwrap();
    s.load(1).unwrap();

    s.remove_track(1).unwrap();

    s.transport_mut().settle_ok();
    s.pump();

    // The deferred load targeted the removed track and is gone with it.
    assert_eq!(s.current_index(), Some(0));
    assert_eq!(s.current_track().unwrap().id, "t0");
}

#[test]
fn seek_during_a_pending_play_waits_for_settle() {
    let mut s = session_with(2, FakeTransport::manual());
    s.play().unwrap();

    s.seek_by(10);
    assert!(
        !s.transport_mut()
            .calls
            .contains(&Call::Seek(Duration::from_secs(10)))
    );

    s.transport_mut().settle_ok();
    s.pump();

    assert_eq!(
        s.transport_mut().calls.last(),
        Some(&Call::Seek(Duration::from_secs(10)))
    );
    assert_eq!(s.snapshot().position, Duration::from_secs(10));
}

#[test]
fn clear_during_a_pending_play_defers_the_pause() {
    let mut s = session_with(2, FakeTransport::manual());
    s.play().unwrap();
    let calls_before = s.transport_mut().calls.len();

    s.clear();
    assert!(s.catalog().is_empty());
    assert!(!s.is_playing());
    assert_eq!(s.transport_mut().calls.len(), calls_before);

    s.transport_mut().settle_ok();
    s.pump();
    assert_eq!(s.transport_mut().calls.last(), Some(&Call::Pause));
}

#[test]
fn ended_during_a_pending_play_is_deferred() {
    let mut s = session_with(2, FakeTransport::manual());
    s.play().unwrap();

    s.handle_event(TransportEvent::Ended);
    assert_eq!(s.current_index(), Some(0), "ended waits for settle");

    s.transport_mut().settle_ok();
    s.pump();
    assert_eq!(s.current_index(), Some(1));
}

// --- transport events ----------------------------------------------------

#[test]
fn loaded_metadata_fills_in_unknown_durations() {
    let mut s = session_of(2);
    s.load(0).unwrap();

    s.handle_event(TransportEvent::LoadedMetadata {
        duration: Duration::from_secs(180),
    });
    assert_eq!(
        s.current_track().unwrap().duration,
        Some(Duration::from_secs(180))
    );
}

#[test]
fn time_updates_move_the_reported_position() {
    let mut s = session_of(1);
    s.load(0).unwrap();

    s.handle_event(TransportEvent::TimeUpdate {
        position: Duration::from_secs(42),
    });
    assert_eq!(s.snapshot().position, Duration::from_secs(42));
}

#[test]
fn transport_errors_stop_playback_and_surface() {
    let mut s = session_of(1);
    s.play().unwrap();
    s.pump();

    s.handle_event(TransportEvent::Error("bad file".into()));
    assert!(!s.is_playing());
    assert_eq!(s.take_error().as_deref(), Some("bad file"));
    assert!(s.take_error().is_none(), "errors are taken once");
}

// --- persistence ---------------------------------------------------------

#[test]
fn saved_state_round_trips_through_restore() {
    let mut s = session_of(5);
    s.load(3).unwrap();
    s.toggle_shuffle();
    s.cycle_repeat();
    s.set_volume(0.25);

    let saved = s.saved_state();

    let mut fresh = session_of(5);
    fresh.restore(&saved);
    let snap = fresh.snapshot();

    assert_eq!(snap.current_index, Some(3));
    assert!(snap.shuffled);
    assert_eq!(snap.repeat, RepeatMode::All);
    assert_eq!(snap.volume, 0.25);
    assert!(!snap.playing, "restore never auto-plays");
    // Restoring is not a play.
    assert_eq!(fresh.catalog().get(3).unwrap().play_count, 0);
}

#[test]
fn restore_drops_an_index_the_catalog_no_longer_has() {
    let saved = SavedSession {
        current_index: Some(9),
        shuffled: false,
        repeat: RepeatMode::Off,
        volume: 0.5,
        muted: false,
    };

    let mut s = session_of(2);
    s.restore(&saved);
    assert_eq!(s.current_index(), None);
}

// --- misc ----------------------------------------------------------------

#[test]
fn toggle_favorite_flips_and_reports() {
    let mut s = session_of(2);
    assert!(s.toggle_favorite(1).unwrap());
    assert!(s.catalog().get(1).unwrap().favorite);
    assert!(!s.toggle_favorite(1).unwrap());
    assert!(matches!(
        s.toggle_favorite(7),
        Err(SessionError::IndexOutOfRange(7))
    ));
}

#[test]
fn seek_by_clamps_at_the_start_of_the_track() {
    let mut s = session_of(1);
    s.load(0).unwrap();
    s.handle_event(TransportEvent::TimeUpdate {
        position: Duration::from_secs(3),
    });

    s.seek_by(-30);
    assert_eq!(s.snapshot().position, Duration::ZERO);
    assert_eq!(
        s.transport_mut().calls.last(),
        Some(&Call::Seek(Duration::ZERO))
    );
}

#[test]
fn clear_resets_to_the_empty_state() {
    let mut s = session_of(3);
    s.play().unwrap();
    s.pump();

    s.clear();
    assert!(s.catalog().is_empty());
    assert_eq!(s.current_index(), None);
    assert!(!s.is_playing());
    assert_eq!(s.snapshot().position, Duration::ZERO);
}

#[test]
fn revision_bumps_on_every_mutation() {
    let mut s = session_of(2);
    let r0 = s.revision();
    s.toggle_shuffle();
    let r1 = s.revision();
    assert!(r1 > r0);
    s.set_volume(0.3);
    assert!(s.revision() > r1);
}
