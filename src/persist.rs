//! Durable session state.
//!
//! A small TOML file holds the whitelisted session fields plus per-track
//! stats keyed by track id. Source paths are never stored as playable
//! handles; stats re-attach to tracks by id after the next import. Every
//! failure here is non-fatal to the player.

mod store;

pub use store::{
    SavedSession, SavedState, TrackStats, apply_stats, collect_stats, load, resolve_state_path,
    save,
};
