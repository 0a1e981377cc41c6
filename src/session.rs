//! Playback session state machine.
//!
//! Tracks the current index, play/pause intent, shuffle/repeat modes and
//! volume/mute state, and linearizes commands that arrive while a `play()`
//! acknowledgement is still pending. The session is the only component
//! allowed to drive the transport.

mod model;
mod shuffle;

pub use model::{RepeatMode, Session, Snapshot};

#[cfg(test)]
mod tests;
