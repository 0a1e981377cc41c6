//! Platform audio transport.
//!
//! The playback session drives a `Transport` and never touches the audio
//! backend directly. `AudioOutput` is the `rodio`-backed production
//! implementation; tests substitute their own.

mod output;
mod sink;
mod types;

pub use output::AudioOutput;
pub use types::{Transport, TransportEvent};
