//! Transport trait and lifecycle events.

use std::path::Path;
use std::time::Duration;

/// Events the transport reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The loaded source was probed successfully.
    LoadedMetadata { duration: Duration },
    /// Playback position advanced.
    TimeUpdate { position: Duration },
    /// A prior `play()` was acknowledged or rejected by the platform.
    PlaySettled(Result<(), String>),
    /// The current source played to its end.
    Ended,
    /// The source could not be opened or decoded.
    Error(String),
}

/// The platform playback primitive the session drives.
///
/// `play()` is asynchronous in spirit: the call returns immediately and the
/// outcome arrives later as a `PlaySettled` event from `poll`. Everything
/// else takes effect synchronously.
pub trait Transport {
    /// Swap the loaded source. Releases whatever was loaded before.
    fn load(&mut self, source: &Path);
    /// Request playback of the loaded source.
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    /// Set the effective output volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
    /// Drain the next pending lifecycle event, if any.
    fn poll(&mut self) -> Option<TransportEvent>;
}
