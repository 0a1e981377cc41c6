//! Utilities for creating `rodio` sinks from source paths.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    handle: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<Sink, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("failed to decode {}: {e}", path.display()))?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(handle.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
