use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lofty::file::AudioFile;
use rodio::{OutputStream, OutputStreamBuilder, StreamError};

use super::sink::create_sink_at;
use super::types::{Transport, TransportEvent};

/// `rodio`-backed transport. One sink per loaded source; seeking rebuilds
/// the sink at the requested offset.
pub struct AudioOutput {
    stream: OutputStream,
    sink: Option<rodio::Sink>,
    loaded: Option<PathBuf>,
    load_error: Option<String>,
    volume: f32,
    paused: bool,

    // Wall-clock position tracking: start instant of the current play
    // stretch plus time accumulated across pauses and seeks.
    started_at: Option<Instant>,
    accumulated: Duration,
    last_reported_secs: u64,

    pending: VecDeque<TransportEvent>,
}

impl AudioOutput {
    pub fn new() -> Result<Self, StreamError> {
        let mut stream = OutputStreamBuilder::open_default_stream()?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in
        // debugging, but noisy for a TUI app.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            loaded: None,
            load_error: None,
            volume: 1.0,
            paused: true,
            started_at: None,
            accumulated: Duration::ZERO,
            last_reported_secs: 0,
            pending: VecDeque::new(),
        })
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    fn drop_sink(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.paused = true;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        self.last_reported_secs = 0;
    }
}

impl Transport for AudioOutput {
    fn load(&mut self, source: &Path) {
        self.drop_sink();
        self.loaded = Some(source.to_path_buf());

        match create_sink_at(&self.stream, source, Duration::ZERO) {
            Ok(sink) => {
                sink.set_volume(self.volume);
                self.sink = Some(sink);
                self.load_error = None;

                // Duration probe: either a value or "unknown", never a failure.
                if let Ok(tagged) = lofty::read_from_path(source) {
                    self.pending.push_back(TransportEvent::LoadedMetadata {
                        duration: tagged.properties().duration(),
                    });
                }
            }
            Err(reason) => {
                self.load_error = Some(reason.clone());
                self.pending.push_back(TransportEvent::Error(reason));
            }
        }
    }

    fn play(&mut self) {
        match self.sink.as_ref() {
            Some(sink) => {
                sink.set_volume(self.volume);
                sink.play();
                self.paused = false;
                self.started_at = Some(Instant::now());
                self.pending.push_back(TransportEvent::PlaySettled(Ok(())));
            }
            None => {
                let reason = self
                    .load_error
                    .clone()
                    .unwrap_or_else(|| "no source loaded".to_string());
                self.pending
                    .push_back(TransportEvent::PlaySettled(Err(reason)));
            }
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.paused = true;
    }

    fn seek(&mut self, position: Duration) {
        let Some(path) = self.loaded.clone() else {
            return;
        };
        let was_paused = self.paused;

        if let Some(s) = self.sink.take() {
            s.stop();
        }

        match create_sink_at(&self.stream, &path, position) {
            Ok(sink) => {
                sink.set_volume(self.volume);
                if was_paused {
                    self.started_at = None;
                } else {
                    sink.play();
                    self.started_at = Some(Instant::now());
                }
                self.sink = Some(sink);
                self.paused = was_paused;
                self.accumulated = position;
                self.last_reported_secs = position.as_secs();
                self.pending
                    .push_back(TransportEvent::TimeUpdate { position });
            }
            Err(reason) => {
                self.drop_sink();
                self.load_error = Some(reason.clone());
                self.pending.push_back(TransportEvent::Error(reason));
            }
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.volume);
        }
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        if let Some(ev) = self.pending.pop_front() {
            return Some(ev);
        }

        let playing = self.sink.is_some() && !self.paused;
        if !playing {
            return None;
        }

        if self.sink.as_ref().is_some_and(|s| s.empty()) {
            self.drop_sink();
            return Some(TransportEvent::Ended);
        }

        let position = self.elapsed();
        if position.as_secs() > self.last_reported_secs {
            self.last_reported_secs = position.as_secs();
            return Some(TransportEvent::TimeUpdate { position });
        }

        None
    }
}
