use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/marea/config.toml` or `~/.config/marea/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `MAREA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled (overridden by a restored session).
    pub shuffle: bool,
    /// Default repeat mode.
    pub repeat: RepeatSetting,
    /// Starting volume in `[0, 1]`.
    pub volume: f32,
    /// Restore current track, modes and volume from the previous session.
    pub restore_session: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatSetting::Off,
            volume: 0.7,
            restore_session: true,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatSetting {
    #[serde(alias = "none", alias = "no-repeat")]
    Off,
    #[serde(alias = "repeat-all", alias = "loop_all", alias = "loop-all")]
    All,
    #[serde(alias = "repeat-one", alias = "loop_one", alias = "loop-one")]
    One,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub seek_seconds: u64,
    /// Volume change applied per `+` / `-` press, in `[0, 1]`.
    pub volume_step: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 5,
            volume_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Whether the playlist shows per-track play counts.
    pub show_play_counts: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ marea ~ ".to_string(),
            show_play_counts: true,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// "artist - title" composed from whatever tags are present.
    Display,
    Title,
    Artist,
    Album,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,

    /// Which fields to use to build `Track.display` and its ordering.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}
