//! Application runtime: startup wiring and the terminal event loop.

use std::env;
use std::path::Path;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::audio::AudioOutput;
use crate::library::{Catalog, scan};
use crate::persist;
use crate::session::Session;

mod event_loop;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let tracks = scan(Path::new(&dir), &settings.library);
    let mut catalog = Catalog::from_tracks(tracks);

    let state_path = persist::resolve_state_path();
    let saved = startup::load_saved_state(state_path.as_deref(), &settings);
    if let Some(state) = &saved {
        persist::apply_stats(&mut catalog, &state.tracks);
    }

    let output = AudioOutput::new()?;
    let mut session = Session::new(catalog, output);
    startup::apply_session_defaults(&mut session, &settings, saved.as_ref());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut session, state_path.as_deref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
