use std::io::Stdout;
use std::path::Path;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::audio::Transport;
use crate::config::Settings;
use crate::error::SessionError;
use crate::persist::{self, SavedState};
use crate::session::Session;
use crate::ui;

const TICK: Duration = Duration::from_millis(50);

/// Drive the session: pump transport events, redraw, dispatch keys and
/// persist state whenever the session changed.
pub fn run<T: Transport>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    settings: &Settings,
    session: &mut Session<T>,
    state_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut selected: usize = session.current_index().unwrap_or(0);
    let mut status: Option<String> = None;
    let mut last_saved = session.revision();

    loop {
        session.pump();
        if let Some(err) = session.take_error() {
            status = Some(err);
        }

        if session.revision() != last_saved {
            save_state(session, state_path, &mut status);
            last_saved = session.revision();
        }

        let len = session.catalog().len();
        selected = selected.min(len.saturating_sub(1));

        let snapshot = session.snapshot();
        terminal.draw(|f| {
            ui::draw(
                f,
                session.catalog(),
                &snapshot,
                selected,
                status.as_deref(),
                &settings.ui,
                &settings.controls,
            )
        })?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Char(' ') | KeyCode::Char('p') => report(session.toggle_play(), &mut status),
            KeyCode::Enter => {
                if len > 0 {
                    report(session.load(selected), &mut status);
                    report(session.play(), &mut status);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if selected + 1 < len {
                    selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Char('g') => selected = 0,
            KeyCode::Char('G') => selected = len.saturating_sub(1),
            KeyCode::Char('h') => report(session.previous(), &mut status),
            KeyCode::Char('l') => report(session.next(), &mut status),
            KeyCode::Char('s') => session.toggle_shuffle(),
            KeyCode::Char('r') => session.cycle_repeat(),
            KeyCode::Char('m') => session.toggle_mute(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let v = session.snapshot().volume + settings.controls.volume_step;
                session.set_volume(v);
            }
            KeyCode::Char('-') => {
                let v = session.snapshot().volume - settings.controls.volume_step;
                session.set_volume(v);
            }
            KeyCode::Char('f') => {
                if len > 0 {
                    report(session.toggle_favorite(selected).map(|_| ()), &mut status);
                }
            }
            KeyCode::Char('d') => {
                if len > 0 {
                    report(session.remove_track(selected).map(|_| ()), &mut status);
                }
            }
            KeyCode::Char('H') => session.seek_by(-(settings.controls.seek_seconds as i64)),
            KeyCode::Char('L') => session.seek_by(settings.controls.seek_seconds as i64),
            _ => {}
        }
    }

    // One last write so play counts and modes survive the quit.
    save_state(session, state_path, &mut status);
    Ok(())
}

fn report(result: Result<(), SessionError>, status: &mut Option<String>) {
    if let Err(e) = result {
        *status = Some(e.to_string());
    }
}

fn save_state<T: Transport>(
    session: &Session<T>,
    state_path: Option<&Path>,
    status: &mut Option<String>,
) {
    let Some(path) = state_path else {
        return;
    };
    let state = SavedState {
        session: session.saved_state(),
        tracks: persist::collect_stats(session.catalog()),
    };
    // Persistence is best-effort; playback keeps going if the disk does not.
    if let Err(e) = persist::save(path, &state) {
        *status = Some(format!("failed to save state: {e}"));
    }
}
