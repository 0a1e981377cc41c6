//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::config::{ControlsSettings, UiSettings};
use crate::library::Catalog;
use crate::session::{RepeatMode, Snapshot};

/// Render the controls help text, incorporating the configured scrub step.
fn controls_text(seek_seconds: u64) -> String {
    let entries = [
        ("j/k", "up/down".to_string()),
        ("g/G", "top/bottom".to_string()),
        ("enter", "play selected track".to_string()),
        ("space/p", "play/pause".to_string()),
        ("h/l", "prev/next track".to_string()),
        ("H/L", format!("scrub -/+{}s", seek_seconds)),
        ("s", "shuffle".to_string()),
        ("r", "repeat mode".to_string()),
        ("m", "mute".to_string()),
        ("-/+", "volume".to_string()),
        ("f", "favorite".to_string()),
        ("d", "remove track".to_string()),
        ("q", "quit".to_string()),
    ];
    entries
        .iter()
        .map(|(k, v)| format!("[{}] {}", k, v))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn repeat_text(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "REPEAT: Off",
        RepeatMode::All => "REPEAT: All",
        RepeatMode::One => "REPEAT: One",
    }
}

/// One playlist row: playback marker, favorite marker, display text and an
/// optional play count.
fn track_line(
    catalog: &Catalog,
    index: usize,
    snapshot: &Snapshot,
    ui_settings: &UiSettings,
) -> String {
    let Some(track) = catalog.get(index) else {
        return String::new();
    };

    let marker = if snapshot.current_index == Some(index) {
        if snapshot.playing { "▶ " } else { "⏸ " }
    } else {
        "  "
    };
    let favorite = if track.favorite { "★ " } else { "" };

    let mut line = format!("{}{}{}", marker, favorite, track.display);
    if ui_settings.show_play_counts && track.play_count > 0 {
        line.push_str(&format!("  ({})", track.play_count));
    }
    line
}

/// Render the entire UI into the provided `frame`.
pub fn draw(
    frame: &mut Frame,
    catalog: &Catalog,
    snapshot: &Snapshot,
    selected: usize,
    status_message: Option<&str>,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" marea ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = Vec::new();

        match snapshot.current_index.and_then(|i| catalog.get(i)) {
            Some(track) => {
                let state = if snapshot.playing { "Playing" } else { "Paused" };
                let time = match track.duration {
                    Some(total) => {
                        format!("{} / {}", format_mmss(snapshot.position), format_mmss(total))
                    }
                    None => format_mmss(snapshot.position),
                };
                parts.push(format!("Track: {} [{}]", track.display, time));
                parts.push(state.to_string());
            }
            None => parts.push("Stopped".to_string()),
        }

        if snapshot.shuffled {
            parts.push("Shuffle: ON".to_string());
        } else {
            parts.push("Shuffle: OFF".to_string());
        }
        parts.push(repeat_text(snapshot.repeat).to_string());

        if snapshot.muted {
            parts.push("Volume: muted".to_string());
        } else {
            parts.push(format!("Volume: {:.0}%", snapshot.volume * 100.0));
        }

        if let Some(msg) = status_message {
            parts.push(format!("! {}", msg));
        }

        parts.join(" • ")
    };

    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Playlist
    {
        // Center the selected item when possible by rendering a visible
        // window instead of allocating items for the whole catalog.
        let total = catalog.len();
        let list_height = chunks[2].height as usize;
        let sel_pos = selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = if sel_pos > half { sel_pos - half } else { 0 };
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = (start..end)
            .map(|i| ListItem::new(track_line(catalog, i, snapshot, ui_settings)))
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    let footer = Paragraph::new(controls_text(controls_settings.seek_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
