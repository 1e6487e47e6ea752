//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::App;
use crate::error::Result;

/// Maps a key event to an application action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Right | KeyCode::Char(']') => app.next_month()?,
        KeyCode::Left | KeyCode::Char('[') => app.prev_month()?,
        KeyCode::Tab | KeyCode::Char('s') => app.toggle_shift(),
        KeyCode::Char('f') => app.cycle_status_filter(),
        KeyCode::Char('r') => app.refresh()?,
        _ => {}
    }
    Ok(())
}
