//! Terminal dashboard for browsing one month of measurements.
//!
//! Feature-gated behind `tui`. Launch with the `tui` subcommand.

mod controls;
mod layout;
/// Application state.
pub mod runtime;
mod style;

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::config::ThresholdsConfig;
use crate::error::Result;
use crate::measure::Month;
use crate::store::Store;
use runtime::App;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs the TUI until the user quits.
///
/// Sets up the terminal (raw mode, alternate screen), runs the event loop,
/// and restores the terminal on exit, including on error.
///
/// # Errors
///
/// Returns terminal I/O errors and store errors raised while reloading.
pub fn run(store: Store, thresholds: ThresholdsConfig, month: Month) -> Result<()> {
    let mut app = App::new(store, thresholds, month)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(t) => t,
        Err(e) => {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
    };

    let result = event_loop(&mut terminal, &mut app);

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

/// Poll input, reload when stale, draw.
fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| layout::render(frame, app))?;

        if app.quit {
            return Ok(());
        }

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                controls::handle_key(app, key)?;
            }
        }

        if app.needs_refresh() {
            app.refresh()?;
        }
    }
}
