mod app;
mod event_handler;
mod ui;

use anyhow::Result;
use crossterm::{
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::api::HttpImageService;
use crate::config::Config;

pub use app::{App, AppMode};

/// Run the TUI application
pub async fn run(config: &mut Config) -> Result<()> {
    let service = Arc::new(HttpImageService::from_config(config)?);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.clone(), service);

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Save config if changed
    if app.config_changed {
        *config = app.config.clone();
        config.save()?;
    }

    result
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Background completions are applied here, between frames
        app.drain_events();
        app.tick = app.tick.wrapping_add(1);

        terminal.draw(|f| ui::draw(f, app))?;

        if poll(Duration::from_millis(100))? {
            if let Event::Key(key) = read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Global quit shortcut
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                match app.mode {
                    AppMode::Main => event_handler::handle_main_input(app, key)?,
                    AppMode::Prompt => event_handler::handle_prompt_input(app, key)?,
                    AppMode::CustomSize => event_handler::handle_custom_size_input(app, key)?,
                    AppMode::Settings => event_handler::handle_settings_input(app, key)?,
                    AppMode::Alert => event_handler::handle_alert_input(app, key)?,
                }
            }
        } else {
            tokio::task::yield_now().await;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
