use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, AppMode, CustomField, SettingsField};
use crate::core::AspectRatio;

/// Handle input in main mode
pub fn handle_main_input(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.clear_prompt();
        return Ok(());
    }

    match key.code {
        // Prompt
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.mode = AppMode::Prompt;
            app.cursor_pos = app.prompt_len();
        }

        KeyCode::Enter | KeyCode::Char('g') => app.submit(),

        // Aspect ratio
        KeyCode::Char('1') => app.set_aspect_ratio(AspectRatio::Square),
        KeyCode::Char('2') => app.set_aspect_ratio(AspectRatio::Landscape),
        KeyCode::Char('3') => app.set_aspect_ratio(AspectRatio::Portrait),
        KeyCode::Char('c') => {
            app.set_aspect_ratio(AspectRatio::Custom);
            app.custom_field = CustomField::Width;
            app.mode = AppMode::CustomSize;
        }

        // Output count
        KeyCode::Char('+') | KeyCode::Char('=') => app.form.increment_count(),
        KeyCode::Char('-') => app.form.decrement_count(),

        // Results
        KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => {
            app.select_previous()
        }
        KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => {
            app.select_next()
        }
        KeyCode::Char('d') => {
            app.download_selected();
        }

        // Dismiss error banner
        KeyCode::Char('x') => app.session.dismiss_error(),

        // Open settings
        KeyCode::Char('s') => {
            app.mode = AppMode::Settings;
            app.settings_selected = 0;
            app.settings_editing = false;
        }

        // Quit
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
        }

        _ => {}
    }
    Ok(())
}

/// Handle input while editing the prompt
pub fn handle_prompt_input(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Main;
        }

        KeyCode::Enter => {
            app.mode = AppMode::Main;
            app.submit();
        }

        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_prompt();
        }

        KeyCode::Char(c) => app.insert_char(c),

        KeyCode::Backspace => app.delete_before_cursor(),

        KeyCode::Delete => app.delete_at_cursor(),

        KeyCode::Left => {
            if app.cursor_pos > 0 {
                app.cursor_pos -= 1;
            }
        }

        KeyCode::Right => {
            if app.cursor_pos < app.prompt_len() {
                app.cursor_pos += 1;
            }
        }

        KeyCode::Home => {
            app.cursor_pos = 0;
        }

        KeyCode::End => {
            app.cursor_pos = app.prompt_len();
        }

        _ => {}
    }
    Ok(())
}

/// Handle input in the custom size popup
pub fn handle_custom_size_input(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.mode = AppMode::Main;
        }

        KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
            app.custom_field = match app.custom_field {
                CustomField::Width => CustomField::Height,
                CustomField::Height => CustomField::Width,
            };
        }

        KeyCode::Char(c) if c.is_ascii_digit() => app.edit_custom(Some(c)),

        KeyCode::Backspace => app.edit_custom(None),

        _ => {}
    }
    Ok(())
}

/// Any key dismisses an alert
pub fn handle_alert_input(app: &mut App, _key: KeyEvent) -> Result<()> {
    app.dismiss_alert();
    Ok(())
}

/// Handle input in settings mode
pub fn handle_settings_input(app: &mut App, key: KeyEvent) -> Result<()> {
    let fields = SettingsField::all();

    if app.settings_editing {
        // Editing a text field
        match key.code {
            KeyCode::Esc => {
                app.settings_editing = false;
                app.settings_edit_buffer.clear();
            }

            KeyCode::Enter => {
                let field = fields[app.settings_selected];
                let value = app.settings_edit_buffer.clone();
                if let Err(e) = app.set_settings_value(&field, &value) {
                    app.show_alert(e.to_string());
                } else {
                    app.set_status(format!("Updated {}", field.label()));
                }
                app.settings_editing = false;
                app.settings_edit_buffer.clear();
            }

            KeyCode::Char(c) => {
                app.settings_edit_buffer.push(c);
            }

            KeyCode::Backspace => {
                app.settings_edit_buffer.pop();
            }

            _ => {}
        }
    } else {
        // Navigation
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if app.settings_selected > 0 {
                    app.settings_selected -= 1;
                }
            }

            KeyCode::Down | KeyCode::Char('j') => {
                if app.settings_selected < fields.len() - 1 {
                    app.settings_selected += 1;
                }
            }

            KeyCode::Enter | KeyCode::Char(' ') => {
                let field = &fields[app.settings_selected];

                // Check if this field has options to cycle
                if app.get_settings_options(field).is_some() {
                    app.cycle_settings_option(field)?;
                    app.set_status(format!("Updated {}", field.label()));
                } else {
                    // Enter edit mode for text fields
                    app.settings_editing = true;
                    app.settings_edit_buffer = app.get_settings_value(field);
                }
            }

            KeyCode::Esc | KeyCode::Char('q') => {
                app.mode = AppMode::Main;
            }

            _ => {}
        }
    }
    Ok(())
}
