use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, AppMode, CustomField, SettingsField};
use crate::core::{grid_columns, AspectRatio, ImageLoadState};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Settings => draw_settings(frame, app),
        _ => draw_main(frame, app),
    }

    if app.mode == AppMode::CustomSize {
        draw_custom_popup(frame, app);
    }
    if app.mode == AppMode::Alert {
        draw_alert(frame, app);
    }
}

fn spinner(app: &App) -> &'static str {
    SPINNER[app.tick % SPINNER.len()]
}

/// Draw main view with controls and results
fn draw_main(frame: &mut Frame, app: &App) {
    let banner_height = if app.session.error_banner().is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Title
            Constraint::Length(5),             // Prompt
            Constraint::Length(3),             // Controls
            Constraint::Length(banner_height), // Error banner
            Constraint::Min(6),                // Results
            Constraint::Length(3),             // Status bar
            Constraint::Length(1),             // Help line
        ])
        .split(frame.area());

    draw_title(frame, chunks[0]);
    draw_prompt(frame, app, chunks[1]);
    draw_controls(frame, app, chunks[2]);
    if banner_height > 0 {
        draw_banner(frame, app, chunks[3]);
    }
    draw_results(frame, app, chunks[4]);
    draw_status(frame, app, chunks[5]);
    draw_help(frame, app, chunks[6]);
}

fn draw_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(vec![Line::from(vec![
        Span::styled(
            "Artio",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" - What will you create?", Style::default().fg(Color::Gray)),
    ])])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    frame.render_widget(title, area);
}

fn draw_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.mode == AppMode::Prompt;
    let (text, style) = if app.form.prompt.is_empty() && !editing {
        (
            "A vibrant synthwave cityscape with a chrome sports car...".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (app.form.prompt.clone(), Style::default().fg(Color::White))
    };

    let title = if editing {
        format!(
            "Image Prompt ({}/{}) - Enter to generate, Esc to leave",
            app.prompt_len(),
            crate::core::params::MAX_PROMPT_LEN
        )
    } else {
        "Image Prompt (i to edit)".to_string()
    };

    let mut block = Block::default().borders(Borders::ALL).title(title);
    block = if editing {
        block.border_style(Style::default().fg(Color::Cyan))
    } else {
        block
    };

    let mut lines = vec![Line::from(Span::styled(text, style))];
    if let Some(err) = app.session.validation_error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    let prompt = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(prompt, area);

    if editing {
        let inner_width = area.width.saturating_sub(2).max(1);
        let pos = app.cursor_pos as u16;
        frame.set_cursor_position((
            area.x + 1 + pos % inner_width,
            area.y + 1 + pos / inner_width,
        ));
    }
}

fn draw_controls(frame: &mut Frame, app: &App, area: Rect) {
    let selected = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let normal = Style::default().fg(Color::Gray);

    let mut spans = Vec::new();
    for ratio in [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
    ] {
        let style = if app.form.aspect_ratio == ratio { selected } else { normal };
        spans.push(Span::styled(format!(" {} ", ratio), style));
        spans.push(Span::raw(" "));
    }

    let custom_style = if app.form.aspect_ratio == AspectRatio::Custom {
        selected
    } else {
        normal
    };
    spans.push(Span::styled(
        format!(" Custom {}x{} ", app.form.custom.width, app.form.custom.height),
        custom_style,
    ));

    spans.push(Span::raw("   "));
    let plural = if app.form.count > 1 { "s" } else { "" };
    spans.push(Span::styled(
        format!("{} Image{}", app.form.count, plural),
        Style::default().fg(Color::White),
    ));

    spans.push(Span::raw("   "));
    if app.session.is_submitting() {
        spans.push(Span::styled(
            format!("{} Generating...", spinner(app)),
            Style::default().fg(Color::Yellow),
        ));
    } else if app.form.prompt.trim().is_empty() {
        spans.push(Span::styled("[Generate]", Style::default().fg(Color::DarkGray)));
    } else {
        spans.push(Span::styled(
            "[Generate]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }

    let controls = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Options"));
    frame.render_widget(controls, area);
}

fn draw_banner(frame: &mut Frame, app: &App, area: Rect) {
    let Some(message) = app.session.error_banner() else {
        return;
    };
    let banner = Paragraph::new(message)
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Generation Error (x to dismiss)"),
        );
    frame.render_widget(banner, area);
}

/// Split `area` into a grid of `count` cells, `columns` wide
fn grid_cells(area: Rect, count: usize, columns: u16) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let columns = columns.max(1) as usize;
    let rows = count.div_ceil(columns);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    let mut cells = Vec::with_capacity(count);
    for row in row_areas.iter() {
        let col_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row);
        cells.extend(col_areas.iter().copied());
    }
    cells.truncate(count);
    cells
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Results");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = grid_columns(app.session.displayed_count());

    if app.session.is_submitting() {
        let count = app.session.displayed_count() as usize;
        for cell in grid_cells(inner, count, columns) {
            let skeleton = Paragraph::new(format!("{} generating", spinner(app)))
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(skeleton, cell);
        }
        return;
    }

    let results = app.session.results();
    if results.is_empty() {
        let empty = Paragraph::new("No images yet. Type a prompt and press Enter.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    for (i, (url, cell)) in results
        .iter()
        .zip(grid_cells(inner, results.len(), columns))
        .enumerate()
    {
        let state = app
            .session
            .load_state(url)
            .cloned()
            .unwrap_or(ImageLoadState::Loading);

        let (headline, color) = match &state {
            ImageLoadState::Loading => (format!("{} loading", spinner(app)), Color::Yellow),
            ImageLoadState::Loaded => ("✓ ready - d to download".to_string(), Color::Green),
            ImageLoadState::Error { .. } => ("✗ failed to load".to_string(), Color::Red),
        };

        let mut lines = vec![
            Line::from(Span::styled(headline, Style::default().fg(color))),
            Line::from(Span::styled(url.clone(), Style::default().fg(Color::DarkGray))),
        ];
        if let ImageLoadState::Error { reason } = &state {
            lines.push(Line::from(Span::styled(
                reason.clone(),
                Style::default().fg(Color::Red),
            )));
        }

        let border = if i == app.selected_image {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let card = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!("#{}", i + 1)),
            );
        frame.render_widget(card, cell);
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let (loading, loaded, failed) = app.session.load_states().tally();

    let (message, style) = if app.downloading {
        ("Downloading...".to_string(), Style::default().fg(Color::Yellow))
    } else if let Some(status) = &app.status_message {
        (status.clone(), Style::default().fg(Color::Green))
    } else if app.session.is_submitting() {
        ("Generating...".to_string(), Style::default().fg(Color::Yellow))
    } else if !app.session.load_states().is_empty() {
        (
            format!("{} loading, {} loaded, {} failed", loading, loaded, failed),
            Style::default().fg(Color::Gray),
        )
    } else {
        ("Ready".to_string(), Style::default().fg(Color::Gray))
    };

    let status = Paragraph::new(message)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.mode {
        AppMode::Prompt => "Enter: Generate | Esc: Done | Ctrl+L: Clear",
        AppMode::CustomSize => "Digits: Edit | Tab: Switch field | Enter/Esc: Close",
        _ => "i: Prompt | Enter: Generate | 1/2/3/c: Ratio | +/-: Count | ←→: Select | d: Download | s: Settings | q: Quit",
    };

    let help = Paragraph::new(help_text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

/// Centered rect of fixed size within `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_custom_popup(frame: &mut Frame, app: &App) {
    let area = centered(frame.area(), 40, 6);

    let field = |label: &str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        Span::styled(format!(" {}: {:<6}", label, value), style)
    };

    let lines = vec![
        Line::from(Span::styled(
            "Set a custom width and height.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            field("W", &app.form.custom.width, app.custom_field == CustomField::Width),
            Span::raw("  x "),
            field("H", &app.form.custom.height, app.custom_field == CustomField::Height),
        ]),
    ];

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Custom Dimensions"),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn draw_alert(frame: &mut Frame, app: &App) {
    let area = centered(frame.area(), 60, 8);
    let message = app.alert.as_deref().unwrap_or_default();

    let alert = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Alert (press any key)"),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(alert, area);
}

/// Draw settings screen
fn draw_settings(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Settings list
            Constraint::Length(3), // Status
            Constraint::Length(2), // Help
        ])
        .split(area);

    let header = Paragraph::new("Settings")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let fields = SettingsField::all();
    let items: Vec<ListItem> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let is_selected = i == app.settings_selected;
            let value = if app.settings_editing && is_selected {
                format!("{}▏", app.settings_edit_buffer)
            } else {
                app.get_settings_value(field)
            };

            let has_options = app.get_settings_options(field).is_some();
            let hint = if has_options { " [cycle]" } else { "" };

            let content = Line::from(vec![
                Span::styled(
                    format!("{:<20}", field.label()),
                    if is_selected {
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    },
                ),
                Span::styled(
                    format!("{}{}", value, hint),
                    if is_selected && app.settings_editing {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Gray)
                    },
                ),
            ]);

            ListItem::new(content)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL));
    frame.render_widget(list, chunks[1]);

    draw_status(frame, app, chunks[2]);

    let help_text = if app.settings_editing {
        "Enter: Save | Esc: Cancel"
    } else {
        "↑↓: Navigate | Enter/Space: Edit/Cycle | Esc/q: Back"
    };
    let help = Paragraph::new(help_text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeService;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn render(app: &App) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn grid_cells_fill_rows() {
        let area = Rect::new(0, 0, 40, 20);
        let cells = grid_cells(area, 4, grid_columns(4));
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].y, cells[1].y);
        assert!(cells[2].y > cells[0].y);

        let three = grid_cells(area, 3, grid_columns(3));
        assert!(three.iter().all(|c| c.y == three[0].y));
    }

    #[test]
    fn renders_banner_and_skeletons() {
        let mut app = App::new(Config::default(), Arc::new(FakeService::default()));
        app.form.prompt = "fox".to_string();
        app.form.count = 2;
        let sub = app.session.begin(&app.form).unwrap();
        let screen = render(&app);
        assert_eq!(screen.matches("generating").count(), 2);

        app.session.complete(
            sub.generation,
            Err(crate::core::ArtioError::Service {
                status: 429,
                message: "quota exceeded".into(),
            }),
        );
        let screen = render(&app);
        assert!(screen.contains("quota exceeded"));
    }

    #[test]
    fn renders_per_image_states() {
        let mut app = App::new(Config::default(), Arc::new(FakeService::default()));
        app.form.prompt = "fox".to_string();
        let sub = app.session.begin(&app.form).unwrap();
        app.session.complete(
            sub.generation,
            Ok(vec!["http://a".to_string(), "http://b".to_string()]),
        );
        app.session
            .record_load(sub.generation, "http://a", ImageLoadState::Loaded);
        app.session
            .record_load(sub.generation, "http://b", ImageLoadState::error("404"));

        let screen = render(&app);
        assert!(screen.contains("d to download"));
        assert!(screen.contains("failed to load"));
    }
}
