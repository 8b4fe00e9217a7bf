use anyhow::Result;
use async_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::ImageService;
use crate::config::{Config, DisplayMode};
use crate::core::{
    ArtioError, AspectRatio, GenerationForm, GenerationResult, GenerationSession, ImageLoadState,
    DOWNLOAD_ALERT,
};
use crate::download::download_image;
use crate::loader::{self, LoadEvent};

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Main view with controls and results
    Main,
    /// Editing the prompt
    Prompt,
    /// Editing the custom width/height
    CustomSize,
    /// Settings screen
    Settings,
    /// Blocking alert; any key dismisses it
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomField {
    Width,
    Height,
}

/// Settings field being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    BaseUrl,
    Timeout,
    AspectRatio,
    Width,
    Height,
    Count,
    OutputDirectory,
    Display,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[
            SettingsField::BaseUrl,
            SettingsField::Timeout,
            SettingsField::AspectRatio,
            SettingsField::Width,
            SettingsField::Height,
            SettingsField::Count,
            SettingsField::OutputDirectory,
            SettingsField::Display,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::BaseUrl => "Service URL",
            SettingsField::Timeout => "Timeout (s)",
            SettingsField::AspectRatio => "Default Ratio",
            SettingsField::Width => "Default Width",
            SettingsField::Height => "Default Height",
            SettingsField::Count => "Default Count",
            SettingsField::OutputDirectory => "Output Directory",
            SettingsField::Display => "Preview Mode",
        }
    }

    pub fn config_key(&self) -> &'static str {
        match self {
            SettingsField::BaseUrl => "api.base_url",
            SettingsField::Timeout => "api.timeout_secs",
            SettingsField::AspectRatio => "defaults.aspect_ratio",
            SettingsField::Width => "defaults.width",
            SettingsField::Height => "defaults.height",
            SettingsField::Count => "defaults.count",
            SettingsField::OutputDirectory => "output.directory",
            SettingsField::Display => "output.display",
        }
    }
}

/// Completions reported back to the UI loop by spawned tasks
#[derive(Debug)]
pub enum AppEvent {
    Generated {
        generation: u64,
        outcome: Result<GenerationResult, ArtioError>,
    },
    Loaded(LoadEvent),
    Downloaded(Result<PathBuf, ArtioError>),
}

impl From<LoadEvent> for AppEvent {
    fn from(event: LoadEvent) -> Self {
        AppEvent::Loaded(event)
    }
}

/// TUI application state
pub struct App {
    /// Current mode
    pub mode: AppMode,

    /// Configuration
    pub config: Config,

    /// Generation service
    pub service: Arc<dyn ImageService>,

    /// Prompt and generation controls
    pub form: GenerationForm,

    /// Results and load states of the current generation
    pub session: GenerationSession,

    /// Cursor position in the prompt, in chars
    pub cursor_pos: usize,

    /// Which custom dimension is being edited
    pub custom_field: CustomField,

    /// Selected result image
    pub selected_image: usize,

    /// Status message
    pub status_message: Option<String>,

    /// Alert text shown in `AppMode::Alert`
    pub alert: Option<String>,

    /// Whether to quit
    pub should_quit: bool,

    /// Whether config was changed
    pub config_changed: bool,

    /// Settings: selected field index
    pub settings_selected: usize,

    /// Settings: currently editing
    pub settings_editing: bool,

    /// Settings: edit buffer
    pub settings_edit_buffer: String,

    /// Download in progress
    pub downloading: bool,

    /// Frame counter driving the spinner
    pub tick: usize,

    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    in_flight: Option<JoinHandle<()>>,
    probes: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(config: Config, service: Arc<dyn ImageService>) -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            mode: AppMode::Main,
            form: config.default_form(),
            config,
            service,
            session: GenerationSession::new(),
            cursor_pos: 0,
            custom_field: CustomField::Width,
            selected_image: 0,
            status_message: None,
            alert: None,
            should_quit: false,
            config_changed: false,
            settings_selected: 0,
            settings_editing: false,
            settings_edit_buffer: String::new(),
            downloading: false,
            tick: 0,
            events_tx,
            events_rx,
            in_flight: None,
            probes: Vec::new(),
        }
    }

    /// Set status message
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// Show a blocking alert
    pub fn show_alert(&mut self, msg: impl Into<String>) {
        self.alert = Some(msg.into());
        self.mode = AppMode::Alert;
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
        self.mode = AppMode::Main;
    }

    /// Start a generation from the current form.
    ///
    /// A previous in-flight request and its image probes are aborted.
    pub fn submit(&mut self) {
        let submission = match self.session.begin(&self.form) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::debug!("submission rejected: {}", e);
                return;
            }
        };

        self.abort_pending();
        self.selected_image = 0;
        self.status_message = None;

        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = service.generate(&submission.request).await;
            let _ = events
                .send(AppEvent::Generated {
                    generation: submission.generation,
                    outcome,
                })
                .await;
        }));
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        for handle in self.probes.drain(..) {
            handle.abort();
        }
    }

    /// Apply every event that has arrived since the last frame
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Generated {
                generation,
                outcome,
            } => {
                if !self.session.complete(generation, outcome) {
                    return;
                }
                self.in_flight = None;
                let urls = self.session.results().to_vec();
                if !urls.is_empty() {
                    self.set_status(format!("Received {} image(s)", urls.len()));
                    self.probes = loader::spawn_probes(
                        Arc::clone(&self.service),
                        generation,
                        &urls,
                        self.events_tx.clone(),
                    );
                }
            }
            AppEvent::Loaded(LoadEvent {
                generation,
                url,
                state,
            }) => {
                self.session.record_load(generation, &url, state);
            }
            AppEvent::Downloaded(result) => {
                self.downloading = false;
                match result {
                    Ok(path) => self.set_status(format!("Saved {}", path.display())),
                    Err(e) => {
                        tracing::warn!("download failed: {}", e);
                        self.show_alert(format!("{}\n\n{}", DOWNLOAD_ALERT, e));
                    }
                }
            }
        }
    }

    /// URL of the selected result image
    pub fn selected_url(&self) -> Option<&str> {
        self.session
            .results()
            .get(self.selected_image)
            .map(String::as_str)
    }

    pub fn selected_state(&self) -> Option<&ImageLoadState> {
        self.selected_url().and_then(|url| self.session.load_state(url))
    }

    /// Download the selected image; only offered once it has loaded
    pub fn download_selected(&mut self) -> bool {
        let Some(url) = self.selected_url().map(str::to_string) else {
            return false;
        };
        if !self.selected_state().map(ImageLoadState::is_loaded).unwrap_or(false) {
            self.set_status("Image has not loaded yet");
            return false;
        }

        self.downloading = true;
        self.set_status(format!("Downloading {}...", url));

        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();
        let dir = PathBuf::from(&self.config.output.directory);
        tokio::spawn(async move {
            let result = download_image(service.as_ref(), &url, &dir).await;
            let _ = events.send(AppEvent::Downloaded(result)).await;
        });
        true
    }

    pub fn select_previous(&mut self) {
        if self.selected_image > 0 {
            self.selected_image -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected_image < self.session.results().len().saturating_sub(1) {
            self.selected_image += 1;
        }
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.form.aspect_ratio = ratio;
        self.session.clear_validation_error();
    }

    // Prompt editing works on char positions so multi-byte input is safe

    fn byte_index(&self, char_pos: usize) -> usize {
        self.form
            .prompt
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.form.prompt.len())
    }

    pub fn prompt_len(&self) -> usize {
        self.form.prompt.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        if self.prompt_len() >= crate::core::params::MAX_PROMPT_LEN {
            return;
        }
        let idx = self.byte_index(self.cursor_pos);
        self.form.prompt.insert(idx, c);
        self.cursor_pos += 1;
        self.session.clear_validation_error();
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let idx = self.byte_index(self.cursor_pos);
            self.form.prompt.remove(idx);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor_pos < self.prompt_len() {
            let idx = self.byte_index(self.cursor_pos);
            self.form.prompt.remove(idx);
        }
    }

    pub fn clear_prompt(&mut self) {
        self.form.prompt.clear();
        self.cursor_pos = 0;
    }

    /// Apply a keystroke to the custom dimension being edited
    pub fn edit_custom(&mut self, c: Option<char>) {
        let current = match self.custom_field {
            CustomField::Width => self.form.custom.width.clone(),
            CustomField::Height => self.form.custom.height.clone(),
        };
        let mut next = current;
        match c {
            Some(c) => next.push(c),
            None => {
                next.pop();
            }
        }
        let accepted = match self.custom_field {
            CustomField::Width => self.form.set_custom_width(&next),
            CustomField::Height => self.form.set_custom_height(&next),
        };
        if accepted {
            self.session.clear_validation_error();
        }
    }

    /// Get current settings value
    pub fn get_settings_value(&self, field: &SettingsField) -> String {
        self.config.get(field.config_key()).unwrap_or_default()
    }

    /// Set settings value
    pub fn set_settings_value(&mut self, field: &SettingsField, value: &str) -> Result<()> {
        self.config.set(field.config_key(), value)?;
        self.config_changed = true;
        Ok(())
    }

    /// Get options for a settings field (if applicable)
    pub fn get_settings_options(&self, field: &SettingsField) -> Option<Vec<&'static str>> {
        match field {
            SettingsField::AspectRatio => Some(AspectRatio::variants().to_vec()),
            SettingsField::Count => Some(vec!["1", "2", "3", "4"]),
            SettingsField::Display => Some(DisplayMode::variants().to_vec()),
            _ => None,
        }
    }

    /// Cycle to next option for a settings field
    pub fn cycle_settings_option(&mut self, field: &SettingsField) -> Result<()> {
        if let Some(options) = self.get_settings_options(field) {
            let current = self.get_settings_value(field);
            let current_idx = options.iter().position(|&o| o == current).unwrap_or(0);
            let next_idx = (current_idx + 1) % options.len();
            self.set_settings_value(field, options[next_idx])?;
        }
        Ok(())
    }
}
