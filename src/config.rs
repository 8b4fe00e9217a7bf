use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::params::{DEFAULT_DIMENSION, MAX_COUNT, MIN_COUNT};
use crate::core::{AspectRatio, CustomSize, GenerationForm};
use crate::http_client::DEFAULT_TIMEOUT_SECS;

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "ARTIO_BASE_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL from the environment. Never written back to the file.
    #[serde(skip)]
    pub base_url_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_count")]
    pub count: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_display")]
    pub display: DisplayMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Terminal,
    None,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Terminal => "terminal",
            DisplayMode::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "terminal" => Some(DisplayMode::Terminal),
            "none" => Some(DisplayMode::None),
            _ => None,
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["terminal", "none"]
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_dimension() -> u32 {
    1024
}

fn default_count() -> u8 {
    1
}

fn default_output_directory() -> String {
    "./artio-output".to_string()
}

fn default_display() -> DisplayMode {
    DisplayMode::Terminal
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            width: default_dimension(),
            height: default_dimension(),
            count: default_count(),
        }
    }
}

impl DefaultsConfig {
    /// Pull hand-edited values back into the ranges `set` enforces
    fn sanitize(&mut self) {
        if !(MIN_COUNT..=MAX_COUNT).contains(&self.count) {
            tracing::warn!(
                "defaults.count = {} is out of range, using {}",
                self.count,
                self.count.clamp(MIN_COUNT, MAX_COUNT)
            );
            self.count = self.count.clamp(MIN_COUNT, MAX_COUNT);
        }
        if self.width == 0 {
            tracing::warn!("defaults.width = 0 is not allowed, using {}", DEFAULT_DIMENSION);
            self.width = DEFAULT_DIMENSION;
        }
        if self.height == 0 {
            tracing::warn!("defaults.height = 0 is not allowed, using {}", DEFAULT_DIMENSION);
            self.height = DEFAULT_DIMENSION;
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            display: default_display(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            defaults: DefaultsConfig::default(),
            output: OutputConfig::default(),
            config_path: PathBuf::new(),
            base_url_override: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "artio", "artio")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it if missing
    pub fn load_or_create() -> Result<Self> {
        let mut config = Self::load_or_create_at(&Self::config_path()?)?;
        config.apply_env_override(std::env::var(BASE_URL_ENV).ok());
        Ok(config)
    }

    /// Load config from `path`, writing defaults there if it does not exist
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&content).context("Failed to parse config file")?;
            config.config_path = path.to_path_buf();
            config.defaults.sanitize();
            Ok(config)
        } else {
            let config = Config {
                config_path: path.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// The environment variable takes precedence over the file
    fn apply_env_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Using base url from {}: {}", BASE_URL_ENV, url);
            self.base_url_override = Some(url);
        }
    }

    /// Base URL requests go to: the environment override, else `api.base_url`
    pub fn effective_base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Initial form state built from `[defaults]`
    pub fn default_form(&self) -> GenerationForm {
        GenerationForm {
            prompt: String::new(),
            aspect_ratio: self.defaults.aspect_ratio,
            custom: CustomSize::new(
                self.defaults.width.to_string(),
                self.defaults.height.to_string(),
            ),
            count: self.defaults.count,
        }
    }

    /// Set a config value by key path (e.g., "api.base_url", "defaults.count")
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    anyhow::bail!("Base URL must start with http:// or https://");
                }
                self.api.base_url = value.trim_end_matches('/').to_string();
            }
            "api.timeout_secs" => {
                let secs: u64 = value.parse().context("Invalid number of seconds")?;
                if secs == 0 {
                    anyhow::bail!("Timeout must be at least 1 second");
                }
                self.api.timeout_secs = secs;
            }
            "defaults.aspect_ratio" => {
                self.defaults.aspect_ratio = value.parse().map_err(|_| {
                    anyhow::anyhow!(
                        "Invalid aspect ratio. Valid values: {}",
                        AspectRatio::variants().join(", ")
                    )
                })?;
            }
            "defaults.width" => self.defaults.width = parse_dimension(value)?,
            "defaults.height" => self.defaults.height = parse_dimension(value)?,
            "defaults.count" => {
                let count: u8 = value.parse().context("Invalid count")?;
                if !(1..=4).contains(&count) {
                    anyhow::bail!("Count must be between 1 and 4");
                }
                self.defaults.count = count;
            }
            "output.directory" => self.output.directory = value.to_string(),
            "output.display" => {
                self.output.display = DisplayMode::parse(value).with_context(|| {
                    format!(
                        "Invalid display mode. Valid values: {}",
                        DisplayMode::variants().join(", ")
                    )
                })?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value by key path
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api.base_url" => Some(self.api.base_url.clone()),
            "api.timeout_secs" => Some(self.api.timeout_secs.to_string()),
            "defaults.aspect_ratio" => Some(self.defaults.aspect_ratio.to_string()),
            "defaults.width" => Some(self.defaults.width.to_string()),
            "defaults.height" => Some(self.defaults.height.to_string()),
            "defaults.count" => Some(self.defaults.count.to_string()),
            "output.directory" => Some(self.output.directory.clone()),
            "output.display" => Some(self.output.display.as_str().to_string()),
            _ => None,
        }
    }

    /// Get all config keys
    pub fn keys() -> &'static [&'static str] {
        &[
            "api.base_url",
            "api.timeout_secs",
            "defaults.aspect_ratio",
            "defaults.width",
            "defaults.height",
            "defaults.count",
            "output.directory",
            "output.display",
        ]
    }
}

fn parse_dimension(value: &str) -> Result<u32> {
    let n: u32 = value.parse().context("Invalid dimension")?;
    if n == 0 {
        anyhow::bail!("Dimensions must be positive numbers");
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_default_file_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_create_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.defaults.aspect_ratio, AspectRatio::Square);
    }

    #[test]
    fn round_trips_edits_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_or_create_at(&path).unwrap();
        config.set("defaults.aspect_ratio", "9:16").unwrap();
        config.set("defaults.count", "3").unwrap();
        config.set("api.base_url", "https://gen.example.com/").unwrap();
        config.save().unwrap();

        let reloaded = Config::load_or_create_at(&path).unwrap();
        assert_eq!(reloaded.defaults.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(reloaded.defaults.count, 3);
        assert_eq!(reloaded.get("api.base_url").as_deref(), Some("https://gen.example.com"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\naspect_ratio = \"16:9\"\n").unwrap();

        let config = Config::load_or_create_at(&path).unwrap();
        assert_eq!(config.defaults.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(config.defaults.count, 1);
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("defaults.count", "5").is_err());
        assert!(config.set("defaults.width", "0").is_err());
        assert!(config.set("defaults.aspect_ratio", "4:3").is_err());
        assert!(config.set("output.display", "viewer").is_err());
        assert!(config.set("api.base_url", "ftp://x").is_err());
        assert!(config.set("nope", "1").is_err());
    }

    #[test]
    fn env_override_wins_when_set() {
        let mut config = Config::default();
        config.apply_env_override(Some("  ".to_string()));
        assert_eq!(config.effective_base_url(), "http://127.0.0.1:5000");

        config.apply_env_override(Some("http://override:9000".to_string()));
        assert_eq!(config.effective_base_url(), "http://override:9000");
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn env_override_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_or_create_at(&path).unwrap();
        config.apply_env_override(Some("http://temporary:9999".to_string()));
        config.set("defaults.count", "2").unwrap();
        config.save().unwrap();

        let reloaded = Config::load_or_create_at(&path).unwrap();
        assert_eq!(reloaded.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(reloaded.effective_base_url(), "http://127.0.0.1:5000");
        assert_eq!(reloaded.defaults.count, 2);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("temporary"));
    }

    #[test]
    fn out_of_range_defaults_are_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\ncount = 255\nwidth = 0\nheight = 768\n").unwrap();

        let config = Config::load_or_create_at(&path).unwrap();
        assert_eq!(config.defaults.count, 4);
        assert_eq!(config.defaults.width, 1024);
        assert_eq!(config.defaults.height, 768);

        let mut form = config.default_form();
        form.increment_count();
        assert_eq!(form.count, 4);

        std::fs::write(&path, "[defaults]\ncount = 0\n").unwrap();
        let config = Config::load_or_create_at(&path).unwrap();
        assert_eq!(config.defaults.count, 1);
    }

    #[test]
    fn default_form_uses_defaults_section() {
        let mut config = Config::default();
        config.set("defaults.aspect_ratio", "custom").unwrap();
        config.set("defaults.width", "640").unwrap();
        let form = config.default_form();
        assert_eq!(form.aspect_ratio, AspectRatio::Custom);
        assert_eq!(form.custom.width, "640");
        assert_eq!(form.custom.height, "1024");
    }
}
