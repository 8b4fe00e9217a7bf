pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "artio",
    version,
    about = "Artio - generate images through a remote generation service",
    long_about = r#"Artio - generate images through a remote generation service

Sends a prompt to an image-generation service (POST <base_url>/generate),
tracks the load state of every returned image and downloads the results.
Run without arguments to launch the interactive TUI.

SETUP:
  Point artio at your service via environment variable or config:
    export ARTIO_BASE_URL=http://127.0.0.1:5000
    artio config set api.base_url http://127.0.0.1:5000

EXAMPLES:
  Generate an image:
    artio generate "a red fox in the snow"
    artio g "city skyline at night" --ratio 16:9 --count 3
    artio generate "poster" --ratio custom --width 800 --height 1200

  Download a single image:
    artio download https://example.com/image.png

  Manage configuration:
    artio config show
    artio config set defaults.count 2

  Launch interactive TUI:
    artio

OUTPUT FORMATS:
  --format text   Human-readable output (default)
  --format json   Machine-readable JSON
  --format quiet  Minimal output, just file paths"#,
    after_help = r#"CONFIGURATION:
  Config file: ~/.config/artio/config.toml (Linux)

  Aspect ratios: 1:1 (1024x1024), 16:9 (1920x1080), 9:16 (1080x1920), custom
  Images per request: 1-4"#
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate images from a text prompt
    ///
    /// Sends the prompt to the configured service, checks that every returned
    /// image loads, and saves the loaded ones to the output directory.
    #[command(
        alias = "g",
        after_help = r#"EXAMPLES:
  Basic generation:
    artio generate "a red apple on a wooden table"

  Several wide images:
    artio generate "panoramic mountain landscape" --ratio 16:9 --count 4

  Custom size:
    artio generate "banner" --ratio custom --width 1500 --height 500

  JSON output:
    artio generate "abstract art" --format json --no-download"#
    )]
    Generate(commands::generate::GenerateArgs),

    /// Download an image by URL into the output directory
    #[command(alias = "d")]
    Download(commands::download::DownloadArgs),

    /// View or modify configuration
    ///
    /// Changes are saved to the config file immediately.
    #[command(
        alias = "c",
        after_help = r#"EXAMPLES:
  Show all settings:
    artio config show

  Get a specific value:
    artio config get api.base_url

  Set values:
    artio config set api.base_url http://gen.local:5000
    artio config set defaults.aspect_ratio 16:9
    artio config set output.directory ~/Pictures/artio

  Reset to defaults:
    artio config reset --force

AVAILABLE SETTINGS:
  api.base_url          - Generation service base URL
  api.timeout_secs      - Request timeout in seconds
  defaults.aspect_ratio - 1:1, 16:9, 9:16 or custom
  defaults.width        - Custom width
  defaults.height       - Custom height
  defaults.count        - Images per request (1-4)
  output.directory      - Where to save images
  output.display        - Preview mode (terminal/none)"#
    )]
    Config(commands::config::ConfigArgs),
}

/// A failure the command already printed in its own output format
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Line to print on stderr for a failed command, or `None` when it was already shown
pub fn error_line(err: &anyhow::Error) -> Option<String> {
    if err.downcast_ref::<Reported>().is_some() {
        return None;
    }
    Some(format!("{:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn reported_failures_print_nothing_more() {
        let err = anyhow::Error::new(Reported("quota exceeded".to_string()));
        assert_eq!(error_line(&err), None);
    }

    #[test]
    fn other_failures_print_once_with_context() {
        let err = Err::<(), _>(anyhow::anyhow!("Download failed: 404"))
            .context("Failed to download image. Please try again.")
            .unwrap_err();
        assert_eq!(
            error_line(&err).as_deref(),
            Some("Failed to download image. Please try again.: Download failed: 404")
        );
    }
}
