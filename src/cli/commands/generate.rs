use anyhow::Result;
use clap::Args;
use colored::Colorize;
use futures_util::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{HttpImageService, ImageService};
use crate::cli::Reported;
use crate::config::{Config, DisplayMode};
use crate::core::{
    ArtioError, AspectRatio, GenerationForm, GenerationSession, ImageLoadState, Phase,
};
use crate::download::download_image;
use crate::loader;

#[derive(Args)]
pub struct GenerateArgs {
    /// The prompt describing the image to generate
    #[arg(required = true)]
    pub prompt: String,

    /// Aspect ratio (1:1, 16:9, 9:16, custom)
    #[arg(short, long, alias = "ar")]
    pub ratio: Option<AspectRatio>,

    /// Custom width in pixels (implies --ratio custom)
    #[arg(long, allow_hyphen_values = true)]
    pub width: Option<String>,

    /// Custom height in pixels (implies --ratio custom)
    #[arg(long, allow_hyphen_values = true)]
    pub height: Option<String>,

    /// Number of images to generate (1-4)
    #[arg(short = 'n', long)]
    pub count: Option<u8>,

    /// Output directory for downloaded images
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Don't download images
    #[arg(long)]
    pub no_download: bool,

    /// Output format (text, json, quiet)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// One returned image and what happened to it
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub url: String,
    #[serde(flatten)]
    pub state: ImageLoadState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_error: Option<String>,
}

/// Everything a finished generation produced
#[derive(Debug, Serialize)]
pub struct GenerateReport {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_outputs: u8,
    pub images: Vec<ImageReport>,
}

/// Merge command-line overrides into the configured default form
pub fn build_form(args: &GenerateArgs, config: &Config) -> GenerationForm {
    let mut form = config.default_form();
    form.prompt = args.prompt.clone();

    if let Some(width) = &args.width {
        form.custom.width = width.clone();
        form.aspect_ratio = AspectRatio::Custom;
    }
    if let Some(height) = &args.height {
        form.custom.height = height.clone();
        form.aspect_ratio = AspectRatio::Custom;
    }
    if let Some(ratio) = args.ratio {
        form.aspect_ratio = ratio;
    }
    if let Some(count) = args.count {
        form.count = count;
    }
    form
}

/// Submit `form`, probe every result, and download the loaded ones into `output_dir`
pub async fn execute(
    form: &GenerationForm,
    service: Arc<dyn ImageService>,
    output_dir: Option<&Path>,
) -> Result<GenerateReport> {
    let mut session = GenerationSession::new();
    let submission = session.begin(form).map_err(ArtioError::Validation)?;
    let request = submission.request.clone();

    let outcome = service.generate(&request).await;
    session.complete(submission.generation, outcome);
    if session.phase() == Phase::Failed {
        anyhow::bail!(session
            .error_banner()
            .unwrap_or(crate::core::GENERIC_GENERATION_ERROR)
            .to_string());
    }

    let urls = session.results().to_vec();
    let states = join_all(urls.iter().map(|url| loader::probe(service.as_ref(), url))).await;
    for (url, state) in urls.iter().zip(states) {
        session.record_load(submission.generation, url, state);
    }

    let mut images = Vec::with_capacity(urls.len());
    for url in &urls {
        let state = session
            .load_state(url)
            .cloned()
            .unwrap_or(ImageLoadState::Loading);
        let mut report = ImageReport {
            url: url.clone(),
            state,
            path: None,
            download_error: None,
        };

        if let (Some(dir), true) = (output_dir, report.state.is_loaded()) {
            match download_image(service.as_ref(), url, dir).await {
                Ok(path) => report.path = Some(path.to_string_lossy().to_string()),
                Err(e) => {
                    tracing::warn!("download of {} failed: {}", url, e);
                    report.download_error = Some(e.to_string());
                }
            }
        }
        images.push(report);
    }

    Ok(GenerateReport {
        prompt: request.prompt,
        width: request.width,
        height: request.height,
        num_outputs: request.count,
        images,
    })
}

pub async fn run(args: GenerateArgs, config: &Config) -> Result<()> {
    let form = build_form(&args, config);
    let service: Arc<dyn ImageService> = Arc::new(HttpImageService::from_config(config)?);

    // Show progress
    let pb = if args.format == "text" {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Generating {} image(s)...", form.count));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let target = (!args.no_download).then_some(output_dir.as_path());

    let report = match execute(&form, service, target).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = pb {
                pb.finish_with_message(format!("{} Generation failed", "✗".red()));
            }
            return Err(failure(e, &args.format));
        }
    };

    let loaded = report.images.iter().filter(|i| i.state.is_loaded()).count();
    if let Some(pb) = &pb {
        pb.finish_with_message(format!(
            "{} Generated {} image(s), {} loaded",
            "✓".green(),
            report.images.len(),
            loaded
        ));
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "quiet" => {
            for image in &report.images {
                println!("{}", image.path.as_deref().unwrap_or(&image.url));
            }
        }
        _ => print_report(&report, config),
    }

    Ok(())
}

/// JSON output carries the error itself; other formats leave printing to `main`
fn failure(err: anyhow::Error, format: &str) -> anyhow::Error {
    if format != "json" {
        return err;
    }
    let message = err.to_string();
    println!("{}", serde_json::json!({ "error": message }));
    Reported(message).into()
}

fn print_report(report: &GenerateReport, config: &Config) {
    println!();
    println!("{}: {}", "Prompt".cyan().bold(), report.prompt);
    println!("{}: {}x{}", "Size".cyan().bold(), report.width, report.height);
    println!();
    println!("{}:", "Images".cyan().bold());
    for (i, image) in report.images.iter().enumerate() {
        let state = match &image.state {
            ImageLoadState::Loaded => "loaded".green().to_string(),
            ImageLoadState::Loading => "loading".yellow().to_string(),
            ImageLoadState::Error { reason } => format!("{} ({})", "error".red(), reason),
        };
        println!("  [{}] {} {}", i, state, image.url.dimmed());
        if let Some(path) = &image.path {
            println!("      saved to {}", path);
        }
        if let Some(err) = &image.download_error {
            println!("      {}: {}", "download failed".red(), err);
        }
    }

    // Try to display image in terminal
    if config.output.display == DisplayMode::Terminal {
        if let Some(first) = report.images.iter().find_map(|i| i.path.as_deref()) {
            println!();
            display_image_terminal(first);
        }
    }
}

/// Display an image in the terminal using viuer
fn display_image_terminal(path: &str) {
    let conf = viuer::Config {
        width: Some(80),
        height: Some(30),
        absolute_offset: false,
        ..Default::default()
    };

    if let Err(e) = viuer::print_from_file(path, &conf) {
        tracing::debug!("Failed to display image in terminal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{tiny_png, FakeService};
    use crate::core::ValidationError;

    fn args(prompt: &str) -> GenerateArgs {
        GenerateArgs {
            prompt: prompt.to_string(),
            ratio: None,
            width: None,
            height: None,
            count: None,
            output: None,
            no_download: false,
            format: "text".to_string(),
        }
    }

    #[test]
    fn size_flags_imply_custom() {
        let mut a = args("x");
        a.width = Some("300".to_string());
        let form = build_form(&a, &Config::default());
        assert_eq!(form.aspect_ratio, AspectRatio::Custom);
        assert_eq!(form.custom.width, "300");
    }

    #[test]
    fn explicit_ratio_wins_over_size_flags() {
        let mut a = args("x");
        a.width = Some("300".to_string());
        a.ratio = Some(AspectRatio::Portrait);
        let form = build_form(&a, &Config::default());
        assert_eq!(form.aspect_ratio, AspectRatio::Portrait);
    }

    #[tokio::test]
    async fn empty_prompt_makes_no_network_call() {
        let fake = Arc::new(FakeService::returning(&["http://a"]));
        let form = build_form(&args(""), &Config::default());

        let err = execute(&form, fake.clone(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Please describe what you want to see.");
        assert!(matches!(
            err.downcast_ref::<ArtioError>(),
            Some(ArtioError::Validation(ValidationError::EmptyPrompt))
        ));
        assert_eq!(fake.generate_count(), 0);
    }

    #[tokio::test]
    async fn non_positive_custom_size_makes_no_network_call() {
        let fake = Arc::new(FakeService::returning(&["http://a"]));
        let mut a = args("fox");
        a.width = Some("-10".to_string());
        let form = build_form(&a, &Config::default());

        let err = execute(&form, fake.clone(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Custom dimensions must be positive numbers.");
        assert_eq!(fake.generate_count(), 0);
    }

    #[tokio::test]
    async fn sends_resolved_request_and_downloads_loaded_images() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(
            FakeService::returning(&["http://ok", "http://broken", "http://ok2"])
                .with_image("http://ok", tiny_png())
                .with_image("http://ok2", tiny_png()),
        );
        let mut a = args("city");
        a.ratio = Some(AspectRatio::Landscape);
        a.count = Some(3);
        let form = build_form(&a, &Config::default());

        let report = execute(&form, fake.clone(), Some(dir.path())).await.unwrap();

        let sent = fake.generate_calls.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!((sent[0].width, sent[0].height, sent[0].count), (1920, 1080, 3));

        assert_eq!(report.images.len(), 3);
        assert!(report.images[0].path.is_some());
        assert_eq!(report.images[1].state.name(), "error");
        assert!(report.images[1].path.is_none());
        assert!(report.images[2].path.is_some());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn service_error_text_is_returned() {
        let fake = Arc::new(FakeService::default());
        *fake.outcome.lock().unwrap() = Some(Err(ArtioError::Service {
            status: 429,
            message: "quota exceeded".to_string(),
        }));
        let form = build_form(&args("fox"), &Config::default());

        let err = execute(&form, fake, None).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn json_failures_are_not_printed_twice() {
        let err = failure(anyhow::anyhow!("quota exceeded"), "json");
        assert!(err.downcast_ref::<Reported>().is_some());
        assert!(crate::cli::error_line(&err).is_none());

        let err = failure(anyhow::anyhow!("quota exceeded"), "text");
        assert_eq!(crate::cli::error_line(&err).as_deref(), Some("quota exceeded"));
    }
}
