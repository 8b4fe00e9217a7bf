use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::api::HttpImageService;
use crate::config::Config;
use crate::core::DOWNLOAD_ALERT;
use crate::download::download_image;

#[derive(Args)]
pub struct DownloadArgs {
    /// URL of the image to download
    #[arg(required = true)]
    pub url: String,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: DownloadArgs, config: &Config) -> Result<()> {
    let service = HttpImageService::from_config(config)?;
    let output_dir = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));

    let path = download_image(&service, &args.url, &output_dir)
        .await
        .context(DOWNLOAD_ALERT)?;

    println!("{} Saved {}", "✓".green(), path.display());
    Ok(())
}
