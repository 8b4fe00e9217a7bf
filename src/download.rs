use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::api::ImageService;
use crate::core::ArtioError;

/// File extension for image bytes, sniffed from their header
pub fn extension_for(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::WebP) => "webp",
        Ok(image::ImageFormat::Gif) => "gif",
        _ => "png",
    }
}

/// Download `url` into `output_dir` as `generated_image_<millis>.<ext>`.
///
/// Bytes land in a `.part` file first and are renamed into place, so a failed
/// download never leaves a partial image behind.
pub async fn download_image(
    service: &dyn ImageService,
    url: &str,
    output_dir: &Path,
) -> Result<PathBuf, ArtioError> {
    let bytes = service.fetch_image(url).await?;
    if bytes.is_empty() {
        return Err(ArtioError::Download(format!("{} returned no data", url)));
    }

    fs::create_dir_all(output_dir).await?;

    let stamp = Utc::now().timestamp_millis();
    let ext = extension_for(&bytes);
    let mut path = output_dir.join(format!("generated_image_{}.{}", stamp, ext));
    let mut n = 1;
    while fs::try_exists(&path).await.unwrap_or(false) {
        path = output_dir.join(format!("generated_image_{}_{}.{}", stamp, n, ext));
        n += 1;
    }

    let part = path.with_extension(format!("{}.part", ext));
    let written = async {
        fs::write(&part, &bytes).await?;
        fs::rename(&part, &path).await
    }
    .await;

    if let Err(e) = written {
        tracing::warn!("cannot write {}: {}", path.display(), e);
        let _ = fs::remove_file(&part).await;
        return Err(e.into());
    }

    tracing::info!("Saved image to: {}", path.display());
    Ok(path)
}
