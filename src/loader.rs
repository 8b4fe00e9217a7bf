//! Per-image load tracking.
//!
//! Every result URL is probed on its own task. A probe fetches the bytes and
//! checks they decode as an image; the outcome is reported as a [`LoadEvent`].

use async_channel::Sender;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::ImageService;
use crate::core::ImageLoadState;

/// Load outcome for one URL of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub generation: u64,
    pub url: String,
    pub state: ImageLoadState,
}

/// Fetch `url` and decide whether it is a displayable image
pub async fn probe(service: &dyn ImageService, url: &str) -> ImageLoadState {
    match service.fetch_image(url).await {
        Ok(bytes) => decode_state(&bytes),
        Err(e) => {
            tracing::debug!("image {} failed to load: {}", url, e);
            ImageLoadState::error(e.to_string())
        }
    }
}

fn decode_state(bytes: &[u8]) -> ImageLoadState {
    match image::load_from_memory(bytes) {
        Ok(_) => ImageLoadState::Loaded,
        Err(e) => ImageLoadState::error(format!("not a valid image: {}", e)),
    }
}

/// Spawn one probe per URL; each reports through `events` when it settles.
///
/// Send errors mean the receiver is gone and are ignored.
pub fn spawn_probes<E>(
    service: Arc<dyn ImageService>,
    generation: u64,
    urls: &[String],
    events: Sender<E>,
) -> Vec<JoinHandle<()>>
where
    E: From<LoadEvent> + Send + 'static,
{
    urls.iter()
        .cloned()
        .map(|url| {
            let service = Arc::clone(&service);
            let events = events.clone();
            tokio::spawn(async move {
                let state = probe(service.as_ref(), &url).await;
                let event = LoadEvent {
                    generation,
                    url,
                    state,
                };
                let _ = events.send(E::from(event)).await;
            })
        })
        .collect()
}
