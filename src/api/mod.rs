mod types;

use async_trait::async_trait;
use reqwest::Client;

pub use types::*;

use crate::config::Config;
use crate::core::{ArtioError, GenerationRequest, GenerationResult, GENERIC_GENERATION_ERROR};
use crate::http_client;

/// Remote image-generation service
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Request `request.count` images and return their URLs
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ArtioError>;

    /// Fetch the raw bytes behind a result URL
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ArtioError>;
}

/// HTTP client for the `/generate` endpoint
#[derive(Debug, Clone)]
pub struct HttpImageService {
    client: Client,
    base_url: String,
}

impl HttpImageService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Create a service from config
    pub fn from_config(config: &Config) -> Result<Self, ArtioError> {
        let client = http_client::client_for(config.api.timeout_secs)?;
        Ok(Self::new(client, config.effective_base_url()))
    }

    fn generate_url(&self) -> String {
        format!("{}/generate", self.base_url)
    }
}

#[async_trait]
impl ImageService for HttpImageService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ArtioError> {
        let url = self.generate_url();

        tracing::debug!("Sending generate request to: {}", url);
        tracing::debug!(
            width = request.width,
            height = request.height,
            num_outputs = request.count,
            "Request parameters"
        );

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Response status: {}", status);
        tracing::debug!("Response body: {}", body);

        if !status.is_success() {
            let message = ErrorResponse::message_from(&body)
                .unwrap_or_else(|| GENERIC_GENERATION_ERROR.to_string());
            return Err(ArtioError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| ArtioError::InvalidResponse(e.to_string()))?;

        tracing::info!("Service returned {} image url(s)", parsed.image_urls.len());
        Ok(parsed.image_urls)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ArtioError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArtioError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtioError::Download(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArtioError::Download(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory service that records every call
    #[derive(Default)]
    pub struct FakeService {
        pub outcome: Mutex<Option<Result<GenerationResult, ArtioError>>>,
        pub images: HashMap<String, Vec<u8>>,
        pub generate_calls: Mutex<Vec<GenerationRequest>>,
        pub fetch_calls: Mutex<Vec<String>>,
    }

    impl FakeService {
        pub fn returning(urls: &[&str]) -> Self {
            let service = Self::default();
            *service.outcome.lock().unwrap() =
                Some(Ok(urls.iter().map(|u| u.to_string()).collect()));
            service
        }

        pub fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.images.insert(url.to_string(), bytes);
            self
        }

        pub fn generate_count(&self) -> usize {
            self.generate_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageService for FakeService {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResult, ArtioError> {
            self.generate_calls.lock().unwrap().push(request.clone());
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ArtioError::InvalidResponse("no outcome".into())))
        }

        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ArtioError> {
            self.fetch_calls.lock().unwrap().push(url.to_string());
            self.images
                .get(url)
                .cloned()
                .ok_or_else(|| ArtioError::Download(format!("{} returned 404", url)))
        }
    }

    /// A valid 1x1 PNG
    pub fn tiny_png() -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(1, 1)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::core::{AspectRatio, CustomSize};

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..split]
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + content_length
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn body_of(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    fn request(ratio: AspectRatio, count: u8) -> GenerationRequest {
        GenerationRequest::new("a red fox", ratio, &CustomSize::default(), count).unwrap()
    }

    #[tokio::test]
    async fn posts_wire_body_and_parses_urls() {
        let (base, server) =
            serve_once("200 OK", r#"{"image_urls":["http://img/1","http://img/2"]}"#).await;
        let service = HttpImageService::new(local_client(), format!("{}/", base));

        let urls = service.generate(&request(AspectRatio::Landscape, 3)).await.unwrap();
        assert_eq!(urls, vec!["http://img/1", "http://img/2"]);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /generate HTTP/1.1"));
        assert_eq!(
            body_of(&raw),
            serde_json::json!({
                "prompt": "a red fox",
                "width": 1920,
                "height": 1080,
                "num_outputs": 3
            })
        );
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let (base, server) =
            serve_once("429 Too Many Requests", r#"{"error":"quota exceeded"}"#).await;
        let service = HttpImageService::new(local_client(), base);

        let err = service.generate(&request(AspectRatio::Square, 1)).await.unwrap_err();
        match &err {
            ArtioError::Service { status, message } => {
                assert_eq!(*status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.banner_text(), "quota exceeded");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn missing_error_field_falls_back() {
        let (base, server) = serve_once("500 Internal Server Error", "oops").await;
        let service = HttpImageService::new(local_client(), base);

        let err = service.generate(&request(AspectRatio::Square, 1)).await.unwrap_err();
        assert_eq!(err.banner_text(), GENERIC_GENERATION_ERROR);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let (base, server) = serve_once("200 OK", r#"{"urls":[]}"#).await;
        let service = HttpImageService::new(local_client(), base);

        let err = service.generate(&request(AspectRatio::Square, 1)).await.unwrap_err();
        assert!(matches!(err, ArtioError::InvalidResponse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpImageService::new(local_client(), format!("http://{}", addr));
        let err = service.generate(&request(AspectRatio::Square, 1)).await.unwrap_err();
        assert!(matches!(err, ArtioError::Network { .. }));
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            ErrorResponse::message_from(r#"{"error":"bad prompt"}"#).as_deref(),
            Some("bad prompt")
        );
        assert_eq!(ErrorResponse::message_from(r#"{"error":""}"#), None);
        assert_eq!(ErrorResponse::message_from(r#"{"detail":"x"}"#), None);
        assert_eq!(ErrorResponse::message_from("<html>"), None);
    }
}
