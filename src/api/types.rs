use serde::Deserialize;

/// Success body of `POST /generate`
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub image_urls: Vec<String>,
}

/// Error body of `POST /generate`
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    /// Best-effort message extraction from a raw error body
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.error)
            .filter(|m| !m.trim().is_empty())
    }
}
