use thiserror::Error;

/// Fallback banner text when the service gives no usable error message
pub const GENERIC_GENERATION_ERROR: &str = "Failed to generate image.";

/// Alert text shown when a download fails
pub const DOWNLOAD_ALERT: &str = "Failed to download image. Please try again.";

/// Local validation failures. These block submission and never reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please describe what you want to see.")]
    EmptyPrompt,

    #[error("Prompt is too long ({len} characters, max {max}).")]
    PromptTooLong { len: usize, max: usize },

    #[error("Custom dimensions must be positive numbers.")]
    NonPositiveDimensions,

    #[error("Custom dimensions must be at most {max}.")]
    DimensionTooLarge { max: u32 },

    #[error("Number of images must be between 1 and 4 (got {0}).")]
    InvalidCount(u8),

    #[error("Unknown aspect ratio '{0}'. Valid values: 1:1, 16:9, 9:16, custom")]
    UnknownAspectRatio(String),
}

#[derive(Error, Debug)]
pub enum ArtioError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Non-success HTTP response from the generation service
    #[error("{message}")]
    Service { status: u16, message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArtioError {
    /// Text for the dismissible error banner
    pub fn banner_text(&self) -> String {
        match self {
            ArtioError::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ArtioError {
    fn from(err: reqwest::Error) -> Self {
        ArtioError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_banner_is_the_raw_message() {
        let err = ArtioError::Service {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.banner_text(), "quota exceeded");
    }

    #[test]
    fn validation_messages_match_form_copy() {
        assert_eq!(
            ValidationError::EmptyPrompt.to_string(),
            "Please describe what you want to see."
        );
        let wrapped: ArtioError = ValidationError::NonPositiveDimensions.into();
        assert_eq!(
            wrapped.banner_text(),
            "Custom dimensions must be positive numbers."
        );
    }
}
