use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use super::error::ValidationError;

/// Side length used when a custom dimension is empty or unparsable
pub const DEFAULT_DIMENSION: u32 = 1024;

/// Longest prompt the form accepts
pub const MAX_PROMPT_LEN: usize = 500;

pub const MIN_COUNT: u8 = 1;
pub const MAX_COUNT: u8 = 4;

/// Aspect ratio selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "custom")]
    Custom,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Custom => "custom",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["1:1", "16:9", "9:16", "custom"]
    }

    /// Fixed pixel size for the preset ratios, `None` for custom
    pub fn preset_dimensions(&self) -> Option<(u32, u32)> {
        match self {
            AspectRatio::Square => Some((1024, 1024)),
            AspectRatio::Landscape => Some((1920, 1080)),
            AspectRatio::Portrait => Some((1080, 1920)),
            AspectRatio::Custom => None,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            "custom" => Ok(AspectRatio::Custom),
            other => Err(ValidationError::UnknownAspectRatio(other.to_string())),
        }
    }
}

/// Raw text of the custom width/height inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSize {
    pub width: String,
    pub height: String,
}

impl Default for CustomSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION.to_string(),
            height: DEFAULT_DIMENSION.to_string(),
        }
    }
}

impl CustomSize {
    pub fn new(width: impl Into<String>, height: impl Into<String>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }

    /// Whether an edited field value is kept: empty, or a positive integer
    pub fn accepts(value: &str) -> bool {
        value.is_empty() || value.parse::<i64>().map(|v| v > 0).unwrap_or(false)
    }

    /// Parse both sides, defaulting empty or unparsable text to 1024
    pub fn parsed(&self) -> Result<(u32, u32), ValidationError> {
        Ok((parse_dimension(&self.width)?, parse_dimension(&self.height)?))
    }
}

fn parse_dimension(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(v) if v <= 0 => Err(ValidationError::NonPositiveDimensions),
        Ok(v) => u32::try_from(v).map_err(|_| ValidationError::DimensionTooLarge { max: u32::MAX }),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Err(ValidationError::DimensionTooLarge { max: u32::MAX }),
            IntErrorKind::NegOverflow => Err(ValidationError::NonPositiveDimensions),
            _ => Ok(DEFAULT_DIMENSION),
        },
    }
}

/// Resolve an aspect-ratio selection to concrete pixel dimensions
pub fn resolve_dimensions(
    ratio: AspectRatio,
    custom: &CustomSize,
) -> Result<(u32, u32), ValidationError> {
    match ratio.preset_dimensions() {
        Some(dims) => Ok(dims),
        None => custom.parsed(),
    }
}

/// Columns used to lay out a grid of `count` results
pub fn grid_columns(count: u8) -> u16 {
    match count {
        0 | 1 => 1,
        2 => 2,
        3 => 3,
        _ => 2,
    }
}

/// A validated request, ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "num_outputs")]
    pub count: u8,
}

impl GenerationRequest {
    /// Build a request from form selections.
    ///
    /// Checks run in form order: prompt, dimensions, count.
    pub fn new(
        prompt: &str,
        ratio: AspectRatio,
        custom: &CustomSize,
        count: u8,
    ) -> Result<Self, ValidationError> {
        validate_prompt(prompt)?;
        let (width, height) = resolve_dimensions(ratio, custom)?;
        if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
            return Err(ValidationError::InvalidCount(count));
        }

        Ok(Self {
            prompt: prompt.to_string(),
            width,
            height,
            count,
        })
    }
}

pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_LEN {
        return Err(ValidationError::PromptTooLong {
            len,
            max: MAX_PROMPT_LEN,
        });
    }
    Ok(())
}
