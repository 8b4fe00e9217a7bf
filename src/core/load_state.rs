use serde::Serialize;
use std::fmt;

/// Load status of a single result image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ImageLoadState {
    Loading,
    Loaded,
    Error {
        reason: String,
    },
}

impl ImageLoadState {
    pub fn error(reason: impl Into<String>) -> Self {
        ImageLoadState::Error {
            reason: reason.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ImageLoadState::Loaded)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImageLoadState::Loading => "loading",
            ImageLoadState::Loaded => "loaded",
            ImageLoadState::Error { .. } => "error",
        }
    }
}

impl fmt::Display for ImageLoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageLoadState::Error { reason } => write!(f, "error: {}", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// URL -> load state for one result set, in result order.
///
/// Keys are fixed when the set is created; updates for unknown URLs are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStates {
    entries: Vec<(String, ImageLoadState)>,
}

impl LoadStates {
    /// Start tracking `urls`, all loading. Duplicates share one entry.
    pub fn for_urls<'a>(urls: impl IntoIterator<Item = &'a String>) -> Self {
        let mut entries: Vec<(String, ImageLoadState)> = Vec::new();
        for url in urls {
            if !entries.iter().any(|(u, _)| u == url) {
                entries.push((url.clone(), ImageLoadState::Loading));
            }
        }
        Self { entries }
    }

    pub fn get(&self, url: &str) -> Option<&ImageLoadState> {
        self.entries.iter().find(|(u, _)| u == url).map(|(_, s)| s)
    }

    /// Returns false when `url` is not tracked
    pub fn set(&mut self, url: &str, state: ImageLoadState) -> bool {
        match self.entries.iter_mut().find(|(u, _)| u == url) {
            Some((_, slot)) => {
                *slot = state;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(u, _)| u.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageLoadState)> {
        self.entries.iter().map(|(u, s)| (u.as_str(), s))
    }

    /// Counts of (loading, loaded, error)
    pub fn tally(&self) -> (usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0), |(loading, loaded, failed), (_, s)| match s {
                ImageLoadState::Loading => (loading + 1, loaded, failed),
                ImageLoadState::Loaded => (loading, loaded + 1, failed),
                ImageLoadState::Error { .. } => (loading, loaded, failed + 1),
            })
    }
}
