use super::error::{ArtioError, ValidationError};
use super::load_state::{ImageLoadState, LoadStates};
use super::params::{AspectRatio, CustomSize, GenerationRequest, MAX_COUNT, MIN_COUNT};

/// Result list returned by the service, in server order
pub type GenerationResult = Vec<String>;

/// Form selections the user edits before submitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationForm {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub custom: CustomSize,
    pub count: u8,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: AspectRatio::Square,
            custom: CustomSize::default(),
            count: 1,
        }
    }
}

impl GenerationForm {
    pub fn to_request(&self) -> Result<GenerationRequest, ValidationError> {
        GenerationRequest::new(&self.prompt, self.aspect_ratio, &self.custom, self.count)
    }

    pub fn increment_count(&mut self) {
        self.count = self.count.saturating_add(1).min(MAX_COUNT);
    }

    pub fn decrement_count(&mut self) {
        self.count = self.count.saturating_sub(1).max(MIN_COUNT);
    }

    /// Edit the custom width. Rejected edits leave the field untouched.
    pub fn set_custom_width(&mut self, value: &str) -> bool {
        if !CustomSize::accepts(value) {
            return false;
        }
        self.custom.width = value.to_string();
        self.aspect_ratio = AspectRatio::Custom;
        true
    }

    /// Edit the custom height. Rejected edits leave the field untouched.
    pub fn set_custom_height(&mut self, value: &str) -> bool {
        if !CustomSize::accepts(value) {
            return false;
        }
        self.custom.height = value.to_string();
        self.aspect_ratio = AspectRatio::Custom;
        true
    }
}

/// Where the current generation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// An accepted submission that still needs its network call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub generation: u64,
    pub request: GenerationRequest,
}

/// View model for one generation screen
#[derive(Debug, Clone)]
pub struct GenerationSession {
    phase: Phase,
    generation: u64,
    results: GenerationResult,
    load_states: LoadStates,
    displayed_count: u8,
    validation_error: Option<ValidationError>,
    error_banner: Option<String>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            results: Vec::new(),
            load_states: LoadStates::default(),
            displayed_count: 1,
            validation_error: None,
            error_banner: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Id of the newest submission (0 before the first one)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn results(&self) -> &[String] {
        &self.results
    }

    pub fn load_states(&self) -> &LoadStates {
        &self.load_states
    }

    pub fn load_state(&self, url: &str) -> Option<&ImageLoadState> {
        self.load_states.get(url)
    }

    /// Count snapshotted at submit time, used for layout
    pub fn displayed_count(&self) -> u8 {
        self.displayed_count
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    /// Validate the form and start a new generation.
    ///
    /// On failure nothing but the validation error changes.
    pub fn begin(&mut self, form: &GenerationForm) -> Result<Submission, ValidationError> {
        let request = match form.to_request() {
            Ok(request) => request,
            Err(e) => {
                self.validation_error = Some(e.clone());
                return Err(e);
            }
        };

        self.validation_error = None;
        self.error_banner = None;
        self.results.clear();
        self.load_states.clear();
        self.displayed_count = request.count;
        self.generation += 1;
        self.phase = Phase::Submitting;

        tracing::debug!(generation = self.generation, "submission started");

        Ok(Submission {
            generation: self.generation,
            request,
        })
    }

    /// Apply the outcome of a submission. Stale generations are ignored.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<GenerationResult, ArtioError>,
    ) -> bool {
        if generation != self.generation || self.phase != Phase::Submitting {
            tracing::debug!(generation, current = self.generation, "dropping stale outcome");
            return false;
        }

        match outcome {
            Ok(urls) => {
                self.load_states = LoadStates::for_urls(&urls);
                self.results = urls;
                self.phase = Phase::Succeeded;
            }
            Err(e) => {
                tracing::warn!("generation failed: {}", e);
                self.error_banner = Some(e.banner_text());
                self.phase = Phase::Failed;
            }
        }
        true
    }

    /// Record a per-image load signal
    pub fn record_load(&mut self, generation: u64, url: &str, state: ImageLoadState) -> bool {
        if generation != self.generation {
            return false;
        }
        self.load_states.set(url, state)
    }

    pub fn dismiss_error(&mut self) {
        self.error_banner = None;
        if self.phase == Phase::Failed {
            self.phase = Phase::Idle;
        }
    }

    pub fn clear_validation_error(&mut self) {
        self.validation_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(prompt: &str) -> GenerationForm {
        GenerationForm {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_prompt_sets_validation_error_only() {
        let mut session = GenerationSession::new();
        let err = session.begin(&form("")).unwrap_err();
        assert_eq!(err, ValidationError::EmptyPrompt);
        assert_eq!(session.validation_error(), Some(&ValidationError::EmptyPrompt));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn success_initializes_every_url_loading() {
        let mut session = GenerationSession::new();
        let sub = session.begin(&form("a red fox")).unwrap();
        assert!(session.complete(sub.generation, Ok(urls(&["u1", "u2"]))));

        assert_eq!(session.phase(), Phase::Succeeded);
        assert_eq!(session.results(), &urls(&["u1", "u2"])[..]);
        let keys: Vec<&str> = session.load_states().urls().collect();
        assert_eq!(keys, vec!["u1", "u2"]);
        assert!(session
            .load_states()
            .iter()
            .all(|(_, s)| *s == ImageLoadState::Loading));
    }

    #[test]
    fn resubmission_clears_prior_results_before_resolving() {
        let mut session = GenerationSession::new();
        let first = session.begin(&form("one")).unwrap();
        session.complete(first.generation, Ok(urls(&["old"])));
        session.record_load(first.generation, "old", ImageLoadState::Loaded);

        let mut next = form("two");
        next.count = 3;
        session.begin(&next).unwrap();

        assert!(session.results().is_empty());
        assert!(session.load_states().is_empty());
        assert_eq!(session.displayed_count(), 3);
        assert!(session.is_submitting());
    }

    #[test]
    fn stale_outcome_is_dropped() {
        let mut session = GenerationSession::new();
        let first = session.begin(&form("one")).unwrap();
        let second = session.begin(&form("two")).unwrap();

        assert!(!session.complete(first.generation, Ok(urls(&["stale"]))));
        assert!(session.is_submitting());

        assert!(session.complete(second.generation, Ok(urls(&["fresh"]))));
        assert_eq!(session.results(), &urls(&["fresh"])[..]);
    }

    #[test]
    fn stale_load_events_are_dropped() {
        let mut session = GenerationSession::new();
        let first = session.begin(&form("one")).unwrap();
        session.complete(first.generation, Ok(urls(&["same"])));
        let second = session.begin(&form("two")).unwrap();
        session.complete(second.generation, Ok(urls(&["same"])));

        assert!(!session.record_load(first.generation, "same", ImageLoadState::Loaded));
        assert_eq!(session.load_state("same"), Some(&ImageLoadState::Loading));
    }

    #[test]
    fn service_error_becomes_banner() {
        let mut session = GenerationSession::new();
        let sub = session.begin(&form("fox")).unwrap();
        session.complete(
            sub.generation,
            Err(ArtioError::Service {
                status: 429,
                message: "quota exceeded".to_string(),
            }),
        );
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.error_banner(), Some("quota exceeded"));

        session.dismiss_error();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.error_banner().is_none());
    }

    #[test]
    fn per_image_error_does_not_touch_siblings() {
        let mut session = GenerationSession::new();
        let sub = session.begin(&form("fox")).unwrap();
        session.complete(sub.generation, Ok(urls(&["a", "b"])));
        session.record_load(sub.generation, "a", ImageLoadState::error("broken"));

        assert_eq!(session.phase(), Phase::Succeeded);
        assert_eq!(session.load_state("b"), Some(&ImageLoadState::Loading));
    }

    #[test]
    fn custom_edit_switches_ratio() {
        let mut f = form("x");
        assert!(f.set_custom_width("800"));
        assert_eq!(f.aspect_ratio, AspectRatio::Custom);
        assert!(!f.set_custom_height("-5"));
        assert_eq!(f.custom.height, "1024");
    }

    #[test]
    fn count_stays_in_range() {
        let mut f = form("x");
        f.decrement_count();
        assert_eq!(f.count, 1);
        for _ in 0..10 {
            f.increment_count();
        }
        assert_eq!(f.count, 4);

        f.count = u8::MAX;
        f.increment_count();
        assert_eq!(f.count, 4);
    }
}
