pub mod error;
pub mod load_state;
pub mod params;
pub mod session;

pub use error::{ArtioError, ValidationError, DOWNLOAD_ALERT, GENERIC_GENERATION_ERROR};
pub use load_state::{ImageLoadState, LoadStates};
pub use params::{grid_columns, resolve_dimensions, AspectRatio, CustomSize, GenerationRequest};
pub use session::{GenerationForm, GenerationResult, GenerationSession, Phase, Submission};
