use carmod_core::error::CoreError;
use carmod_gemini::GeminiError;

/// Errors from the integrate and prompt-edit flows.
#[derive(Debug, thiserror::Error)]
pub enum IntegrateError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Generation(#[from] GeminiError),

    /// Another generation for this studio has not finished yet.
    #[error("An integration is already in progress")]
    Busy,

    /// The scene or base image changed while the request was in flight.
    #[error("Result discarded: the scene changed while it was being generated")]
    Stale,
}
