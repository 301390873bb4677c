//! Pipeline errors.
//!
//! These never reach callers of [`DocumentRenderer::render`](crate::DocumentRenderer::render):
//! the resilience boundary turns them into degraded output.

/// Failure inside one pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to write HTML: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("{stage} stage failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },
}
