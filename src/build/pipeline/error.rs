//! Pipeline error types.

use crate::build::render::RenderError;
use crate::build::transform::TransformError;

/// Errors that can occur during pipeline processing.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{filename}: {source}")]
    Transform {
        filename: String,
        source: TransformError,
    },

    #[error("{filename}: {source}")]
    Render {
        filename: String,
        source: RenderError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl PipelineError {
    /// Create a stage-specific error.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
