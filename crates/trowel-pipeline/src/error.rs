//! Pipeline errors.

use std::path::Path;

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },

    #[error("Failed to render {page}: {message}")]
    TemplateError { page: String, message: String },

    #[error("Failed to compile stylesheet {path}: {message}")]
    StylesheetError { path: String, message: String },

    #[error("Failed to compile script {path}: {message}")]
    ScriptError { path: String, message: String },

    #[error("Failed to process image {path}: {message}")]
    ImageError { path: String, message: String },

    #[error("Failed to build sprite: {0}")]
    SpriteError(String),

    #[error("Refusing to clean {dist}: it contains the source directory {src}")]
    UnsafeOutput { dist: String, src: String },

    #[error("Task did not complete: {0}")]
    JoinError(String),
}

impl PipelineError {
    pub(crate) fn read(path: &Path, err: impl ToString) -> Self {
        Self::ReadError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl ToString) -> Self {
        Self::WriteError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
