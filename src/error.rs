//! Error type shared by the resolution and rendering pipeline

use thiserror::Error;

use crate::acquire::DecodeError;
use crate::color::ColorMapError;
use crate::output::OutputError;
use crate::registry::RegistryError;

/// Result alias used throughout the pipeline.
pub type AnnotateResult<T> = Result<T, AnnotateError>;

/// Everything that can abort resolving, fetching or rendering an item.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// A linked resource does not exist (no overlay, no overlay file)
    #[error("not found: {0}")]
    NotFound(String),

    /// More than one candidate where exactly one is required
    #[error("ambiguous: {0}")]
    Ambiguous(String),

    /// Missing color map, unmapped label or missing identifier
    #[error("configuration error: {0}")]
    Config(String),

    /// Annotation element that cannot be drawn
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    ColorMap(#[from] ColorMapError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnnotateError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::Ambiguous(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
