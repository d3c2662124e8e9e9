//! Error types.
//!
//! Only [`OverlayError::ModelBootstrap`] is fatal. Inference and render failures are reported for
//! the frame they happened in, and the frame loop keeps going.

use std::error::Error as _;

use thiserror::Error;

/// A perception model could not be made ready for inference.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("missing weights `{0}`")]
    MissingWeights(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single inference call failed.
#[derive(Debug, Error)]
pub enum InferError {
    #[error("frame rejected: {0}")]
    InvalidFrame(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Drawing onto a render surface failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render surface is unavailable")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to bootstrap {model} model")]
    ModelBootstrap {
        model: String,
        #[source]
        source: BootstrapError,
    },
    #[error("{model} inference failed")]
    Inference {
        model: String,
        #[source]
        source: InferError,
    },
    #[error("failed to render annotations")]
    Render(#[from] RenderError),
}

impl OverlayError {
    /// Returns `true` if the frame loop can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ModelBootstrap { .. })
    }

    /// Logs a recoverable error together with its cause.
    pub(crate) fn log(&self) {
        match self.source() {
            Some(cause) => log::warn!("{self}: {cause}"),
            None => log::warn!("{self}"),
        }
    }
}
