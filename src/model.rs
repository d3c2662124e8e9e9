//! Interface to the perception models.
//!
//! The overlay never depends on a concrete model. Each model is a [`Model`] with its own
//! per-call configuration and output type:
//!
//! | Role | `Config` | `Output` |
//! |---|---|---|
//! | face mesh | [`MeshConfig`] | `Vec<`[`MeshSubject`]`>` |
//! | body pose | [`PoseConfig`] | `Vec<`[`PoseSubject`]`>` |
//! | facial attributes | [`AttributeConfig`] | `Vec<`[`AttributeDetection`]`>` |
//!
//! [`MeshSubject`]: crate::landmark::MeshSubject
//! [`PoseSubject`]: crate::landmark::PoseSubject
//! [`AttributeDetection`]: crate::landmark::AttributeDetection

use std::{future::Future, sync::Arc};

use crate::config;
use crate::error::{BootstrapError, InferError};
use crate::image::{Image, Resolution};

/// A video frame, handed to every model called during one iteration of the frame loop.
///
/// Cloning a [`Frame`] is cheap; the pixel data is shared.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<Image>,
    index: u64,
}

impl Frame {
    pub fn new(image: Arc<Image>, index: u64) -> Self {
        Self {
            image,
            index,
        }
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Sequence number of the frame, as assigned by the video source.
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.image.resolution()
    }
}

/// An asynchronous perception model.
pub trait Model {
    /// Per-call options.
    type Config;
    /// What the model detects in a frame.
    type Output;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Makes the model ready for inference (loading weights, warming up, etc.).
    ///
    /// Called once, before the first frame. Failing here is fatal to the frame loop.
    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        Ok(())
    }

    /// Runs the model on `frame`.
    fn infer(
        &mut self,
        frame: &Frame,
        config: &Self::Config,
    ) -> impl Future<Output = Result<Self::Output, InferError>>;
}

/// Options for the face mesh model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    /// Maximum number of faces to return.
    pub max_subjects: usize,
    /// Whether to refine the eye region with iris landmarks.
    pub predict_irises: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            max_subjects: config::MESH_MAX_SUBJECTS,
            predict_irises: config::MESH_PREDICT_IRISES,
        }
    }
}

/// Options for the body pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseConfig {
    /// Detect every person in one pass, instead of only the most prominent one.
    pub multi_subject: bool,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            multi_subject: true,
        }
    }
}

/// Options for the facial attribute model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeConfig {
    pub expressions: bool,
    pub age_and_gender: bool,
}

impl Default for AttributeConfig {
    fn default() -> Self {
        Self {
            expressions: true,
            age_and_gender: true,
        }
    }
}
