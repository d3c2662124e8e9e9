//! Per-frame model orchestration.

use std::time::{Duration, Instant};

use itertools::Itertools;

use crate::error::{BootstrapError, OverlayError};
use crate::landmark::{
    AttributeDetection, FrameAnnotations, MeshSubject, PoseSubject, SubjectInfo,
};
use crate::model::{AttributeConfig, Frame, MeshConfig, Model, PoseConfig};
use crate::render::{AnnotationRenderer, RenderSurface};
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::timer::{ThroughputMeter, Timer};
use crate::toggle::ToggleSet;

const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

/// Result of processing one frame.
#[derive(Debug)]
pub struct FrameOutput {
    /// What was drawn.
    pub annotations: FrameAnnotations,
    /// Frames completed within the last second, including this one.
    pub fps: usize,
    /// Recoverable errors that occurred during this frame. They have already been logged.
    ///
    /// If rendering failed, the surface was cleared again, so a failed frame shows no annotations.
    pub errors: Vec<OverlayError>,
}

/// Runs the enabled models on a frame, one after another, and draws their results.
pub struct Orchestrator<M, P, A> {
    mesh: M,
    pose: P,
    attributes: A,
    mesh_config: MeshConfig,
    pose_config: PoseConfig,
    attribute_config: AttributeConfig,
    renderer: AnnotationRenderer,
    meter: ThroughputMeter,
    t_mesh: Timer,
    t_pose: Timer,
    t_attributes: Timer,
    t_render: Timer,
    last_summary: Instant,
}

impl<M, P, A> Orchestrator<M, P, A>
where
    M: Model<Config = MeshConfig, Output = Vec<MeshSubject>>,
    P: Model<Config = PoseConfig, Output = Vec<PoseSubject>>,
    A: Model<Config = AttributeConfig, Output = Vec<AttributeDetection>>,
{
    pub fn new(mesh: M, pose: P, attributes: A) -> Self {
        Self {
            mesh,
            pose,
            attributes,
            mesh_config: MeshConfig::default(),
            pose_config: PoseConfig::default(),
            attribute_config: AttributeConfig::default(),
            renderer: AnnotationRenderer::default(),
            meter: ThroughputMeter::default(),
            t_mesh: Timer::new("mesh"),
            t_pose: Timer::new("pose"),
            t_attributes: Timer::new("attributes"),
            t_render: Timer::new("render"),
            last_summary: Instant::now(),
        }
    }

    pub fn with_renderer(self, renderer: AnnotationRenderer) -> Self {
        Self { renderer, ..self }
    }

    pub fn with_mesh_config(self, mesh_config: MeshConfig) -> Self {
        Self {
            mesh_config,
            ..self
        }
    }

    pub fn with_pose_config(self, pose_config: PoseConfig) -> Self {
        Self {
            pose_config,
            ..self
        }
    }

    pub fn with_attribute_config(self, attribute_config: AttributeConfig) -> Self {
        Self {
            attribute_config,
            ..self
        }
    }

    /// Bootstraps all three models.
    ///
    /// Returns [`OverlayError::ModelBootstrap`] for the first model that fails.
    pub fn bootstrap(&mut self) -> Result<(), OverlayError> {
        bootstrap(&mut self.mesh)?;
        bootstrap(&mut self.pose)?;
        bootstrap(&mut self.attributes)?;
        Ok(())
    }

    /// Returns the current frame rate, as of the last processed frame.
    pub fn fps(&self) -> usize {
        self.meter.report()
    }

    /// Processes one frame.
    ///
    /// The models enabled in `toggles` are awaited one after another (mesh, pose, attributes).
    /// A model that fails is logged and treated as absent for this frame. Then `surface` is
    /// cleared and everything that was detected is drawn onto it, the frame is counted towards
    /// the frame rate, and the raw model output is sent to `telemetry` if the data log is
    /// enabled.
    pub async fn process_frame<S, T>(
        &mut self,
        frame: &Frame,
        toggles: ToggleSet,
        surface: &mut S,
        telemetry: &mut T,
    ) -> FrameOutput
    where
        S: RenderSurface + ?Sized,
        T: TelemetrySink + ?Sized,
    {
        let mut errors = Vec::new();

        let mesh = if toggles.mesh {
            infer(&mut self.mesh, frame, &self.mesh_config, &self.t_mesh, &mut errors).await
        } else {
            None
        };

        let pose = if toggles.pose {
            infer(&mut self.pose, frame, &self.pose_config, &self.t_pose, &mut errors).await
        } else {
            None
        };

        let detections = if toggles.attributes {
            infer(
                &mut self.attributes,
                frame,
                &self.attribute_config,
                &self.t_attributes,
                &mut errors,
            )
            .await
        } else {
            None
        };
        let attributes = detections
            .as_ref()
            .map(|dets| dets.iter().map(SubjectInfo::from).collect::<Vec<_>>());

        let annotations = FrameAnnotations {
            mesh,
            pose,
            attributes,
        };

        if let Err(e) = self
            .t_render
            .time(|| self.renderer.render(surface, &annotations))
        {
            let err = OverlayError::from(e);
            err.log();
            errors.push(err);

            // Don't leave a half-drawn frame on screen.
            if let Err(e) = surface.clear() {
                let err = OverlayError::from(e);
                err.log();
                errors.push(err);
            }
        }

        let now = Instant::now();
        self.meter.record(now);
        let fps = self.meter.report();

        if toggles.data_log {
            telemetry.record(&TelemetryRecord {
                frame: frame.index(),
                mesh: annotations.mesh.as_deref(),
                pose: annotations.pose.as_deref(),
                attributes: detections.as_deref(),
            });
        }

        log::trace!(
            "frame {}: {} faces, {} bodies, {} attributes",
            frame.index(),
            count(&annotations.mesh),
            count(&annotations.pose),
            count(&annotations.attributes),
        );
        if now.duration_since(self.last_summary) >= SUMMARY_INTERVAL {
            log::debug!(
                "{fps} FPS ({})",
                [&self.t_mesh, &self.t_pose, &self.t_attributes, &self.t_render]
                    .iter()
                    .format(", ")
            );
            self.last_summary = now;
        }

        FrameOutput {
            annotations,
            fps,
            errors,
        }
    }
}

fn bootstrap<Mo: Model>(model: &mut Mo) -> Result<(), OverlayError> {
    log::debug!("bootstrapping {} model", model.name());
    model
        .bootstrap()
        .map_err(|source: BootstrapError| OverlayError::ModelBootstrap {
            model: model.name().to_string(),
            source,
        })
}

async fn infer<Mo: Model>(
    model: &mut Mo,
    frame: &Frame,
    config: &Mo::Config,
    timer: &Timer,
    errors: &mut Vec<OverlayError>,
) -> Option<Mo::Output> {
    let result = {
        let _guard = timer.start();
        model.infer(frame, config).await
    };
    match result {
        Ok(output) => Some(output),
        Err(source) => {
            let err = OverlayError::Inference {
                model: model.name().to_string(),
                source,
            };
            err.log();
            errors.push(err);
            None
        }
    }
}

fn count<T>(subjects: &Option<Vec<T>>) -> String {
    match subjects {
        Some(subjects) => subjects.len().to_string(),
        None => "-".into(),
    }
}
