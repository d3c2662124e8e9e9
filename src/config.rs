//! Constants and runtime options.

use std::{env, time::Duration};

use crate::toggle::{Toggle, ToggleSet};

/// Maximum number of faces the mesh model is asked for.
pub const MESH_MAX_SUBJECTS: usize = 3;
pub const MESH_PREDICT_IRISES: bool = false;

/// Radius of the dot drawn for each face mesh landmark, in pixels.
pub const MESH_POINT_RADIUS: u32 = 1;
/// Radius of the dot drawn for each confident body keypoint, in pixels.
pub const POSE_POINT_RADIUS: u32 = 7;
pub const POSE_EDGE_WIDTH: u32 = 3;
/// Body keypoints are drawn only if their score is strictly greater than this.
pub const POSE_SCORE_THRESHOLD: f32 = 0.39;

/// Position of the first subject's first info line (left edge, text baseline).
pub const SUBJECT_INFO_ORIGIN: [f32; 2] = [20.0, 30.0];
/// Distance between the info lines of one subject.
pub const SUBJECT_INFO_LINE_HEIGHT: f32 = 14.0;
/// Vertical offset between consecutive subjects' info blocks.
pub const SUBJECT_INFO_SPACING: f32 = 60.0;

/// Width of the sliding window the frame rate is computed over.
pub const THROUGHPUT_WINDOW: Duration = Duration::from_secs(1);

/// Time between two canvas size synchronizations during startup.
pub const SIZE_SYNC_INTERVAL: Duration = Duration::from_secs(1);
/// Number of matching size synchronizations needed before the frame loop starts.
pub const SIZE_SYNC_CONFIRMATIONS: u32 = 2;

pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Runtime options of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    toggles: ToggleSet,
    refresh_hz: u32,
    sync_interval: Duration,
    sync_confirmations: u32,
    thread_name: String,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            toggles: ToggleSet::default(),
            refresh_hz: DEFAULT_REFRESH_HZ,
            sync_interval: SIZE_SYNC_INTERVAL,
            sync_confirmations: SIZE_SYNC_CONFIRMATIONS,
            thread_name: "overlay".into(),
        }
    }
}

impl OverlayOptions {
    /// Reads options from the process environment.
    ///
    /// See the [crate-level documentation](crate) for the supported variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads options from a variable lookup function.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut this = Self::default();

        if let Some(value) = var("OVERLAY_DATA_LOG") {
            let enabled = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => anyhow::bail!("invalid value for OVERLAY_DATA_LOG: '{value}'"),
            };
            this.toggles = this.toggles.with(Toggle::DataLog, enabled);
        }

        if let Some(value) = var("OVERLAY_DISABLE") {
            for model in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let toggle = match model {
                    "mesh" => Toggle::Mesh,
                    "pose" => Toggle::Pose,
                    "attributes" => Toggle::Attributes,
                    _ => anyhow::bail!(
                        "invalid model '{model}' in OVERLAY_DISABLE (expected `mesh`, `pose` or `attributes`)"
                    ),
                };
                this.toggles = this.toggles.with(toggle, false);
            }
        }

        if let Some(value) = var("OVERLAY_REFRESH_HZ") {
            let hz: u32 = value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid value for OVERLAY_REFRESH_HZ: '{value}' ({e})"))?;
            if hz == 0 {
                anyhow::bail!("OVERLAY_REFRESH_HZ must be greater than zero");
            }
            this.refresh_hz = hz;
        }

        log::debug!("overlay options: {this:?}");
        Ok(this)
    }

    /// Sets the initial state of the toggles.
    pub fn toggles(self, toggles: ToggleSet) -> Self {
        Self { toggles, ..self }
    }

    /// Sets the rate at which the default frame clock ticks.
    ///
    /// # Panics
    ///
    /// Panics if `hz` is zero.
    pub fn refresh_hz(self, hz: u32) -> Self {
        assert!(hz != 0, "refresh rate must be greater than zero");
        Self {
            refresh_hz: hz,
            ..self
        }
    }

    /// Sets the time between canvas size synchronizations during startup.
    pub fn sync_interval(self, interval: Duration) -> Self {
        Self {
            sync_interval: interval,
            ..self
        }
    }

    /// Sets how many matching size synchronizations are needed to start the frame loop.
    ///
    /// # Panics
    ///
    /// Panics if `confirmations` is zero.
    pub fn sync_confirmations(self, confirmations: u32) -> Self {
        assert!(confirmations != 0, "at least one size confirmation is required");
        Self {
            sync_confirmations: confirmations,
            ..self
        }
    }

    /// Sets the name of the frame loop thread.
    pub fn thread_name<N: Into<String>>(self, name: N) -> Self {
        Self {
            thread_name: name.into(),
            ..self
        }
    }

    pub fn initial_toggles(&self) -> ToggleSet {
        self.toggles
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.refresh_hz
    }

    pub fn size_sync_interval(&self) -> Duration {
        self.sync_interval
    }

    pub fn size_sync_confirmations(&self) -> u32 {
        self.sync_confirmations
    }

    pub fn frame_thread_name(&self) -> &str {
        &self.thread_name
    }
}
