//! Live video overlays for machine perception models.
//!
//! A [`FrameScheduler`] drives a loop that, once per display refresh, asks up to three
//! perception models about the current video frame: a face mesh estimator, a body pose estimator,
//! and a facial attribute classifier. Their results are drawn onto a [`RenderSurface`] by the
//! [`AnnotationRenderer`], and the loop's throughput is measured with a [`ThroughputMeter`].
//!
//! The models themselves, the video source and the host UI are outside of this crate and are
//! plugged in through the [`Model`], [`VideoSource`], [`FrameClock`], [`TelemetrySink`] and
//! [`FpsDisplay`] traits.
//!
//! # Coordinates
//!
//! All keypoint coordinates are in pixels of the displayed video, with X pointing right and Y
//! pointing *down*, like the image coordinates the models output.
//!
//! # Environment Variables
//!
//! [`OverlayOptions::from_env`] reads the following variables:
//!
//! * `OVERLAY_DATA_LOG`: whether raw model output is logged each frame (`1`/`0`, `true`/`false`).
//!   Enabled by default.
//! * `OVERLAY_DISABLE`: comma-separated list of models to start out disabled (`mesh`, `pose`,
//!   `attributes`).
//! * `OVERLAY_REFRESH_HZ`: rate of the default [`IntervalClock`]. Defaults to 60.
//!
//! [`FrameScheduler`]: scheduler::FrameScheduler
//! [`RenderSurface`]: render::RenderSurface
//! [`AnnotationRenderer`]: render::AnnotationRenderer
//! [`ThroughputMeter`]: timer::ThroughputMeter
//! [`Model`]: model::Model
//! [`VideoSource`]: scheduler::VideoSource
//! [`FrameClock`]: scheduler::FrameClock
//! [`IntervalClock`]: scheduler::IntervalClock
//! [`TelemetrySink`]: telemetry::TelemetrySink
//! [`FpsDisplay`]: scheduler::FpsDisplay
//! [`OverlayOptions::from_env`]: config::OverlayOptions::from_env

use log::LevelFilter;

pub mod config;
pub mod error;
pub mod expression;
pub mod fixture;
pub mod image;
pub mod landmark;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod scheduler;
pub mod skeleton;
pub mod telemetry;
pub mod timer;
pub mod toggle;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this crate will log at *trace*
/// level. Otherwise, they will log at *debug* level. Everything else logs at *info* level.
/// `RUST_LOG` overrides these defaults.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
