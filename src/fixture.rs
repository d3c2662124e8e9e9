//! Deterministic stand-ins for the perception models and the video source.
//!
//! These produce plausible, frame-dependent results without any model weights or camera, so the
//! whole overlay loop can be run and tested on any machine.

use std::{cell::Cell, f32::consts::TAU, sync::Arc};

use crate::error::{BootstrapError, InferError};
use crate::expression::Expressions;
use crate::image::{Color, Image, Resolution};
use crate::landmark::{AttributeDetection, MeshSubject, PoseKeypoint, PoseSubject};
use crate::model::{AttributeConfig, Frame, MeshConfig, Model, PoseConfig};
use crate::scheduler::VideoSource;
use crate::skeleton::KeypointIdx;

/// Weight sets the attribute model needs before it can run.
pub const ATTRIBUTE_WEIGHTS: [&str; 3] = ["tiny_face_detector", "age_gender", "face_expression"];

fn check_frame(frame: &Frame) -> Result<Resolution, InferError> {
    let res = frame.resolution();
    if res.is_empty() {
        return Err(InferError::InvalidFrame(format!("frame {} is empty", frame.index())));
    }
    if frame.image().is_blank() {
        return Err(InferError::InvalidFrame(format!(
            "frame {} has no picture",
            frame.index()
        )));
    }
    Ok(res)
}

/// Returns a phase in `0..TAU` that advances slowly with the frame index.
fn phase(frame: &Frame) -> f32 {
    (frame.index() % 120) as f32 / 120.0 * TAU
}

/// Face mesh model reporting a ring of keypoints around the center of the frame.
#[derive(Debug, Clone)]
pub struct FixtureMesh {
    subjects: usize,
    points: usize,
}

impl FixtureMesh {
    pub fn new() -> Self {
        Self {
            subjects: 1,
            points: 68,
        }
    }

    /// Sets the number of faces "visible" in every frame.
    pub fn subjects(self, subjects: usize) -> Self {
        Self { subjects, ..self }
    }
}

impl Default for FixtureMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for FixtureMesh {
    type Config = MeshConfig;
    type Output = Vec<MeshSubject>;

    fn name(&self) -> &str {
        "fixture mesh"
    }

    async fn infer(
        &mut self,
        frame: &Frame,
        config: &MeshConfig,
    ) -> Result<Vec<MeshSubject>, InferError> {
        let res = check_frame(frame)?;
        let (w, h) = (res.width() as f32, res.height() as f32);
        let radius = w.min(h) / 8.0;
        let count = self.subjects.min(config.max_subjects);

        let subjects = (0..count)
            .map(|i| {
                let cx = w * (i + 1) as f32 / (count + 1) as f32;
                let cy = h / 3.0;
                let keypoints = (0..self.points)
                    .map(|p| {
                        let angle = p as f32 / self.points as f32 * TAU + phase(frame);
                        [
                            cx + angle.cos() * radius,
                            cy + angle.sin() * radius,
                            angle.sin(),
                        ]
                    })
                    .collect();
                MeshSubject::new(keypoints)
            })
            .collect();
        Ok(subjects)
    }
}

/// Body pose model reporting a standing figure in the middle of the frame.
///
/// The wrists wave back and forth, and their confidence drops below the drawing threshold every
/// few frames.
#[derive(Debug, Clone, Default)]
pub struct FixturePose {
    _priv: (),
}

impl FixturePose {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for FixturePose {
    type Config = PoseConfig;
    type Output = Vec<PoseSubject>;

    fn name(&self) -> &str {
        "fixture pose"
    }

    async fn infer(
        &mut self,
        frame: &Frame,
        _config: &PoseConfig,
    ) -> Result<Vec<PoseSubject>, InferError> {
        use KeypointIdx::*;

        let res = check_frame(frame)?;
        let (w, h) = (res.width() as f32, res.height() as f32);
        let wave = phase(frame).sin() * 0.08;
        let wrist_score = if frame.index() % 10 < 8 { 0.8 } else { 0.2 };

        let keypoints = KeypointIdx::ALL
            .iter()
            .map(|&idx| {
                let (x, y) = match idx {
                    Nose => (0.5, 0.2),
                    LeftEye => (0.52, 0.18),
                    RightEye => (0.48, 0.18),
                    LeftEar => (0.55, 0.19),
                    RightEar => (0.45, 0.19),
                    LeftShoulder => (0.6, 0.32),
                    RightShoulder => (0.4, 0.32),
                    LeftElbow => (0.66, 0.45),
                    RightElbow => (0.34, 0.45),
                    LeftWrist => (0.7 + wave, 0.56),
                    RightWrist => (0.3 - wave, 0.56),
                    LeftHip => (0.56, 0.6),
                    RightHip => (0.44, 0.6),
                    LeftKnee => (0.57, 0.75),
                    RightKnee => (0.43, 0.75),
                    LeftAnkle => (0.58, 0.9),
                    RightAnkle => (0.42, 0.9),
                };
                let score = match idx {
                    LeftWrist | RightWrist => wrist_score,
                    _ => 0.9,
                };
                PoseKeypoint::new(x * w, y * h, score).with_name(idx.name())
            })
            .collect();

        Ok(vec![PoseSubject {
            keypoints,
            score: Some(0.85),
        }])
    }
}

/// Facial attribute model reporting one face whose expression changes over time.
///
/// Like a real classifier, it refuses to run until all of its [`ATTRIBUTE_WEIGHTS`] are
/// available.
#[derive(Debug, Clone)]
pub struct FixtureAttributes {
    available: Vec<String>,
    loaded: bool,
}

impl FixtureAttributes {
    /// Creates the model with all weight sets available.
    pub fn new() -> Self {
        Self::with_weights(ATTRIBUTE_WEIGHTS)
    }

    /// Creates the model with only the given weight sets available.
    pub fn with_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: weights.into_iter().map(Into::into).collect(),
            loaded: false,
        }
    }
}

impl Default for FixtureAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for FixtureAttributes {
    type Config = AttributeConfig;
    type Output = Vec<AttributeDetection>;

    fn name(&self) -> &str {
        "fixture attributes"
    }

    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        for weights in ATTRIBUTE_WEIGHTS {
            if !self.available.iter().any(|w| w == weights) {
                return Err(BootstrapError::MissingWeights(weights.to_string()));
            }
            log::trace!("loaded '{weights}' weights");
        }
        self.loaded = true;
        Ok(())
    }

    async fn infer(
        &mut self,
        frame: &Frame,
        config: &AttributeConfig,
    ) -> Result<Vec<AttributeDetection>, InferError> {
        if !self.loaded {
            return Err(InferError::Other(anyhow::anyhow!(
                "model used before bootstrapping"
            )));
        }
        check_frame(frame)?;

        let t = phase(frame);
        let expressions = if config.expressions {
            [
                ("neutral", 0.4),
                ("happy", 0.3 + 0.3 * t.sin()),
                ("surprised", 0.3 - 0.3 * t.sin()),
            ]
            .into_iter()
            .collect()
        } else {
            Expressions::new()
        };
        let (age, gender) = if config.age_and_gender {
            (29.5 + t.cos() * 2.0, "female".to_string())
        } else {
            (0.0, String::new())
        };

        Ok(vec![AttributeDetection {
            age,
            gender,
            expressions,
        }])
    }
}

/// A video source showing a flat gray picture.
///
/// It can be made to report an empty display size for the first few queries, like a video
/// element that has not finished loading.
#[derive(Debug, Clone)]
pub struct FixtureVideo {
    image: Arc<Image>,
    next_index: u64,
    loading_queries: Cell<u32>,
}

impl FixtureVideo {
    pub fn new(res: Resolution) -> Self {
        let mut image = Image::with_resolution(res);
        image.clear(Color::from_rgb8(60, 60, 60));
        Self {
            image: Arc::new(image),
            next_index: 0,
            loading_queries: Cell::new(0),
        }
    }

    /// Makes the first `queries` calls to [`VideoSource::display_resolution`] report an empty
    /// size.
    pub fn loading_for(self, queries: u32) -> Self {
        Self {
            loading_queries: Cell::new(queries),
            ..self
        }
    }

    /// Returns the number of frames handed out so far.
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }
}

impl VideoSource for FixtureVideo {
    fn display_resolution(&self) -> Resolution {
        let loading = self.loading_queries.get();
        if loading > 0 {
            self.loading_queries.set(loading - 1);
            Resolution::default()
        } else {
            self.image.resolution()
        }
    }

    fn current_frame(&mut self) -> anyhow::Result<Frame> {
        let frame = Frame::new(self.image.clone(), self.next_index);
        self.next_index += 1;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use pollster::block_on;

    use super::*;

    fn frame(res: Resolution, index: u64) -> Frame {
        let mut image = Image::with_resolution(res);
        image.clear(Color::WHITE);
        Frame::new(Arc::new(image), index)
    }

    #[test]
    fn attributes_need_all_weights() {
        let mut model = FixtureAttributes::with_weights(["tiny_face_detector", "age_gender"]);
        match model.bootstrap() {
            Err(BootstrapError::MissingWeights(w)) => assert_eq!(w, "face_expression"),
            other => panic!("unexpected bootstrap result: {other:?}"),
        }

        let frame = frame(Resolution::VGA, 0);
        assert!(block_on(model.infer(&frame, &AttributeConfig::default())).is_err());

        let mut model = FixtureAttributes::new();
        model.bootstrap().unwrap();
        let dets = block_on(model.infer(&frame, &AttributeConfig::default())).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].gender, "female");
        assert_eq!(dets[0].expressions.len(), 3);
    }

    #[test]
    fn mesh_respects_max_subjects() {
        let mut model = FixtureMesh::new().subjects(5);
        let config = MeshConfig::default();
        let subjects = block_on(model.infer(&frame(Resolution::VGA, 3), &config)).unwrap();
        assert_eq!(subjects.len(), config.max_subjects);
        for subject in &subjects {
            assert_eq!(subject.len(), 68);
            for &[x, y, _] in subject.keypoints() {
                assert!((0.0..640.0).contains(&x));
                assert!((0.0..480.0).contains(&y));
            }
        }
    }

    #[test]
    fn pose_reports_full_layout() {
        let mut model = FixturePose::new();
        let subjects =
            block_on(model.infer(&frame(Resolution::RES_720P, 1), &PoseConfig::default()))
                .unwrap();
        assert_eq!(subjects.len(), 1);
        let keypoints = &subjects[0].keypoints;
        assert_eq!(keypoints.len(), KeypointIdx::NUM_KEYPOINTS);
        for (i, kp) in keypoints.iter().enumerate() {
            let idx = KeypointIdx::from_index(i).unwrap();
            assert_eq!(kp.name.as_deref(), Some(idx.name()));
        }
    }

    #[test]
    fn empty_frame_is_rejected() {
        let mut model = FixturePose::new();
        let result = block_on(model.infer(&frame(Resolution::default(), 7), &PoseConfig::default()));
        assert!(matches!(result, Err(InferError::InvalidFrame(_))));
    }

    #[test]
    fn blank_frame_is_rejected() {
        let mut model = FixtureMesh::new();
        let blank = Frame::new(Arc::new(Image::with_resolution(Resolution::VGA)), 2);
        let result = block_on(model.infer(&blank, &MeshConfig::default()));
        assert!(matches!(result, Err(InferError::InvalidFrame(_))));
    }

    #[test]
    fn video_loading() {
        let mut video = FixtureVideo::new(Resolution::VGA).loading_for(2);
        assert!(video.display_resolution().is_empty());
        assert!(video.display_resolution().is_empty());
        assert_eq!(video.display_resolution(), Resolution::VGA);

        assert_eq!(video.current_frame().unwrap().index(), 0);
        assert_eq!(video.current_frame().unwrap().index(), 1);
        assert_eq!(video.frames_read(), 2);
    }
}
