//! Keypoints and per-subject results produced by the perception models.

use serde::Serialize;

use crate::expression::Expressions;

pub type Position = [f32; 3];

/// One detected face's ordered set of 3D facial landmarks.
///
/// X and Y are in pixels of the input frame; Z is relative depth as output by the mesh model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSubject {
    keypoints: Vec<Position>,
}

impl MeshSubject {
    pub fn new(keypoints: Vec<Position>) -> Self {
        Self { keypoints }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Position] {
        &self.keypoints
    }
}

/// A named 2D body keypoint with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseKeypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PoseKeypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self {
            x,
            y,
            score,
            name: None,
        }
    }

    pub fn with_name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    #[inline]
    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// One detected body.
///
/// `keypoints` is indexed by [`KeypointIdx`][crate::skeleton::KeypointIdx]. A pose model may
/// report fewer keypoints than the full layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseSubject {
    pub keypoints: Vec<PoseKeypoint>,
    /// Overall confidence of the detection, if the model reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl PoseSubject {
    pub fn new(keypoints: Vec<PoseKeypoint>) -> Self {
        Self {
            keypoints,
            score: None,
        }
    }
}

/// Raw output of the facial attribute model for one face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDetection {
    pub age: f32,
    pub gender: String,
    pub expressions: Expressions,
}

/// Attributes of one face, reduced to what the overlay displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectInfo {
    pub age: f32,
    pub gender: String,
    /// The dominant expression, or an empty string if no expression scored above 0.
    pub expression: String,
}

impl From<&AttributeDetection> for SubjectInfo {
    fn from(det: &AttributeDetection) -> Self {
        Self {
            age: det.age,
            gender: det.gender.clone(),
            expression: det.expressions.dominant().to_string(),
        }
    }
}

/// Everything that gets drawn for one frame.
///
/// `None` means the model was disabled (or failed) for this frame, while an empty list means it
/// ran and found nothing. Either way nothing is drawn for that category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAnnotations {
    pub mesh: Option<Vec<MeshSubject>>,
    pub pose: Option<Vec<PoseSubject>>,
    pub attributes: Option<Vec<SubjectInfo>>,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn subject_info_uses_dominant_expression() {
        let det = AttributeDetection {
            age: 31.6,
            gender: "female".into(),
            expressions: [("neutral", 0.1), ("happy", 0.8)].into_iter().collect(),
        };
        let info = SubjectInfo::from(&det);
        assert_eq!(info.expression, "happy");
        assert_eq!(info.gender, "female");
        assert_relative_eq!(info.age, 31.6);
    }

    #[test]
    fn keypoint_name_is_optional_in_json() {
        let kp = PoseKeypoint::new(1.0, 2.0, 0.5);
        assert_eq!(
            serde_json::to_string(&kp).unwrap(),
            r#"{"x":1.0,"y":2.0,"score":0.5}"#
        );
        let kp = kp.with_name("nose");
        assert!(serde_json::to_string(&kp).unwrap().contains(r#""name":"nose""#));
    }
}
