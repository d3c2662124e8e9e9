//! The 17-point body keypoint layout and its skeleton connection graph.

/// Index of a keypoint in a [`PoseSubject`][crate::landmark::PoseSubject].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypointIdx {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIdx {
    pub const NUM_KEYPOINTS: usize = 17;

    /// All keypoints, in index order.
    pub const ALL: [KeypointIdx; Self::NUM_KEYPOINTS] = {
        use KeypointIdx::*;
        [
            Nose,
            LeftEye,
            RightEye,
            LeftEar,
            RightEar,
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The keypoint name pose models attach to their output.
    pub fn name(self) -> &'static str {
        use KeypointIdx::*;
        match self {
            Nose => "nose",
            LeftEye => "left_eye",
            RightEye => "right_eye",
            LeftEar => "left_ear",
            RightEar => "right_ear",
            LeftShoulder => "left_shoulder",
            RightShoulder => "right_shoulder",
            LeftElbow => "left_elbow",
            RightElbow => "right_elbow",
            LeftWrist => "left_wrist",
            RightWrist => "right_wrist",
            LeftHip => "left_hip",
            RightHip => "right_hip",
            LeftKnee => "left_knee",
            RightKnee => "right_knee",
            LeftAnkle => "left_ankle",
            RightAnkle => "right_ankle",
        }
    }
}

/// Skeleton edges, as a mapping from a keypoint to the keypoints it is connected to.
///
/// Sorted by source keypoint. Every edge is listed once; keypoints without outgoing edges have no
/// entry.
pub const CONNECTIONS: &[(KeypointIdx, &[KeypointIdx])] = {
    use KeypointIdx::*;
    &[
        (Nose, &[LeftEye]),
        (RightEye, &[Nose]),
        (LeftEar, &[LeftEye]),
        (RightEar, &[RightEye]),
        (LeftShoulder, &[RightShoulder, LeftElbow, LeftHip]),
        (RightElbow, &[RightShoulder]),
        (LeftWrist, &[LeftElbow]),
        (RightWrist, &[RightElbow]),
        (RightHip, &[RightShoulder, LeftHip]),
        (LeftKnee, &[LeftHip]),
        (RightKnee, &[RightHip]),
        (LeftAnkle, &[LeftKnee]),
        (RightAnkle, &[RightKnee]),
    ]
};

/// Returns the keypoints that `index` is connected to.
///
/// Returns an empty slice for keypoints without outgoing edges and for out-of-range indices.
pub fn connections(index: usize) -> &'static [KeypointIdx] {
    CONNECTIONS
        .iter()
        .find(|(from, _)| from.index() == index)
        .map(|&(_, to)| to)
        .unwrap_or(&[])
}
