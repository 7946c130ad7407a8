//! Canonical landmark records produced by the pose pipeline.

use serde::{Deserialize, Serialize};

/// One body keypoint with normalized coordinates and a visibility score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Confidence in [0, 1]; 0.0 when the model reported none.
    pub visibility: f32,
}

/// Result of one inference over a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// 33 entries in [`PoseLandmark`] order for a detected body, or empty
    /// when no body was found.
    pub landmarks: Vec<Landmark>,
    /// Measured wall-clock inference time.
    pub inference_time_ms: u64,
    /// Width of the analyzed image.
    pub frame_width: u32,
    /// Height of the analyzed image.
    pub frame_height: u32,
}

/// Index of each of the 33 body keypoints. The order is fixed and
/// meaningful; models emit landmarks in exactly this sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Number of keypoints per detected body.
    pub const COUNT: usize = 33;

    /// Position of this keypoint within a landmark sequence.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Map a sequence position back to its keypoint.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEyeInner),
            2 => Some(Self::LeftEye),
            3 => Some(Self::LeftEyeOuter),
            4 => Some(Self::RightEyeInner),
            5 => Some(Self::RightEye),
            6 => Some(Self::RightEyeOuter),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            9 => Some(Self::MouthLeft),
            10 => Some(Self::MouthRight),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            17 => Some(Self::LeftPinky),
            18 => Some(Self::RightPinky),
            19 => Some(Self::LeftIndex),
            20 => Some(Self::RightIndex),
            21 => Some(Self::LeftThumb),
            22 => Some(Self::RightThumb),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            25 => Some(Self::LeftKnee),
            26 => Some(Self::RightKnee),
            27 => Some(Self::LeftAnkle),
            28 => Some(Self::RightAnkle),
            29 => Some(Self::LeftHeel),
            30 => Some(Self::RightHeel),
            31 => Some(Self::LeftFootIndex),
            32 => Some(Self::RightFootIndex),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip_covers_all_keypoints() {
        for i in 0..PoseLandmark::COUNT {
            let keypoint = PoseLandmark::from_index(i).unwrap();
            assert_eq!(keypoint.index(), i);
        }
        assert!(PoseLandmark::from_index(PoseLandmark::COUNT).is_none());
    }

    #[test]
    fn well_known_keypoints_keep_their_slots() {
        assert_eq!(PoseLandmark::Nose.index(), 0);
        assert_eq!(PoseLandmark::LeftShoulder.index(), 11);
        assert_eq!(PoseLandmark::RightHip.index(), 24);
        assert_eq!(PoseLandmark::RightFootIndex.index(), 32);
    }

    #[test]
    fn landmark_wire_shape() {
        let lm = Landmark {
            x: 0.5,
            y: 0.25,
            z: -0.1,
            visibility: 0.9,
        };
        let value = serde_json::to_value(lm).unwrap();
        assert_eq!(value["x"], 0.5);
        assert_eq!(value["y"], 0.25);
        assert!(value.get("visibility").is_some());
    }

    #[test]
    fn detection_result_serializes_landmark_list() {
        let result = DetectionResult {
            landmarks: vec![Landmark {
                x: 0.1,
                y: 0.2,
                z: 0.3,
                visibility: 1.0,
            }],
            inference_time_ms: 12,
            frame_width: 640,
            frame_height: 480,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["landmarks"].as_array().unwrap().len(), 1);
        assert_eq!(value["inference_time_ms"], 12);
    }
}
