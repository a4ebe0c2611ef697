//! Camera adapter: composes a face count primitive with a per-hand
//! landmark primitive and derives a bounded `typingConfidence` score from
//! five weighted criteria.

use crate::detector::CameraOutput;
use crate::frame::Frame;

/// Normalised (x, y) landmark positions in `[0, 1]` frame-relative
/// coordinates, the subset of MediaPipe's 21-point hand model the
/// scoring function needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    pub wrist: (f64, f64),
    pub thumb_tip: (f64, f64),
    pub index_tip: (f64, f64),
    pub middle_tip: (f64, f64),
    pub ring_tip: (f64, f64),
    pub pinky_tip: (f64, f64),
    pub palm_base: (f64, f64),
}

impl HandLandmarks {
    fn non_thumb_tips(&self) -> [(f64, f64); 4] {
        [self.index_tip, self.middle_tip, self.ring_tip, self.pinky_tip]
    }
}

/// Raw per-frame output of the replaceable vision primitive: a face
/// count and, for each visible hand, its landmarks.
#[derive(Debug, Clone, Default)]
pub struct CameraPrimitiveOutput {
    pub face_count: usize,
    pub hands: Vec<HandLandmarks>,
}

/// The vision primitive contract for the camera substream. Pure,
/// no cross-frame state exposed. Implementations may hold internal
/// buffers but must not leak state through the return value.
pub trait CameraVision: Send {
    fn detect(&mut self, frame: &Frame) -> CameraPrimitiveOutput;
}

/// A dependency-free stand-in vision primitive: always reports one
/// face and no hands. Exists so the adapter and fusion layers are
/// testable end to end without a real landmark/face detector wired in;
/// a production deployment swaps this for a real implementation behind
/// the same trait.
#[derive(Debug, Default)]
pub struct NullCameraVision;

impl CameraVision for NullCameraVision {
    fn detect(&mut self, _frame: &Frame) -> CameraPrimitiveOutput {
        CameraPrimitiveOutput {
            face_count: 1,
            hands: Vec::new(),
        }
    }
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Score a single hand's typing confidence in `[0, 1]` from five
/// weighted criteria:
///   1. hand located in the lower ~60% of the frame (positive)
///   2. >=2 non-thumb fingertips at moderate distance from the palm
///      centre — natural curl (positive)
///   3. <3 fingertips well above the wrist — not waving/pointing (positive)
///   4. fingertips not all collapsed onto the palm — not a fist (positive)
///   5. hand near horizontal centre (minor positive)
pub fn typing_confidence(hand: &HandLandmarks) -> f64 {
    let max_score = 10.0;
    let mut score = 3.0; // neutral base, 30%

    // Criterion 1: vertical position in the lower typing area.
    if hand.wrist.1 > 0.4 && hand.wrist.1 < 0.9 {
        score += 2.5;
    } else {
        score -= 1.0;
    }

    // Criterion 2: finger curl.
    let tips = hand.non_thumb_tips();
    let curled = tips
        .iter()
        .filter(|&&tip| {
            let d = dist(tip, hand.palm_base);
            d > 0.08 && d < 0.25
        })
        .count();
    if curled >= 2 {
        score += 2.0;
    } else if curled >= 1 {
        score += 1.0;
    }

    // Criterion 3: not waving/pointing.
    let fingers_up = tips.iter().filter(|&&tip| tip.1 < hand.wrist.1 - 0.12).count();
    if fingers_up >= 3 {
        score -= 2.0;
    } else {
        score += 1.5;
    }

    // Criterion 4: not a fist.
    let all_collapsed = tips.iter().all(|&tip| dist(tip, hand.palm_base) < 0.05);
    if !all_collapsed {
        score += 1.0;
    } else {
        score -= 1.0;
    }

    // Criterion 5: horizontal centring, minor bonus.
    if hand.wrist.0 > 0.3 && hand.wrist.0 < 0.7 {
        score += 0.5;
    }

    (score / max_score).clamp(0.0, 1.0)
}

/// The camera adapter: normalises the raw primitive output into a
/// `CameraOutput` using `typing_confidence` thresholded at τ_typing.
pub struct CameraAdapter {
    typing_threshold: f64,
}

impl CameraAdapter {
    pub fn new(typing_threshold: f64) -> Self {
        Self { typing_threshold }
    }

    pub fn process(&self, primitive: &CameraPrimitiveOutput) -> CameraOutput {
        let typing_confidence = primitive
            .hands
            .iter()
            .map(typing_confidence)
            .fold(0.0_f64, f64::max);

        CameraOutput {
            face_count: primitive.face_count,
            hands_visible: !primitive.hands.is_empty(),
            hands_typing: typing_confidence > self.typing_threshold,
            typing_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing_hand() -> HandLandmarks {
        HandLandmarks {
            wrist: (0.5, 0.6),
            thumb_tip: (0.45, 0.55),
            index_tip: (0.55, 0.5),
            middle_tip: (0.56, 0.52),
            ring_tip: (0.54, 0.53),
            pinky_tip: (0.53, 0.54),
            palm_base: (0.5, 0.58),
        }
    }

    fn waving_hand() -> HandLandmarks {
        HandLandmarks {
            wrist: (0.5, 0.6),
            thumb_tip: (0.45, 0.2),
            index_tip: (0.5, 0.1),
            middle_tip: (0.52, 0.08),
            ring_tip: (0.54, 0.1),
            pinky_tip: (0.56, 0.12),
            palm_base: (0.5, 0.4),
        }
    }

    fn fist_hand() -> HandLandmarks {
        HandLandmarks {
            wrist: (0.5, 0.6),
            thumb_tip: (0.5, 0.6),
            index_tip: (0.5, 0.6),
            middle_tip: (0.5, 0.6),
            ring_tip: (0.5, 0.6),
            pinky_tip: (0.5, 0.6),
            palm_base: (0.5, 0.6),
        }
    }

    #[test]
    fn test_typing_hand_scores_above_threshold() {
        let confidence = typing_confidence(&typing_hand());
        assert!(confidence > 0.40, "confidence was {confidence}");
    }

    #[test]
    fn test_waving_hand_scores_low() {
        let typing = typing_confidence(&typing_hand());
        let waving = typing_confidence(&waving_hand());
        assert!(waving < typing);
    }

    #[test]
    fn test_fist_scores_low() {
        let typing = typing_confidence(&typing_hand());
        let fist = typing_confidence(&fist_hand());
        assert!(fist < typing);
    }

    #[test]
    fn test_adapter_hands_visible_and_typing() {
        let adapter = CameraAdapter::new(0.40);
        let primitive = CameraPrimitiveOutput {
            face_count: 1,
            hands: vec![typing_hand()],
        };
        let output = adapter.process(&primitive);
        assert!(output.hands_visible);
        assert!(output.hands_typing);
        assert_eq!(output.face_count, 1);
    }

    #[test]
    fn test_adapter_no_hands() {
        let adapter = CameraAdapter::new(0.40);
        let primitive = CameraPrimitiveOutput {
            face_count: 1,
            hands: vec![],
        };
        let output = adapter.process(&primitive);
        assert!(!output.hands_visible);
        assert!(!output.hands_typing);
        assert_eq!(output.typing_confidence, 0.0);
    }
}
