use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Nose-tip position used for the off-center check.
    ///
    /// Falls back to the box center when the estimator returned no
    /// landmarks, so landmark-less detectors still gate on position.
    pub fn nose(&self) -> (f32, f32) {
        match self.landmarks {
            Some(points) => points[2],
            None => (self.x + self.width / 2.0, self.y + self.height / 2.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nose_from_landmarks() {
        let face = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            confidence: 0.9,
            landmarks: Some([(10.0, 20.0), (30.0, 20.0), (20.0, 40.0), (12.0, 60.0), (28.0, 60.0)]),
        };
        assert_eq!(face.nose(), (20.0, 40.0));
    }

    #[test]
    fn test_nose_falls_back_to_box_center() {
        let face = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 40.0,
            height: 60.0,
            confidence: 0.9,
            landmarks: None,
        };
        assert_eq!(face.nose(), (30.0, 50.0));
    }
}
