//! Hand landmark data model.
//!
//! Landmarks follow the 21-point MediaPipe hand layout: x/y normalized to
//! the source image, z relative depth. A hand with any other point count is
//! treated as "not detected" and never reaches hit-testing.

use tracing::debug;

// ── Landmark indices ───────────────────────────────────────

/// Number of landmarks in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

/// The 21 anatomical hand landmarks, in detector index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

const ALL_LANDMARKS: [HandLandmark; LANDMARK_COUNT] = [
    HandLandmark::Wrist,
    HandLandmark::ThumbCmc,
    HandLandmark::ThumbMcp,
    HandLandmark::ThumbIp,
    HandLandmark::ThumbTip,
    HandLandmark::IndexMcp,
    HandLandmark::IndexPip,
    HandLandmark::IndexDip,
    HandLandmark::IndexTip,
    HandLandmark::MiddleMcp,
    HandLandmark::MiddlePip,
    HandLandmark::MiddleDip,
    HandLandmark::MiddleTip,
    HandLandmark::RingMcp,
    HandLandmark::RingPip,
    HandLandmark::RingDip,
    HandLandmark::RingTip,
    HandLandmark::PinkyMcp,
    HandLandmark::PinkyPip,
    HandLandmark::PinkyDip,
    HandLandmark::PinkyTip,
];

impl HandLandmark {
    /// Array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_LANDMARKS.get(index).copied()
    }

    /// String representation for logs and s-expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        ALL_LANDMARKS.iter().copied().find(|lm| lm.as_str() == s)
    }
}

/// Skeleton edges between landmark indices, as drawn by overlays.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

// ── Landmark ───────────────────────────────────────────────

/// A single normalized keypoint. Values outside [0, 1] are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// ── Hand ───────────────────────────────────────────────────

/// One detected hand: exactly 21 landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarkSet {
    /// Build a hand from detector output. `None` unless exactly 21 points.
    pub fn from_points(points: Vec<Landmark>) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    /// A hand with every landmark at the same position.
    pub fn uniform(point: Landmark) -> Self {
        Self {
            points: [point; LANDMARK_COUNT],
        }
    }

    /// Copy of this hand with one landmark moved.
    pub fn with_landmark(mut self, landmark: HandLandmark, point: Landmark) -> Self {
        self.points[landmark.index()] = point;
        self
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn landmark(&self, landmark: HandLandmark) -> &Landmark {
        &self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

// ── Frame ──────────────────────────────────────────────────

/// All hands detected in one processed camera frame. Zero hands is valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LandmarkFrame {
    hands: Vec<HandLandmarkSet>,
    dropped_hands: usize,
}

impl LandmarkFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(hands: Vec<HandLandmarkSet>) -> Self {
        Self {
            hands,
            dropped_hands: 0,
        }
    }

    /// Build a frame from raw per-hand point lists, silently excluding
    /// malformed hands.
    pub fn from_raw(raw_hands: Vec<Vec<Landmark>>) -> Self {
        let mut hands = Vec::with_capacity(raw_hands.len());
        let mut dropped_hands = 0;
        for raw in raw_hands {
            let count = raw.len();
            match HandLandmarkSet::from_points(raw) {
                Some(hand) => hands.push(hand),
                None => {
                    debug!(
                        "Dropping hand: expected {} landmarks, got {}",
                        LANDMARK_COUNT, count
                    );
                    dropped_hands += 1;
                }
            }
        }
        Self {
            hands,
            dropped_hands,
        }
    }

    pub fn hands(&self) -> &[HandLandmarkSet] {
        &self.hands
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// Number of malformed hands excluded when the frame was built.
    pub fn dropped_hands(&self) -> usize {
        self.dropped_hands
    }

    /// Keep at most `max` hands, in detector order.
    pub fn truncate(&mut self, max: usize) {
        self.hands.truncate(max);
    }
}
