//! Canonical hand frame: 21 landmarks plus handedness and timing.
//!
//! Both tracking sources end up here.  Camera-estimator landmarks arrive in
//! normalized image space (x/y in 0..1, z relative depth); skeletal joints are
//! re-expressed in the hand's own wrist-anchored basis before they get here.

use nalgebra::Vector3;

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks in anatomical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
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

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// `[mcp, pip, dip, tip]` chains for the four non-thumb fingers.
pub const FINGER_CHAINS: [[Landmark; 4]; 4] = [
    [Landmark::IndexMcp, Landmark::IndexPip, Landmark::IndexDip, Landmark::IndexTip],
    [Landmark::MiddleMcp, Landmark::MiddlePip, Landmark::MiddleDip, Landmark::MiddleTip],
    [Landmark::RingMcp, Landmark::RingPip, Landmark::RingDip, Landmark::RingTip],
    [Landmark::PinkyMcp, Landmark::PinkyPip, Landmark::PinkyDip, Landmark::PinkyTip],
];

impl Landmark {
    /// Position in the landmark array (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_LANDMARKS.get(index).copied()
    }

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
}

const ALL_LANDMARKS: [Landmark; LANDMARK_COUNT] = [
    Landmark::Wrist,
    Landmark::ThumbCmc,
    Landmark::ThumbMcp,
    Landmark::ThumbIp,
    Landmark::ThumbTip,
    Landmark::IndexMcp,
    Landmark::IndexPip,
    Landmark::IndexDip,
    Landmark::IndexTip,
    Landmark::MiddleMcp,
    Landmark::MiddlePip,
    Landmark::MiddleDip,
    Landmark::MiddleTip,
    Landmark::RingMcp,
    Landmark::RingPip,
    Landmark::RingDip,
    Landmark::RingTip,
    Landmark::PinkyMcp,
    Landmark::PinkyPip,
    Landmark::PinkyDip,
    Landmark::PinkyTip,
];

// ── Handedness ─────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse "left" / "right" (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Skeletal-runtime handedness; "none" and unknown values read as left.
    pub fn from_xr(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Left)
    }
}

// ── Landmark ───────────────────────────────────────────────

/// A single landmark position in the hand's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HandLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance to another landmark.
    pub fn distance(&self, other: &HandLandmark) -> f32 {
        (self.to_vector() - other.to_vector()).norm()
    }
}

impl From<Vector3<f32>> for HandLandmark {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

// ── Pose ───────────────────────────────────────────────────

/// One tracked hand for one frame.
///
/// Immutable once built; replaced wholesale every tracked frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    pub handedness: Handedness,
    pub landmarks: [HandLandmark; LANDMARK_COUNT],
    /// Capture time in milliseconds.
    pub timestamp_ms: f64,
    /// Source image size; 1x1 for skeletal poses.
    pub image_width: u32,
    pub image_height: u32,
}

impl HandPose {
    pub fn new(
        handedness: Handedness,
        landmarks: [HandLandmark; LANDMARK_COUNT],
        timestamp_ms: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            handedness,
            landmarks,
            timestamp_ms,
            image_width,
            image_height,
        }
    }

    /// Build from an estimator result slice.  Anything other than exactly
    /// 21 landmarks is rejected.
    pub fn from_landmarks(
        handedness: Handedness,
        landmarks: &[HandLandmark],
        timestamp_ms: f64,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let landmarks: [HandLandmark; LANDMARK_COUNT] = landmarks.try_into().ok()?;
        Some(Self::new(
            handedness,
            landmarks,
            timestamp_ms,
            image_width,
            image_height,
        ))
    }

    pub fn landmark(&self, landmark: Landmark) -> &HandLandmark {
        &self.landmarks[landmark.index()]
    }

    /// Distance between two landmarks of this hand.
    pub fn distance(&self, a: Landmark, b: Landmark) -> f32 {
        self.landmark(a).distance(self.landmark(b))
    }
}

// ── Test fixtures ──────────────────────────────────────────


// ── Tests ──────────────────────────────────────────────────
