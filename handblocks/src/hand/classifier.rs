//! Per-frame gesture classification.
//!
//! Pure functions over a single `HandPose`.  Distances are divided by a hand
//! scale (mean wrist→knuckle length) so thresholds hold across hand sizes
//! and camera distances.

use super::pose::{HandPose, Handedness, Landmark, FINGER_CHAINS};

// ── Config ─────────────────────────────────────────────────

/// Thresholds for gesture classification and event generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Enable gesture recognition.
    pub enabled: bool,
    /// Normalized thumb-index distance below which the hand is pinching.
    pub pinch_threshold: f32,
    /// Normalized distance at which pinch strength reaches zero.
    pub pinch_strength_range: f32,
    /// Normalized index-middle distance below which two fingers are pinched.
    pub two_finger_threshold: f32,
    /// Lower bound on the hand scale.
    pub hand_scale_epsilon: f32,
    /// Longest pinch-to-release interval (ms) that still counts as a tap.
    pub tap_max_interval_ms: f64,
    /// Minimum time (ms) between two tap events.
    pub tap_cooldown_ms: f64,
    /// Number of pinch samples kept for tap detection.
    pub history_capacity: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pinch_threshold: 0.35,
            pinch_strength_range: 0.4,
            two_finger_threshold: 0.3,
            hand_scale_epsilon: 0.001,
            tap_max_interval_ms: 220.0,
            tap_cooldown_ms: 260.0,
            history_capacity: 12,
        }
    }
}

// ── Metrics ────────────────────────────────────────────────

/// Thumb-index pinch measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PinchMetrics {
    pub distance: f32,
    pub normalized: f32,
    /// 1.0 fully pinched, 0.0 open or beyond range.
    pub strength: f32,
}

/// Index-middle distance measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwoFingerMetrics {
    pub distance: f32,
    pub normalized: f32,
}

/// Everything the classifier knows about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Classification {
    pub pinch: PinchMetrics,
    pub two_finger: TwoFingerMetrics,
    pub is_pinching: bool,
    pub is_two_finger_pinch: bool,
    pub is_open_palm: bool,
    pub is_pointing: bool,
}

/// Mean of wrist→index-knuckle and wrist→middle-knuckle, floored at epsilon.
pub fn hand_scale(hand: &HandPose, config: &GestureConfig) -> f32 {
    let span = (hand.distance(Landmark::Wrist, Landmark::IndexMcp)
        + hand.distance(Landmark::Wrist, Landmark::MiddleMcp))
        * 0.5;
    span.max(config.hand_scale_epsilon)
}

pub fn pinch_metrics(hand: &HandPose, config: &GestureConfig) -> PinchMetrics {
    let distance = hand.distance(Landmark::ThumbTip, Landmark::IndexTip);
    let normalized = distance / hand_scale(hand, config);
    let strength = (1.0 - normalized / config.pinch_strength_range).clamp(0.0, 1.0);
    PinchMetrics {
        distance,
        normalized,
        strength,
    }
}

pub fn two_finger_metrics(hand: &HandPose, config: &GestureConfig) -> TwoFingerMetrics {
    let distance = hand.distance(Landmark::IndexTip, Landmark::MiddleTip);
    TwoFingerMetrics {
        distance,
        normalized: distance / hand_scale(hand, config),
    }
}

pub fn is_pinching(hand: &HandPose, config: &GestureConfig) -> bool {
    pinch_metrics(hand, config).normalized < config.pinch_threshold
}

pub fn is_two_finger_pinch(hand: &HandPose, config: &GestureConfig) -> bool {
    two_finger_metrics(hand, config).normalized < config.two_finger_threshold
}

/// A finger is extended when each joint sits above its parent along local Y
/// (smaller y is further along the extension axis).
pub fn finger_extended(hand: &HandPose, chain: [Landmark; 4]) -> bool {
    let [mcp, pip, dip, tip] = chain.map(|lm| hand.landmark(lm).y);
    tip < pip && dip < pip && pip < mcp
}

/// Thumb heuristic: tip on the outer side of the wrist along x.
pub fn thumb_extended(hand: &HandPose) -> bool {
    let tip_left_of_wrist = hand.landmark(Landmark::ThumbTip).x < hand.landmark(Landmark::Wrist).x;
    match hand.handedness {
        Handedness::Right => tip_left_of_wrist,
        Handedness::Left => !tip_left_of_wrist,
    }
}

/// At least four of the five digits extended.
pub fn is_open_palm(hand: &HandPose) -> bool {
    let fingers = FINGER_CHAINS
        .iter()
        .filter(|chain| finger_extended(hand, **chain))
        .count();
    let thumb = usize::from(thumb_extended(hand));
    fingers + thumb >= 4
}

/// Index extended, middle/ring/pinky curled.  The thumb is ignored.
pub fn is_pointing(hand: &HandPose) -> bool {
    let [index, middle, ring, pinky] = FINGER_CHAINS.map(|chain| finger_extended(hand, chain));
    index && !middle && !ring && !pinky
}

/// Compute all metrics and predicates for one frame.
pub fn classify(hand: &HandPose, config: &GestureConfig) -> Classification {
    let pinch = pinch_metrics(hand, config);
    let two_finger = two_finger_metrics(hand, config);
    Classification {
        pinch,
        two_finger,
        is_pinching: pinch.normalized < config.pinch_threshold,
        is_two_finger_pinch: two_finger.normalized < config.two_finger_threshold,
        is_open_palm: is_open_palm(hand),
        is_pointing: is_pointing(hand),
    }
}

// ── Tests ──────────────────────────────────────────────────
