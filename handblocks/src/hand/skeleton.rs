//! Skeletal hand joints and the hand-local normalization.
//!
//! The native tracking API reports 25 joints per hand in world space.  Gesture
//! thresholds are calibrated against hand-local geometry, so each frame is
//! re-expressed in an orthonormal basis anchored at the wrist:
//!
//! - Y: wrist → middle fingertip
//! - X: wrist → index knuckle, re-orthogonalized against Y
//! - Z: X × Y
//!
//! Moving or rotating the physical hand does not change the output.

use nalgebra::Vector3;
use tracing::debug;

use super::pose::{HandLandmark, HandPose, Handedness, Landmark, LANDMARK_COUNT};

// ── Joint definitions ──────────────────────────────────────

/// The 25 hand joints reported by the WebXR hand input module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrHandJoint {
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    PinkyMetacarpal,
    PinkyProximal,
    PinkyIntermediate,
    PinkyDistal,
    PinkyTip,
}

/// Total number of skeletal joints per hand.
pub const XR_JOINT_COUNT: usize = 25;

/// Skeletal joint feeding each canonical landmark, in landmark order.
/// The four finger metacarpals have no landmark counterpart.
pub const LANDMARK_JOINTS: [XrHandJoint; LANDMARK_COUNT] = [
    XrHandJoint::Wrist,
    XrHandJoint::ThumbMetacarpal,
    XrHandJoint::ThumbProximal,
    XrHandJoint::ThumbDistal,
    XrHandJoint::ThumbTip,
    XrHandJoint::IndexProximal,
    XrHandJoint::IndexIntermediate,
    XrHandJoint::IndexDistal,
    XrHandJoint::IndexTip,
    XrHandJoint::MiddleProximal,
    XrHandJoint::MiddleIntermediate,
    XrHandJoint::MiddleDistal,
    XrHandJoint::MiddleTip,
    XrHandJoint::RingProximal,
    XrHandJoint::RingIntermediate,
    XrHandJoint::RingDistal,
    XrHandJoint::RingTip,
    XrHandJoint::PinkyProximal,
    XrHandJoint::PinkyIntermediate,
    XrHandJoint::PinkyDistal,
    XrHandJoint::PinkyTip,
];

/// Joint names in enum order.
const JOINT_NAMES: [&str; XR_JOINT_COUNT] = [
    "wrist",
    "thumb-metacarpal", "thumb-phalanx-proximal", "thumb-phalanx-distal", "thumb-tip",
    "index-finger-metacarpal", "index-finger-phalanx-proximal", "index-finger-phalanx-intermediate",
    "index-finger-phalanx-distal", "index-finger-tip",
    "middle-finger-metacarpal", "middle-finger-phalanx-proximal", "middle-finger-phalanx-intermediate",
    "middle-finger-phalanx-distal", "middle-finger-tip",
    "ring-finger-metacarpal", "ring-finger-phalanx-proximal", "ring-finger-phalanx-intermediate",
    "ring-finger-phalanx-distal", "ring-finger-tip",
    "pinky-finger-metacarpal", "pinky-finger-phalanx-proximal", "pinky-finger-phalanx-intermediate",
    "pinky-finger-phalanx-distal", "pinky-finger-tip",
];

const ALL_JOINTS: [XrHandJoint; XR_JOINT_COUNT] = [
    XrHandJoint::Wrist,
    XrHandJoint::ThumbMetacarpal,
    XrHandJoint::ThumbProximal,
    XrHandJoint::ThumbDistal,
    XrHandJoint::ThumbTip,
    XrHandJoint::IndexMetacarpal,
    XrHandJoint::IndexProximal,
    XrHandJoint::IndexIntermediate,
    XrHandJoint::IndexDistal,
    XrHandJoint::IndexTip,
    XrHandJoint::MiddleMetacarpal,
    XrHandJoint::MiddleProximal,
    XrHandJoint::MiddleIntermediate,
    XrHandJoint::MiddleDistal,
    XrHandJoint::MiddleTip,
    XrHandJoint::RingMetacarpal,
    XrHandJoint::RingProximal,
    XrHandJoint::RingIntermediate,
    XrHandJoint::RingDistal,
    XrHandJoint::RingTip,
    XrHandJoint::PinkyMetacarpal,
    XrHandJoint::PinkyProximal,
    XrHandJoint::PinkyIntermediate,
    XrHandJoint::PinkyDistal,
    XrHandJoint::PinkyTip,
];

impl XrHandJoint {
    /// Convert joint enum to array index (0-24).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// WebXR joint name.
    pub fn as_str(&self) -> &'static str {
        JOINT_NAMES[self.index()]
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_JOINTS.get(index).copied()
    }

    /// Parse a WebXR joint name.
    pub fn parse(name: &str) -> Option<Self> {
        JOINT_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| ALL_JOINTS[i])
    }
}

// ── Skeleton ───────────────────────────────────────────────

/// World-space position of one joint, as polled this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XrJointPose {
    /// Position in meters (x, y, z).
    pub position: [f32; 3],
    /// Whether the runtime returned a pose for this joint.
    pub valid: bool,
}

impl XrJointPose {
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            valid: true,
        }
    }
}

/// Raw skeletal data for one hand.
#[derive(Debug, Clone)]
pub struct XrHandSkeleton {
    pub hand: Handedness,
    /// 25 joint poses indexed by `XrHandJoint`.
    pub joints: Vec<XrJointPose>,
    pub timestamp_ms: f64,
    /// False when the frame cannot report per-joint poses at all.
    pub joint_poses_supported: bool,
}

impl XrHandSkeleton {
    /// Create a skeleton with no valid joints.
    pub fn new(hand: Handedness, timestamp_ms: f64) -> Self {
        Self {
            hand,
            joints: vec![XrJointPose::default(); XR_JOINT_COUNT],
            timestamp_ms,
            joint_poses_supported: true,
        }
    }

    pub fn set_joint(&mut self, joint: XrHandJoint, position: [f32; 3]) {
        self.joints[joint.index()] = XrJointPose::new(position);
    }

    /// World position of a joint, if the runtime reported it.
    pub fn position(&self, joint: XrHandJoint) -> Option<Vector3<f32>> {
        let pose = self.joints.get(joint.index())?;
        pose.valid.then(|| Vector3::from(pose.position))
    }
}

// ── Hand-local basis ───────────────────────────────────────

/// Orthonormal right-handed basis anchored at the wrist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandBasis {
    pub origin: Vector3<f32>,
    pub x: Vector3<f32>,
    pub y: Vector3<f32>,
    pub z: Vector3<f32>,
}

impl HandBasis {
    /// Build the basis from wrist, index knuckle and middle fingertip.
    ///
    /// Degenerate axes fall back to fixed directions; the result is
    /// orthonormal for any input, including coincident or non-finite points.
    pub fn from_points(
        wrist: Vector3<f32>,
        index_base: Vector3<f32>,
        middle_tip: Vector3<f32>,
    ) -> Self {
        let y = unit_or(middle_tip - wrist, Vector3::y());
        let provisional_x = unit_or(index_base - wrist, Vector3::x());
        let z = unit_or(provisional_x.cross(&y), -Vector3::z());
        let x = unit_or(y.cross(&z), Vector3::x());
        // Only differs from the z above when z fell back parallel to y.
        let z = x.cross(&y);
        Self {
            origin: if is_finite(&wrist) { wrist } else { Vector3::zeros() },
            x,
            y,
            z,
        }
    }

    /// Express a world position in this basis.
    pub fn to_local(&self, world: &Vector3<f32>) -> HandLandmark {
        let relative = world - self.origin;
        HandLandmark::new(relative.dot(&self.x), relative.dot(&self.y), relative.dot(&self.z))
    }
}

fn is_finite(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Normalize `v`, or return `fallback` when `v` is zero-length or non-finite.
fn unit_or(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    const MIN_NORM_SQUARED: f32 = 1e-12;
    if !is_finite(&v) || v.norm_squared() <= MIN_NORM_SQUARED {
        return fallback;
    }
    v.normalize()
}

// ── Normalization ──────────────────────────────────────────

/// Why a skeletal frame produced no pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseRejection {
    MissingJoint(XrHandJoint),
    JointPosesUnsupported,
}

impl PoseRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingJoint(_) => "missing-joint",
            Self::JointPosesUnsupported => "joint-poses-unsupported",
        }
    }
}

/// Normalize a skeletal frame, reporting why it was rejected.
pub fn try_normalize(skeleton: &XrHandSkeleton) -> Result<HandPose, PoseRejection> {
    if !skeleton.joint_poses_supported {
        return Err(PoseRejection::JointPosesUnsupported);
    }

    let mut world = [Vector3::zeros(); LANDMARK_COUNT];
    for (slot, joint) in world.iter_mut().zip(LANDMARK_JOINTS) {
        *slot = skeleton
            .position(joint)
            .ok_or(PoseRejection::MissingJoint(joint))?;
    }

    let basis = HandBasis::from_points(
        world[Landmark::Wrist.index()],
        world[Landmark::IndexMcp.index()],
        world[Landmark::MiddleTip.index()],
    );
    let landmarks = world.map(|p| basis.to_local(&p));

    Ok(HandPose::new(skeleton.hand, landmarks, skeleton.timestamp_ms, 1, 1))
}

/// Normalize a skeletal frame; `None` means "hand not tracked this frame".
pub fn normalize(skeleton: &XrHandSkeleton) -> Option<HandPose> {
    match try_normalize(skeleton) {
        Ok(pose) => Some(pose),
        Err(PoseRejection::MissingJoint(joint)) => {
            debug!("Skeletal pose dropped: {} missing on {:?}", joint.as_str(), skeleton.hand);
            None
        }
        Err(reason) => {
            debug!("Skeletal pose dropped: {}", reason.as_str());
            None
        }
    }
}

// ── Source variants ────────────────────────────────────────

/// The tracking sources a hand frame can come from.
#[derive(Debug, Clone)]
pub enum HandSource {
    /// Camera-estimator landmarks already in normalized image space.
    Landmarks(HandPose),
    /// Native skeletal joints in world space.
    Skeletal(XrHandSkeleton),
}

impl HandSource {
    /// Convert to the canonical pose.  Landmarks pass through unchanged.
    pub fn into_pose(self) -> Option<HandPose> {
        match self {
            Self::Landmarks(pose) => Some(pose),
            Self::Skeletal(skeleton) => normalize(&skeleton),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landmarks(_) => "camera",
            Self::Skeletal(_) => "skeletal",
        }
    }
}

// ── Test helpers ───────────────────────────────────────────

/// A plausible right hand in meters, palm facing -Z, fingers along +Y.
#[cfg(test)]
pub(crate) fn test_skeleton(timestamp_ms: f64) -> XrHandSkeleton {
    let mut skel = XrHandSkeleton::new(Handedness::Right, timestamp_ms);
    skel.set_joint(XrHandJoint::Wrist, [0.0, 0.0, 0.0]);
    skel.set_joint(XrHandJoint::ThumbMetacarpal, [-0.025, 0.02, -0.01]);
    skel.set_joint(XrHandJoint::ThumbProximal, [-0.04, 0.04, -0.015]);
    skel.set_joint(XrHandJoint::ThumbDistal, [-0.05, 0.06, -0.02]);
    skel.set_joint(XrHandJoint::ThumbTip, [-0.06, 0.075, -0.02]);
    let fingers = [
        (XrHandJoint::IndexMetacarpal, -0.02_f32),
        (XrHandJoint::MiddleMetacarpal, 0.0),
        (XrHandJoint::RingMetacarpal, 0.018),
        (XrHandJoint::PinkyMetacarpal, 0.034),
    ];
    for (metacarpal, x) in fingers {
        let base = metacarpal.index();
        for step in 0..5 {
            let joint = ALL_JOINTS[base + step];
            let y = 0.03 + step as f32 * 0.025;
            skel.set_joint(joint, [x, y, 0.0]);
        }
    }
    skel
}

#[cfg(test)]
fn assert_orthonormal(basis: &HandBasis) {
    for axis in [basis.x, basis.y, basis.z] {
        assert!((axis.norm() - 1.0).abs() < 1e-4, "axis not unit: {:?}", axis);
    }
    assert!(basis.x.dot(&basis.y).abs() < 1e-4);
    assert!(basis.y.dot(&basis.z).abs() < 1e-4);
    assert!(basis.z.dot(&basis.x).abs() < 1e-4);
    assert!((basis.x.cross(&basis.y) - basis.z).norm() < 1e-4, "not right-handed");
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};

    #[test]
    fn test_joint_names_round_trip() {
        for joint in ALL_JOINTS {
            assert_eq!(XrHandJoint::parse(joint.as_str()), Some(joint));
        }
        assert_eq!(XrHandJoint::parse("palm"), None);
        assert_eq!(XrHandJoint::PinkyTip.index(), 24);
    }

    #[test]
    fn test_landmark_joint_mapping() {
        assert_eq!(LANDMARK_JOINTS[Landmark::Wrist.index()], XrHandJoint::Wrist);
        assert_eq!(LANDMARK_JOINTS[Landmark::IndexMcp.index()], XrHandJoint::IndexProximal);
        assert_eq!(LANDMARK_JOINTS[Landmark::MiddleTip.index()], XrHandJoint::MiddleTip);
        assert!(!LANDMARK_JOINTS.contains(&XrHandJoint::IndexMetacarpal));
    }

    #[test]
    fn test_basis_orthonormal_for_regular_hand() {
        let basis = HandBasis::from_points(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(-0.02, 0.03, 0.01),
            Vector3::new(0.0, 0.13, 0.0),
        );
        assert_orthonormal(&basis);
        assert!((basis.y - Vector3::y()).norm() < 1e-5);
    }

    #[test]
    fn test_basis_orthonormal_for_degenerate_inputs() {
        let p = Vector3::new(0.3, 1.2, -0.4);
        let nan = Vector3::new(f32::NAN, 0.0, 0.0);
        let cases = [
            // Every point coincident.
            (p, p, p),
            // Index base parallel to middle tip direction.
            (p, p + Vector3::new(0.0, 0.05, 0.0), p + Vector3::new(0.0, 0.1, 0.0)),
            // Y along world Z while X collapses: Z fallback is parallel to Y.
            (p, p + Vector3::new(0.0, 0.0, 0.05), p + Vector3::new(0.0, 0.0, 0.1)),
            (p, p + Vector3::new(0.0, 0.0, -0.05), p + Vector3::new(0.0, 0.0, -0.1)),
            // Non-finite input.
            (p, nan, p + Vector3::new(0.0, 0.1, 0.0)),
            (nan, nan, nan),
        ];
        for (wrist, index_base, middle_tip) in cases {
            let basis = HandBasis::from_points(wrist, index_base, middle_tip);
            assert_orthonormal(&basis);
        }
    }

    #[test]
    fn test_normalize_wrist_is_origin() {
        let pose = normalize(&test_skeleton(10.0)).expect("complete skeleton");
        let wrist = pose.landmark(Landmark::Wrist);
        assert!(wrist.x.abs() < 1e-6 && wrist.y.abs() < 1e-6 && wrist.z.abs() < 1e-6);
        assert_eq!(pose.handedness, Handedness::Right);
        assert_eq!(pose.timestamp_ms, 10.0);
        assert_eq!((pose.image_width, pose.image_height), (1, 1));

        // Middle tip lies on the local +Y axis.
        let tip = pose.landmark(Landmark::MiddleTip);
        assert!(tip.x.abs() < 1e-5 && tip.z.abs() < 1e-5);
        assert!(tip.y > 0.1);
    }

    #[test]
    fn test_normalize_is_frame_invariant() {
        let skel = test_skeleton(0.0);
        let reference = normalize(&skel).expect("complete skeleton");

        let iso = Isometry3::from_parts(
            Translation3::new(1.5, -0.3, 2.0),
            UnitQuaternion::from_euler_angles(0.4, -1.1, 2.3),
        );
        let mut moved = skel.clone();
        for joint in moved.joints.iter_mut() {
            let p = iso * Point3::from(joint.position);
            joint.position = [p.x, p.y, p.z];
        }
        let transformed = normalize(&moved).expect("complete skeleton");

        for (a, b) in reference.landmarks.iter().zip(transformed.landmarks.iter()) {
            assert!(a.distance(b) < 1e-4, "landmark moved: {:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_missing_joint_rejects_pose() {
        let mut skel = test_skeleton(0.0);
        skel.joints[XrHandJoint::RingTip.index()].valid = false;
        assert_eq!(
            try_normalize(&skel),
            Err(PoseRejection::MissingJoint(XrHandJoint::RingTip))
        );
        assert!(normalize(&skel).is_none());
    }

    #[test]
    fn test_missing_metacarpal_is_tolerated() {
        let mut skel = test_skeleton(0.0);
        skel.joints[XrHandJoint::MiddleMetacarpal.index()].valid = false;
        assert!(normalize(&skel).is_some());
    }

    #[test]
    fn test_short_joint_list_rejects_pose() {
        let mut skel = test_skeleton(0.0);
        skel.joints.truncate(10);
        assert!(matches!(try_normalize(&skel), Err(PoseRejection::MissingJoint(_))));
    }

    #[test]
    fn test_unsupported_frame_rejects_pose() {
        let mut skel = test_skeleton(0.0);
        skel.joint_poses_supported = false;
        assert_eq!(try_normalize(&skel), Err(PoseRejection::JointPosesUnsupported));
    }

    #[test]
    fn test_source_landmarks_pass_through() {
        let pose = super::super::pose::fixtures::open_hand(Handedness::Left, 3.0);
        let out = HandSource::Landmarks(pose.clone()).into_pose();
        assert_eq!(out, Some(pose));
    }

    #[test]
    fn test_source_skeletal_normalizes() {
        let src = HandSource::Skeletal(test_skeleton(0.0));
        assert_eq!(src.as_str(), "skeletal");
        assert!(src.into_pose().is_some());
    }
}
