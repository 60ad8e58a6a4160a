//! Image-space landmarks to world positions.
//!
//! A single ray–plane intersection against the detected surface height.
//! Real-world occlusion is ignored; the result only follows the plane, which
//! keeps manipulation stable from frame to frame.

use nalgebra::{Point3, Unit, Vector3};
use tracing::trace;

use super::camera::PerspectiveCamera;
use crate::hand::pose::{HandLandmark, HandPose, Landmark};

/// Rays with a smaller vertical component are treated as parallel to the plane.
pub const PARALLEL_EPSILON: f32 = 1e-5;

/// NDC depth used for unprojection; only the direction matters.
const UNPROJECT_DEPTH: f32 = 0.5;

/// World-space ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Ray from the camera through a normalized image position, or `None`
    /// when the camera lens cannot unproject.
    pub fn through_landmark(camera: &PerspectiveCamera, landmark: &HandLandmark) -> Option<Self> {
        let ndc = Point3::new(landmark.x * 2.0 - 1.0, 1.0 - landmark.y * 2.0, UNPROJECT_DEPTH);
        let point = camera.unproject(ndc)?;
        Some(Self {
            origin: camera.position,
            direction: (point - camera.position).normalize(),
        })
    }

    /// Intersection with `y = height`, or `None` when the ray runs parallel
    /// to the plane or points away from it.
    pub fn intersect_horizontal(&self, height: f32) -> Option<Vector3<f32>> {
        if self.direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        Some(self.origin + self.direction * t)
    }
}

/// Project a landmark onto the horizontal plane at `plane_height`.
///
/// Degenerate rays return `fallback` when one is given.
pub fn landmark_to_world(
    landmark: &HandLandmark,
    camera: &PerspectiveCamera,
    plane_height: f32,
    fallback: Option<Vector3<f32>>,
) -> Option<Vector3<f32>> {
    let Some(ray) = Ray::through_landmark(camera, landmark) else {
        trace!("Camera lens cannot unproject; using fallback");
        return fallback;
    };
    match ray.intersect_horizontal(plane_height) {
        Some(hit) => Some(hit),
        None => {
            trace!(
                "Degenerate projection ray dir=({:.3}, {:.3}, {:.3})",
                ray.direction.x,
                ray.direction.y,
                ray.direction.z
            );
            fallback
        }
    }
}

/// Unit wrist→index-tip direction on the plane, used as an orientation signal.
pub fn hand_direction(
    hand: &HandPose,
    camera: &PerspectiveCamera,
    plane_height: f32,
) -> Option<Unit<Vector3<f32>>> {
    let wrist = landmark_to_world(hand.landmark(Landmark::Wrist), camera, plane_height, None)?;
    let tip = landmark_to_world(hand.landmark(Landmark::IndexTip), camera, plane_height, None)?;
    Unit::try_new(tip - wrist, 0.0)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::pose::{Handedness, LANDMARK_COUNT};
    use nalgebra::UnitQuaternion;
    use std::f32::consts::FRAC_PI_2;

    /// One unit above the floor, looking straight down, 90° square lens.
    fn overhead() -> PerspectiveCamera {
        PerspectiveCamera::new(
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
            90.0,
            1.0,
        )
    }

    fn level() -> PerspectiveCamera {
        PerspectiveCamera::new(Vector3::new(0.0, 1.0, 0.0), UnitQuaternion::identity(), 90.0, 1.0)
    }

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).norm() < 1e-3
    }

    #[test]
    fn test_center_hits_below_camera() {
        let hit = landmark_to_world(&HandLandmark::new(0.5, 0.5, 0.0), &overhead(), 0.0, None)
            .expect("hit");
        assert!(close(hit, Vector3::zeros()), "got {:?}", hit);
    }

    #[test]
    fn test_offset_landmark() {
        let camera = overhead();
        let right = landmark_to_world(&HandLandmark::new(0.75, 0.5, 0.0), &camera, 0.0, None).expect("hit");
        assert!(close(right, Vector3::new(0.5, 0.0, 0.0)), "got {:?}", right);

        // Image top maps to world -Z for this camera.
        let up = landmark_to_world(&HandLandmark::new(0.5, 0.25, 0.0), &camera, 0.0, None).expect("hit");
        assert!(close(up, Vector3::new(0.0, 0.0, -0.5)), "got {:?}", up);
    }

    #[test]
    fn test_result_lies_on_plane() {
        let camera = PerspectiveCamera::look_at(
            Vector3::new(0.3, 1.6, 1.2),
            Vector3::new(0.0, 0.2, 0.0),
            Vector3::y(),
        );
        let hit = landmark_to_world(&HandLandmark::new(0.4, 0.6, 0.0), &camera, 0.2, None).expect("hit");
        assert!((hit.y - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_parallel_ray() {
        let center = HandLandmark::new(0.5, 0.5, 0.0);
        assert!(landmark_to_world(&center, &level(), 0.0, None).is_none());

        let fallback = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(landmark_to_world(&center, &level(), 0.0, Some(fallback)), Some(fallback));
    }

    #[test]
    fn test_plane_behind_ray() {
        // Looking straight up with the plane below.
        let camera = PerspectiveCamera::new(
            Vector3::new(0.0, 1.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            90.0,
            1.0,
        );
        let center = HandLandmark::new(0.5, 0.5, 0.0);
        assert!(landmark_to_world(&center, &camera, 0.0, None).is_none());
        assert_eq!(
            landmark_to_world(&center, &camera, 0.0, Some(Vector3::x())),
            Some(Vector3::x())
        );
    }

    #[test]
    fn test_degenerate_lens_uses_fallback() {
        let camera = overhead().with_lens(90.0, 1e-9);
        let center = HandLandmark::new(0.5, 0.5, 0.0);
        assert!(Ray::through_landmark(&camera, &center).is_none());
        assert!(landmark_to_world(&center, &camera, 0.0, None).is_none());
        assert_eq!(
            landmark_to_world(&center, &camera, 0.0, Some(Vector3::z())),
            Some(Vector3::z())
        );
    }

    fn hand_with(wrist: HandLandmark, tip: HandLandmark) -> HandPose {
        let mut landmarks = [HandLandmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        landmarks[Landmark::Wrist.index()] = wrist;
        landmarks[Landmark::IndexTip.index()] = tip;
        HandPose::new(Handedness::Right, landmarks, 0.0, 640, 480)
    }

    #[test]
    fn test_hand_direction() {
        let hand = hand_with(HandLandmark::new(0.5, 0.5, 0.0), HandLandmark::new(0.75, 0.5, 0.0));
        let dir = hand_direction(&hand, &overhead(), 0.0).expect("direction");
        assert!(close(dir.into_inner(), Vector3::x()), "got {:?}", dir);
    }

    #[test]
    fn test_hand_direction_degenerate() {
        let same = HandLandmark::new(0.6, 0.4, 0.0);
        assert!(hand_direction(&hand_with(same, same), &overhead(), 0.0).is_none());

        let hand = hand_with(HandLandmark::new(0.5, 0.5, 0.0), HandLandmark::new(0.75, 0.5, 0.0));
        assert!(hand_direction(&hand, &level(), 0.0).is_none());
    }
}
