//! Perspective camera with NDC unprojection.
//!
//! View space follows the usual GL convention: the camera looks down its
//! local -Z with +Y up, NDC x/y/z in [-1, 1].

use nalgebra::{Perspective3, Point3, UnitQuaternion, Vector3};

/// Camera pose and lens for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// World position.
    pub position: Vector3<f32>,
    /// World orientation.
    pub orientation: UnitQuaternion<f32>,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    /// Width / height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            fov_y_deg: 70.0,
            aspect: 1.0,
            near: 0.01,
            far: 20.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>, fov_y_deg: f32, aspect: f32) -> Self {
        Self {
            position,
            orientation,
            fov_y_deg,
            aspect,
            ..Self::default()
        }
    }

    /// Camera at `position` looking at `target`.
    ///
    /// When `up` is parallel to the viewing direction, world -Z is used as
    /// up instead.
    pub fn look_at(position: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Self {
        let back = position - target;
        let up = if back.cross(&up).norm_squared() < 1e-12 {
            -Vector3::z()
        } else {
            up
        };
        // face_towards maps local +Z onto `back`, so local -Z faces the target.
        let orientation = UnitQuaternion::face_towards(&back, &up);
        Self {
            position,
            orientation,
            ..Self::default()
        }
    }

    pub fn with_lens(mut self, fov_y_deg: f32, aspect: f32) -> Self {
        self.fov_y_deg = fov_y_deg;
        self.aspect = aspect;
        self
    }

    /// Whether the lens describes a usable frustum: a field of view strictly
    /// between 0 and 180 degrees, a non-zero aspect, and distinct clip planes
    /// in front of the camera.
    pub fn has_valid_lens(&self) -> bool {
        let finite = [self.fov_y_deg, self.aspect, self.near, self.far]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.fov_y_deg > 0.0
            && self.fov_y_deg < 180.0
            && self.aspect > f32::EPSILON
            && self.near > 0.0
            && self.far - self.near > f32::EPSILON
    }

    /// `None` for a degenerate lens.
    pub fn projection(&self) -> Option<Perspective3<f32>> {
        self.has_valid_lens().then(|| {
            Perspective3::new(self.aspect, self.fov_y_deg.to_radians(), self.near, self.far)
        })
    }

    /// World-space point for a normalized device coordinate.
    pub fn unproject(&self, ndc: Point3<f32>) -> Option<Vector3<f32>> {
        let view = self.projection()?.unproject_point(&ndc);
        Some(self.orientation * view.coords + self.position)
    }

    /// Unit viewing direction in world space.
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * -Vector3::z()
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_camera_looks_down_negative_z() {
        let camera = PerspectiveCamera::default();
        assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-6);

        let p = camera.unproject(Point3::new(0.0, 0.0, 0.5)).expect("valid lens");
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!(p.z < 0.0);
    }

    #[test]
    fn test_look_at_forward() {
        let camera = PerspectiveCamera::look_at(
            Vector3::new(0.0, 1.6, 2.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::y(),
        );
        let expected = Vector3::new(0.0, -1.6, -2.0).normalize();
        assert!((camera.forward() - expected).norm() < 1e-5);
    }

    #[test]
    fn test_look_at_straight_down() {
        let camera = PerspectiveCamera::look_at(Vector3::new(0.0, 1.0, 0.0), Vector3::zeros(), Vector3::y());
        assert!((camera.forward() - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-5);
        assert!(camera.orientation.coords.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_unproject_edge_matches_fov() {
        let camera = PerspectiveCamera::default().with_lens(90.0, 1.0);
        let p = camera.unproject(Point3::new(1.0, 0.0, 0.5)).expect("valid lens");
        // At 90° and aspect 1 the right edge lies at 45° from forward.
        assert!((p.x / -p.z - 1.0).abs() < 1e-4, "got {:?}", p);
    }

    #[test]
    fn test_degenerate_lens_does_not_project() {
        let tiny_aspect = PerspectiveCamera::default().with_lens(90.0, 1e-9);
        assert!(!tiny_aspect.has_valid_lens());
        assert!(tiny_aspect.unproject(Point3::new(0.0, 0.0, 0.5)).is_none());

        let mut flat = PerspectiveCamera::default();
        flat.far = flat.near;
        assert!(flat.projection().is_none());

        for fov in [0.0, 180.0, f32::NAN] {
            assert!(!PerspectiveCamera::default().with_lens(fov, 1.0).has_valid_lens());
        }
        assert!(PerspectiveCamera::default().has_valid_lens());
    }
}
