//! Camera model and image-to-world projection.

pub mod camera;
pub mod projector;

pub use camera::PerspectiveCamera;
pub use projector::{hand_direction, landmark_to_world, Ray};
