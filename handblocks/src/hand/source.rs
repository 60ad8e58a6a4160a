//! Per-frame source arbitration.
//!
//! The camera estimator delivers results through a callback at its own rate;
//! skeletal hands are polled inside the frame callback.  Each frame resolves
//! to "latest pose, or none": skeletal tracking wins when it produces a pose,
//! otherwise the most recent camera result is used.

use tracing::debug;

use super::pose::HandPose;
use super::skeleton::{normalize, XrHandSkeleton};

/// Which source supplied the resolved pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource {
    None,
    Camera,
    Skeletal,
}

impl ActiveSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Camera => "camera",
            Self::Skeletal => "skeletal",
        }
    }
}

/// Latest inputs from both tracking sources.
#[derive(Debug, Clone)]
pub struct HandInputs {
    /// Most recent camera-estimator pose, if the last inference found a hand.
    camera: Option<HandPose>,
    /// Source of the last resolved pose.
    active: ActiveSource,
}

impl Default for HandInputs {
    fn default() -> Self {
        Self::new()
    }
}

impl HandInputs {
    pub fn new() -> Self {
        Self {
            camera: None,
            active: ActiveSource::None,
        }
    }

    /// Estimator callback: zero or one candidates per inference.
    /// No candidates means the hand was lost.
    pub fn on_camera_results(&mut self, candidates: Vec<HandPose>) {
        if candidates.len() > 1 {
            debug!("Camera estimator returned {} hands; using the first", candidates.len());
        }
        self.camera = candidates.into_iter().next();
    }

    pub fn camera_pose(&self) -> Option<&HandPose> {
        self.camera.as_ref()
    }

    /// Resolve this frame's pose from the polled skeletal hands, falling back
    /// to the latest camera result.
    pub fn resolve(&mut self, skeletons: &[XrHandSkeleton]) -> Option<HandPose> {
        if let Some(pose) = skeletons.iter().find_map(normalize) {
            self.active = ActiveSource::Skeletal;
            return Some(pose);
        }
        match &self.camera {
            Some(pose) => {
                self.active = ActiveSource::Camera;
                Some(pose.clone())
            }
            None => {
                self.active = ActiveSource::None;
                None
            }
        }
    }

    pub fn active(&self) -> ActiveSource {
        self.active
    }

    /// Drop everything (tracking stopped).
    pub fn reset(&mut self) {
        self.camera = None;
        self.active = ActiveSource::None;
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:source :{} :camera-pose {})",
            self.active.as_str(),
            if self.camera.is_some() { "t" } else { "nil" },
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
