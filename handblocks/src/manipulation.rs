//! Block manipulation driven by gesture frames.
//!
//! `ManipulationController` turns each `GestureFrameState` into a list of
//! commands against the selected block:
//!
//! | Input | Command |
//! |---|---|
//! | pinch-start | `Grab` the target, or `Spawn` at the reticle |
//! | pinch-end | `Release` |
//! | open-palm | `DeleteSelected` |
//! | tap | `CycleMaterial` |
//! | pinching while grabbed | `Move` toward the projected index tip |
//! | pointing | `Rotate` toward the wrist→tip direction |
//! | two-finger pinch | `Scale` relative to the pinch-start spread |
//!
//! `Selection` applies the commands to the selected block.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use tracing::debug;

use crate::hand::engine::{GestureEventKind, GestureFrameState};
use crate::hand::pose::Landmark;
use crate::ipc::sexp::format_vector;
use crate::space::{hand_direction, landmark_to_world, PerspectiveCamera};

// ── Config ─────────────────────────────────────────────────

/// Manipulation smoothing and scale limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ManipulationConfig {
    /// Fraction of the remaining distance covered per move command.
    pub move_lerp: f32,
    /// Slerp factor per rotate command.
    pub rotate_slerp: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            move_lerp: 0.3,
            rotate_slerp: 0.25,
            min_scale: 0.3,
            max_scale: 3.0,
        }
    }
}

// ── Transforms ─────────────────────────────────────────────

/// Position and orientation, used for the reticle and spawn points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockPose {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
}

impl BlockPose {
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// World transform of a block with uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTransform {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub scale: f32,
}

impl BlockTransform {
    pub fn from_pose(pose: BlockPose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
            scale: 1.0,
        }
    }

    /// Step `factor` of the way toward the target position and orientation.
    pub fn moved_toward(
        &self,
        position: &Vector3<f32>,
        orientation: &UnitQuaternion<f32>,
        factor: f32,
    ) -> Self {
        Self {
            position: self.position.lerp(position, factor),
            orientation: slerp_toward(&self.orientation, orientation, factor),
            scale: self.scale,
        }
    }

    /// Turn so local +Z heads along `direction`, by `factor`.
    pub fn rotated_toward(&self, direction: &Unit<Vector3<f32>>, factor: f32) -> Self {
        let up = if direction.cross(&Vector3::y()).norm_squared() < 1e-12 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let target = UnitQuaternion::face_towards(direction.as_ref(), &up);
        Self {
            orientation: slerp_toward(&self.orientation, &target, factor),
            ..*self
        }
    }

    pub fn scaled_to(&self, scale: f32, min: f32, max: f32) -> Self {
        Self {
            scale: scale.clamp(min, max),
            ..*self
        }
    }
}

/// Shortest-path slerp; nearly identical rotations snap to the target.
fn slerp_toward(from: &UnitQuaternion<f32>, to: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    from.try_slerp(to, t, 1e-6).unwrap_or(*to)
}

// ── Scale session ──────────────────────────────────────────

/// Baseline captured when a two-finger pinch starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSession {
    pub base_scale: f32,
    pub base_normalized: f32,
}

impl Default for ScaleSession {
    fn default() -> Self {
        Self {
            base_scale: 1.0,
            base_normalized: 1.0,
        }
    }
}

impl ScaleSession {
    pub fn begin(base_scale: f32, normalized: f32) -> Self {
        Self {
            base_scale,
            base_normalized: normalized.max(0.01),
        }
    }

    /// Scale proportional to the current index-middle spread.
    pub fn scale_for(&self, normalized: f32) -> f32 {
        self.base_scale * normalized.max(0.01) / self.base_normalized.max(0.01)
    }
}

// ── Commands ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ManipulationCommand {
    /// Take hold of the current target.
    Grab,
    /// Create a block at `pose` and hold it.
    Spawn { pose: BlockPose },
    Release,
    DeleteSelected,
    CycleMaterial,
    /// Move toward a world position (smoothed when applied).
    Move {
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    },
    Rotate { direction: Unit<Vector3<f32>> },
    /// Absolute uniform scale, already clamped.
    Scale(f32),
}

impl ManipulationCommand {
    pub fn to_sexp(&self) -> String {
        match self {
            Self::Grab => "(:grab)".to_string(),
            Self::Spawn { pose } => format!("(:spawn :position {})", format_vector(&pose.position)),
            Self::Release => "(:release)".to_string(),
            Self::DeleteSelected => "(:delete)".to_string(),
            Self::CycleMaterial => "(:cycle-material)".to_string(),
            Self::Move { position, .. } => format!("(:move :position {})", format_vector(position)),
            Self::Rotate { direction } => {
                format!("(:rotate :direction {})", format_vector(direction))
            }
            Self::Scale(scale) => format!("(:scale {:.3})", scale),
        }
    }
}

// ── Controller ─────────────────────────────────────────────

/// Scene context for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ManipulationView<'a> {
    pub camera: &'a PerspectiveCamera,
    pub plane_height: f32,
    /// Reticle pose on the detected surface, if one is visible.
    pub reticle: Option<BlockPose>,
    /// Currently selected block.
    pub target: Option<&'a BlockTransform>,
}

/// Maps gesture frames to block commands.
#[derive(Debug, Clone, Default)]
pub struct ManipulationController {
    pub config: ManipulationConfig,
    grabbing: bool,
    scale_session: ScaleSession,
}

impl ManipulationController {
    pub fn new(config: ManipulationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    pub fn scale_session(&self) -> ScaleSession {
        self.scale_session
    }

    /// Events first, then continuous manipulation for the frame.
    pub fn process(
        &mut self,
        frame: &GestureFrameState,
        view: &ManipulationView<'_>,
    ) -> Vec<ManipulationCommand> {
        let mut commands = Vec::new();

        let Some(hand) = frame.hand.as_ref() else {
            if self.grabbing {
                debug!("Hand lost while grabbing, releasing");
                commands.push(ManipulationCommand::Release);
            }
            self.grabbing = false;
            self.scale_session = ScaleSession::default();
            return commands;
        };

        // Spawning makes the new block the target for the rest of the frame.
        let mut target = view.target.copied();

        for event in &frame.events {
            match event.kind {
                GestureEventKind::PinchStart => {
                    if target.is_some() {
                        debug!("Grabbing selected block");
                        self.grabbing = true;
                        commands.push(ManipulationCommand::Grab);
                    } else if let Some(pose) = view.reticle {
                        debug!("Spawning block at reticle");
                        self.grabbing = true;
                        target = Some(BlockTransform::from_pose(pose));
                        commands.push(ManipulationCommand::Spawn { pose });
                    }
                }
                GestureEventKind::PinchEnd => {
                    if self.grabbing {
                        commands.push(ManipulationCommand::Release);
                    }
                    self.grabbing = false;
                }
                GestureEventKind::OpenPalm => {
                    self.grabbing = false;
                    commands.push(ManipulationCommand::DeleteSelected);
                    target = None;
                }
                GestureEventKind::Tap => commands.push(ManipulationCommand::CycleMaterial),
                GestureEventKind::TwoFingerPinchStart => {
                    if let Some(t) = &target {
                        self.scale_session = ScaleSession::begin(t.scale, frame.two_finger_normalized);
                        debug!(
                            "Scale session base={:.3} spread={:.3}",
                            self.scale_session.base_scale, self.scale_session.base_normalized
                        );
                    }
                }
                GestureEventKind::TwoFingerPinchEnd => self.scale_session = ScaleSession::default(),
                GestureEventKind::PointStart | GestureEventKind::PointEnd => {}
            }
        }

        let Some(target) = target else {
            return commands;
        };

        if frame.is_pinching && self.grabbing {
            let tip = hand.landmark(Landmark::IndexTip);
            if let Some(position) =
                landmark_to_world(tip, view.camera, view.plane_height, Some(target.position))
            {
                let orientation = view.reticle.map_or(target.orientation, |r| r.orientation);
                commands.push(ManipulationCommand::Move {
                    position,
                    orientation,
                });
            }
        }

        if frame.is_pointing {
            if let Some(direction) = hand_direction(hand, view.camera, view.plane_height) {
                commands.push(ManipulationCommand::Rotate { direction });
            }
        }

        // Scaling applies only to the held block.
        if frame.is_two_finger_pinch && self.grabbing {
            let scale = self
                .scale_session
                .scale_for(frame.two_finger_normalized)
                .clamp(self.config.min_scale, self.config.max_scale);
            commands.push(ManipulationCommand::Scale(scale));
        }

        commands
    }

    pub fn reset(&mut self) {
        self.grabbing = false;
        self.scale_session = ScaleSession::default();
    }
}

// ── Selection ──────────────────────────────────────────────

/// Block surface materials, cycled by tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMaterial {
    #[default]
    Metal,
    Wood,
    Glass,
    Plastic,
}

impl BlockMaterial {
    pub fn next(self) -> Self {
        match self {
            Self::Metal => Self::Wood,
            Self::Wood => Self::Glass,
            Self::Glass => Self::Plastic,
            Self::Plastic => Self::Metal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::Wood => "wood",
            Self::Glass => "glass",
            Self::Plastic => "plastic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedBlock {
    pub transform: BlockTransform,
    pub material: BlockMaterial,
}

/// The selected block plus the material the next spawn will use.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub block: Option<SelectedBlock>,
    pub material: BlockMaterial,
}

impl Selection {
    pub fn transform(&self) -> Option<&BlockTransform> {
        self.block.as_ref().map(|b| &b.transform)
    }

    pub fn apply(&mut self, command: &ManipulationCommand, config: &ManipulationConfig) {
        match command {
            ManipulationCommand::Spawn { pose } => {
                self.block = Some(SelectedBlock {
                    transform: BlockTransform::from_pose(*pose),
                    material: self.material,
                });
            }
            ManipulationCommand::DeleteSelected => self.block = None,
            ManipulationCommand::CycleMaterial => match &mut self.block {
                Some(block) => {
                    block.material = block.material.next();
                    self.material = block.material;
                }
                None => self.material = self.material.next(),
            },
            ManipulationCommand::Move {
                position,
                orientation,
            } => {
                if let Some(block) = &mut self.block {
                    block.transform = block.transform.moved_toward(position, orientation, config.move_lerp);
                }
            }
            ManipulationCommand::Rotate { direction } => {
                if let Some(block) = &mut self.block {
                    block.transform = block.transform.rotated_toward(direction, config.rotate_slerp);
                }
            }
            ManipulationCommand::Scale(scale) => {
                if let Some(block) = &mut self.block {
                    block.transform = block.transform.scaled_to(*scale, config.min_scale, config.max_scale);
                }
            }
            ManipulationCommand::Grab | ManipulationCommand::Release => {}
        }
    }

    pub fn status_sexp(&self) -> String {
        match &self.block {
            Some(block) => format!(
                "(:material :{} :position {} :scale {:.3})",
                block.material.as_str(),
                format_vector(&block.transform.position),
                block.transform.scale,
            ),
            None => format!("(:material :{} :position nil)", self.material.as_str()),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
