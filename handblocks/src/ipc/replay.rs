//! Scripted replay: drive the full pipeline from s-expression messages.
//!
//! One message per line, `;` starts a comment.  Scene messages (camera,
//! plane, reticle, target) update the view; frame messages (landmarks,
//! skeleton, lost) advance the gesture engine and the manipulation
//! controller and answer with a `:frame` report.

use lexpr::Value;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

use super::sexp::{
    as_floats, as_vector3, error_response, format_vector, get_bool, get_float, get_int, get_keyword,
    get_string, get_value, get_vector3, list_items, ok_response, sexp_bool,
};
use crate::config::EngineConfig;
use crate::hand::engine::GestureEngine;
use crate::hand::pose::{HandLandmark, HandPose, Handedness};
use crate::hand::skeleton::{HandSource, XrHandJoint, XrHandSkeleton};
use crate::hand::source::HandInputs;
use crate::manipulation::{
    BlockPose, BlockTransform, ManipulationCommand, ManipulationController, ManipulationView,
    SelectedBlock, Selection,
};
use crate::space::PerspectiveCamera;

/// Camera-estimator frames carry the source image size; scripts may omit it.
const DEFAULT_IMAGE_SIZE: (u32, u32) = (640, 480);

/// Replay state: one engine, one scene, one selected block.
pub struct ReplaySession {
    config: EngineConfig,
    engine: GestureEngine,
    inputs: HandInputs,
    controller: ManipulationController,
    selection: Selection,
    camera: PerspectiveCamera,
    plane_height: f32,
    reticle: Option<BlockPose>,
    /// Tracking switch, independent of the config `enabled` flag.
    tracking: bool,
    frames: u64,
}

impl Default for ReplaySession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ReplaySession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: GestureEngine::with_config(config.gesture.clone()),
            controller: ManipulationController::new(config.manipulation.clone()),
            config,
            inputs: HandInputs::new(),
            selection: Selection::default(),
            camera: PerspectiveCamera::look_at(
                Vector3::new(0.0, 1.6, 0.0),
                Vector3::new(0.0, 0.0, -1.0),
                Vector3::y(),
            ),
            plane_height: 0.0,
            reticle: None,
            tracking: true,
            frames: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run every message in a script, collecting the responses.
    pub fn run_script(&mut self, script: &str) -> Vec<String> {
        script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
            .filter_map(|line| self.handle_message(line))
            .collect()
    }

    /// Parse one message and dispatch it.
    pub fn handle_message(&mut self, raw: &str) -> Option<String> {
        let value = match lexpr::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("malformed s-expression: {}", e);
                return Some(error_response(0, &format!("malformed s-expression: {e}")));
            }
        };

        let msg_type = get_keyword(&value, "type");
        let msg_id = get_int(&value, "id").unwrap_or(0);
        debug!(msg_id, "replay message {:?}", msg_type);

        let result = match msg_type.as_deref() {
            Some("config") => self.handle_config(&value),
            Some("enable") => self.handle_enable(&value),
            Some("camera") => self.handle_camera(&value),
            Some("plane") => self.handle_plane(&value),
            Some("reticle") => self.handle_reticle(&value),
            Some("target") => self.handle_target(&value),
            Some("landmarks") | Some("skeleton") | Some("lost") => self.handle_frame(&value),
            Some("status") => Ok(self.status_fields()),
            Some(other) => Err(format!("unknown message type: {other}")),
            None => Err("missing :type".to_string()),
        };

        Some(match result {
            Ok(fields) if fields.is_empty() => ok_response(msg_id),
            Ok(fields) => format!("(:type :response :id {} :status :ok {})", msg_id, fields),
            Err(reason) => {
                warn!(msg_id, "rejected message: {}", reason);
                error_response(msg_id, &reason)
            }
        })
    }

    // ── Scene ──────────────────────────────────────────────

    fn handle_config(&mut self, value: &Value) -> Result<String, String> {
        let applied = self.config.apply_plist(value);
        self.engine.config = self.config.gesture.clone();
        self.controller.config = self.config.manipulation.clone();
        info!("Applied {} config keys", applied);
        Ok(format!(":applied {} :config {}", applied, self.config.config_sexp()))
    }

    fn handle_enable(&mut self, value: &Value) -> Result<String, String> {
        let enabled = get_bool(value, "enabled").ok_or("missing :enabled")?;
        if self.tracking != enabled {
            info!("Hand tracking {}", if enabled { "started" } else { "stopped" });
        }
        self.tracking = enabled;
        if !enabled {
            self.inputs.reset();
            self.engine.reset();
            self.controller.reset();
        }
        Ok(String::new())
    }

    fn handle_camera(&mut self, value: &Value) -> Result<String, String> {
        let position = get_vector3(value, "position").ok_or("missing :position (x y z)")?;
        let target = get_vector3(value, "target").ok_or("missing :target (x y z)")?;
        let up = get_vector3(value, "up").unwrap_or_else(Vector3::y);
        if position == target {
            return Err(":position and :target coincide".to_string());
        }
        let defaults = PerspectiveCamera::default();
        let fov = get_float(value, "fov").map_or(defaults.fov_y_deg, |f| f as f32);
        let aspect = get_float(value, "aspect").map_or(defaults.aspect, |a| a as f32);
        let camera = PerspectiveCamera::look_at(position, target, up).with_lens(fov, aspect);
        if !camera.has_valid_lens() {
            return Err(format!("invalid lens fov={fov} aspect={aspect}"));
        }
        self.camera = camera;
        Ok(String::new())
    }

    fn handle_plane(&mut self, value: &Value) -> Result<String, String> {
        let height = get_float(value, "height").ok_or("missing :height")?;
        self.plane_height = height as f32;
        Ok(String::new())
    }

    /// The reticle sits on the detected surface, so it also sets the plane height.
    fn handle_reticle(&mut self, value: &Value) -> Result<String, String> {
        match get_value(value, "position") {
            None => self.reticle = None,
            Some(raw) => {
                let position = as_vector3(raw).ok_or(":position must be (x y z)")?;
                let orientation = match get_value(value, "orientation") {
                    None => UnitQuaternion::identity(),
                    Some(q) => parse_quaternion(q)?,
                };
                self.plane_height = position.y;
                self.reticle = Some(BlockPose {
                    position,
                    orientation,
                });
            }
        }
        Ok(String::new())
    }

    fn handle_target(&mut self, value: &Value) -> Result<String, String> {
        match get_value(value, "position") {
            None => self.selection.block = None,
            Some(raw) => {
                let position = as_vector3(raw).ok_or(":position must be (x y z)")?;
                let mut transform = BlockTransform::from_pose(BlockPose::at(position));
                if let Some(scale) = get_float(value, "scale") {
                    let m = &self.config.manipulation;
                    transform = transform.scaled_to(scale as f32, m.min_scale, m.max_scale);
                }
                self.selection.block = Some(SelectedBlock {
                    transform,
                    material: self.selection.material,
                });
            }
        }
        Ok(String::new())
    }

    // ── Frames ─────────────────────────────────────────────

    fn handle_frame(&mut self, value: &Value) -> Result<String, String> {
        let now_ms = get_float(value, "t").ok_or("missing :t")?;
        let source = parse_source(value, now_ms)?;

        if let Some(source) = &source {
            debug!("{} frame at {:.1}ms", source.as_str(), now_ms);
        }
        let pose = if !self.tracking {
            None
        } else {
            match source {
                Some(HandSource::Skeletal(skeleton)) => self.inputs.resolve(&[skeleton]),
                camera => {
                    // Estimator callback: one candidate, or none when the hand was lost.
                    let candidates = camera.and_then(HandSource::into_pose).into_iter().collect();
                    self.inputs.on_camera_results(candidates);
                    self.inputs.resolve(&[])
                }
            }
        };

        let state = self.engine.update(pose.as_ref(), self.tracking, now_ms);

        let target = self.selection.transform().copied();
        let view = ManipulationView {
            camera: &self.camera,
            plane_height: self.plane_height,
            reticle: self.reticle,
            target: target.as_ref(),
        };
        let commands = self.controller.process(&state, &view);
        for command in &commands {
            self.selection.apply(command, &self.config.manipulation);
        }
        self.frames += 1;

        Ok(format!(
            ":frame ({} :source :{} :commands {})",
            state.sexp_fields(),
            self.inputs.active().as_str(),
            format_commands(&commands),
        ))
    }

    fn status_fields(&self) -> String {
        format!(
            ":frames {} :tracking {} :engine {} :inputs {} :grabbing {} :plane-height {:.3} :reticle {} :selection {}",
            self.frames,
            sexp_bool(self.tracking),
            self.engine.status_sexp(),
            self.inputs.status_sexp(),
            sexp_bool(self.controller.is_grabbing()),
            self.plane_height,
            self.reticle
                .map(|r| format_vector(&r.position))
                .unwrap_or_else(|| "nil".to_string()),
            self.selection.status_sexp(),
        )
    }
}

fn format_commands(commands: &[ManipulationCommand]) -> String {
    if commands.is_empty() {
        return "nil".to_string();
    }
    let items: Vec<String> = commands.iter().map(ManipulationCommand::to_sexp).collect();
    format!("({})", items.join(" "))
}

// ── Frame parsing ──────────────────────────────────────────

fn parse_handedness(value: &Value) -> Result<Handedness, String> {
    match get_keyword(value, "hand") {
        None => Ok(Handedness::Right),
        Some(h) => Handedness::parse(&h).ok_or_else(|| format!("unknown hand: {h}")),
    }
}

/// Image dimension in pixels; absent keys take the default.
fn parse_dimension(value: &Value, key: &str, default: u32) -> Result<u32, String> {
    match get_int(value, key) {
        None => Ok(default),
        Some(n) => match u32::try_from(n) {
            Ok(px) if px > 0 => Ok(px),
            _ => Err(format!(":{key} out of range: {n}")),
        },
    }
}

/// `(x y z w)` rotation; normalized, rejected when zero or non-finite.
fn parse_quaternion(value: &Value) -> Result<UnitQuaternion<f32>, String> {
    let [x, y, z, w] = as_floats(value)
        .as_deref()
        .and_then(|f| <[f64; 4]>::try_from(f).ok())
        .ok_or(":orientation must be (x y z w)")?;
    let q = Quaternion::new(w as f32, x as f32, y as f32, z as f32);
    if !q.coords.iter().all(|c| c.is_finite()) || q.norm() < 1e-6 {
        return Err(":orientation must be a non-zero rotation".to_string());
    }
    Ok(UnitQuaternion::from_quaternion(q))
}

/// `None` for a `:lost` frame.
fn parse_source(value: &Value, now_ms: f64) -> Result<Option<HandSource>, String> {
    match get_keyword(value, "type").as_deref() {
        Some("landmarks") => parse_landmarks(value, now_ms).map(|p| Some(HandSource::Landmarks(p))),
        Some("skeleton") => parse_skeleton(value, now_ms).map(|s| Some(HandSource::Skeletal(s))),
        _ => Ok(None),
    }
}

fn parse_landmarks(value: &Value, now_ms: f64) -> Result<HandPose, String> {
    let handedness = parse_handedness(value)?;
    let points = get_value(value, "points")
        .and_then(list_items)
        .ok_or("missing :points list")?;
    let landmarks = points
        .into_iter()
        .map(|p| as_vector3(p).map(HandLandmark::from))
        .collect::<Option<Vec<_>>>()
        .ok_or(":points entries must be (x y z)")?;
    let width = parse_dimension(value, "width", DEFAULT_IMAGE_SIZE.0)?;
    let height = parse_dimension(value, "height", DEFAULT_IMAGE_SIZE.1)?;
    let count = landmarks.len();
    HandPose::from_landmarks(handedness, &landmarks, now_ms, width, height)
        .ok_or_else(|| format!("expected 21 landmarks, got {count}"))
}

fn parse_skeleton(value: &Value, now_ms: f64) -> Result<XrHandSkeleton, String> {
    let hand = get_keyword(value, "hand").map_or(Handedness::Right, |h| Handedness::from_xr(&h));
    let mut skeleton = XrHandSkeleton::new(hand, now_ms);
    if let Some(supported) = get_bool(value, "supported") {
        skeleton.joint_poses_supported = supported;
    }
    let joints = get_value(value, "joints")
        .and_then(list_items)
        .ok_or("missing :joints list")?;
    for joint in joints {
        let name = get_string(joint, "name").ok_or("joint without :name")?;
        let id = XrHandJoint::parse(&name).ok_or_else(|| format!("unknown joint: {name}"))?;
        let coord = |axis: &str| {
            get_float(joint, axis)
                .map(|c| c as f32)
                .ok_or_else(|| format!("joint {name} missing :{axis}"))
        };
        skeleton.set_joint(id, [coord("x")?, coord("y")?, coord("z")?]);
    }
    Ok(skeleton)
}

// ── Tests ──────────────────────────────────────────────────
