//! Hand tracking core: canonical pose, normalization, classification and
//! the gesture event engine.
//!
//! Provides:
//! - `pose`: 21-landmark `HandPose` shared by every tracking source
//! - `skeleton`: WebXR joint vocabulary and the hand-local normalizer
//! - `source`: per-frame arbitration between skeletal and camera tracking
//! - `classifier`: pure per-frame metrics and predicates
//! - `engine`: stateful edge-triggered events with tap detection

pub mod classifier;
pub mod engine;
pub mod pose;
pub mod skeleton;
pub mod source;

pub use classifier::{classify, Classification, GestureConfig};
pub use engine::{GestureEngine, GestureEvent, GestureEventKind, GestureFrameState};
pub use pose::{HandLandmark, HandPose, Handedness, Landmark, LANDMARK_COUNT};
pub use skeleton::{HandSource, XrHandJoint, XrHandSkeleton};
pub use source::{ActiveSource, HandInputs};
