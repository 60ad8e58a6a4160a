//! Bare-hand gesture engine for building virtual blocks in AR.
//!
//! Hand poses from a camera estimator or a skeletal hand-tracking runtime are
//! normalized to one 21-landmark model, classified per frame, turned into
//! debounced gesture events, and mapped onto a detected surface to move,
//! rotate and scale blocks.

pub mod config;
pub mod hand;
pub mod ipc;
pub mod manipulation;
pub mod space;
