//! S-expression message layer.
//!
//! Provides:
//! - `sexp`: plist accessors and response formatting
//! - `replay`: scripted sessions that drive tracking, gestures and manipulation

pub mod replay;
pub mod sexp;

pub use replay::ReplaySession;
