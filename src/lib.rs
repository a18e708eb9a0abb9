//! Stride Serpent - step-driven snake simulation
//!
//! Motion-sensor samples are fused into discrete step events, which move a
//! snake around a canvas on a fixed-rate tick loop.

pub mod config;
pub mod game;
pub mod sensor;
pub mod util;
