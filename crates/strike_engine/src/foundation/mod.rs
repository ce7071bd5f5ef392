//! Foundation module
//!
//! Shared building blocks for the rest of the crate: nalgebra aliases and
//! ground-plane helpers, delta clamping and interval timers, and the
//! env_logger setup used by tests.

pub mod logging;
pub mod math;
pub mod time;
