//! Pipeline and resource warmup run once before the first real frame

pub mod sequencer;

pub use sequencer::{yaw_steps, WarmupContext, WarmupPhase, WarmupSequencer, WarmupStats, WarmupStatus};
