//! Frame profiling

pub mod hitch;

pub use hitch::{EntityCounts, FrameStage, HitchProfiler, HitchReport};
