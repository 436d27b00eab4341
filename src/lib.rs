pub mod check;
pub mod engine;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod math;
pub mod transform;

pub use check::{
    detect_gaps, DetectGaps, FixMethod, FixStatus, GapCheckConfig, GapDetection, GapFixer,
    GapParams, GapRecord, MergeInstruction, ResolveGap,
};
pub use error::{GapCheckError, Result};
