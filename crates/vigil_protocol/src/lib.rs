//! Canonical domain types for Vigil Flow.
//!
//! Every crate in the workspace speaks these types: the stage state
//! machine an artifact moves through, the findings an analyzer reports,
//! and the records a sink persists. Keep all cross-crate vocabulary here
//! so there is exactly one definition of each.

pub mod types;

// Re-export types for convenience
pub use types::{
    AnalysisResult,
    Finding,
    FindingDetail,
    LogRecord,
    Nutrition,
    ProfileKind,
    Stage,
    SuccessPolicy,
};
