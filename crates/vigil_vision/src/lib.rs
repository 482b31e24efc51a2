//! Analyzer boundary: image in, structured findings out.
//!
//! The `Analyzer` trait is the seam between the agent loop and the hosted
//! vision model. "Nothing detected" is a normal empty result; an `Err` is
//! reserved for genuine transport or parse failure, which the loop maps
//! to the error stage.

use std::path::Path;
use thiserror::Error;
use vigil_protocol::AnalysisResult;

mod gemini;
mod nutrition;
mod profile;

pub use gemini::{GeminiAnalyzer, GeminiConfig};
pub use nutrition::lookup_nutrition;

/// Analyzer operation result type.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Failures crossing the analyzer boundary.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Artifact unreadable before it ever left the machine
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File extension we will not upload
    #[error("unsupported image type: '{0}' (expected jpg, jpeg, png, webp, or gif)")]
    UnsupportedImage(String),

    /// Transport failure talking to the model endpoint
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model answered, but not in the shape we asked for
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
}

/// Given an artifact path, return a structured result or an error.
pub trait Analyzer {
    fn analyze(&self, artifact: &Path) -> Result<AnalysisResult>;
}
