use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the face-matching engine.
///
/// Degenerate (all-zero) embeddings are deliberately NOT represented here:
/// they yield a successful comparison with the `-1.0` sentinel similarity so
/// that a security-sensitive caller can never confuse an error with a match.
#[derive(Debug, Error)]
pub enum FaceMatchError {
    /// The supplied image string was not valid base64, or decoded to nothing.
    #[error("invalid base64 image data: {0}")]
    Decode(String),

    /// The decoded bytes could not be turned into a canonical tensor
    /// (corrupt image, unsupported format).
    #[error("image preprocessing failed: {0}")]
    Preprocess(String),

    /// No model file could be resolved from configuration or the
    /// conventional model directory.
    #[error("no face embedding model found at {}", .0.display())]
    ModelNotFound(PathBuf),

    /// The resolved model file exists but could not be loaded.
    #[error("failed to load face embedding model: {0}")]
    ModelLoad(String),

    /// Inference failed and the failure was not resolved by the one-time
    /// layout retry.
    #[error("face embedding inference failed: {0}")]
    Inference(String),
}
