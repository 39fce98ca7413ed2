use crate::error::FaceMatchError;
use crate::tensor::TensorLayout;

/// Epsilon floor for the L2 norm; anything below it marks the embedding as
/// degenerate (all-zero model output).
const NORM_EPSILON: f32 = 1e-6;

/// A unit-norm face embedding. Transient; never persisted by this engine.
#[derive(Debug, Clone)]
pub struct Embedding {
    vector: Vec<f32>,
    degenerate: bool,
}

impl Embedding {
    /// L2-normalize a raw model output.
    ///
    /// A (near-)zero vector cannot be normalized meaningfully; it is kept as
    /// zeros and flagged so the scorer can fail closed instead of erroring.
    pub fn from_raw(raw: Vec<f32>) -> Self {
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < NORM_EPSILON {
            return Self {
                vector: raw,
                degenerate: true,
            };
        }
        Self {
            vector: raw.iter().map(|x| x / norm).collect(),
            degenerate: false,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Whether the raw output had no direction to normalize.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

/// Dot product of two unit vectors, i.e. their cosine similarity.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| x * y)
        .sum()
}

/// Known runtime signatures for a tensor-shape rejection. Matched on the
/// error text because the runtime reports shape problems as opaque messages.
pub(crate) fn is_shape_mismatch(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("invalid dimensions") || msg.contains("invalid shape")
}

/// Run inference with the selected layout; on a shape-mismatch rejection,
/// retry exactly once with the opposite layout. Exported models do not
/// always declare their input convention truthfully, so both conventions
/// must work without per-deployment configuration. Any other error, or a
/// failed retry, is surfaced unchanged.
pub(crate) fn run_with_layout_retry<F>(
    layout: TensorLayout,
    mut run: F,
) -> Result<Vec<f32>, FaceMatchError>
where
    F: FnMut(TensorLayout) -> Result<Vec<f32>, FaceMatchError>,
{
    match run(layout) {
        Err(FaceMatchError::Inference(msg)) if is_shape_mismatch(&msg) => {
            let flipped = layout.flipped();
            log::warn!("dimension mismatch with layout {layout}, retrying with {flipped}");
            run(flipped)
        }
        other => other,
    }
}
