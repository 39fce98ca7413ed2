use once_cell::sync::{Lazy, OnceCell};
use serde::Serialize;

use crate::config::Config;
use crate::decode;
use crate::embed::{self, Embedding};
use crate::error::FaceMatchError;
use crate::session::{resolve_model_path, ModelSession};
use crate::tensor;

/// Sentinel reported when the similarity cannot be computed (degenerate
/// embedding or non-finite arithmetic): worst case, never a match.
pub const SIMILARITY_FLOOR: f32 = -1.0;

/// Outcome of comparing an identity photo against a live capture.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComparisonResult {
    /// Cosine similarity in [-1, 1]; -1 also doubles as the degenerate
    /// sentinel.
    pub similarity: f32,
    pub is_match: bool,
}

/// The face-matching engine: configuration plus a lazily loaded model
/// session. Stateless per request; safe to share across threads.
pub struct FaceMatcher {
    config: Config,
    session: OnceCell<ModelSession>,
}

impl FaceMatcher {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: OnceCell::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared model session, loading it on first use. Racing first
    /// callers block on the same in-flight load; the model file is read at
    /// most once per matcher lifetime.
    fn session(&self) -> Result<&ModelSession, FaceMatchError> {
        self.session.get_or_try_init(|| {
            let path = resolve_model_path(&self.config)?;
            log::info!("loading face embedding model from {}", path.display());
            ModelSession::load(&path)
        })
    }

    /// Produce a unit-norm embedding for one base64-encoded image.
    pub fn embed(&self, image_base64: &str) -> Result<Embedding, FaceMatchError> {
        // Decode before touching the session: garbage input must never
        // trigger a model load or tensor work.
        let bytes = decode::decode_image(image_base64)?;
        let session = self.session()?;

        let layout = tensor::select_layout(session.input_shape(), self.config.layout);
        let raw = embed::run_with_layout_retry(layout, |layout| {
            let t = tensor::build_tensor(&bytes, layout, self.config.color_order)?;
            session.run(t)
        })?;

        Ok(Embedding::from_raw(raw))
    }

    /// Compare a reference identity photo against a live capture.
    ///
    /// The two embeddings are produced in parallel; both only read the
    /// shared session. A similarity that cannot be computed is clamped to
    /// the -1 sentinel rather than surfaced as an error, so a mishandled
    /// exception can never turn into a false "match".
    pub fn compare(
        &self,
        id_image_base64: &str,
        live_image_base64: &str,
    ) -> Result<ComparisonResult, FaceMatchError> {
        let (id_embedding, live_embedding) = rayon::join(
            || self.embed(id_image_base64),
            || self.embed(live_image_base64),
        );
        let id_embedding = id_embedding?;
        let live_embedding = live_embedding?;

        let similarity = score(&id_embedding, &live_embedding);
        let is_match = similarity >= self.config.threshold;

        if self.config.debug {
            log::info!(
                "embeddings {}/{} similarity {:.6} threshold {}",
                id_embedding.len(),
                live_embedding.len(),
                similarity,
                self.config.threshold
            );
        }

        Ok(ComparisonResult {
            similarity,
            is_match,
        })
    }
}

fn score(a: &Embedding, b: &Embedding) -> f32 {
    if a.is_degenerate() || b.is_degenerate() {
        return SIMILARITY_FLOOR;
    }
    let similarity = embed::cosine_similarity(a, b);
    if !similarity.is_finite() {
        return SIMILARITY_FLOOR;
    }
    similarity.max(-1.0).min(1.0)
}

static ENGINE: Lazy<FaceMatcher> = Lazy::new(FaceMatcher::from_env);

/// Process-wide entry point used by login step-up, KYC, and voting
/// verification: compare two base64 images with environment configuration.
pub fn compare_faces(
    id_image_base64: &str,
    live_image_base64: &str,
) -> Result<ComparisonResult, FaceMatchError> {
    ENGINE.compare(id_image_base64, live_image_base64)
}
