use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(any(feature = "openvino", feature = "cuda"))]
use ort::ep::{self, ExecutionProvider};
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::Value,
};

use crate::config::Config;
use crate::error::FaceMatchError;
use crate::tensor::ImageTensor;

/// Resolve the embedding model file.
///
/// An explicit `model_path` wins, with relative paths resolved against the
/// model directory. Otherwise the model directory is scanned for `*.onnx`
/// files, preferring names that hint at the expected ArcFace architecture.
pub fn resolve_model_path(config: &Config) -> Result<PathBuf, FaceMatchError> {
    if let Some(path) = &config.model_path {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            config.model_dir.join(path)
        };
        if path.is_file() {
            return Ok(path);
        }
        return Err(FaceMatchError::ModelNotFound(path));
    }

    let dir = &config.model_dir;
    if dir.is_dir() {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|_| FaceMatchError::ModelNotFound(dir.clone()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("onnx"))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        let preferred = candidates.iter().find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_ascii_lowercase().contains("arc"))
                .unwrap_or(false)
        });
        if let Some(path) = preferred.or_else(|| candidates.first()) {
            return Ok(path.clone());
        }
    }
    Err(FaceMatchError::ModelNotFound(dir.clone()))
}

fn session_builder() -> Result<SessionBuilder, FaceMatchError> {
    #[cfg_attr(not(any(feature = "openvino", feature = "cuda")), allow(unused_mut))]
    let mut builder = Session::builder()
        .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
        .map_err(|e| FaceMatchError::ModelLoad(e.to_string()))?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        match ep.is_available() {
            Ok(true) => {
                if let Err(e) = ep.register(&mut builder) {
                    log::warn!("failed to register openvino provider: {e}");
                }
            }
            _ => log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        match ep.is_available() {
            Ok(true) => {
                if let Err(e) = ep.register(&mut builder) {
                    log::warn!("failed to register cuda provider: {e}");
                }
            }
            _ => log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda"),
        }
    }

    Ok(builder)
}

/// The loaded embedding model: one long-lived handle shared by all
/// concurrent comparisons. `ort::Session::run` takes `&mut self`, so the
/// session sits behind a `Mutex`; everything else is captured at load time
/// and immutable afterwards.
pub struct ModelSession {
    session: Mutex<Session>,
    input_name: String,
    input_shape: Option<Vec<i64>>,
}

impl ModelSession {
    pub fn load(path: &Path) -> Result<Self, FaceMatchError> {
        let session = session_builder()?
            .commit_from_file(path)
            .map_err(|e| FaceMatchError::ModelLoad(e.to_string()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());
        let input_shape = session
            .inputs()
            .first()
            .and_then(|i| i.dtype().tensor_shape())
            .map(|shape| shape.iter().copied().collect());

        log::debug!(
            "loaded embedding model {} (input {:?}, declared shape {:?})",
            path.display(),
            input_name,
            input_shape
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_shape,
        })
    }

    /// Declared dimensions of the model's first input, when the export
    /// carries them.
    pub fn input_shape(&self) -> Option<&[i64]> {
        self.input_shape.as_deref()
    }

    /// Run one inference call and return the first output tensor's flat
    /// contents. Pure with respect to engine state; the internal lock only
    /// covers the runtime call.
    pub fn run(&self, tensor: ImageTensor) -> Result<Vec<f32>, FaceMatchError> {
        let value = Value::from_array(tensor.data)
            .map_err(|e| FaceMatchError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| FaceMatchError::Inference(format!("session lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => value])
            .map_err(|e| FaceMatchError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceMatchError::Inference(e.to_string()))?;

        // Typically [1, D]; take one embedding row either way.
        let dim = if shape.len() == 2 {
            shape[1] as usize
        } else {
            data.len()
        };
        Ok(data[..dim.min(data.len())].to_vec())
    }
}
