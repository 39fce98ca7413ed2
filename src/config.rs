use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

use crate::tensor::{ColorOrder, TensorLayout};

/// Conventional directory scanned for embedding models when no explicit
/// path is configured.
pub static MODEL_DIR: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("FACE_MODEL_DIR").unwrap_or("models")));

/// Calibrated default: a strict high-similarity bar. KYC and voting flows
/// favor false rejections over false matches.
pub const DEFAULT_THRESHOLD: f32 = 0.9;

/// Process-wide engine configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit model file; relative paths resolve against `model_dir`.
    pub model_path: Option<PathBuf>,
    /// Directory scanned for `*.onnx` models when `model_path` is unset.
    pub model_dir: PathBuf,
    /// Cosine-similarity cutoff for a match decision.
    pub threshold: f32,
    /// Channel order the model expects.
    pub color_order: ColorOrder,
    /// Forced input layout; `None` auto-detects from model metadata.
    pub layout: Option<TensorLayout>,
    /// Verbose per-comparison diagnostics.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: None,
            model_dir: MODEL_DIR.to_path_buf(),
            threshold: DEFAULT_THRESHOLD,
            color_order: ColorOrder::Rgb,
            layout: None,
            debug: false,
        }
    }
}

impl Config {
    /// Build configuration from `FACE_*` environment variables.
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            model_path: env::var("FACE_MODEL_PATH").ok().map(PathBuf::from),
            model_dir: MODEL_DIR.to_path_buf(),
            threshold: env::var("FACE_MATCH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_THRESHOLD),
            color_order: env::var("FACE_COLOR_ORDER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            layout: env::var("FACE_INPUT_LAYOUT")
                .ok()
                .and_then(|v| v.parse().ok()),
            debug: env::var("FACE_MATCH_DEBUG")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let cfg = Config::default();
        assert_eq!(cfg.threshold, DEFAULT_THRESHOLD);
        assert_eq!(cfg.color_order, ColorOrder::Rgb);
        assert!(cfg.layout.is_none());
        assert!(!cfg.debug);
    }

    #[test]
    fn parses_layout_and_order_strings() {
        assert_eq!("nchw".parse(), Ok(TensorLayout::Nchw));
        assert_eq!("NHWC".parse(), Ok(TensorLayout::Nhwc));
        assert!("CHWN".parse::<TensorLayout>().is_err());
        assert_eq!("bgr".parse(), Ok(ColorOrder::Bgr));
        assert!("CMYK".parse::<ColorOrder>().is_err());
    }

    #[test]
    fn parses_debug_flag_variants() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("on"));
    }
}
