//! Error-contract tests for the comparison pipeline.
//!
//! These run without an embedding model on disk: they pin the ordering and
//! typing guarantees the engine makes before inference is ever reached.

use std::io::Cursor;
use std::path::PathBuf;

use face_match::{Config, FaceMatchError, FaceMatcher};

fn matcher_without_model() -> FaceMatcher {
    FaceMatcher::new(Config {
        model_dir: PathBuf::from("/nonexistent/face-match-models"),
        ..Config::default()
    })
}

fn tiny_png_base64() -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 90, 60]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

#[test]
fn malformed_base64_fails_before_any_model_work() {
    let matcher = matcher_without_model();
    // The model directory does not exist. If decoding happened after session
    // setup this would report ModelNotFound instead.
    let err = matcher.compare("!!not-base64!!", "!!also-bad!!").unwrap_err();
    assert!(matches!(err, FaceMatchError::Decode(_)), "got {err}");
}

#[test]
fn one_malformed_input_is_enough_to_reject() {
    let matcher = matcher_without_model();
    let good = tiny_png_base64();
    let err = matcher.compare("%%%", &good).unwrap_err();
    assert!(matches!(err, FaceMatchError::Decode(_)), "got {err}");
}

#[test]
fn valid_images_without_a_model_surface_model_not_found() {
    let matcher = matcher_without_model();
    let good = tiny_png_base64();
    let err = matcher.compare(&good, &good).unwrap_err();
    assert!(matches!(err, FaceMatchError::ModelNotFound(_)), "got {err}");
}

#[test]
fn data_uri_inputs_are_accepted_by_the_decoder() {
    let matcher = matcher_without_model();
    let with_header = format!("data:image/png;base64,{}", tiny_png_base64());
    // Decoding succeeds; the pipeline then stops at model resolution.
    let err = matcher.compare(&with_header, &with_header).unwrap_err();
    assert!(matches!(err, FaceMatchError::ModelNotFound(_)), "got {err}");
}

#[test]
fn embed_propagates_decode_errors_typed() {
    let matcher = matcher_without_model();
    let err = matcher.embed("data:image/png;base64,").unwrap_err();
    assert!(matches!(err, FaceMatchError::Decode(_)), "got {err}");
}
