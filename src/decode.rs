use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::FaceMatchError;

/// Decode an externally supplied image into raw encoded-image bytes.
///
/// Accepts plain base64 or a data-URI (`data:<mime>;base64,...`) as produced
/// by browser canvas captures. The header, when present, is stripped before
/// decoding.
pub fn decode_image(data: &str) -> Result<Vec<u8>, FaceMatchError> {
    let payload = strip_data_uri(data.trim());
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| FaceMatchError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(FaceMatchError::Decode("decoded to zero bytes".to_string()));
    }
    Ok(bytes)
}

fn strip_data_uri(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix("data:") {
        if let Some(idx) = rest.find(";base64,") {
            return &rest[idx + ";base64,".len()..];
        }
    }
    s
}
