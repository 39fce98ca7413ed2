use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use ndarray::Array4;

use crate::error::FaceMatchError;

/// Canonical input resolution fixed by the embedding model architecture.
pub const INPUT_SIZE: u32 = 112;
/// Channels after alpha removal.
pub const CHANNELS: usize = 3;

/// Memory ordering convention for the canonical image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// Channel-last: (1, H, W, C)
    Nhwc,
    /// Channel-first: (1, C, H, W)
    Nchw,
}

impl TensorLayout {
    /// The opposite convention, used by the one-time inference retry.
    pub fn flipped(self) -> Self {
        match self {
            TensorLayout::Nhwc => TensorLayout::Nchw,
            TensorLayout::Nchw => TensorLayout::Nhwc,
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorLayout::Nhwc => write!(f, "NHWC"),
            TensorLayout::Nchw => write!(f, "NCHW"),
        }
    }
}

impl FromStr for TensorLayout {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NHWC" => Ok(TensorLayout::Nhwc),
            "NCHW" => Ok(TensorLayout::Nchw),
            _ => Err(()),
        }
    }
}

/// Channel order expected by the embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Bgr,
}

impl FromStr for ColorOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RGB" => Ok(ColorOrder::Rgb),
            "BGR" => Ok(ColorOrder::Bgr),
            _ => Err(()),
        }
    }
}

/// A preprocessed 112x112x3 image tensor tagged with its active layout.
/// Request-local; consumed by a single inference call.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    pub data: Array4<f32>,
    pub layout: TensorLayout,
}

/// Pick the tensor layout for a session.
///
/// An explicit override always wins. Otherwise, when the model declares a
/// rank-4 input whose second dimension is 3, the model is channel-first;
/// everything else defaults to channel-last. Declared metadata is not always
/// trustworthy, which is why inference carries a layout retry on top.
pub fn select_layout(declared: Option<&[i64]>, forced: Option<TensorLayout>) -> TensorLayout {
    if let Some(layout) = forced {
        return layout;
    }
    match declared {
        Some(dims) if dims.len() == 4 && dims[1] == 3 => TensorLayout::Nchw,
        _ => TensorLayout::Nhwc,
    }
}

/// Build the canonical image tensor from decoded image bytes.
///
/// Resizes to 112x112 with CatmullRom (bicubic-equivalent), drops any alpha
/// channel, and normalizes every sample as `(v - 127.5) / 128.0`. The BGR
/// order swaps R and B identically in both layouts.
pub fn build_tensor(
    bytes: &[u8],
    layout: TensorLayout,
    order: ColorOrder,
) -> Result<ImageTensor, FaceMatchError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| FaceMatchError::Preprocess(e.to_string()))?;
    let resized = img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);
    let rgb = resized.to_rgb8();

    let size = INPUT_SIZE as usize;
    let data = match layout {
        TensorLayout::Nhwc => {
            let mut t = Array4::<f32>::zeros((1, size, size, CHANNELS));
            for (x, y, pixel) in rgb.enumerate_pixels() {
                let (c0, c1, c2) = map_channels(pixel.0, order);
                t[[0, y as usize, x as usize, 0]] = c0;
                t[[0, y as usize, x as usize, 1]] = c1;
                t[[0, y as usize, x as usize, 2]] = c2;
            }
            t
        }
        TensorLayout::Nchw => {
            let mut t = Array4::<f32>::zeros((1, CHANNELS, size, size));
            for (x, y, pixel) in rgb.enumerate_pixels() {
                let (c0, c1, c2) = map_channels(pixel.0, order);
                t[[0, 0, y as usize, x as usize]] = c0;
                t[[0, 1, y as usize, x as usize]] = c1;
                t[[0, 2, y as usize, x as usize]] = c2;
            }
            t
        }
    };

    Ok(ImageTensor { data, layout })
}

fn map_channels(px: [u8; 3], order: ColorOrder) -> (f32, f32, f32) {
    let r = normalize(px[0]);
    let g = normalize(px[1]);
    let b = normalize(px[2]);
    match order {
        ColorOrder::Rgb => (r, g, b),
        ColorOrder::Bgr => (b, g, r),
    }
}

#[inline]
fn normalize(v: u8) -> f32 {
    (v as f32 - 127.5) / 128.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn layout_override_wins() {
        let declared = [1i64, 3, 112, 112];
        assert_eq!(
            select_layout(Some(&declared), Some(TensorLayout::Nhwc)),
            TensorLayout::Nhwc
        );
    }

    #[test]
    fn layout_inferred_from_declared_dims() {
        assert_eq!(
            select_layout(Some(&[1, 3, 112, 112]), None),
            TensorLayout::Nchw
        );
        assert_eq!(
            select_layout(Some(&[1, 112, 112, 3]), None),
            TensorLayout::Nhwc
        );
        // Symbolic batch dims come through as -1; rank or channel position
        // still decides.
        assert_eq!(
            select_layout(Some(&[-1, 3, 112, 112]), None),
            TensorLayout::Nchw
        );
        assert_eq!(select_layout(None, None), TensorLayout::Nhwc);
    }

    #[test]
    fn nhwc_tensor_shape_and_range() {
        let t = build_tensor(&png_bytes([255, 0, 127]), TensorLayout::Nhwc, ColorOrder::Rgb)
            .unwrap();
        assert_eq!(t.data.shape(), &[1, 112, 112, 3]);
        // Resampling a solid color leaves it solid, modulo u8 rounding.
        assert!((t.data[[0, 0, 0, 0]] - (255.0 - 127.5) / 128.0).abs() < 0.02);
        assert!((t.data[[0, 0, 0, 1]] - (0.0 - 127.5) / 128.0).abs() < 0.02);
        for v in t.data.iter() {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
    }

    #[test]
    fn nchw_tensor_shape() {
        let t = build_tensor(&png_bytes([10, 20, 30]), TensorLayout::Nchw, ColorOrder::Rgb)
            .unwrap();
        assert_eq!(t.data.shape(), &[1, 3, 112, 112]);
        assert_eq!(t.layout, TensorLayout::Nchw);
    }

    #[test]
    fn bgr_swaps_red_and_blue_in_both_layouts() {
        let bytes = png_bytes([255, 0, 0]);

        let nhwc = build_tensor(&bytes, TensorLayout::Nhwc, ColorOrder::Bgr).unwrap();
        // Pure red lands in the last channel under BGR.
        assert!(nhwc.data[[0, 0, 0, 2]] > 0.9);
        assert!(nhwc.data[[0, 0, 0, 0]] < 0.0);

        let nchw = build_tensor(&bytes, TensorLayout::Nchw, ColorOrder::Bgr).unwrap();
        assert!(nchw.data[[0, 2, 0, 0]] > 0.9);
        assert!(nchw.data[[0, 0, 0, 0]] < 0.0);
    }

    #[test]
    fn rgb_and_bgr_agree_on_green() {
        let bytes = png_bytes([0, 255, 0]);
        let rgb = build_tensor(&bytes, TensorLayout::Nhwc, ColorOrder::Rgb).unwrap();
        let bgr = build_tensor(&bytes, TensorLayout::Nhwc, ColorOrder::Bgr).unwrap();
        assert_eq!(rgb.data[[0, 5, 5, 1]], bgr.data[[0, 5, 5, 1]]);
    }

    #[test]
    fn corrupt_bytes_fail_preprocess() {
        let err = build_tensor(b"not an image", TensorLayout::Nhwc, ColorOrder::Rgb).unwrap_err();
        assert!(matches!(err, FaceMatchError::Preprocess(_)));
    }

    #[test]
    fn alpha_is_stripped() {
        let mut img = image::RgbaImage::from_pixel(4, 4, image::Rgba([100, 150, 200, 40]));
        img.put_pixel(0, 0, image::Rgba([100, 150, 200, 0]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();

        let t = build_tensor(&buf.into_inner(), TensorLayout::Nhwc, ColorOrder::Rgb).unwrap();
        assert_eq!(t.data.shape(), &[1, 112, 112, 3]);
    }
}
