//! Image preprocessing for document OCR
//!
//! Upscales the photo, converts it to grayscale and applies a contrast and
//! binarization pass whose strength is derived from the photo's own mean
//! brightness, so dark phone shots and washed-out scans both come out with
//! crisp dark text on a light background.

use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::Instant;
use tracing::debug;

use crate::config::PreprocessSettings;
use crate::error::{OcrError, Result};

/// Contrast and threshold chosen from the image's mean brightness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveParams {
    /// Contrast factor applied around the midpoint (128)
    pub contrast: f32,
    /// Values below this are pushed darker, the rest brighter
    pub threshold: f32,
}

impl AdaptiveParams {
    /// Derive parameters from mean brightness (0-255)
    pub fn for_brightness(mean: f32) -> Self {
        Self {
            contrast: if mean < 128.0 { 1.8 } else { 1.5 },
            threshold: if mean > 180.0 { 140.0 } else { 128.0 },
        }
    }
}

/// Enhanced image ready for recognition
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// PNG-encoded enhanced image
    pub png: Vec<u8>,
    /// Width after upscaling
    pub width: u32,
    /// Height after upscaling
    pub height: u32,
    /// Mean grayscale brightness measured before enhancement
    pub mean_brightness: f32,
    /// Parameters used for the enhancement pass
    pub params: AdaptiveParams,
}

/// Decode, upscale and enhance an encoded image (JPEG/PNG bytes)
pub fn prepare(bytes: &[u8], settings: &PreprocessSettings) -> Result<PreparedImage> {
    let start = Instant::now();

    let source = decode(bytes)?;
    let mut image = upscale(&source, settings)?;
    let (width, height) = image.dimensions();

    let gray = luminance(&image);
    let mean_brightness = mean(&gray);
    let params = AdaptiveParams::for_brightness(mean_brightness);
    apply_adaptive_enhancement(&mut image, &gray, params);

    let png = encode_png(image)?;

    debug!(
        "Preprocessed {}x{} -> {}x{} (mean brightness {:.1}, contrast {}, threshold {}) in {:?}",
        source.width(),
        source.height(),
        width,
        height,
        mean_brightness,
        params.contrast,
        params.threshold,
        start.elapsed()
    );

    Ok(PreparedImage {
        png,
        width,
        height,
        mean_brightness,
        params,
    })
}

/// Decode encoded bytes into an RGBA buffer
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(OcrError::image_decode("image data is empty"));
    }

    let image = image::load_from_memory(bytes)
        .map_err(|e| OcrError::image_decode_with_source("failed to decode image", e))?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::image_decode("image has zero width or height"));
    }

    Ok(image)
}

/// Upscale by the configured integer factor
fn upscale(image: &RgbaImage, settings: &PreprocessSettings) -> Result<RgbaImage> {
    let scale = settings.scale.max(1);
    let (width, height) = image.dimensions();

    let (Some(new_width), Some(new_height)) = (width.checked_mul(scale), height.checked_mul(scale))
    else {
        return Err(OcrError::image_decode(format!(
            "image {}x{} is too large to upscale by {}",
            width, height, scale
        )));
    };

    let pixels = new_width as u64 * new_height as u64;
    if pixels > settings.max_output_pixels {
        return Err(OcrError::image_decode(format!(
            "upscaled image would be {}x{} ({} pixels, limit {})",
            new_width, new_height, pixels, settings.max_output_pixels
        )));
    }

    if scale == 1 {
        return Ok(image.clone());
    }

    Ok(image::imageops::resize(
        image,
        new_width,
        new_height,
        settings.filter.into(),
    ))
}

/// Luminance of each RGBA pixel, unrounded so the enhancement pass sees the
/// exact threshold crossover
pub fn luminance(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|chunk| {
            // Standard luminance weights
            (0.299 * chunk[0] as f32 + 0.587 * chunk[1] as f32 + 0.114 * chunk[2] as f32)
                .clamp(0.0, 255.0)
        })
        .collect()
}

/// Mean brightness, 0 for an empty image
pub fn mean(gray: &[f32]) -> f32 {
    if gray.is_empty() {
        return 0.0;
    }
    let sum: f64 = gray.iter().map(|&g| g as f64).sum();
    (sum / gray.len() as f64) as f32
}

/// Write the enhanced luminance into the RGB channels of RGBA data in place.
/// Alpha is unchanged.
pub fn apply_adaptive_enhancement(data: &mut [u8], gray: &[f32], params: AdaptiveParams) {
    for (chunk, &g) in data.chunks_exact_mut(4).zip(gray) {
        let value = enhance_value(g, params);
        chunk[0] = value;
        chunk[1] = value;
        chunk[2] = value;
    }
}

/// Enhance a single grayscale value
pub fn enhance_value(gray: f32, params: AdaptiveParams) -> u8 {
    let intercept = 128.0 * (1.0 - params.contrast);
    let mut value = gray * params.contrast + intercept;

    // Push text darker and paper brighter
    value = if value < params.threshold {
        (value * 0.6).max(0.0)
    } else {
        (value * 1.15).min(255.0)
    };

    // Sharpen edges
    value = if value < 100.0 {
        value * 0.7
    } else if value > 180.0 {
        (value * 1.1).min(255.0)
    } else {
        value
    };

    value.round().clamp(0.0, 255.0) as u8
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| OcrError::image_encode_with_source("failed to encode enhanced image", e))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;

    /// Encode a solid-color PNG of the given size
    pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_adaptive_params() {
        let dark = AdaptiveParams::for_brightness(90.0);
        assert_eq!(dark.contrast, 1.8);
        assert_eq!(dark.threshold, 128.0);

        let normal = AdaptiveParams::for_brightness(150.0);
        assert_eq!(normal.contrast, 1.5);
        assert_eq!(normal.threshold, 128.0);

        let bright = AdaptiveParams::for_brightness(200.0);
        assert_eq!(bright.contrast, 1.5);
        assert_eq!(bright.threshold, 140.0);

        // Boundaries: 128 is not dark, 180 is not bright
        assert_eq!(AdaptiveParams::for_brightness(128.0).contrast, 1.5);
        assert_eq!(AdaptiveParams::for_brightness(180.0).threshold, 128.0);
    }

    #[test]
    fn test_luminance() {
        let data = vec![255, 0, 0, 255, 255, 255, 255, 128]; // Red pixel, white pixel
        let gray = luminance(&data);
        // 0.299*255 = 76.245, kept unrounded
        assert!((gray[0] - 76.245).abs() < 0.01);
        assert!((gray[1] - 255.0).abs() < 0.01);
        assert!((mean(&gray) - (76.245 + 255.0) / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_luminance_empty_buffer() {
        let gray = luminance(&[]);
        assert!(gray.is_empty());
        assert_eq!(mean(&gray), 0.0);
    }

    #[test]
    fn test_enhance_value() {
        let params = AdaptiveParams {
            contrast: 1.5,
            threshold: 128.0,
        };
        // 128*1.5 - 64 = 128 (not below threshold) -> *1.15 = 147.2
        assert_eq!(enhance_value(128.0, params), 147);
        // 100*1.5 - 64 = 86 -> *0.6 = 51.6 -> *0.7 = 36.12
        assert_eq!(enhance_value(100.0, params), 36);
        // Bright paper saturates
        assert_eq!(enhance_value(200.0, params), 255);

        let dark = AdaptiveParams::for_brightness(60.0);
        // 50*1.8 - 102.4 is negative -> clamped to black
        assert_eq!(enhance_value(50.0, dark), 0);
    }

    #[test]
    fn test_enhance_value_rounds() {
        let params = AdaptiveParams {
            contrast: 1.5,
            threshold: 128.0,
        };
        // 110*1.5 - 64 = 101 -> *0.6 = 60.6 -> *0.7 = 42.42
        assert_eq!(enhance_value(110.0, params), 42);
        // 111*1.5 - 64 = 102.5 -> *0.6 = 61.5 -> *0.7 = 43.05
        assert_eq!(enhance_value(111.0, params), 43);
        // 120*1.5 - 64 = 116 -> *0.6 = 69.6 -> *0.7 = 48.72
        assert_eq!(enhance_value(120.0, params), 49);
    }

    #[test]
    fn test_enhancement_uses_unrounded_luminance() {
        // Luminance 127.886 sits just below the threshold crossover
        let mut data = vec![128, 128, 127, 255];
        let gray = luminance(&data);
        let params = AdaptiveParams {
            contrast: 1.5,
            threshold: 128.0,
        };
        apply_adaptive_enhancement(&mut data, &gray, params);
        // 127.886*1.5 - 64 = 127.83 -> *0.6 = 76.70 -> *0.7 = 53.69
        assert_eq!(data, vec![54, 54, 54, 255]);
    }

    #[test]
    fn test_enhancement_writes_all_channels() {
        let mut data = vec![100, 100, 100, 255, 200, 200, 200, 255];
        let gray = luminance(&data);
        let params = AdaptiveParams::for_brightness(150.0);
        apply_adaptive_enhancement(&mut data, &gray, params);

        for chunk in data.chunks_exact(4) {
            assert_eq!(chunk[0], chunk[1]);
            assert_eq!(chunk[1], chunk[2]);
            assert_eq!(chunk[3], 255);
        }
        assert_eq!(data[0], 36);
        assert_eq!(data[4], 255);
    }

    #[test]
    fn test_prepare_upscales_and_binarizes() {
        let png = solid_png(4, 2, [200, 200, 200, 255]);
        let prepared = prepare(&png, &PreprocessSettings::default()).unwrap();

        assert_eq!((prepared.width, prepared.height), (12, 6));
        assert!((prepared.mean_brightness - 200.0).abs() < 0.5);
        assert_eq!(prepared.params.threshold, 140.0);

        let decoded = image::load_from_memory(&prepared.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 6));
        for pixel in decoded.pixels() {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
        }
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let result = prepare(b"definitely not an image", &PreprocessSettings::default());
        assert!(matches!(result, Err(OcrError::ImageDecode { .. })));
    }

    #[test]
    fn test_prepare_rejects_empty_input() {
        let result = prepare(&[], &PreprocessSettings::default());
        assert!(matches!(result, Err(OcrError::ImageDecode { .. })));
    }

    #[test]
    fn test_prepare_rejects_oversized_output() {
        let png = solid_png(10, 10, [255, 255, 255, 255]);
        let settings = PreprocessSettings {
            max_output_pixels: 500,
            ..Default::default()
        };
        // 30x30 = 900 pixels > 500
        let result = prepare(&png, &settings);
        assert!(matches!(result, Err(OcrError::ImageDecode { .. })));
    }

    #[test]
    fn test_scale_one_keeps_size() {
        let png = solid_png(5, 3, [10, 20, 30, 255]);
        let settings = PreprocessSettings {
            scale: 1,
            ..Default::default()
        };
        let prepared = prepare(&png, &settings).unwrap();
        assert_eq!((prepared.width, prepared.height), (5, 3));
    }
}
