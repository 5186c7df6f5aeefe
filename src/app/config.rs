// config.rs
use image::imageops::FilterType;

/// The only input type the converter accepts.
pub const ACCEPTED_MIME_TYPE: &str = "image/webp";

/// Encoder quality in `0.0..=1.0`. Lossless formats ignore it.
pub const ENCODE_QUALITY: f32 = 0.95;

pub const OUTPUT_FILE_STEM: &str = "converted_image";

/// Upper bound on `width * height` of the upscaled raster (RGBA, so 400 MB).
pub const MAX_RASTER_PIXELS: u64 = 100_000_000;

/// Longest side of an on-screen preview texture. GPUs commonly cap textures
/// at 2048 to 8192 pixels a side.
pub const PREVIEW_MAX_SIDE: u32 = 2048;

/// Tunables of the conversion flow. Code defaults only, nothing is persisted.
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    pub accepted_mime: &'static str,
    pub encode_quality: f32,
    pub max_raster_pixels: u64,
    pub preview_max_side: u32,
    pub resize_filter: FilterType,
    pub output_file_stem: &'static str,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            accepted_mime: ACCEPTED_MIME_TYPE,
            encode_quality: ENCODE_QUALITY,
            max_raster_pixels: MAX_RASTER_PIXELS,
            preview_max_side: PREVIEW_MAX_SIDE,
            // bilinear, like a canvas draw; no ringing at alpha edges
            resize_filter: FilterType::Triangle,
            output_file_stem: OUTPUT_FILE_STEM,
        }
    }
}

impl ConverterConfig {
    /// Maps `encode_quality` onto the 1..=100 scale the JPEG encoder takes.
    pub fn jpeg_quality(&self) -> u8 {
        (self.encode_quality.clamp(0.01, 1.0) * 100.0).round() as u8
    }
}
