// image_processing.rs
use crate::app::config::ConverterConfig;
use crate::app::error::{ConverterError, ConverterResult};
use crate::app::{ConversionOptions, ConvertedImage, OutputFormat, PreviewHandle, ScaleFactor, SourceImage};
use crate::utils::{get_memory_usage, measure_time, Logger};
use base64::{engine::general_purpose, Engine as _};
use egui_extras::RetainedImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{imageops, ColorType, DynamicImage, GenericImageView, ImageBuffer, ImageEncoder, Rgba, RgbImage, RgbaImage};
use rayon::prelude::*;
use std::path::Path;

/// MIME type a file declares through its extension.
pub fn declared_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

pub fn validate_source(path: &Path, config: &ConverterConfig) -> ConverterResult<SourceImage> {
    let mime_type = declared_mime_type(path);
    if mime_type != config.accepted_mime {
        return Err(ConverterError::InvalidInputType {
            mime: mime_type.to_string(),
        });
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceImage {
        path: path.to_path_buf(),
        name,
        mime_type,
    })
}

/// Reads the source file into a data URI and decodes a preview of it.
///
/// Only the read can fail here. Bytes that do not decode still produce a
/// handle; the conversion step reports the decode error.
pub fn read_preview(path: &Path, config: &ConverterConfig, logger: &Logger) -> ConverterResult<PreviewHandle> {
    let (read_result, read_duration) = measure_time(|| std::fs::read(path));
    let bytes = read_result.map_err(ConverterError::ReadFailure)?;
    logger.log(format!(
        "Reading {} ({} bytes) took {:?}",
        path.display(),
        bytes.len(),
        read_duration
    ));

    let data_uri = to_data_uri(declared_mime_type(path), &bytes);
    let (image, dimensions) = match decode_webp(&bytes) {
        Ok(img) => {
            let dimensions = (img.width(), img.height());
            let preview = retained_image("source preview", &img, config.preview_max_side);
            (Some(preview), Some(dimensions))
        }
        Err(err) => {
            logger.log(format!("Preview unavailable: {}", err.detail()));
            (None, None)
        }
    };

    Ok(PreviewHandle {
        data_uri,
        dimensions,
        image,
    })
}

/// Decodes the preview handle, scales it onto a fresh raster and encodes the
/// raster in the requested format.
pub fn convert_image(
    preview_uri: &str,
    options: ConversionOptions,
    config: &ConverterConfig,
    logger: &Logger,
) -> ConverterResult<ConvertedImage> {
    logger.log(get_memory_usage());

    let bytes = decode_data_uri(preview_uri)?;
    let (decoded, decode_duration) = measure_time(|| decode_webp(&bytes));
    let decoded = decoded?;
    logger.log(format!(
        "Decoding {}x{} WEBP took {:?}",
        decoded.width(),
        decoded.height(),
        decode_duration
    ));

    let (raster, render_duration) = measure_time(|| render_scaled(&decoded, options.scale_factor, config));
    let raster = raster?;
    logger.log(format!(
        "Rendering {}x{} raster took {:?}",
        raster.width(),
        raster.height(),
        render_duration
    ));

    let (encoded, encode_duration) = measure_time(|| encode_raster(&raster, options.output_format, config));
    let encoded = encoded?;
    logger.log(format!(
        "Encoding to {} took {:?}",
        options.output_format.label(),
        encode_duration
    ));
    logger.log(get_memory_usage());

    let preview = retained_image("converted preview", &raster, config.preview_max_side);
    Ok(ConvertedImage {
        data_uri: to_data_uri(options.output_format.mime_type(), &encoded),
        bytes: encoded,
        format: options.output_format,
        width: raster.width(),
        height: raster.height(),
        image: Some(preview),
    })
}

pub fn decode_webp(bytes: &[u8]) -> ConverterResult<DynamicImage> {
    webp::Decoder::new(bytes)
        .decode()
        .map(|webp| webp.to_image())
        .ok_or_else(|| ConverterError::decode("not a decodable still WEBP image"))
}

/// Raster size for a scale factor, rounded to the nearest pixel.
pub fn target_dimensions(width: u32, height: u32, scale: ScaleFactor) -> (u64, u64) {
    let factor = scale.as_f64();
    let scale_dim = |dim: u32| (dim as f64 * factor).round() as u64;
    (scale_dim(width), scale_dim(height))
}

/// Validates a raster size and returns it in encoder units.
fn raster_size(width: u64, height: u64, config: &ConverterConfig) -> ConverterResult<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(ConverterError::encode_context(format!(
            "empty raster {}x{}",
            width, height
        )));
    }
    let pixels = width
        .checked_mul(height)
        .ok_or_else(|| ConverterError::encode_context("raster size overflows"))?;
    if pixels > config.max_raster_pixels {
        return Err(ConverterError::encode_context(format!(
            "raster {}x{} exceeds {} pixels",
            width, height, config.max_raster_pixels
        )));
    }
    let to_u32 = |dim: u64| {
        u32::try_from(dim).map_err(|_| ConverterError::encode_context("raster dimension out of range"))
    };
    Ok((to_u32(width)?, to_u32(height)?))
}

/// Draws `img` onto a raster of the scaled size, stretching it to fill the
/// whole surface.
///
/// Filtering happens on premultiplied pixels so the colour of transparent
/// pixels never bleeds into visible edges.
pub fn render_scaled(img: &DynamicImage, scale: ScaleFactor, config: &ConverterConfig) -> ConverterResult<RgbaImage> {
    let (width, height) = target_dimensions(img.width(), img.height(), scale);
    let (width, height) = raster_size(width, height, config)?;
    let mut raster = img.to_rgba8();
    if (width, height) == raster.dimensions() {
        return Ok(raster);
    }
    premultiply_in_place(&mut raster);
    let mut scaled = imageops::resize(&raster, width, height, config.resize_filter);
    drop(raster);
    unpremultiply_in_place(&mut scaled);
    Ok(scaled)
}

fn premultiply_in_place(raster: &mut RgbaImage) {
    raster.par_chunks_exact_mut(4).for_each(|px| {
        let a = px[3] as u16;
        for channel in 0..3 {
            px[channel] = ((px[channel] as u16 * a + 127) / 255) as u8;
        }
    });
}

fn unpremultiply_in_place(raster: &mut RgbaImage) {
    raster.par_chunks_exact_mut(4).for_each(|px| {
        let a = px[3] as u32;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            return;
        }
        for channel in 0..3 {
            px[channel] = ((px[channel] as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    });
}

pub fn encode_raster(raster: &RgbaImage, format: OutputFormat, config: &ConverterConfig) -> ConverterResult<Vec<u8>> {
    let (width, height) = raster.dimensions();
    let mut encoded = Vec::new();
    let result = match format {
        OutputFormat::Png => PngEncoder::new(&mut encoded).write_image(raster.as_raw(), width, height, ColorType::Rgba8),
        OutputFormat::Jpeg => {
            let flat = flatten_onto_black(raster)?;
            JpegEncoder::new_with_quality(&mut encoded, config.jpeg_quality()).write_image(
                flat.as_raw(),
                width,
                height,
                ColorType::Rgb8,
            )
        }
    };
    result.map_err(|e| ConverterError::encode_context(e.to_string()))?;
    Ok(encoded)
}

/// Composites RGBA over an opaque black background, the way a canvas exports
/// to a format without alpha.
fn flatten_onto_black(raster: &RgbaImage) -> ConverterResult<RgbImage> {
    let (width, height) = raster.dimensions();
    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    rgb.par_chunks_exact_mut(3)
        .zip(raster.as_raw().par_chunks_exact(4))
        .for_each(|(dst, px)| {
            let a = px[3] as u16;
            for channel in 0..3 {
                dst[channel] = ((px[channel] as u16 * a + 127) / 255) as u8;
            }
        });
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| ConverterError::encode_context("flattened buffer has the wrong size"))
}

pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, general_purpose::STANDARD.encode(bytes))
}

pub fn decode_data_uri(uri: &str) -> ConverterResult<Vec<u8>> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .and_then(|(header, data)| header.ends_with(";base64").then_some(data))
        .ok_or_else(|| ConverterError::decode("malformed data URI"))?;
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ConverterError::decode(format!("invalid base64 payload: {}", e)))
}

/// Largest size with the same aspect ratio that fits in a `max_side` square.
pub fn preview_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width, height);
    }
    let ratio = max_side as f64 / width.max(height) as f64;
    let fit = |dim: u32| ((dim as f64 * ratio).round() as u32).clamp(1, max_side);
    (fit(width), fit(height))
}

/// On-screen copy of `img`, shrunk to stay under the GPU texture size limit.
fn retained_image<I>(debug_name: &str, img: &I, max_side: u32) -> RetainedImage
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = preview_size(img.width(), img.height(), max_side);
    let rgba: RgbaImage = if (width, height) == img.dimensions() {
        ImageBuffer::from_fn(width, height, |x, y| img.get_pixel(x, y))
    } else {
        imageops::thumbnail(img, width, height)
    };
    let size = [width as usize, height as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
    RetainedImage::from_color_image(debug_name, color_image)
}
