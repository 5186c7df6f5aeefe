// fixtures.rs
use std::path::{Path, PathBuf};

/// Lossless WEBP with a gradient over a checkerboard.
pub fn checkerboard_webp(width: u32, height: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let checker = ((x / 4) % 2) ^ ((y / 4) % 2) != 0;
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            let b = if checker { 220 } else { 60 };
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    webp::Encoder::from_rgba(&rgba, width, height).encode_lossless().to_vec()
}

pub fn transparent_white_webp(width: u32, height: u32) -> Vec<u8> {
    let rgba = [255u8, 255, 255, 0].repeat((width * height) as usize);
    webp::Encoder::from_rgba(&rgba, width, height).encode_lossless().to_vec()
}

pub fn write_webp(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, checkerboard_webp(width, height)).unwrap();
    path
}

/// Real PNG data behind a `.png` name.
pub fn write_png_named(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}
