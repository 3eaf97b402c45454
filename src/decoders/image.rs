// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image metadata decoder and vision payload preparation

use base64::{engine::general_purpose, Engine as _};
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

use super::ContentDecoder;
use crate::{NomnomError, Result};

/// Longest side of an image sent to a vision model
const VISION_MAX_DIMENSION: u32 = 1024;

/// Extensions treated as images
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif", "ico",
];

/// Describes an image by its dimensions and format
pub struct ImageInfoDecoder;

impl ImageInfoDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageInfoDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDecoder for ImageInfoDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supported_extensions(&self) -> &[&str] {
        IMAGE_EXTENSIONS
    }

    fn priority(&self) -> u8 {
        100
    }

    fn decode(&self, path: &Path) -> Result<String> {
        let img = image::open(path)
            .map_err(|e| NomnomError::Decode(format!("{}: {}", path.display(), e)))?;
        let (width, height) = img.dimensions();
        let format = image::ImageFormat::from_path(path)
            .map(|f| format!("{:?}", f))
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(format!(
            "{} image, {}x{} pixels, {:?} color",
            format,
            width,
            height,
            img.color()
        ))
    }
}

/// True if the file name has an image extension
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Resize large images for faster processing
fn prepare_image(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path)?;

    let img = if img.width() > VISION_MAX_DIMENSION || img.height() > VISION_MAX_DIMENSION {
        img.resize(
            VISION_MAX_DIMENSION,
            VISION_MAX_DIMENSION,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    // JPEG has no alpha channel
    let img = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

    Ok(buffer)
}

/// Base64 vision payload and its media type. Falls back to the raw file
/// when the image cannot be re-encoded.
pub fn encode_for_vision(path: &Path) -> Result<(String, String)> {
    match prepare_image(path) {
        Ok(data) => Ok((general_purpose::STANDARD.encode(&data), "image/jpeg".to_string())),
        Err(e) => {
            debug!("Re-encoding {:?} failed ({}), sending raw bytes", path, e);
            let data = std::fs::read(path)?;
            Ok((general_purpose::STANDARD.encode(&data), media_type(path).to_string()))
        }
    }
}

fn media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
