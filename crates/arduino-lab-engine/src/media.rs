use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::EngineError;

pub const VISION_IMAGE_SIZE: u32 = 512;
pub const VISION_JPEG_QUALITY: u8 = 90;

/// Photo prepared for the vision model: 512x512 JPEG as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    data_url: String,
    jpeg_len: usize,
}

impl ImageAttachment {
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let bytes = std::fs::read(path)?;
        Self::from_image_bytes(&bytes)
    }

    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let image = image::load_from_memory(bytes).map_err(EngineError::ImageEncoding)?;
        Self::from_image(&image)
    }

    /// Stretches to a square without keeping aspect ratio, and flattens any
    /// transparency onto white.
    pub fn from_image(image: &DynamicImage) -> Result<Self, EngineError> {
        let resized = image.resize_exact(VISION_IMAGE_SIZE, VISION_IMAGE_SIZE, FilterType::Triangle);
        let rgba = resized.to_rgba8();
        let mut rgb = RgbImage::new(rgba.width(), rgba.height());
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as f32 / 255.0;
            let blend = |channel: u8| (channel as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
            rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
        }

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, VISION_JPEG_QUALITY);
        encoder
            .encode_image(&rgb)
            .map_err(EngineError::ImageEncoding)?;
        Ok(Self {
            data_url: format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes)),
            jpeg_len: bytes.len(),
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn jpeg_len(&self) -> usize {
        self.jpeg_len
    }
}

/// Bytes returned by the images endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        let mime_type = sniff_mime(&bytes);
        Self { bytes, mime_type }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/png" => "png",
            _ => "bin",
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}
