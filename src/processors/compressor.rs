// cloud-imager/src/processors/compressor.rs
use crate::core::{ImagerError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use oxipng::{optimize_from_memory, Options};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    quality: u8,
    optimize_png: bool,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            optimize_png: true,
        }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encodes to `path` through a sibling temp file, so the destination
    /// only ever holds a complete artifact.
    pub fn save(&self, image: &DynamicImage, path: &Path, fallback: ImageFormat) -> Result<()> {
        let format = Self::detect_format(path).unwrap_or(fallback);
        let bytes = self.compress_to_bytes(image, format)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&bytes)?;
        staged.flush()?;
        staged.persist(path).map_err(|e| ImagerError::Io(e.error))?;

        log::debug!(
            "Saved image: {} ({} bytes, {:?}, quality {})",
            path.display(),
            bytes.len(),
            format,
            self.quality
        );
        Ok(())
    }

    pub fn compress_to_bytes(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());

        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
                DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
            }
            ImageFormat::Png => {
                image.write_to(&mut buffer, ImageFormat::Png)?;
                if self.optimize_png {
                    return self.optimize_png_bytes(&buffer.into_inner());
                }
            }
            ImageFormat::Gif => {
                DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut buffer, ImageFormat::Gif)?;
            }
            _ => {
                image.write_to(&mut buffer, format)?;
            }
        }

        Ok(buffer.into_inner())
    }

    fn optimize_png_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        optimize_from_memory(data, &Options::default())
            .map_err(|e| ImagerError::ProcessingError(format!("PNG optimization failed: {}", e)))
    }

    pub fn detect_format(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::WebP),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(85)
    }
}
