// cloud-imager/src/processors/loader.rs
use crate::core::{ImagerError, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((100_000, 100_000)),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    /// Decodes `path`, returning the pixels and the detected container format.
    pub fn load(&self, path: &Path) -> Result<(DynamicImage, ImageFormat)> {
        log::debug!("Loading image from: {}", path.display());

        self.validate_path(path)?;

        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .or_else(|| ImageFormat::from_path(path).ok())
            .ok_or_else(|| {
                ImagerError::ProcessingError(format!(
                    "Failed to detect format for: {}",
                    path.display()
                ))
            })?;

        let image = reader.decode().map_err(|e| {
            ImagerError::ProcessingError(format!("Failed to decode {}: {}", path.display(), e))
        })?;

        if let Some((max_w, max_h)) = self.max_dimensions {
            if image.width() > max_w || image.height() > max_h {
                return Err(ImagerError::InvalidParameter(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    image.width(),
                    image.height(),
                    max_w,
                    max_h
                )));
            }
        }

        log::debug!(
            "Loaded image: {}x{} pixels, format: {:?}",
            image.width(),
            image.height(),
            format
        );

        Ok((image, format))
    }

    fn validate_path(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ImagerError::InvalidParameter(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        if path.metadata()?.len() == 0 {
            return Err(ImagerError::InvalidParameter(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
