//! Reference manipulation backend built on the `image` crate.
//!
//! | Operation | Arguments | Effect |
//! |---|---|---|
//! | `resize` | width?, height?, flag? | fit box; `!` exact, `%` percent |
//! | `crop` | width, height, x?, y? | crop placed by the current gravity |
//! | `gravity` | name | `NorthWest` .. `SouthEast`, `Center` |
//! | `blur` | radius, sigma? | gaussian blur |
//! | `sharpen` | sigma, threshold? | unsharp mask |
//! | `colorize` | red, green, blue | per channel percent shift |
//! | `contrast` | steps | `+n` / `-n` contrast steps |
//! | `sepia`, `negative`, `monochrome` | | colour filters |
//! | `rotate` | degrees | multiples of 90 |
//! | `flip`, `flop` | | vertical / horizontal mirror |
//! | `autoOrient` | | apply the source EXIF orientation |
//! | `noProfile`, `strip` | | drop embedded profiles on encode |
//! | `quality` | 1-100 | encoder quality |

use super::backend::{ImageHandle, ImageManipulator, Operation};
use super::compressor::Compressor;
use super::loader::Loader;
use super::metadata::MetadataProcessor;
use super::resizer::{ResizeAlgorithm, ResizeMode, Resizer};
use crate::core::{Dimensions, ImagerError, Result};
use image::{DynamicImage, ImageFormat, Rgba};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

const CONTRAST_STEP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    pub fn parse(name: &str) -> Option<Self> {
        let gravity = match name.to_ascii_lowercase().as_str() {
            "northwest" => Gravity::NorthWest,
            "north" => Gravity::North,
            "northeast" => Gravity::NorthEast,
            "west" => Gravity::West,
            "center" | "centre" => Gravity::Center,
            "east" => Gravity::East,
            "southwest" => Gravity::SouthWest,
            "south" => Gravity::South,
            "southeast" => Gravity::SouthEast,
            _ => return None,
        };
        Some(gravity)
    }

    /// Top-left corner of a `crop` box inside `outer`.
    fn origin(self, outer: Dimensions, crop: Dimensions) -> (u32, u32) {
        let free_x = outer.width.saturating_sub(crop.width);
        let free_y = outer.height.saturating_sub(crop.height);
        let x = match self {
            Gravity::NorthWest | Gravity::West | Gravity::SouthWest => 0,
            Gravity::North | Gravity::Center | Gravity::South => free_x / 2,
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => free_x,
        };
        let y = match self {
            Gravity::NorthWest | Gravity::North | Gravity::NorthEast => 0,
            Gravity::West | Gravity::Center | Gravity::East => free_y / 2,
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => free_y,
        };
        (x, y)
    }
}

#[derive(Debug, Clone)]
pub struct RasterManipulator {
    loader: Loader,
    algorithm: ResizeAlgorithm,
    quality: u8,
}

impl RasterManipulator {
    pub fn new() -> Self {
        Self {
            loader: Loader::new(),
            algorithm: ResizeAlgorithm::default(),
            quality: Compressor::default().quality(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }
}

impl Default for RasterManipulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageManipulator for RasterManipulator {
    fn open(&self, path: &Path) -> Result<Box<dyn ImageHandle>> {
        let (image, format) = self.loader.load(path)?;
        Ok(Box::new(RasterHandle {
            source: path.to_path_buf(),
            image,
            format,
            gravity: Gravity::default(),
            resizer: Resizer::new(self.algorithm),
            compressor: Compressor::new(self.quality),
        }))
    }
}

pub struct RasterHandle {
    source: PathBuf,
    image: DynamicImage,
    format: ImageFormat,
    gravity: Gravity,
    resizer: Resizer,
    compressor: Compressor,
}

impl RasterHandle {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    fn crop(&mut self, operation: &Operation) -> Result<()> {
        let (width, height) = required_pair(operation)?;
        let current = self.dimensions();
        let width = width.min(current.width);
        let height = height.min(current.height);

        let (origin_x, origin_y) = self.gravity.origin(current, Dimensions::new(width, height));
        let x = origin_x
            .saturating_add(operation.arg(2).as_u32().unwrap_or(0))
            .min(current.width - width);
        let y = origin_y
            .saturating_add(operation.arg(3).as_u32().unwrap_or(0))
            .min(current.height - height);

        self.image = self.image.crop_imm(x, y, width, height);
        Ok(())
    }

    fn colorize(&mut self, operation: &Operation) -> Result<()> {
        let red = operation.arg(0).as_f64().unwrap_or(0.0);
        let green = operation.arg(1).as_f64().unwrap_or(red);
        let blue = operation.arg(2).as_f64().unwrap_or(green);
        let shift = |value: u8, percent: f64| -> u8 {
            let value = value as f64;
            let shifted = if percent >= 0.0 {
                value + (255.0 - value) * percent / 100.0
            } else {
                value * (1.0 + percent / 100.0)
            };
            shifted.round().clamp(0.0, 255.0) as u8
        };

        let mut pixels = self.image.to_rgba8();
        for Rgba([r, g, b, _]) in pixels.pixels_mut() {
            *r = shift(*r, red);
            *g = shift(*g, green);
            *b = shift(*b, blue);
        }
        self.image = DynamicImage::ImageRgba8(pixels);
        Ok(())
    }

    fn sepia(&mut self) {
        let mut pixels = self.image.to_rgba8();
        for Rgba([r, g, b, _]) in pixels.pixels_mut() {
            let (red, green, blue) = (*r as f32, *g as f32, *b as f32);
            *r = (0.393 * red + 0.769 * green + 0.189 * blue).min(255.0) as u8;
            *g = (0.349 * red + 0.686 * green + 0.168 * blue).min(255.0) as u8;
            *b = (0.272 * red + 0.534 * green + 0.131 * blue).min(255.0) as u8;
        }
        self.image = DynamicImage::ImageRgba8(pixels);
    }

    fn blur(&mut self, operation: &Operation) -> Result<()> {
        let radius = operation.arg(0).as_f64().unwrap_or(0.0);
        let sigma = operation.arg(1).as_f64().unwrap_or(radius) as f32;
        if sigma <= 0.0 {
            return Ok(());
        }
        let blurred = imageproc::filter::gaussian_blur_f32(&self.image.to_rgba8(), sigma);
        self.image = DynamicImage::ImageRgba8(blurred);
        Ok(())
    }

    fn rotate(&mut self, operation: &Operation) -> Result<()> {
        let degrees = operation
            .arg(0)
            .as_f64()
            .ok_or_else(|| invalid(operation, "degrees required"))?;
        self.image = match (degrees.round() as i64).rem_euclid(360) {
            0 => return Ok(()),
            90 => self.image.rotate90(),
            180 => self.image.rotate180(),
            270 => self.image.rotate270(),
            _ => return Err(invalid(operation, "only multiples of 90 degrees are supported")),
        };
        Ok(())
    }
}

impl ImageHandle for RasterHandle {
    fn size(&mut self) -> Result<Dimensions> {
        Ok(self.dimensions())
    }

    fn apply(&mut self, operation: &Operation) -> Result<()> {
        log::debug!("Applying {} to {}", operation, self.source.display());

        match operation.name() {
            "resize" => {
                let flag = operation.arg(2).as_str();
                if let Some(mode) =
                    ResizeMode::from_request(operation.arg(0).as_u32(), operation.arg(1).as_u32(), flag)
                {
                    self.image = self.resizer.resize(&self.image, mode);
                }
            }
            "crop" => self.crop(operation)?,
            "gravity" => {
                self.gravity = operation
                    .arg(0)
                    .as_str()
                    .and_then(Gravity::parse)
                    .ok_or_else(|| invalid(operation, "unknown gravity"))?;
            }
            "blur" => self.blur(operation)?,
            "sharpen" | "unsharp" => {
                let sigma = operation.arg(0).as_f64().unwrap_or(1.0) as f32;
                let threshold = operation.arg(1).as_f64().unwrap_or(0.0) as i32;
                self.image = self.image.unsharpen(sigma, threshold);
            }
            "colorize" => self.colorize(operation)?,
            "contrast" => {
                let steps = operation.arg(0).as_f64().unwrap_or(1.0) as f32;
                self.image = self.image.adjust_contrast(steps * CONTRAST_STEP);
            }
            "sepia" => self.sepia(),
            "negative" => self.image.invert(),
            "monochrome" | "grayscale" => self.image = self.image.grayscale(),
            "rotate" => self.rotate(operation)?,
            "flip" => self.image = self.image.flipv(),
            "flop" => self.image = self.image.fliph(),
            "autoOrient" => {
                let orientation = MetadataProcessor::new().orientation(&self.source);
                self.image = orientation.apply(&self.image);
            }
            // Re-encoding already drops embedded profiles and EXIF.
            "noProfile" | "strip" => {}
            "quality" => {
                let quality = operation
                    .arg(0)
                    .as_u32()
                    .ok_or_else(|| invalid(operation, "quality required"))?;
                self.compressor = Compressor::new(quality.min(100) as u8);
            }
            other => {
                return Err(ImagerError::ProcessingError(format!(
                    "Unsupported operation: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    fn write(&mut self, destination: &Path) -> Result<()> {
        self.compressor.save(&self.image, destination, self.format)
    }

    fn stream(&mut self) -> Result<Box<dyn Read + Send>> {
        let bytes = self.compressor.compress_to_bytes(&self.image, self.format)?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

fn required_pair(operation: &Operation) -> Result<(u32, u32)> {
    match (operation.arg(0).as_u32(), operation.arg(1).as_u32()) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(invalid(operation, "positive width and height required")),
    }
}

fn invalid(operation: &Operation, reason: &str) -> ImagerError {
    ImagerError::InvalidParameter(format!("{}: {}", operation, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::backend::OpArg;
    use image::RgbImage;

    fn open_fixture(width: u32, height: u32) -> (tempfile::TempDir, Box<dyn ImageHandle>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.png");
        RgbImage::from_pixel(width, height, image::Rgb([120, 60, 30]))
            .save(&path)
            .unwrap();
        let handle = RasterManipulator::new().open(&path).unwrap();
        (dir, handle)
    }

    fn op(name: &'static str, args: Vec<OpArg>) -> Operation {
        Operation::new(name, args)
    }

    #[test]
    fn resize_then_center_crop() {
        let (_dir, mut handle) = open_fixture(80, 40);
        handle
            .apply(&op("resize", vec![OpArg::Absent, 20.into()]))
            .unwrap();
        assert_eq!(handle.size().unwrap(), Dimensions::new(40, 20));

        handle.apply(&op("gravity", vec!["Center".into()])).unwrap();
        handle.apply(&op("crop", vec![20.into(), 20.into()])).unwrap();
        assert_eq!(handle.size().unwrap(), Dimensions::new(20, 20));
    }

    #[test]
    fn crop_offsets_clamp_to_the_image() {
        let (_dir, mut handle) = open_fixture(30, 30);
        handle.apply(&op("gravity", vec!["Center".into()])).unwrap();
        handle
            .apply(&op(
                "crop",
                vec![10.into(), 10.into(), u32::MAX.into(), u32::MAX.into()],
            ))
            .unwrap();
        assert_eq!(handle.size().unwrap(), Dimensions::new(10, 10));
    }

    #[test]
    fn strip_is_accepted() {
        let (_dir, mut handle) = open_fixture(4, 4);
        handle.apply(&op("strip", Vec::new())).unwrap();
        handle.apply(&op("noProfile", Vec::new())).unwrap();
        assert_eq!(handle.size().unwrap(), Dimensions::new(4, 4));
    }

    #[test]
    fn gravity_places_crop_origin() {
        let outer = Dimensions::new(100, 50);
        let crop = Dimensions::new(20, 10);
        assert_eq!(Gravity::Center.origin(outer, crop), (40, 20));
        assert_eq!(Gravity::SouthEast.origin(outer, crop), (80, 40));
        assert_eq!(Gravity::NorthWest.origin(outer, crop), (0, 0));
        assert_eq!(Gravity::parse("centre"), Some(Gravity::Center));
        assert_eq!(Gravity::parse("middle"), None);
    }

    #[test]
    fn colour_filters_change_pixels() {
        let (_dir, mut handle) = open_fixture(4, 4);
        let before = handle.stream().unwrap();
        let before = read_all(before);

        handle.apply(&op("sepia", Vec::new())).unwrap();
        handle
            .apply(&op("colorize", vec![10.into(), (-20).into(), 25.into()]))
            .unwrap();
        handle.apply(&op("blur", vec![2.into()])).unwrap();
        handle.apply(&op("contrast", vec!["+4".into()])).unwrap();

        let after = read_all(handle.stream().unwrap());
        assert_ne!(before, after);
        assert_eq!(handle.size().unwrap(), Dimensions::new(4, 4));
    }

    #[test]
    fn rotate_accepts_right_angles_only() {
        let (_dir, mut handle) = open_fixture(6, 2);
        handle.apply(&op("rotate", vec![90.into()])).unwrap();
        assert_eq!(handle.size().unwrap(), Dimensions::new(2, 6));
        assert!(handle.apply(&op("rotate", vec![45.into()])).is_err());
    }

    #[test]
    fn unknown_operation_fails() {
        let (_dir, mut handle) = open_fixture(2, 2);
        let err = handle.apply(&op("swirl", vec![90.into()])).unwrap_err();
        assert!(matches!(err, ImagerError::ProcessingError(ref m) if m.contains("swirl")));
    }

    #[test]
    fn write_encodes_by_destination_extension() {
        let (dir, mut handle) = open_fixture(5, 3);
        let destination = dir.path().join("copy.jpg");
        handle.write(&destination).unwrap();
        let bytes = std::fs::read(&destination).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        bytes
    }
}
