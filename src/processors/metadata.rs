// cloud-imager/src/processors/metadata.rs
use crate::core::{ImagerError, Result};
use exif::{Exif, In, Reader, Tag};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF orientation as stored by the camera (tag 0x0112).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    MirrorHorizontal,
    Rotate180,
    MirrorVertical,
    MirrorHorizontalRotate270,
    Rotate90,
    MirrorHorizontalRotate90,
    Rotate270,
}

impl Orientation {
    pub fn from_exif_value(value: u32) -> Self {
        match value {
            2 => Orientation::MirrorHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::MirrorVertical,
            5 => Orientation::MirrorHorizontalRotate270,
            6 => Orientation::Rotate90,
            7 => Orientation::MirrorHorizontalRotate90,
            8 => Orientation::Rotate270,
            _ => Orientation::Normal,
        }
    }

    /// Applies the transform that makes the image display upright.
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => image.clone(),
            Orientation::MirrorHorizontal => image.fliph(),
            Orientation::Rotate180 => image.rotate180(),
            Orientation::MirrorVertical => image.flipv(),
            Orientation::MirrorHorizontalRotate270 => image.rotate90().fliph(),
            Orientation::Rotate90 => image.rotate90(),
            Orientation::MirrorHorizontalRotate90 => image.rotate270().fliph(),
            Orientation::Rotate270 => image.rotate270(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn read_metadata(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Ok(Some(exif))
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                Ok(None)
            }
            Err(e) => {
                log::warn!("Failed to read EXIF from {}: {}", path.display(), e);
                Err(ImagerError::ProcessingError(format!("EXIF read error: {}", e)))
            }
        }
    }

    /// Orientation of the source, `Normal` when absent or unreadable.
    pub fn orientation(&self, path: &Path) -> Orientation {
        let exif = match self.read_metadata(path) {
            Ok(Some(exif)) => exif,
            _ => return Orientation::Normal,
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from_exif_value)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_values_map() {
        assert_eq!(Orientation::from_exif_value(6), Orientation::Rotate90);
        assert_eq!(Orientation::from_exif_value(1), Orientation::Normal);
        assert_eq!(Orientation::from_exif_value(42), Orientation::Normal);
    }

    #[test]
    fn rotation_swaps_sides() {
        let image = DynamicImage::new_rgb8(4, 2);
        let upright = Orientation::Rotate90.apply(&image);
        assert_eq!((upright.width(), upright.height()), (2, 4));
        let mirrored = Orientation::MirrorHorizontal.apply(&image);
        assert_eq!((mirrored.width(), mirrored.height()), (4, 2));
    }

    #[test]
    fn files_without_exif_are_upright() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        assert_eq!(MetadataProcessor::new().orientation(&path), Orientation::Normal);
    }
}
