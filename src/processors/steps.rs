//! Transformation steps and the named operation catalogue.
//!
//! A variant is an ordered list of [`Step`]s applied to one handle. Any
//! [`Operation`] is a step that forwards itself to the backend; closures and
//! [`SmartCrop`] cover steps that need to inspect the handle first.

use super::backend::{ImageHandle, OpArg, Operation};
use crate::core::{ImagerError, Result};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub trait Step: Send + Sync {
    fn apply(&self, handle: &mut dyn ImageHandle) -> Result<()>;

    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed("custom step")
    }
}

pub type SharedStep = Arc<dyn Step>;

impl<F> Step for F
where
    F: Fn(&mut dyn ImageHandle) -> Result<()> + Send + Sync,
{
    fn apply(&self, handle: &mut dyn ImageHandle) -> Result<()> {
        self(handle)
    }
}

impl Step for Operation {
    fn apply(&self, handle: &mut dyn ImageHandle) -> Result<()> {
        handle.apply(self)
    }

    fn describe(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl fmt::Debug for dyn Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Any named backend operation.
pub fn op(name: impl Into<Cow<'static, str>>, args: Vec<OpArg>) -> Operation {
    Operation::new(name, args)
}

pub fn resize(width: Option<u32>, height: Option<u32>) -> Operation {
    op("resize", vec![width.into(), height.into()])
}

pub fn crop(width: u32, height: u32) -> Operation {
    op("crop", vec![width.into(), height.into()])
}

pub fn crop_at(width: u32, height: u32, x: u32, y: u32) -> Operation {
    op("crop", vec![width.into(), height.into(), x.into(), y.into()])
}

pub fn gravity(name: &str) -> Operation {
    op("gravity", vec![name.into()])
}

pub fn blur(radius: f32) -> Operation {
    op("blur", vec![radius.into()])
}

pub fn sharpen(sigma: f32) -> Operation {
    op("sharpen", vec![sigma.into()])
}

pub fn colorize(red: i32, green: i32, blue: i32) -> Operation {
    op("colorize", vec![red.into(), green.into(), blue.into()])
}

/// Contrast steps, e.g. `"+4"` or `"-2"`.
pub fn contrast(steps: &str) -> Operation {
    op("contrast", vec![steps.into()])
}

pub fn sepia() -> Operation {
    op("sepia", Vec::new())
}

pub fn negative() -> Operation {
    op("negative", Vec::new())
}

pub fn monochrome() -> Operation {
    op("monochrome", Vec::new())
}

pub fn rotate(degrees: i32) -> Operation {
    op("rotate", vec![degrees.into()])
}

pub fn flip() -> Operation {
    op("flip", Vec::new())
}

pub fn flop() -> Operation {
    op("flop", Vec::new())
}

pub fn auto_orient() -> Operation {
    op("autoOrient", Vec::new())
}

pub fn no_profile() -> Operation {
    op("noProfile", Vec::new())
}

pub fn quality(value: u32) -> Operation {
    op("quality", vec![value.into()])
}

/// Fills a `width` x `height` box: resize by the constraining side, then
/// center-crop the overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartCrop {
    width: u32,
    height: u32,
}

impl SmartCrop {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(ImagerError::InvalidParameter(
                "Invalid sizing, width and height must be larger than zero".to_string(),
            ));
        }
        Ok(Self { width, height })
    }
}

impl Step for SmartCrop {
    fn apply(&self, handle: &mut dyn ImageHandle) -> Result<()> {
        let size = handle.size()?;
        if size.width == 0 || size.height == 0 {
            return Err(ImagerError::ProcessingError(
                "Could not get size of image".to_string(),
            ));
        }

        let target_ratio = self.width as f64 / self.height as f64;
        let actual_ratio = size.aspect_ratio();

        // Too tall: fix the width. Too wide: fix the height.
        handle.apply(&resize(
            (target_ratio >= actual_ratio).then_some(self.width),
            (target_ratio <= actual_ratio).then_some(self.height),
        ))?;
        if target_ratio != actual_ratio {
            handle.apply(&gravity("Center"))?;
            handle.apply(&crop(self.width, self.height))?;
        }
        handle.apply(&no_profile())?;
        handle.apply(&auto_orient())
    }

    fn describe(&self) -> Cow<'_, str> {
        Cow::Owned(format!("smartCrop({}, {})", self.width, self.height))
    }
}

pub fn smart_crop(width: u32, height: u32) -> Result<SmartCrop> {
    SmartCrop::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockManipulator, RecordedCall};
    use crate::ImageManipulator;
    use std::path::Path;

    #[test]
    fn smart_crop_rejects_empty_box() {
        assert!(SmartCrop::new(0, 10).is_err());
        assert!(SmartCrop::new(10, 0).is_err());
        assert!(SmartCrop::new(1, 1).is_ok());
    }

    #[test]
    fn smart_crop_on_wide_image_fixes_height_then_crops() {
        let backend = MockManipulator::with_size(800, 400);
        let mut handle = backend.open(Path::new("wide.jpg")).unwrap();
        SmartCrop::new(100, 100).unwrap().apply(handle.as_mut()).unwrap();

        let ops = backend.operations("wide.jpg");
        assert_eq!(
            ops,
            vec![
                RecordedCall::op("resize(null, 100)"),
                RecordedCall::op("gravity(Center)"),
                RecordedCall::op("crop(100, 100)"),
                RecordedCall::op("noProfile()"),
                RecordedCall::op("autoOrient()"),
            ]
        );
    }

    #[test]
    fn smart_crop_with_matching_ratio_skips_crop() {
        let backend = MockManipulator::with_size(300, 150);
        let mut handle = backend.open(Path::new("exact.png")).unwrap();
        SmartCrop::new(100, 50).unwrap().apply(handle.as_mut()).unwrap();

        let ops = backend.operations("exact.png");
        assert_eq!(ops[0], RecordedCall::op("resize(100, 50)"));
        assert!(!ops.contains(&RecordedCall::op("crop(100, 50)")));
    }

    #[test]
    fn closures_are_steps() {
        let step = |handle: &mut dyn ImageHandle| -> Result<()> {
            let size = handle.size()?;
            handle.apply(&resize(Some(size.width / 2), None))
        };
        let backend = MockManipulator::with_size(64, 64);
        let mut handle = backend.open(Path::new("half.gif")).unwrap();
        step.apply(handle.as_mut()).unwrap();
        assert_eq!(
            backend.operations("half.gif"),
            vec![RecordedCall::op("resize(32, null)")]
        );
    }

    #[test]
    fn operations_describe_themselves() {
        assert_eq!(colorize(10, -20, 25).describe(), "colorize(10, -20, 25)");
        assert_eq!(SmartCrop::new(3, 4).unwrap().describe(), "smartCrop(3, 4)");
    }
}
