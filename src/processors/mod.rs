// cloud-imager/src/processors/mod.rs
mod backend;
mod batch;
mod compressor;
mod loader;
mod metadata;
mod raster;
mod resizer;
pub mod steps;

pub use backend::{ImageHandle, ImageManipulator, OpArg, Operation};
pub use batch::BatchProcessor;
pub use compressor::Compressor;
pub use loader::Loader;
pub use metadata::{MetadataProcessor, Orientation};
pub use raster::{Gravity, RasterHandle, RasterManipulator};
pub use resizer::{ResizeAlgorithm, ResizeMode, Resizer};
pub use steps::{SharedStep, SmartCrop, Step};

pub mod prelude {
    pub use super::steps::*;
    pub use super::{ImageHandle, ImageManipulator, RasterManipulator, SmartCrop, Step};
}
