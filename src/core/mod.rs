// cloud-imager/src/core/mod.rs
mod config;
mod descriptor;
mod preset;
pub(crate) mod processor;
mod template;

pub use config::{
    DefaultResultTransformator, ImagerConfig, ProcessOutput, ResultTransformator, VariantResults,
    DEFAULT_FILE_NAME_FORMAT, MAX_IMAGES_IN_FLIGHT, MAX_VARIANTS_IN_FLIGHT,
};
pub use descriptor::{
    ExtensionMimeLookup, FileDescriptor, FileDescriptorInput, MimeLookup, UploadRecord,
};
pub(crate) use descriptor::mime_extension_for;
pub use preset::{Preset, PresetOptions, PresetRegistry, Variants, DEFAULT_PRESET};
pub use processor::{CloudImager, ImageBatch};
pub use template::{
    Context, DefaultFileNameFormatter, FileNameFormat, FileNameFormatter, ORIGINAL_VARIANT,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unknown or incompatible image format: {0}")]
    UnsupportedFormat(String),

    #[error("Non-existing preset \"{0}\"")]
    UnknownPreset(String),

    #[error("Transform step failed for variant \"{variant}\": {message}")]
    TransformStepFailure { variant: String, message: String },

    #[error("Outlet failed for variant \"{variant}\": {message}")]
    OutletFailure { variant: String, message: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl ImagerError {
    /// Tags a backend or step error with the variant it broke.
    pub fn step_failure(variant: &str, error: ImagerError) -> Self {
        match error {
            tagged @ ImagerError::TransformStepFailure { .. } => tagged,
            other => ImagerError::TransformStepFailure {
                variant: variant.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Tags a persistence error with the variant whose artifact was lost.
    pub fn outlet_failure(variant: &str, error: ImagerError) -> Self {
        match error {
            tagged @ ImagerError::OutletFailure { .. } => tagged,
            other => ImagerError::OutletFailure {
                variant: variant.to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ImagerError>;

/// Width and height in pixels, as reported by a manipulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}
