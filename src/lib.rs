// cloud-imager/src/lib.rs
mod core;
pub mod outlets;
pub mod processors;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use crate::core::{
    CloudImager, Context, DefaultFileNameFormatter, DefaultResultTransformator, Dimensions,
    ExtensionMimeLookup, FileDescriptor, FileDescriptorInput, FileNameFormat, FileNameFormatter,
    ImageBatch, ImagerConfig, ImagerError, MimeLookup, Preset, PresetOptions, PresetRegistry,
    ProcessOutput, Result, ResultTransformator, UploadRecord, VariantResults, Variants,
    DEFAULT_FILE_NAME_FORMAT, DEFAULT_PRESET, MAX_IMAGES_IN_FLIGHT, MAX_VARIANTS_IN_FLIGHT,
    ORIGINAL_VARIANT,
};
pub use outlets::{
    LocalDirectoryOutlet, LocalOutletOptions, ObjectStorageOptions, ObjectStorageOutlet, Outlet,
    OutletRef, OutletSpec, ReturnType, StorageClient, UploadRequest,
};
pub use processors::{
    BatchProcessor, ImageHandle, ImageManipulator, OpArg, Operation, RasterManipulator,
    SharedStep, SmartCrop, Step,
};
pub use utils::{collect_image_paths, format_file_size, is_supported_format};

pub mod prelude {
    pub use crate::processors::prelude::*;
    pub use crate::{
        CloudImager, ImagerConfig, LocalOutletOptions, OutletRef, OutletSpec, PresetOptions,
        ProcessOutput, ReturnType, Variants,
    };
}
