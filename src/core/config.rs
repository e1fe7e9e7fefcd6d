// cloud-imager/src/core/config.rs
use super::descriptor::{ExtensionMimeLookup, MimeLookup};
use super::template::{Context, DefaultFileNameFormatter, FileNameFormat, FileNameFormatter};
use super::{ImagerError, Result};
use crate::outlets::{OutletRef, OutletSpec};
use crate::processors::{ImageManipulator, RasterManipulator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_FILE_NAME_FORMAT: &str = "{{uid}}{{prefixedVariant}}{{mimeExtension}}";

/// Images of one batch processed at the same time.
pub const MAX_IMAGES_IN_FLIGHT: usize = 2;

/// Variant pipelines of one image processed at the same time.
pub const MAX_VARIANTS_IN_FLIGHT: usize = 3;

/// Outlet references of one image, keyed by variant name.
pub type VariantResults = BTreeMap<String, OutletRef>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcessOutput {
    Single(VariantResults),
    Batch(Vec<VariantResults>),
}

impl ProcessOutput {
    pub fn into_single(self) -> Option<VariantResults> {
        match self {
            ProcessOutput::Single(results) => Some(results),
            ProcessOutput::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Vec<VariantResults> {
        match self {
            ProcessOutput::Single(results) => vec![results],
            ProcessOutput::Batch(results) => results,
        }
    }
}

/// Reshapes the ordered per-image results of a `process` call.
pub trait ResultTransformator: Send + Sync {
    fn transform(
        &self,
        results: Vec<VariantResults>,
        preset: &str,
        is_single: bool,
    ) -> Result<ProcessOutput>;
}

impl<F> ResultTransformator for F
where
    F: Fn(Vec<VariantResults>, &str, bool) -> Result<ProcessOutput> + Send + Sync,
{
    fn transform(
        &self,
        results: Vec<VariantResults>,
        preset: &str,
        is_single: bool,
    ) -> Result<ProcessOutput> {
        self(results, preset, is_single)
    }
}

/// Unwraps a single input to its own mapping, keeps batches as sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResultTransformator;

impl ResultTransformator for DefaultResultTransformator {
    fn transform(
        &self,
        results: Vec<VariantResults>,
        _preset: &str,
        is_single: bool,
    ) -> Result<ProcessOutput> {
        if is_single {
            Ok(ProcessOutput::Single(
                results.into_iter().next().unwrap_or_default(),
            ))
        } else {
            Ok(ProcessOutput::Batch(results))
        }
    }
}

/// Process-wide settings of a [`CloudImager`](super::CloudImager).
///
/// Cloning is cheap; `process` works on a clone taken when the call starts.
#[derive(Clone)]
pub struct ImagerConfig {
    default_outlet: Option<OutletSpec>,
    upload_directory: Option<PathBuf>,
    file_name_format: FileNameFormat,
    file_name_formatter: Arc<dyn FileNameFormatter>,
    result_transformator: Arc<dyn ResultTransformator>,
    image_manipulator: Arc<dyn ImageManipulator>,
    mime_lookup: Arc<dyn MimeLookup>,
}

impl Default for ImagerConfig {
    fn default() -> Self {
        Self {
            default_outlet: None,
            upload_directory: None,
            file_name_format: FileNameFormat::from(DEFAULT_FILE_NAME_FORMAT),
            file_name_formatter: Arc::new(DefaultFileNameFormatter),
            result_transformator: Arc::new(DefaultResultTransformator),
            image_manipulator: Arc::new(RasterManipulator::new()),
            mime_lookup: Arc::new(ExtensionMimeLookup),
        }
    }
}

impl ImagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let FileNameFormat::Template(template) = &self.file_name_format {
            if template.trim().is_empty() {
                return Err(ImagerError::InvalidParameter(
                    "File name format must not be empty".to_string(),
                ));
            }
        }

        if let Some(dir) = &self.upload_directory {
            if dir.components().any(|c| c == Component::ParentDir) {
                return Err(ImagerError::InvalidParameter(format!(
                    "Path traversal detected in upload directory: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Resolves `format`, or the configured format, against `context`.
    pub fn format_file_name(&self, format: Option<&FileNameFormat>, context: &Context<'_>) -> String {
        self.file_name_formatter
            .format(format.unwrap_or(&self.file_name_format), context)
    }

    pub fn default_outlet(&self) -> Option<&OutletSpec> {
        self.default_outlet.as_ref()
    }

    pub fn set_default_outlet(&mut self, outlet: Option<OutletSpec>) {
        self.default_outlet = outlet;
    }

    pub fn upload_directory(&self) -> Option<&Path> {
        self.upload_directory.as_deref()
    }

    pub fn set_upload_directory(&mut self, dir: Option<PathBuf>) {
        self.upload_directory = dir;
    }

    pub fn file_name_format(&self) -> &FileNameFormat {
        &self.file_name_format
    }

    pub fn set_file_name_format(&mut self, format: impl Into<FileNameFormat>) {
        self.file_name_format = format.into();
    }

    pub fn file_name_formatter(&self) -> &dyn FileNameFormatter {
        self.file_name_formatter.as_ref()
    }

    pub fn set_file_name_formatter(&mut self, formatter: Arc<dyn FileNameFormatter>) {
        self.file_name_formatter = formatter;
    }

    pub fn result_transformator(&self) -> &dyn ResultTransformator {
        self.result_transformator.as_ref()
    }

    pub fn set_result_transformator(&mut self, transformator: Arc<dyn ResultTransformator>) {
        self.result_transformator = transformator;
    }

    pub fn image_manipulator(&self) -> &dyn ImageManipulator {
        self.image_manipulator.as_ref()
    }

    pub fn set_image_manipulator(&mut self, manipulator: Arc<dyn ImageManipulator>) {
        self.image_manipulator = manipulator;
    }

    pub fn mime_lookup(&self) -> &dyn MimeLookup {
        self.mime_lookup.as_ref()
    }

    pub fn set_mime_lookup(&mut self, lookup: Arc<dyn MimeLookup>) {
        self.mime_lookup = lookup;
    }
}

impl fmt::Debug for ImagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagerConfig")
            .field("default_outlet", &self.default_outlet)
            .field("upload_directory", &self.upload_directory)
            .field("file_name_format", &self.file_name_format)
            .finish_non_exhaustive()
    }
}
