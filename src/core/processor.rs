// cloud-imager/src/core/processor.rs
use super::{
    Context, FileDescriptorInput, FileNameFormat, ImagerConfig, ImagerError, Preset,
    PresetOptions, PresetRegistry, ProcessOutput, Result, UploadRecord, Variants, DEFAULT_PRESET,
};
use crate::outlets::{
    LocalDirectoryOutlet, LocalOutletOptions, ObjectStorageOptions, ObjectStorageOutlet, Outlet,
    OutletSpec, StorageClient,
};
use crate::processors::BatchProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Images handed to [`CloudImager::process`].
///
/// A single input yields a single result mapping, a list yields a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageBatch {
    Single(FileDescriptorInput),
    Many(Vec<FileDescriptorInput>),
}

impl ImageBatch {
    pub fn is_single(&self) -> bool {
        matches!(self, ImageBatch::Single(_))
    }

    pub fn into_inputs(self) -> Vec<FileDescriptorInput> {
        match self {
            ImageBatch::Single(input) => vec![input],
            ImageBatch::Many(inputs) => inputs,
        }
    }
}

macro_rules! single_input {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ImageBatch {
            fn from(input: $ty) -> Self {
                ImageBatch::Single(input.into())
            }
        })*
    };
}

single_input!(&str, String, &Path, PathBuf, UploadRecord, FileDescriptorInput);

impl<T: Into<FileDescriptorInput>> From<Vec<T>> for ImageBatch {
    fn from(inputs: Vec<T>) -> Self {
        ImageBatch::Many(inputs.into_iter().map(Into::into).collect())
    }
}

/// Registers presets and runs them over images, handing every artifact to an outlet.
///
/// Register presets and adjust the configuration before the first
/// `process` call; a call works on a snapshot taken when it starts.
pub struct CloudImager {
    config: ImagerConfig,
    presets: PresetRegistry,
    batch: BatchProcessor,
}

impl CloudImager {
    pub fn new() -> Result<Self> {
        Self::with_config(ImagerConfig::default())
    }

    pub fn with_config(config: ImagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            presets: PresetRegistry::new(),
            batch: BatchProcessor::new()?,
        })
    }

    pub fn config(&self) -> &ImagerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ImagerConfig {
        &mut self.config
    }

    pub fn set_default_outlet(&mut self, outlet: impl Into<OutletSpec>) {
        self.config.set_default_outlet(Some(outlet.into()));
    }

    pub fn set_upload_directory(&mut self, dir: impl Into<PathBuf>) {
        self.config.set_upload_directory(Some(dir.into()));
    }

    pub fn set_file_name_format(&mut self, format: impl Into<FileNameFormat>) {
        self.config.set_file_name_format(format);
    }

    /// Registers (or replaces) the preset `name`.
    pub fn preset(
        &mut self,
        name: impl Into<String>,
        variants: Variants,
        options: PresetOptions,
    ) -> Result<()> {
        self.presets.register(Preset::new(name, variants, options)?);
        Ok(())
    }

    pub fn default_preset(&mut self, variants: Variants, options: PresetOptions) -> Result<()> {
        self.preset(DEFAULT_PRESET, variants, options)
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.contains(name)
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    /// File name for `context`, using `format` or the configured default.
    pub fn format_file_name(&self, format: Option<&FileNameFormat>, context: &Context<'_>) -> String {
        self.config.format_file_name(format, context)
    }

    pub fn local_directory_outlet(&self, options: LocalOutletOptions) -> OutletSpec {
        OutletSpec::custom(LocalDirectoryOutlet::new(options))
    }

    pub fn object_storage_outlet(
        &self,
        client: Arc<dyn StorageClient>,
        container: impl Into<String>,
        options: ObjectStorageOptions,
    ) -> OutletSpec {
        OutletSpec::custom(ObjectStorageOutlet::new(client, container, options))
    }

    /// Runs a preset over `images`.
    ///
    /// `preset_name` defaults to `"default"`. The outlet is the first of:
    /// `outlet`, the preset's outlet, the configured default outlet, a
    /// local-directory outlet.
    pub fn process(
        &self,
        images: impl Into<ImageBatch>,
        preset_name: Option<&str>,
        outlet: Option<OutletSpec>,
    ) -> Result<ProcessOutput> {
        let preset_name = preset_name.unwrap_or(DEFAULT_PRESET);
        let preset = self
            .presets
            .get(preset_name)
            .ok_or_else(|| ImagerError::UnknownPreset(preset_name.to_string()))?;

        let mut config = self.config.clone();
        if let Some(format) = preset.file_name_format() {
            config.set_file_name_format(format.clone());
        }
        config.validate()?;

        let outlet: Arc<dyn Outlet> = match outlet
            .as_ref()
            .or_else(|| preset.outlet())
            .or_else(|| config.default_outlet())
        {
            Some(chosen) => chosen.resolve(),
            None => Arc::new(LocalDirectoryOutlet::default()),
        };

        let images = images.into();
        let is_single = images.is_single();
        let inputs = images.into_inputs();

        let results = self
            .batch
            .process_images(&inputs, &preset, outlet.as_ref(), &config)?;

        config
            .result_transformator()
            .transform(results, preset.name(), is_single)
    }

    /// [`process`](Self::process) with the default preset and outlet.
    pub fn process_default(&self, images: impl Into<ImageBatch>) -> Result<ProcessOutput> {
        self.process(images, None, None)
    }
}
