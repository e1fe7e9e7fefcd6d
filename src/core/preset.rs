// cloud-imager/src/core/preset.rs
use super::template::{Context, FileNameFormat, ORIGINAL_VARIANT};
use super::{FileDescriptor, ImagerError, Result};
use crate::outlets::OutletSpec;
use crate::processors::{SharedStep, Step};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PRESET: &str = "default";

/// Variant name to ordered step pipeline.
#[derive(Clone, Default)]
pub struct Variants(BTreeMap<String, Vec<SharedStep>>);

impl Variants {
    pub fn new() -> Self {
        Self::default()
    }

    /// A variant made of a single step.
    pub fn variant(self, name: impl Into<String>, step: impl Step + 'static) -> Self {
        self.pipeline(name, vec![Arc::new(step) as SharedStep])
    }

    pub fn pipeline(mut self, name: impl Into<String>, steps: Vec<SharedStep>) -> Self {
        self.0.insert(name.into(), steps);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SharedStep])> {
        self.0.iter().map(|(name, steps)| (name.as_str(), steps.as_slice()))
    }

    pub fn steps(&self, name: &str) -> Option<&[SharedStep]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

impl fmt::Debug for Variants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct PresetOptions {
    pub keep_original: bool,
    pub outlet: Option<OutletSpec>,
    pub file_name_format: Option<FileNameFormat>,
    /// Extra placeholder values for file name formats.
    pub extra: BTreeMap<String, String>,
}

impl Default for PresetOptions {
    fn default() -> Self {
        Self {
            keep_original: true,
            outlet: None,
            file_name_format: None,
            extra: BTreeMap::new(),
        }
    }
}

impl PresetOptions {
    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }

    pub fn outlet(mut self, outlet: impl Into<OutletSpec>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn file_name_format(mut self, format: impl Into<FileNameFormat>) -> Self {
        self.file_name_format = Some(format.into());
        self
    }

    pub fn extra_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Preset {
    name: String,
    variants: Variants,
    options: PresetOptions,
}

impl Preset {
    pub fn new(name: impl Into<String>, variants: Variants, options: PresetOptions) -> Result<Self> {
        let name = name.into();
        if variants.is_empty() {
            return Err(ImagerError::InvalidParameter(format!(
                "Preset \"{}\" needs at least one variant",
                name
            )));
        }
        if let Some((variant, _)) = variants.iter().find(|(_, steps)| steps.is_empty()) {
            return Err(ImagerError::InvalidParameter(format!(
                "Variant \"{}\" of preset \"{}\" has no steps",
                variant, name
            )));
        }
        if options.keep_original && variants.steps(ORIGINAL_VARIANT).is_some() {
            return Err(ImagerError::InvalidParameter(format!(
                "Preset \"{}\" keeps the original, so no variant may be named \"{}\"",
                name, ORIGINAL_VARIANT
            )));
        }

        Ok(Self {
            name,
            variants,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &Variants {
        &self.variants
    }

    pub fn keep_original(&self) -> bool {
        self.options.keep_original
    }

    pub fn outlet(&self) -> Option<&OutletSpec> {
        self.options.outlet.as_ref()
    }

    pub fn file_name_format(&self) -> Option<&FileNameFormat> {
        self.options.file_name_format.as_ref()
    }

    pub fn context<'a>(&self, image: &'a FileDescriptor, variant: &str) -> Context<'a> {
        Context::new(image, &self.name, variant).with_extra(&self.options.extra)
    }
}

/// Presets by name. Filled during setup, read by `process`.
#[derive(Debug, Default)]
pub struct PresetRegistry {
    presets: HashMap<String, Arc<Preset>>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `preset`, replacing any preset of the same name.
    pub fn register(&mut self, preset: Preset) {
        log::debug!(
            "Registered preset \"{}\" with {} variant(s)",
            preset.name(),
            preset.variants().len()
        );
        self.presets.insert(preset.name().to_string(), Arc::new(preset));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Preset>> {
        self.presets.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}
