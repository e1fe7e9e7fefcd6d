// cloud-imager/src/outlets/local.rs
use super::{Outlet, OutletRef};
use crate::core::{Context, FileNameFormat, ImagerConfig, Result};
use crate::processors::ImageHandle;
use crate::utils::{ensure_contained, normalize_path, relative_path, to_slash};
use std::path::{Path, PathBuf};

/// Shape of the reference returned for a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    /// Relative to the outlet's `cwd`.
    #[default]
    Relative,
    /// `/` followed by the relative path.
    Url,
    Absolute,
}

#[derive(Debug, Clone, Default)]
pub struct LocalOutletOptions {
    pub file_name_format: Option<FileNameFormat>,
    pub upload_directory: Option<PathBuf>,
    /// Base for relative directories and returned paths; process cwd if unset.
    pub cwd: Option<PathBuf>,
    pub return_type: ReturnType,
    pub include_size: bool,
}

impl LocalOutletOptions {
    pub fn file_name_format(mut self, format: impl Into<FileNameFormat>) -> Self {
        self.file_name_format = Some(format.into());
        self
    }

    pub fn upload_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_directory = Some(dir.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn include_size(mut self, include: bool) -> Self {
        self.include_size = include;
        self
    }
}

/// Writes artifacts below an upload directory on the local disk.
#[derive(Debug, Clone, Default)]
pub struct LocalDirectoryOutlet {
    options: LocalOutletOptions,
}

impl LocalDirectoryOutlet {
    pub fn new(options: LocalOutletOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LocalOutletOptions {
        &self.options
    }

    fn cwd(&self) -> Result<PathBuf> {
        let cwd = match &self.options.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        Ok(if cwd.is_absolute() {
            cwd
        } else {
            std::env::current_dir()?.join(cwd)
        })
    }

    /// Absolute destination for `context`, without touching the disk.
    pub fn destination(&self, context: &Context<'_>, config: &ImagerConfig) -> Result<PathBuf> {
        let name = config.format_file_name(self.options.file_name_format.as_ref(), context);
        ensure_contained(&name)?;

        let dir = self
            .options
            .upload_directory
            .as_deref()
            .or_else(|| config.upload_directory())
            .unwrap_or_else(|| Path::new("."));

        Ok(normalize_path(&self.cwd()?.join(dir).join(name)))
    }
}

impl Outlet for LocalDirectoryOutlet {
    fn persist(
        &self,
        handle: &mut dyn ImageHandle,
        context: &Context<'_>,
        config: &ImagerConfig,
    ) -> Result<OutletRef> {
        let abs_path = self.destination(context, config)?;
        if let Some(parent) = abs_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        handle.write(&abs_path)?;
        log::info!("Stored {} variant at {}", context.variant().unwrap_or("?"), abs_path.display());

        let cwd = self.cwd()?;
        let location = match self.options.return_type {
            ReturnType::Absolute => abs_path.display().to_string(),
            ReturnType::Url => format!("/{}", to_slash(&relative_path(&cwd, &abs_path))),
            ReturnType::Relative => relative_path(&cwd, &abs_path).display().to_string(),
        };

        if self.options.include_size {
            let size = config.image_manipulator().open(&abs_path)?.size()?;
            return Ok(OutletRef::Sized { url: location, size });
        }

        Ok(match self.options.return_type {
            ReturnType::Url => OutletRef::Url(location),
            _ => OutletRef::Path(location),
        })
    }
}
