//! Outlets persist a finished handle and return where it landed.
//!
//! An outlet gets the handle only for the duration of [`Outlet::persist`];
//! it must not keep it. A failed persist must not report a reference.

mod local;
mod storage;

pub use local::{LocalDirectoryOutlet, LocalOutletOptions, ReturnType};
pub use storage::{ObjectStorageOptions, ObjectStorageOutlet, StorageClient, UploadRequest};

use crate::core::{Context, Dimensions, ImagerConfig, Result};
use crate::processors::ImageHandle;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait Outlet: Send + Sync {
    fn persist(
        &self,
        handle: &mut dyn ImageHandle,
        context: &Context<'_>,
        config: &ImagerConfig,
    ) -> Result<OutletRef>;
}

impl<F> Outlet for F
where
    F: Fn(&mut dyn ImageHandle, &Context<'_>, &ImagerConfig) -> Result<OutletRef> + Send + Sync,
{
    fn persist(
        &self,
        handle: &mut dyn ImageHandle,
        context: &Context<'_>,
        config: &ImagerConfig,
    ) -> Result<OutletRef> {
        self(handle, context, config)
    }
}

/// Durable reference returned by an outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutletRef {
    Path(String),
    Url(String),
    Sized { url: String, size: Dimensions },
}

impl OutletRef {
    /// The path or URL, whatever the shape.
    pub fn location(&self) -> &str {
        match self {
            OutletRef::Path(location) | OutletRef::Url(location) => location,
            OutletRef::Sized { url, .. } => url,
        }
    }

    pub fn size(&self) -> Option<Dimensions> {
        match self {
            OutletRef::Sized { size, .. } => Some(*size),
            _ => None,
        }
    }
}

impl fmt::Display for OutletRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            Some(size) => write!(f, "{} ({}x{})", self.location(), size.width, size.height),
            None => f.write_str(self.location()),
        }
    }
}

/// An outlet, or a directory path standing for a local-directory outlet.
#[derive(Clone)]
pub enum OutletSpec {
    Directory(PathBuf),
    Custom(Arc<dyn Outlet>),
}

impl OutletSpec {
    pub fn custom(outlet: impl Outlet + 'static) -> Self {
        OutletSpec::Custom(Arc::new(outlet))
    }

    pub fn resolve(&self) -> Arc<dyn Outlet> {
        match self {
            OutletSpec::Directory(dir) => Arc::new(LocalDirectoryOutlet::new(
                LocalOutletOptions::default().upload_directory(dir.clone()),
            )),
            OutletSpec::Custom(outlet) => Arc::clone(outlet),
        }
    }
}

impl fmt::Debug for OutletSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutletSpec::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            OutletSpec::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for OutletSpec {
    fn from(dir: &str) -> Self {
        OutletSpec::Directory(PathBuf::from(dir))
    }
}

impl From<&Path> for OutletSpec {
    fn from(dir: &Path) -> Self {
        OutletSpec::Directory(dir.to_path_buf())
    }
}

impl From<PathBuf> for OutletSpec {
    fn from(dir: PathBuf) -> Self {
        OutletSpec::Directory(dir)
    }
}

impl From<Arc<dyn Outlet>> for OutletSpec {
    fn from(outlet: Arc<dyn Outlet>) -> Self {
        OutletSpec::Custom(outlet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_location_and_display() {
        let sized = OutletRef::Sized {
            url: "/out/a.jpg".into(),
            size: Dimensions::new(10, 20),
        };
        assert_eq!(sized.location(), "/out/a.jpg");
        assert_eq!(sized.to_string(), "/out/a.jpg (10x20)");
        assert_eq!(OutletRef::Url("u".into()).size(), None);
    }

    #[test]
    fn sized_reference_serializes_as_struct() {
        let sized = OutletRef::Sized {
            url: "a.jpg".into(),
            size: Dimensions::new(1, 2),
        };
        assert_eq!(
            serde_json::to_string(&sized).unwrap(),
            r#"{"url":"a.jpg","size":{"width":1,"height":2}}"#
        );
    }

    #[test]
    fn closures_are_outlets() {
        let outlet = OutletSpec::custom(
            |_: &mut dyn ImageHandle, ctx: &Context<'_>, _: &ImagerConfig| -> Result<OutletRef> {
                Ok(OutletRef::Path(ctx.preset.clone()))
            },
        );
        assert!(matches!(outlet, OutletSpec::Custom(_)));
        assert!(matches!(OutletSpec::from("out"), OutletSpec::Directory(ref d) if d == Path::new("out")));
    }
}
