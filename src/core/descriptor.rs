// cloud-imager/src/core/descriptor.rs
use super::{ImagerError, Result};
use std::path::{Path, PathBuf};

const UID_LENGTH: usize = 16;

/// Canonical extension for each accepted MIME type.
const MIME_EXTENSIONS: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
];

/// Resolves a MIME type from a file name.
pub trait MimeLookup: Send + Sync {
    fn lookup(&self, file_name: &str) -> Option<String>;
}

impl<F> MimeLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, file_name: &str) -> Option<String> {
        self(file_name)
    }
}

/// Extension based lookup covering the common raster formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeLookup;

impl MimeLookup for ExtensionMimeLookup {
    fn lookup(&self, file_name: &str) -> Option<String> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();

        let mime = match extension.as_str() {
            "jpg" | "jpeg" | "jpe" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "tif" | "tiff" => "image/tiff",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            _ => return None,
        };
        Some(mime.to_string())
    }
}

/// An already described upload, e.g. a multipart form file saved to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub path: PathBuf,
    pub name: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDescriptorInput {
    Path(PathBuf),
    Upload(UploadRecord),
}

impl From<&str> for FileDescriptorInput {
    fn from(path: &str) -> Self {
        FileDescriptorInput::Path(PathBuf::from(path))
    }
}

impl From<String> for FileDescriptorInput {
    fn from(path: String) -> Self {
        FileDescriptorInput::Path(PathBuf::from(path))
    }
}

impl From<&Path> for FileDescriptorInput {
    fn from(path: &Path) -> Self {
        FileDescriptorInput::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for FileDescriptorInput {
    fn from(path: PathBuf) -> Self {
        FileDescriptorInput::Path(path)
    }
}

impl From<UploadRecord> for FileDescriptorInput {
    fn from(record: UploadRecord) -> Self {
        FileDescriptorInput::Upload(record)
    }
}

/// Identity of one input image and the naming pieces derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    path: PathBuf,
    name: String,
    declared_type: String,
    extension: String,
    basename: String,
    mime_extension: String,
    uid: String,
}

impl FileDescriptor {
    pub fn new(input: FileDescriptorInput, lookup: &dyn MimeLookup) -> Result<Self> {
        let (path, name, declared_type) = match input {
            FileDescriptorInput::Upload(record) => {
                (record.path, record.name, record.content_type)
            }
            FileDescriptorInput::Path(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let declared_type = lookup.lookup(&path.to_string_lossy());
                (path, name, declared_type)
            }
        };

        let declared_type = declared_type.unwrap_or_default();
        let mapped = mime_extension_for(&declared_type).ok_or_else(|| {
            ImagerError::UnsupportedFormat(if declared_type.is_empty() {
                format!("no MIME type for {}", path.display())
            } else {
                declared_type.clone()
            })
        })?;

        let (basename, extension) = split_name(&name);

        Ok(Self {
            path,
            name,
            declared_type,
            extension,
            basename,
            mime_extension: format!(".{}", mapped),
            uid: random_uid(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// Extension of `name` including the leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Canonical extension for the declared type, e.g. `.jpg`.
    pub fn mime_extension(&self) -> &str {
        &self.mime_extension
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }
}

pub(crate) fn mime_extension_for(mime: &str) -> Option<&'static str> {
    MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, ext)| *ext)
}

fn split_name(name: &str) -> (String, String) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (
            stem.to_string_lossy().into_owned(),
            format!(".{}", ext.to_string_lossy()),
        ),
        _ => (name.to_string(), String::new()),
    }
}

fn random_uid() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(UID_LENGTH)
        .collect()
}
