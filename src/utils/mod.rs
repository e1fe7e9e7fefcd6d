// cloud-imager/src/utils/mod.rs
use crate::core::{mime_extension_for, ExtensionMimeLookup, ImagerError, MimeLookup, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Lexically removes `.` and resolves `..` against preceding components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `target` expressed relative to `base`; both should be absolute.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = normalize_path(base);
    let target = normalize_path(target);

    let base_parts: Vec<_> = base.components().collect();
    let target_parts: Vec<_> = target.components().collect();
    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Renders a path with `/` separators, as used in URLs and object keys.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|part| part != "/")
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins an object-storage prefix and key with exactly one `/`.
pub fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let key = key.trim_start_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// Rejects destinations that would climb out of their root.
pub fn ensure_contained(destination: &str) -> Result<()> {
    if Path::new(destination)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ImagerError::InvalidParameter(format!(
            "Path traversal detected in destination: {}",
            destination
        )));
    }
    Ok(())
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

/// Whether a file descriptor would accept `path`.
pub fn is_supported_format(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| ExtensionMimeLookup.lookup(name))
        .is_some_and(|mime| mime_extension_for(&mime).is_some())
}

/// Expands directories into the image files they contain, in a stable order.
pub fn collect_image_paths(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(ImagerError::InvalidParameter(format!(
                "Input does not exist: {}",
                input.display()
            )));
        }

        if input.is_file() {
            paths.push(input.clone());
            continue;
        }

        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        let mut found: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_supported_format(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}
