//! Mapping between entry names and filesystem paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve an entry name to a path relative to the extraction directory.
///
/// Backslashes count as separators, and empty or `.` segments are dropped.
/// Names that are absolute, carry a drive or root prefix, or contain a `..`
/// segment are rejected with [`Error::UnsafeEntryPath`]. The result may be
/// empty for names like `./`.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf> {
    let unsafe_name = || Error::UnsafeEntryPath(name.to_string());

    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(unsafe_name());
    }

    let mut path = PathBuf::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(unsafe_name()),
            _ => {}
        }

        // Catches `C:` and similar prefixes on platforms that have them
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err(unsafe_name()),
        }
    }

    Ok(path)
}

/// Entry name for `path` relative to `base`, always `/`-separated.
pub fn relative_entry_name(base: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| Error::UnsafeEntryPath(path.display().to_string()))?;

    let mut name = String::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let part = part
            .to_str()
            .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))?;
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(part);
    }

    Ok(name)
}
