use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::LocalFileReader;
use crate::zip::path::sanitize_entry_name;
use crate::zip::{ZipExtractor, ZipFileEntry};

/// Extract every entry of `archive` below `dest_dir`, in stored order.
///
/// `dest_dir` must already exist and be a directory. Missing parent
/// directories of entries are created and existing files are overwritten.
/// Entry names that would land outside `dest_dir` fail the extraction with
/// [`Error::UnsafeEntryPath`]. Extraction stops at the first failing entry;
/// entries extracted before it stay on disk.
pub async fn unzip_file(archive: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<()> {
    let (archive, dest_dir) = (archive.as_ref(), dest_dir.as_ref());

    let meta = fs::metadata(dest_dir).await.map_err(|source| Error::Lookup {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(Error::DestNotDir(dest_dir.to_path_buf()));
    }

    let extractor = ZipExtractor::new(Arc::new(LocalFileReader::new(archive)?));
    let entries = extractor.list_files().await?;

    for entry in &entries {
        let relative = sanitize_entry_name(&entry.file_name)?;
        let target = dest_dir.join(&relative);

        if entry.is_directory {
            fs::create_dir_all(&target)
                .await
                .map_err(|source| Error::Create {
                    path: target.clone(),
                    source,
                })?;
            continue;
        }
        if relative.as_os_str().is_empty() {
            return Err(Error::UnsafeEntryPath(entry.file_name.clone()));
        }

        let bytes = extractor.extract_to_file(entry, &target).await?;
        debug!(entry = %entry.file_name, bytes, "extracted entry");
    }

    info!(archive = %archive.display(), dest = %dest_dir.display(), entries = entries.len(), "extracted archive");
    Ok(())
}

/// List the entries of `archive` in stored order without extracting them.
pub async fn list_archive(archive: impl AsRef<Path>) -> Result<Vec<ZipFileEntry>> {
    let extractor = ZipExtractor::new(Arc::new(LocalFileReader::new(archive.as_ref())?));
    extractor.list_files().await
}
