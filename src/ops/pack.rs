use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tokio::fs::{self, File};
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use super::walk::DirWalker;
use crate::error::{Error, Result};
use crate::zip::path::relative_entry_name;
use crate::zip::{ZipOptions, ZipWriter};

/// Zip every regular file below `src_dir` into a new archive at `dest`,
/// using DEFLATE at the default level.
pub async fn zip_dir(src_dir: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    zip_dir_with(src_dir, dest, &ZipOptions::default()).await
}

/// Like [`zip_dir`], with explicit [`ZipOptions`].
///
/// Entries are named by their `/`-separated path relative to `src_dir`
/// and added in walk order. Directories contribute no entries of their own,
/// so an empty tree yields a valid, empty archive. If `dest` itself lies
/// inside `src_dir` it is left out.
pub async fn zip_dir_with(
    src_dir: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: &ZipOptions,
) -> Result<()> {
    let (src_dir, dest) = (src_dir.as_ref(), dest.as_ref());

    let mut zip = ZipWriter::new(create(dest).await?, options)?;
    let mut walker = DirWalker::new(src_dir).await?;
    let own_entry = own_entry(src_dir, dest).await;

    while let Some(path) = walker.next().await? {
        let name = relative_entry_name(src_dir, &path)?;
        if own_entry.as_deref() == Some(Path::new(&name)) {
            debug!(entry = %name, "skipping destination archive");
            continue;
        }
        add_file(&mut zip, &name, &path).await?;
    }

    let entries = zip.len();
    zip.close().await?;

    info!(src = %src_dir.display(), dest = %dest.display(), entries, "zipped directory");
    Ok(())
}

/// Zip a single file into a new archive at `dest`, using DEFLATE at the
/// default level.
pub async fn zip_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    zip_file_with(src, dest, &ZipOptions::default()).await
}

/// Like [`zip_file`], with explicit [`ZipOptions`].
///
/// The single entry is named after the base name of `src`, so
/// `data/report.csv` is stored as `report.csv`.
pub async fn zip_file_with(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: &ZipOptions,
) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());

    let name = src
        .file_name()
        .ok_or_else(|| Error::Open {
            path: src.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?
        .to_str()
        .ok_or_else(|| Error::NonUtf8Path(src.to_path_buf()))?;

    let (mut reader, modified) = open(src).await?;
    let mut zip = ZipWriter::new(create(dest).await?, options)?;
    let bytes = zip.write_entry(name, modified, &mut reader).await?;
    zip.close().await?;

    info!(src = %src.display(), dest = %dest.display(), bytes, "zipped file");
    Ok(())
}

async fn add_file<W>(zip: &mut ZipWriter<W>, name: &str, path: &Path) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (mut reader, modified) = open(path).await?;
    let bytes = zip.write_entry(name, modified, &mut reader).await?;
    debug!(entry = %name, bytes, "added file");
    Ok(())
}

/// Open a source file along with the timestamp to record for it.
async fn open(path: &Path) -> Result<(File, NaiveDateTime)> {
    let file = File::open(path).await.map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = match file.metadata().await.and_then(|meta| meta.modified()) {
        Ok(time) => DateTime::<Local>::from(time),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "no modification time, recording now");
            Local::now()
        }
    };

    Ok((file, modified.naive_local()))
}

async fn create(path: &Path) -> Result<File> {
    File::create(path).await.map_err(|source| Error::Create {
        path: path.to_path_buf(),
        source,
    })
}

/// Path of `dest` relative to `src_dir`, when the archive is written into
/// the tree being zipped.
async fn own_entry(src_dir: &Path, dest: &Path) -> Option<PathBuf> {
    let src_dir = fs::canonicalize(src_dir).await.ok()?;
    let dest = fs::canonicalize(dest).await.ok()?;
    dest.strip_prefix(src_dir).ok().map(Path::to_path_buf)
}
