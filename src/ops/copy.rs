use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};

/// Copy the contents of `src` into `dest`, creating or truncating `dest`.
///
/// A failure partway through leaves `dest` truncated at whatever was
/// written; there is no cleanup of partial output.
pub async fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());

    let mut reader = File::open(src).await.map_err(|source| Error::Open {
        path: src.to_path_buf(),
        source,
    })?;
    let mut writer = File::create(dest).await.map_err(|source| Error::Create {
        path: dest.to_path_buf(),
        source,
    })?;

    let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;

    debug!(src = %src.display(), dest = %dest.display(), bytes, "copied file");
    Ok(())
}
