//! Depth-first walk over the regular files of a directory tree.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::trace;

use crate::error::{Error, Result};

/// Yields every regular file below a root directory.
///
/// Siblings are visited in lexicographic order and directories are entered
/// as they are reached, so `a.txt` comes before `b/c.txt`, which comes
/// before `d.txt`. Symlinks and other non-regular entries are skipped and
/// never followed. The first I/O error ends the walk.
pub struct DirWalker {
    /// Pending entries, next one last.
    stack: Vec<(PathBuf, std::fs::FileType)>,
}

impl DirWalker {
    /// Start a walk at `root`, which must be a directory.
    pub async fn new(root: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(root)
            .await
            .map_err(|source| Error::Walk {
                path: root.to_path_buf(),
                source,
            })?;
        if !meta.is_dir() {
            return Err(Error::Walk {
                path: root.to_path_buf(),
                source: std::io::ErrorKind::NotADirectory.into(),
            });
        }

        let mut stack = Vec::new();
        push_children(&mut stack, root).await?;
        Ok(Self { stack })
    }

    /// The next regular file, or `None` once the tree is exhausted.
    pub async fn next(&mut self) -> Result<Option<PathBuf>> {
        while let Some((path, file_type)) = self.stack.pop() {
            if file_type.is_dir() {
                push_children(&mut self.stack, &path).await?;
            } else if file_type.is_file() {
                return Ok(Some(path));
            } else {
                trace!(path = %path.display(), "skipping non-regular entry");
            }
        }

        Ok(None)
    }
}

async fn push_children(stack: &mut Vec<(PathBuf, std::fs::FileType)>, dir: &Path) -> Result<()> {
    let walk_err = |source| Error::Walk {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = fs::read_dir(dir).await.map_err(walk_err)?;
    let mut children = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(walk_err)? {
        let file_type = entry.file_type().await.map_err(|source| Error::Walk {
            path: entry.path(),
            source,
        })?;
        children.push((entry.path(), file_type));
    }

    // Reverse order so the smallest name is popped first
    children.sort_by(|(a, _), (b, _)| b.file_name().cmp(&a.file_name()));
    stack.extend(children);
    Ok(())
}
