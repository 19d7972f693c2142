//! Error and result types shared by every operation in this crate.

use std::path::PathBuf;

use thiserror::Error;

/// A Result type alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while copying, packing or extracting.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to create '{}': {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to stat '{}': {source}", path.display())]
    Lookup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("destination is not a directory: '{}'", .0.display())]
    DestNotDir(PathBuf),
    #[error("unable to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ZIP archive: {0}")]
    InvalidArchive(&'static str),
    #[error("compression not supported: {0}")]
    CompressionNotSupported(u16),
    #[error("a computed CRC32 value did not match the expected value for '{0}'")]
    Crc32Mismatch(String),
    #[error("extracted size did not match the expected size for '{0}'")]
    SizeMismatch(String),
    #[error("entry '{0}' would be extracted outside of the destination directory")]
    UnsafeEntryPath(String),

    #[error("path is not valid UTF-8: '{}'", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("file name exceeds the maximum length of an entry name")]
    FileNameTooLarge,
    #[error("archive requires ZIP64 extensions, which are not written: {0}")]
    Zip64Needed(&'static str),

    #[error("an I/O operation failed: {0}")]
    Io(#[from] std::io::Error),
}
