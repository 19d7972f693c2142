//! # fileutil
//!
//! Small file utilities: copy a file, extract a ZIP archive into a
//! directory, zip a directory tree, or zip a single file.
//!
//! The ZIP format is handled in-crate: archives are read through the
//! [`ReadAt`] random access trait and written by a streaming
//! [`ZipWriter`], with STORED and DEFLATE entries.
//!
//! ## Features
//!
//! - Byte-exact file copies
//! - Extraction with entry path sanitization and CRC-32 verification
//! - Recursive directory zipping with `/`-separated relative entry names
//! - Reading ZIP64 archives
//!
//! ## Example
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> fileutil::Result<()> {
//!     fileutil::zip_dir("src", "out.zip").await?;
//!
//!     tokio::fs::create_dir_all("restore").await?;
//!     fileutil::unzip_file("out.zip", "restore").await?;
//!
//!     for entry in fileutil::list_archive("out.zip").await? {
//!         println!("{}", entry.file_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod ops;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{LocalFileReader, ReadAt};
pub use ops::{
    copy_file, list_archive, unzip_file, zip_dir, zip_dir_with, zip_file, zip_file_with,
};
pub use zip::{CompressionMethod, ZipExtractor, ZipFileEntry, ZipOptions, ZipWriter};
