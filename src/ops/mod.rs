//! The file operations exposed at the crate root.
//!
//! Each operation opens its own handles, works through them sequentially
//! and releases every handle before returning, whether it succeeds or not.
//! Nothing is shared between calls, so concurrent calls on distinct paths
//! are independent; calls targeting the same destination are not
//! coordinated.

mod copy;
mod pack;
mod unzip;
mod walk;

pub use copy::copy_file;
pub use pack::{zip_dir, zip_dir_with, zip_file, zip_file_with};
pub use unzip::{list_archive, unzip_file};
pub use walk::DirWalker;
