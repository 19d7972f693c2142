//! ZIP archive reading and writing.
//!
//! - [`structures`]: ZIP format records (EOCD, file headers, data descriptors)
//! - [`parser`]: low-level parsing of those records from a [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: streaming, CRC-checked extraction of single entries
//! - [`writer`]: streaming archive creation
//! - [`path`]: entry name to filesystem path mapping
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions when reading
//! - STORED (no compression) and DEFLATE compression methods
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Archives are written without ZIP64 extensions

mod extractor;
mod parser;
pub mod path;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{ZipOptions, ZipWriter};
