use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crc32fast::Hasher;
use flate2::write::DeflateDecoder;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Compressed bytes pulled from the reader per iteration.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compressed bytes fed to the inflater between size checks. DEFLATE
/// expands at most ~1032:1, so this bounds buffered output to about 1 MiB.
const INFLATE_STEP: usize = 1024;

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Stream an entry's decompressed bytes into `writer`.
    ///
    /// Data is read and inflated in bounded chunks. The CRC-32 and the
    /// uncompressed size recorded in the central directory are verified;
    /// bytes already written before a mismatch is detected stay written.
    pub async fn extract_to_writer<W>(&self, entry: &ZipFileEntry, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut decoder = match entry.compression_method {
            CompressionMethod::Stored => None,
            CompressionMethod::Deflate => Some(DeflateDecoder::new(Vec::with_capacity(CHUNK_SIZE))),
            CompressionMethod::Unknown(method) => {
                return Err(Error::CompressionNotSupported(method));
            }
        };

        let mut offset = self.parser.get_data_offset(entry).await?;
        let end = offset + entry.compressed_size;

        let mut buf = vec![0u8; CHUNK_SIZE.min(entry.compressed_size as usize)];
        let mut hasher = Hasher::new();
        let mut written = 0u64;

        while offset < end {
            let len = ((end - offset) as usize).min(buf.len());
            let chunk = &mut buf[..len];
            self.parser.reader().read_exact_at(offset, chunk).await?;
            offset += len as u64;

            match decoder.as_mut() {
                Some(decoder) => {
                    for piece in chunk.chunks(INFLATE_STEP) {
                        decoder.write_all(piece)?;
                        check_size(entry, written + decoder.get_ref().len() as u64)?;
                        written += drain(decoder.get_mut(), writer, &mut hasher).await?;
                    }
                }
                None => {
                    check_size(entry, written + len as u64)?;
                    written += emit(chunk, writer, &mut hasher).await?;
                }
            }
        }

        if let Some(decoder) = decoder.as_mut() {
            decoder.try_finish()?;
            check_size(entry, written + decoder.get_ref().len() as u64)?;
            written += drain(decoder.get_mut(), writer, &mut hasher).await?;
        }
        writer.flush().await?;

        if written != entry.uncompressed_size {
            return Err(Error::SizeMismatch(entry.file_name.clone()));
        }
        if hasher.finalize() != entry.crc32 {
            return Err(Error::Crc32Mismatch(entry.file_name.clone()));
        }

        trace!(entry = %entry.file_name, bytes = written, "entry inflated");
        Ok(written)
    }

    /// Extract file data to memory
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(entry.uncompressed_size.min(CHUNK_SIZE as u64) as usize);
        self.extract_to_writer(entry, &mut buf).await?;
        Ok(buf)
    }

    /// Extract an entry to `output_path`, creating missing parent
    /// directories and truncating any existing file.
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::Create {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let mut file = fs::File::create(output_path)
            .await
            .map_err(|source| Error::Create {
                path: output_path.to_path_buf(),
                source,
            })?;

        // flush inside extract_to_writer surfaces deferred write errors before the handle drops
        self.extract_to_writer(entry, &mut file).await
    }
}

/// Refuse output beyond the size the central directory promised.
fn check_size(entry: &ZipFileEntry, produced: u64) -> Result<()> {
    if produced > entry.uncompressed_size {
        return Err(Error::SizeMismatch(entry.file_name.clone()));
    }
    Ok(())
}

async fn emit<W>(data: &[u8], writer: &mut W, hasher: &mut Hasher) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    hasher.update(data);
    writer.write_all(data).await?;
    Ok(data.len() as u64)
}

async fn drain<W>(out: &mut Vec<u8>, writer: &mut W, hasher: &mut Hasher) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let n = emit(out, writer, hasher).await?;
    out.clear();
    Ok(n)
}
