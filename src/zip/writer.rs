//! Streaming ZIP archive writer.
//!
//! Every entry is written as a local file header with the data-descriptor
//! flag set, followed by its data and a data descriptor, so entries of any
//! size can be streamed without seeking back. The central directory and
//! the end of central directory record are appended by [`ZipWriter::close`].

use std::io::Write;

use chrono::NaiveDateTime;
use crc32fast::Hasher;
use flate2::write::DeflateEncoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};

use super::structures::*;

/// Uncompressed bytes pulled from an entry's source per iteration.
const CHUNK_SIZE: usize = 64 * 1024;

/// One below the `0xFFFF` ZIP64 marker of the EOCD entry count.
const MAX_ENTRIES: usize = u16::MAX as usize - 1;

/// How entries are stored in archives produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipOptions {
    /// [`CompressionMethod::Stored`] or [`CompressionMethod::Deflate`].
    pub compression: CompressionMethod,
    /// DEFLATE level, 0 (fastest) to 9 (smallest). Ignored when storing.
    pub level: u32,
}

impl ZipOptions {
    pub fn stored() -> Self {
        Self {
            compression: CompressionMethod::Stored,
            ..Self::default()
        }
    }

    pub fn deflate(level: u32) -> Self {
        Self {
            compression: CompressionMethod::Deflate,
            level: level.min(9),
        }
    }
}

impl Default for ZipOptions {
    fn default() -> Self {
        Self::deflate(6)
    }
}

/// Writes a ZIP archive into any [`AsyncWrite`].
///
/// Archives are limited to 65534 entries and offsets below 4 GiB; larger
/// ones fail with [`Error::Zip64Needed`]. The all-ones values of the count
/// and offset fields are ZIP64 markers, so they are never written.
pub struct ZipWriter<W: AsyncWrite + Unpin> {
    writer: W,
    offset: u64,
    cd_entries: Vec<CentralDirectoryHeader>,
    options: ZipOptions,
}

impl<W: AsyncWrite + Unpin> ZipWriter<W> {
    pub fn new(writer: W, options: &ZipOptions) -> Result<Self> {
        if let CompressionMethod::Unknown(method) = options.compression {
            return Err(Error::CompressionNotSupported(method));
        }

        Ok(Self {
            writer,
            offset: 0,
            cd_entries: Vec::new(),
            options: *options,
        })
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.cd_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cd_entries.is_empty()
    }

    /// Add an entry named `name`, streaming its contents from `reader`
    /// until EOF. Returns the number of uncompressed bytes stored.
    pub async fn write_entry<R>(
        &mut self,
        name: &str,
        modified: NaiveDateTime,
        reader: &mut R,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file_name_length = u16::try_from(name.len()).map_err(|_| Error::FileNameTooLarge)?;
        if self.cd_entries.len() >= MAX_ENTRIES {
            return Err(Error::Zip64Needed("too many entries"));
        }
        let lfh_offset = fits_u32(self.offset, "archive too large")?;

        let mut flags = FLAG_DATA_DESCRIPTOR;
        if !name.is_ascii() {
            flags |= FLAG_UTF8;
        }
        let (last_mod_time, last_mod_date) = dos_date_time(&modified);
        let compression_method = self.options.compression;

        let mut header = Vec::with_capacity(LFH_SIZE + name.len());
        LocalFileHeader {
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            file_name_length,
            extra_field_length: 0,
        }
        .write_to(&mut header)?;
        header.extend_from_slice(name.as_bytes());
        self.write_raw(&header).await?;

        let mut encoder = match compression_method {
            CompressionMethod::Deflate => Some(DeflateEncoder::new(
                Vec::with_capacity(CHUNK_SIZE),
                flate2::Compression::new(self.options.level),
            )),
            _ => None,
        };

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut hasher = Hasher::new();
        let mut uncompressed = 0u64;
        let mut compressed = 0u64;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let data = &buf[..n];
            hasher.update(data);
            uncompressed += n as u64;

            compressed += match encoder.as_mut() {
                Some(encoder) => {
                    encoder.write_all(data)?;
                    self.drain(encoder.get_mut()).await?
                }
                None => {
                    self.write_raw(data).await?;
                    n as u64
                }
            };
        }

        if let Some(encoder) = encoder.as_mut() {
            encoder.try_finish()?;
            compressed += self.drain(encoder.get_mut()).await?;
        }

        let crc32 = hasher.finalize();
        let compressed_size = fits_u32(compressed, "entry too large")?;
        let uncompressed_size = fits_u32(uncompressed, "entry too large")?;

        let mut descriptor = Vec::with_capacity(DD_SIZE);
        DataDescriptor {
            crc32,
            compressed_size,
            uncompressed_size,
        }
        .write_to(&mut descriptor)?;
        self.write_raw(&descriptor).await?;

        trace!(entry = name, uncompressed, compressed, "entry written");

        self.cd_entries.push(CentralDirectoryHeader {
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
            file_name: name.to_string(),
        });

        Ok(uncompressed)
    }

    /// Write the central directory and trailer, flush, and hand back the
    /// inner writer.
    pub async fn close(mut self) -> Result<W> {
        let cd_offset = fits_u32(self.offset, "archive too large")?;

        let cd_len: usize = self.cd_entries.iter().map(|e| e.encoded_len()).sum();
        let mut cd = Vec::with_capacity(cd_len + EndOfCentralDirectory::SIZE);
        for entry in &self.cd_entries {
            entry.write_to(&mut cd)?;
        }
        let cd_size = fits_u32(cd.len() as u64, "central directory too large")?;

        EndOfCentralDirectory::new(self.cd_entries.len() as u16, cd_size, cd_offset)
            .write_to(&mut cd)?;
        self.write_raw(&cd).await?;

        self.writer.flush().await?;
        Ok(self.writer)
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).await?;
        self.offset += data.len() as u64;
        Ok(())
    }

    async fn drain(&mut self, out: &mut Vec<u8>) -> Result<u64> {
        self.write_raw(out).await?;
        let n = out.len() as u64;
        out.clear();
        Ok(n)
    }
}

/// `0xFFFFFFFF` itself is the ZIP64 marker for sizes and offsets.
fn fits_u32(value: u64, what: &'static str) -> Result<u32> {
    if value >= u32::MAX as u64 {
        return Err(Error::Zip64Needed(what));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::ZipExtractor;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn build(options: ZipOptions, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Vec::new(), &options).unwrap();
        for (name, mut data) in files.iter().copied() {
            writer.write_entry(name, noon(), &mut data).await.unwrap();
        }
        writer.close().await.unwrap()
    }

    #[tokio::test]
    async fn entries_read_back_in_order() {
        let big = "lorem ipsum ".repeat(20_000);
        for options in [ZipOptions::stored(), ZipOptions::default()] {
            let archive = build(
                options,
                &[
                    ("a.txt", &b"hello"[..]),
                    ("sub/big.txt", big.as_bytes()),
                    ("empty", &b""[..]),
                ],
            )
            .await;

            let extractor = ZipExtractor::new(Arc::new(archive));
            let entries = extractor.list_files().await.unwrap();
            let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
            assert_eq!(names, ["a.txt", "sub/big.txt", "empty"]);
            assert_eq!(entries[0].compression_method, options.compression);
            assert_eq!(entries[1].mod_date(), (2023, 7, 14));

            assert_eq!(extractor.extract_to_memory(&entries[0]).await.unwrap(), b"hello");
            assert_eq!(
                extractor.extract_to_memory(&entries[1]).await.unwrap(),
                big.as_bytes()
            );
            assert!(extractor.extract_to_memory(&entries[2]).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn deflate_shrinks_repetitive_data() {
        let data = vec![b'z'; 100_000];
        let archive = build(ZipOptions::default(), &[("z", data.as_slice())]).await;

        let entries = ZipExtractor::new(Arc::new(archive)).list_files().await.unwrap();
        assert_eq!(entries[0].uncompressed_size, 100_000);
        assert!(entries[0].compressed_size < 1_000);
    }

    #[tokio::test]
    async fn empty_writer_produces_bare_trailer() {
        let archive = build(ZipOptions::default(), &[]).await;
        assert_eq!(archive.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(&archive[..4], EndOfCentralDirectory::SIGNATURE);
    }

    #[tokio::test]
    async fn corrupted_data_fails_crc_check() {
        let mut archive = build(ZipOptions::stored(), &[("a.txt", &b"hello"[..])]).await;
        archive[LFH_SIZE + "a.txt".len()] ^= 0xFF;

        let extractor = ZipExtractor::new(Arc::new(archive));
        let entries = extractor.list_files().await.unwrap();
        assert!(matches!(
            extractor.extract_to_memory(&entries[0]).await,
            Err(Error::Crc32Mismatch(name)) if name == "a.txt"
        ));
    }

    #[tokio::test]
    async fn utf8_names_are_flagged() {
        let archive = build(ZipOptions::stored(), &[("caf\u{e9}.txt", &b"x"[..])]).await;
        let flags = u16::from_le_bytes([archive[6], archive[7]]);
        assert_ne!(flags & FLAG_UTF8, 0);
        assert_ne!(flags & FLAG_DATA_DESCRIPTOR, 0);

        let entries = ZipExtractor::new(Arc::new(archive)).list_files().await.unwrap();
        assert_eq!(entries[0].file_name, "caf\u{e9}.txt");
    }

    #[test]
    fn unknown_methods_are_refused() {
        let options = ZipOptions {
            compression: CompressionMethod::Unknown(12),
            level: 0,
        };
        assert!(matches!(
            ZipWriter::new(Vec::new(), &options),
            Err(Error::CompressionNotSupported(12))
        ));
    }

    #[tokio::test]
    async fn entry_count_stops_below_zip64_marker() {
        let mut writer = ZipWriter::new(Vec::new(), &ZipOptions::stored()).unwrap();
        for i in 0..MAX_ENTRIES {
            let mut empty: &[u8] = &[];
            writer.write_entry(&format!("{i}"), noon(), &mut empty).await.unwrap();
        }

        let mut empty: &[u8] = &[];
        assert!(matches!(
            writer.write_entry("one-too-many", noon(), &mut empty).await,
            Err(Error::Zip64Needed("too many entries"))
        ));

        let archive = writer.close().await.unwrap();
        let entries = ZipExtractor::new(Arc::new(archive)).list_files().await.unwrap();
        assert_eq!(entries.len(), 65534);
    }

    #[test]
    fn all_ones_offsets_are_refused() {
        assert_eq!(fits_u32(0xFFFF_FFFE, "x").unwrap(), 0xFFFF_FFFE);
        assert!(matches!(
            fits_u32(0xFFFF_FFFF, "x"),
            Err(Error::Zip64Needed("x"))
        ));
        assert!(fits_u32(1 << 32, "x").is_err());
    }
}
