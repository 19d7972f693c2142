//! Low-level ZIP archive parser.
//!
//! Archives are read from the end: the End of Central Directory record
//! (and its ZIP64 counterpart, when present) locates the Central Directory,
//! which lists every entry in stored order. An entry's data offset is only
//! known after reading its Local File Header, since the local name and
//! extra field may differ in length from the central copy.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field id.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Low-level ZIP file parser, generic over the reader it pulls bytes from.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a parser over `reader`.
    ///
    /// # Arguments
    ///
    /// * `reader` - Random-access source holding the whole archive
    ///
    /// The archive size is taken once here; nothing is read until the
    /// first lookup.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// # Returns
    ///
    /// The record together with its offset in the archive.
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when the source is shorter than an EOCD or no
    /// signature is followed by a comment reaching the end of the file.
    /// `Io` when reading fails.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::InvalidArchive("file too small"));
        }

        // Common case: no archive comment
        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // A comment follows the record; search backwards for a signature
        // whose comment length reaches exactly to the end of the file.
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::InvalidArchive("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// # Arguments
    ///
    /// * `eocd_offset` - Offset of the regular EOCD; the ZIP64 locator sits
    ///   immediately before it
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when the locator or the ZIP64 record is missing or
    /// carries a bad signature. `Io` when reading fails.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(Error::InvalidArchive("missing ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// List all entries in the archive, in Central Directory order.
    ///
    /// ZIP64 records and extra fields are followed when present.
    ///
    /// # Returns
    ///
    /// One [`ZipFileEntry`] per central directory header.
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when the central directory lies outside the
    /// archive, claims more entries than it can hold, or contains a header
    /// with a bad signature. `Io` when reading fails.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.saturating_add(cd_size) > eocd_offset {
            return Err(Error::InvalidArchive("central directory out of bounds"));
        }
        if total_entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd_size {
            return Err(Error::InvalidArchive("entry count exceeds central directory"));
        }

        // One read for the whole Central Directory
        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data).await?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..total_entries {
            entries.push(self.parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header at the cursor position.
    fn parse_cdfh(&self, cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(Error::InvalidArchive("bad central directory header signature"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Names without the UTF-8 flag are usually CP437; lossy is good enough
        let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

        let is_directory = file_name.ends_with('/');

        let extra_field_end = cursor.position() + extra_field_length as u64;

        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;
            let field_end = cursor.position() + field_size as u64;

            if header_id == ZIP64_EXTRA_ID {
                // Only the fields saturated in the fixed header are present, in this order
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        cursor.set_position(extra_field_end + file_comment_length as u64);

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            is_directory,
        })
    }

    /// Offset of the first byte of an entry's (compressed) data.
    ///
    /// # Arguments
    ///
    /// * `entry` - Entry from [`list_files`](Self::list_files)
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when the local header signature is wrong or the
    /// data would run past the end of the archive. `Io` when reading fails.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh_buf)
            .await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::InvalidArchive("bad local file header signature"));
        }

        // Name and extra field lengths sit at a fixed position in the LFH
        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26);

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        let data_offset =
            entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        if data_offset.saturating_add(entry.compressed_size) > self.size {
            return Err(Error::InvalidArchive("entry data out of bounds"));
        }

        Ok(data_offset)
    }

    /// The underlying reader, for pulling entry data once its offset is known.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_archive_has_no_entries() {
        let mut buf = Vec::new();
        EndOfCentralDirectory::new(0, 0, 0).write_to(&mut buf).unwrap();

        let parser = ZipParser::new(Arc::new(buf));
        assert!(parser.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn eocd_is_found_behind_a_comment() {
        let mut buf = Vec::new();
        let mut eocd = EndOfCentralDirectory::new(0, 0, 0);
        eocd.comment_len = 7;
        eocd.write_to(&mut buf).unwrap();
        buf.extend_from_slice(b"comment");

        let parser = ZipParser::new(Arc::new(buf));
        let (_, offset) = parser.find_eocd().await.unwrap();
        assert_eq!(offset, 0);
    }

    #[tokio::test]
    async fn non_zip_data_is_rejected() {
        let parser = ZipParser::new(Arc::new(b"definitely not a zip archive".to_vec()));
        assert!(matches!(
            parser.list_files().await,
            Err(Error::InvalidArchive(_))
        ));

        let parser = ZipParser::new(Arc::new(Vec::new()));
        assert!(matches!(
            parser.list_files().await,
            Err(Error::InvalidArchive(_))
        ));
    }

    #[tokio::test]
    async fn central_directory_past_eocd_is_rejected() {
        let mut buf = Vec::new();
        EndOfCentralDirectory::new(1, 46, 100).write_to(&mut buf).unwrap();

        let parser = ZipParser::new(Arc::new(buf));
        assert!(matches!(
            parser.list_files().await,
            Err(Error::InvalidArchive(_))
        ));
    }
}
