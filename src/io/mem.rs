use super::ReadAt;
use crate::error::Result;
use async_trait::async_trait;

/// In-memory archives, mostly useful for archives built with
/// [`ZipWriter`](crate::zip::ZipWriter) over a `Vec<u8>`.
#[async_trait]
impl ReadAt for Vec<u8> {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = offset.min(self.len() as u64) as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}
