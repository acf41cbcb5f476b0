use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::SmallError;
use crate::types::SmallResult;

/// Anything that can be turned into its on-disk byte representation.
pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

/// Anything that can be parsed back out of a byte stream produced by
/// the matching `Encodeable` impl.
pub trait Decodeable {
    fn decode(bytes: &[u8]) -> Self;
}

impl Encodeable for u32 {
    fn encode(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl Decodeable for u32 {
    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        u32::from_be_bytes(buf)
    }
}

/// A thin wrapper over a backing file that understands the engine's
/// fixed-size-page layout: page `i` (0-based) always lives at byte
/// offset `i * page_size`, regardless of page category. This is the
/// single canonical on-disk layout used by every page type; there is
/// no length-prefixing anywhere in the format.
pub struct SmallFile {
    file: File,
}

impl SmallFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<SmallFile, SmallError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(SmallFile { file })
    }

    pub fn get_size(&self) -> Result<u64, SmallError> {
        Ok(self.file.metadata()?.len())
    }

    pub fn set_len(&self, len: u64) -> SmallResult {
        self.file.set_len(len)?;
        Ok(())
    }

    /// Read exactly `page_size` bytes starting at `page_index * page_size`.
    /// Pages past the current end of file read back as all-zero, which
    /// matches the "newly allocated page" state.
    pub fn read_page_at(
        &mut self,
        page_index: u32,
        page_size: usize,
    ) -> Result<Vec<u8>, SmallError> {
        let offset = page_index as u64 * page_size as u64;
        let file_len = self.get_size()?;

        let mut buf = vec![0u8; page_size];
        if offset >= file_len {
            return Ok(buf);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let to_read = std::cmp::min(page_size as u64, file_len - offset) as usize;
        self.file.read_exact(&mut buf[..to_read])?;
        Ok(buf)
    }

    /// Write `data` (must be exactly `page_size` bytes, zero-padded by
    /// the caller if necessary) at `page_index * page_size`, extending
    /// the file as needed.
    pub fn write_page_at(
        &mut self,
        page_index: u32,
        page_size: usize,
        data: &[u8],
    ) -> SmallResult {
        assert_eq!(data.len(), page_size);
        let offset = page_index as u64 * page_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn pages_count(&self, page_size: usize) -> Result<u32, SmallError> {
        let len = self.get_size()?;
        Ok((len / page_size as u64) as u32)
    }

    /// Append raw bytes at the current end of file, for the
    /// append-only log (which has no fixed page size of its own).
    pub fn append_bytes(&mut self, data: &[u8]) -> SmallResult {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }
}
