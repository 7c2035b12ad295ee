//! Minimal ZIP support.
//!
//! - [`ArchiveReader`] locates one named entry through the central directory and
//!   streams its content (store or deflate) without reading the whole archive.
//! - [`ZipWriter`] emits store-method archives with data descriptors, computing CRC32
//!   while content streams through.
//!
//! Only the classic (non-ZIP64) format is handled: archives, entries and offsets are
//! limited to 4 GiB and 65535 entries.

pub mod crc32;
pub mod reader;
pub mod writer;

use thiserror::Error;

pub use crc32::{Crc32, crc32};
pub use reader::{ArchiveReader, EntryReader, ZipEntryInfo};
pub use writer::{EntryContent, ZipWriter};

pub(crate) const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
pub(crate) const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
pub(crate) const EOCD_SIG: u32 = 0x0605_4b50;
pub(crate) const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;

pub(crate) const LOCAL_HEADER_LEN: usize = 30;
pub(crate) const CENTRAL_HEADER_LEN: usize = 46;
pub(crate) const EOCD_LEN: usize = 22;

pub(crate) const METHOD_STORE: u16 = 0;
pub(crate) const METHOD_DEFLATE: u16 = 8;

/// General purpose flag bit 3: CRC and sizes follow the data
pub(crate) const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// General purpose flag bit 11: names are UTF-8
pub(crate) const FLAG_UTF8: u16 = 0x0800;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("none of the entries {names:?} found in archive")]
    EntryNotFound { names: Vec<String> },

    #[error("unsupported compression method {0} (only store and deflate are supported)")]
    UnsupportedCompression(u16),

    #[error("archive too large: {0}")]
    TooLarge(String),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
