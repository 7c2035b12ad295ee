//! Streaming store-method ZIP writer.
//!
//! Every local header sets the data-descriptor flag and zeroes its CRC and sizes, so
//! each entry is written in a single pass: content is copied to the sink while its
//! CRC32 accumulates, then a data descriptor carries the real values. The central
//! directory repeats them for readers that start from the end.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use super::{
    ArchiveError, CENTRAL_HEADER_SIG, Crc32, DATA_DESCRIPTOR_SIG, EOCD_SIG, FLAG_DATA_DESCRIPTOR,
    FLAG_UTF8, LOCAL_HEADER_LEN, LOCAL_HEADER_SIG, METHOD_STORE, crc32::dos_time_date,
};

const VERSION: u16 = 20;
const DATA_DESCRIPTOR_LEN: u64 = 16;
const COPY_CHUNK: usize = 64 * 1024;

/// Content of one entry: in-memory bytes or a file streamed from disk.
#[derive(Debug, Clone)]
pub enum EntryContent {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug)]
struct CentralRecord {
    name: Vec<u8>,
    crc: u32,
    size: u32,
    offset: u32,
    time: u16,
    date: u16,
}

#[derive(Debug)]
pub struct ZipWriter<W: Write> {
    out: W,
    offset: u64,
    records: Vec<CentralRecord>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, offset: 0, records: Vec::new() }
    }

    pub fn entry_count(&self) -> usize {
        self.records.len()
    }

    /// Append one entry.
    ///
    /// # Arguments
    ///
    /// * `path` - Entry name inside the archive (forward slashes)
    /// * `content` - Bytes or a file to stream
    /// * `modified_ms` - Modification time in epoch milliseconds, stored as DOS local time
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::TooLarge`] once the archive would exceed 65535 entries or
    /// 32-bit offsets or sizes, and [`ArchiveError::Io`] if the sink or a source file fails.
    pub fn add_entry(
        &mut self,
        path: &str,
        content: EntryContent,
        modified_ms: i64,
    ) -> Result<(), ArchiveError> {
        if self.records.len() >= usize::from(u16::MAX) {
            return Err(ArchiveError::TooLarge(format!(
                "more than {} entries",
                u16::MAX
            )));
        }
        let name = path.as_bytes().to_vec();
        let name_len = u16::try_from(name.len())
            .map_err(|_| ArchiveError::TooLarge(format!("entry name {} bytes long", name.len())))?;
        let offset = u32::try_from(self.offset)
            .map_err(|_| ArchiveError::TooLarge(format!("entry {} starts past 4 GiB", path)))?;

        let (time, date) = dos_time_date(modified_ms);

        let mut header = Vec::with_capacity(LOCAL_HEADER_LEN + name.len());
        put_u32(&mut header, LOCAL_HEADER_SIG);
        put_u16(&mut header, VERSION);
        put_u16(&mut header, FLAG_DATA_DESCRIPTOR | FLAG_UTF8);
        put_u16(&mut header, METHOD_STORE);
        put_u16(&mut header, time);
        put_u16(&mut header, date);
        // CRC, compressed and uncompressed size live in the data descriptor
        header.extend_from_slice(&[0u8; 12]);
        put_u16(&mut header, name_len);
        put_u16(&mut header, 0);
        header.extend_from_slice(&name);
        self.out.write_all(&header)?;

        let mut crc = Crc32::new();
        let size = match content {
            EntryContent::Bytes(bytes) => {
                crc.update(&bytes);
                self.out.write_all(&bytes)?;
                bytes.len() as u64
            }
            EntryContent::File(source) => {
                copy_with_crc(File::open(source)?, &mut self.out, &mut crc)?
            }
        };
        let size = u32::try_from(size)
            .map_err(|_| ArchiveError::TooLarge(format!("entry {} is {} bytes", path, size)))?;
        let crc = crc.finish();

        let mut descriptor = Vec::with_capacity(DATA_DESCRIPTOR_LEN as usize);
        put_u32(&mut descriptor, DATA_DESCRIPTOR_SIG);
        put_u32(&mut descriptor, crc);
        put_u32(&mut descriptor, size);
        put_u32(&mut descriptor, size);
        self.out.write_all(&descriptor)?;

        self.offset += header.len() as u64 + u64::from(size) + DATA_DESCRIPTOR_LEN;
        self.records.push(CentralRecord { name, crc, size, offset, time, date });
        Ok(())
    }

    /// Write the central directory and end record, returning the sink.
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        let cd_start = u32::try_from(self.offset).map_err(|_| {
            ArchiveError::TooLarge("central directory starts past 4 GiB".to_string())
        })?;

        let mut cd = Vec::new();
        for record in &self.records {
            put_u32(&mut cd, CENTRAL_HEADER_SIG);
            put_u16(&mut cd, VERSION);
            put_u16(&mut cd, VERSION);
            put_u16(&mut cd, FLAG_DATA_DESCRIPTOR | FLAG_UTF8);
            put_u16(&mut cd, METHOD_STORE);
            put_u16(&mut cd, record.time);
            put_u16(&mut cd, record.date);
            put_u32(&mut cd, record.crc);
            put_u32(&mut cd, record.size);
            put_u32(&mut cd, record.size);
            put_u16(&mut cd, record.name.len() as u16);
            // extra len, comment len, disk start, internal attrs
            cd.extend_from_slice(&[0u8; 8]);
            put_u32(&mut cd, 0);
            put_u32(&mut cd, record.offset);
            cd.extend_from_slice(&record.name);
        }
        let cd_size = u32::try_from(cd.len())
            .ok()
            .filter(|size| cd_start.checked_add(*size).is_some())
            .ok_or_else(|| ArchiveError::TooLarge("central directory past 4 GiB".to_string()))?;

        let count = self.records.len() as u16;
        put_u32(&mut cd, EOCD_SIG);
        put_u16(&mut cd, 0);
        put_u16(&mut cd, 0);
        put_u16(&mut cd, count);
        put_u16(&mut cd, count);
        put_u32(&mut cd, cd_size);
        put_u32(&mut cd, cd_start);
        put_u16(&mut cd, 0);

        self.out.write_all(&cd)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

fn copy_with_crc<R: Read, W: Write>(
    mut source: R,
    out: &mut W,
    crc: &mut Crc32,
) -> Result<u64, ArchiveError> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}
