//! Random-access ZIP entry reader.
//!
//! Only the tail window (where the End-Of-Central-Directory record lives) and the
//! central directory itself are loaded into memory; entry content is streamed from
//! the source through a length-limited reader. The CRC32 and size of the decompressed
//! content are checked against the central directory once the declared size has been
//! read or the content ends, and a mismatch fails that read with an
//! [`ArchiveError::CorruptArchive`] wrapped in an `InvalidData` I/O error.

use std::io::{self, Read, Seek, SeekFrom, Take};

use flate2::read::DeflateDecoder;

use super::{
    ArchiveError, CENTRAL_HEADER_LEN, CENTRAL_HEADER_SIG, Crc32, EOCD_LEN, EOCD_SIG,
    LOCAL_HEADER_LEN, LOCAL_HEADER_SIG, METHOD_DEFLATE, METHOD_STORE, read_u16, read_u32,
};

/// The EOCD record is 22 bytes plus a comment of at most 65535 bytes
const MAX_EOCD_SEARCH: u64 = (EOCD_LEN + u16::MAX as usize) as u64;

/// Central directory record of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntryInfo {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

impl ZipEntryInfo {
    /// Exact name match, or match on the final path component.
    pub fn matches(&self, candidate: &str) -> bool {
        self.name == candidate
            || self.name.strip_suffix(candidate).is_some_and(|prefix| prefix.ends_with('/'))
    }
}

enum Decoder<R: Read> {
    Stored(Take<R>),
    Deflated(DeflateDecoder<Take<R>>),
}

/// Decompressed content of one entry, verified against its central directory record.
pub struct EntryReader<R: Read> {
    decoder: Decoder<R>,
    name: String,
    expected_crc: u32,
    expected_size: u64,
    crc: Crc32,
    read: u64,
    verified: bool,
}

impl<R: Read> EntryReader<R> {
    fn new(decoder: Decoder<R>, entry: &ZipEntryInfo) -> Self {
        Self {
            decoder,
            name: entry.name.clone(),
            expected_crc: entry.crc32,
            expected_size: entry.uncompressed_size,
            crc: Crc32::new(),
            read: 0,
            verified: false,
        }
    }

    fn verify(&mut self) -> io::Result<()> {
        self.verified = true;
        let problem = if self.read != self.expected_size {
            let (name, read, expected) = (&self.name, self.read, self.expected_size);
            format!("{} is {} bytes, directory says {}", name, read, expected)
        } else if self.crc.finish() != self.expected_crc {
            format!(
                "CRC mismatch in {}: expected {:08x}, got {:08x}",
                self.name,
                self.expected_crc,
                self.crc.finish()
            )
        } else {
            return Ok(());
        };
        Err(io::Error::new(io::ErrorKind::InvalidData, ArchiveError::CorruptArchive(problem)))
    }
}

impl<R: Read> Read for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = match &mut self.decoder {
            Decoder::Stored(inner) => inner.read(buf)?,
            Decoder::Deflated(inner) => inner.read(buf)?,
        };
        self.crc.update(&buf[..n]);
        self.read += n as u64;
        if !self.verified && (n == 0 || self.read >= self.expected_size) {
            self.verify()?;
        }
        Ok(n)
    }
}

#[derive(Debug)]
pub struct ArchiveReader<R> {
    source: R,
    cd_offset: u64,
    cd_size: u64,
    entry_count: u16,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Locate the End-Of-Central-Directory record by scanning backward through the tail.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::CorruptArchive`] if no EOCD record is found or the central
    /// directory it points to lies outside the source.
    pub fn new(mut source: R) -> Result<Self, ArchiveError> {
        let len = source.seek(SeekFrom::End(0))?;
        if len < EOCD_LEN as u64 {
            return Err(ArchiveError::CorruptArchive(format!(
                "source is {} bytes, too small to be a ZIP archive",
                len
            )));
        }

        let window = len.min(MAX_EOCD_SEARCH);
        let window_start = len - window;
        source.seek(SeekFrom::Start(window_start))?;
        let mut tail = vec![0u8; window as usize];
        source.read_exact(&mut tail)?;

        let eocd = (0..=tail.len() - EOCD_LEN)
            .rev()
            .find(|&i| read_u32(&tail, i) == EOCD_SIG)
            .ok_or_else(|| {
                ArchiveError::CorruptArchive("end of central directory not found".to_string())
            })?;

        let entry_count = read_u16(&tail, eocd + 10);
        let cd_size = u64::from(read_u32(&tail, eocd + 12));
        let cd_offset = u64::from(read_u32(&tail, eocd + 16));

        let eocd_pos = window_start + eocd as u64;
        if cd_offset + cd_size > eocd_pos {
            return Err(ArchiveError::CorruptArchive(format!(
                "central directory ({} bytes at {}) overlaps end record at {}",
                cd_size, cd_offset, eocd_pos
            )));
        }

        Ok(Self { source, cd_offset, cd_size, entry_count })
    }

    /// Number of entries declared by the end record.
    pub fn len(&self) -> usize {
        usize::from(self.entry_count)
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Parse every central directory record.
    pub fn entries(&mut self) -> Result<Vec<ZipEntryInfo>, ArchiveError> {
        let cd = self.read_central_directory()?;
        let mut entries = Vec::with_capacity(self.len());
        let mut pos = 0;
        while let Some((entry, next)) = parse_central_record(&cd, pos)? {
            entries.push(entry);
            pos = next;
        }
        Ok(entries)
    }

    /// Find the first entry (in directory order) matching any of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EntryNotFound`] carrying the attempted names.
    pub fn find_entry(&mut self, names: &[&str]) -> Result<ZipEntryInfo, ArchiveError> {
        let cd = self.read_central_directory()?;
        let mut pos = 0;
        while let Some((entry, next)) = parse_central_record(&cd, pos)? {
            if names.iter().any(|name| entry.matches(name)) {
                return Ok(entry);
            }
            pos = next;
        }
        Err(ArchiveError::EntryNotFound { names: names.iter().map(|n| n.to_string()).collect() })
    }

    /// Stream an entry while keeping the reader for further lookups.
    pub fn open_entry(
        &mut self,
        entry: &ZipEntryInfo,
    ) -> Result<EntryReader<&mut R>, ArchiveError> {
        check_method(entry)?;
        let start = data_start(&mut self.source, entry)?;
        self.source.seek(SeekFrom::Start(start))?;
        Ok(wrap(&mut self.source, entry))
    }

    /// Consume the reader and stream one entry.
    pub fn into_entry_reader(
        mut self,
        entry: &ZipEntryInfo,
    ) -> Result<EntryReader<R>, ArchiveError> {
        check_method(entry)?;
        let start = data_start(&mut self.source, entry)?;
        self.source.seek(SeekFrom::Start(start))?;
        Ok(wrap(self.source, entry))
    }

    /// Find the first entry matching `names` and stream it.
    pub fn open_first(
        mut self,
        names: &[&str],
    ) -> Result<(ZipEntryInfo, EntryReader<R>), ArchiveError> {
        let entry = self.find_entry(names)?;
        let reader = self.into_entry_reader(&entry)?;
        Ok((entry, reader))
    }

    fn read_central_directory(&mut self) -> Result<Vec<u8>, ArchiveError> {
        self.source.seek(SeekFrom::Start(self.cd_offset))?;
        let mut cd = vec![0u8; self.cd_size as usize];
        self.source.read_exact(&mut cd).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                ArchiveError::CorruptArchive("central directory truncated".to_string())
            }
            _ => ArchiveError::Io(e),
        })?;
        Ok(cd)
    }
}

fn check_method(entry: &ZipEntryInfo) -> Result<(), ArchiveError> {
    match entry.method {
        METHOD_STORE | METHOD_DEFLATE => Ok(()),
        other => Err(ArchiveError::UnsupportedCompression(other)),
    }
}

fn wrap<R: Read>(source: R, entry: &ZipEntryInfo) -> EntryReader<R> {
    let limited = source.take(entry.compressed_size);
    let decoder = if entry.method == METHOD_DEFLATE {
        Decoder::Deflated(DeflateDecoder::new(limited))
    } else {
        Decoder::Stored(limited)
    };
    EntryReader::new(decoder, entry)
}

/// Read the local header to find where entry data begins; its name and extra field
/// lengths may differ from the central directory's.
fn data_start<R: Read + Seek>(source: &mut R, entry: &ZipEntryInfo) -> Result<u64, ArchiveError> {
    source.seek(SeekFrom::Start(entry.local_header_offset))?;
    let mut header = [0u8; LOCAL_HEADER_LEN];
    source.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ArchiveError::CorruptArchive(format!(
            "local header of {} truncated",
            entry.name
        )),
        _ => ArchiveError::Io(e),
    })?;

    if read_u32(&header, 0) != LOCAL_HEADER_SIG {
        return Err(ArchiveError::CorruptArchive(format!(
            "bad local header signature for {}",
            entry.name
        )));
    }

    let name_len = u64::from(read_u16(&header, 26));
    let extra_len = u64::from(read_u16(&header, 28));
    Ok(entry.local_header_offset + LOCAL_HEADER_LEN as u64 + name_len + extra_len)
}

/// Parse the record at `pos`; `None` at the end of the directory.
fn parse_central_record(
    cd: &[u8],
    pos: usize,
) -> Result<Option<(ZipEntryInfo, usize)>, ArchiveError> {
    if pos >= cd.len() {
        return Ok(None);
    }
    if pos + CENTRAL_HEADER_LEN > cd.len() || read_u32(cd, pos) != CENTRAL_HEADER_SIG {
        return Err(ArchiveError::CorruptArchive(format!(
            "bad central directory record at {}",
            pos
        )));
    }

    let name_len = usize::from(read_u16(cd, pos + 28));
    let extra_len = usize::from(read_u16(cd, pos + 30));
    let comment_len = usize::from(read_u16(cd, pos + 32));
    let name_start = pos + CENTRAL_HEADER_LEN;
    let next = name_start + name_len + extra_len + comment_len;
    if next > cd.len() {
        return Err(ArchiveError::CorruptArchive(format!(
            "central directory record at {} overruns the directory",
            pos
        )));
    }

    let entry = ZipEntryInfo {
        name: String::from_utf8_lossy(&cd[name_start..name_start + name_len]).into_owned(),
        flags: read_u16(cd, pos + 8),
        method: read_u16(cd, pos + 10),
        crc32: read_u32(cd, pos + 16),
        compressed_size: u64::from(read_u32(cd, pos + 20)),
        uncompressed_size: u64::from(read_u32(cd, pos + 24)),
        local_header_offset: u64::from(read_u32(cd, pos + 42)),
    };
    Ok(Some((entry, next)))
}
