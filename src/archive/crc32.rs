//! CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320) and DOS timestamps.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

const POLY: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Incremental CRC-32 accumulator.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut c = self.state;
        for &b in bytes {
            c = TABLE[((c ^ u32::from(b)) & 0xFF) as usize] ^ (c >> 8);
        }
        self.state = c;
    }

    pub fn finish(&self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-32 of a byte slice.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finish()
}

/// MS-DOS `(time, date)` pair in local time. Years before 1980 clamp to 1980-01-01.
pub fn dos_time_date(millis: i64) -> (u16, u16) {
    let local: DateTime<Local> = match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt,
        None => return (0, (1 << 5) | 1),
    };
    if local.year() < 1980 {
        return (0, (1 << 5) | 1);
    }

    let time = ((local.hour() as u16) << 11)
        | ((local.minute() as u16) << 5)
        | (local.second() as u16 / 2);
    let date = (((local.year() - 1980) as u16) << 9)
        | ((local.month() as u16) << 5)
        | local.day() as u16;
    (time, date)
}
