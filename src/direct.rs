//! Word-aligned packed arrays for 8- and 32-bit values
//!
//! When the width is exactly one backing word there is no bit-splitting to
//! do: `get` is an index and a widening cast, `set` a truncating store.
//!
//! ## On-disk layout
//!
//! ```text
//! [value_count big-endian words of 1 or 4 bytes]
//! [padding: byte_count(version, value_count, B) - word_size*value_count]
//! ```
//!
//! The padding tail exists because version-0 payloads were 64-bit-word
//! aligned; it carries no values but must be consumed exactly so the
//! stream cursor lands on the next entry.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::mem;

use crate::encoding::byte_count;
use crate::{Mutable, Reader};

fn skip_padding<R: Read>(reader: &mut R, padding: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(padding), &mut io::sink())?;
    if skipped < padding {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "missing alignment padding",
        ));
    }
    Ok(())
}

fn write_padding<W: Write>(writer: &mut W, padding: u64) -> io::Result<()> {
    for _ in 0..padding {
        writer.write_u8(0)?;
    }
    Ok(())
}

// ── Direct8 ──────────────────────────────────────────────────────────────

/// Packed array storing exactly 8 bits per value, one byte per value.
#[derive(Debug, Clone)]
pub struct Direct8 {
    values: Vec<u8>,
}

impl Direct8 {
    pub fn new(value_count: usize) -> Self {
        Self {
            values: vec![0; value_count],
        }
    }

    /// Deserialize `value_count` bytes plus the version's alignment padding.
    pub fn from_reader<R: Read>(reader: &mut R, version: u32, value_count: usize) -> io::Result<Self> {
        let mut values = vec![0u8; value_count];
        reader.read_exact(&mut values)?;
        let padding = byte_count(version, value_count, 8) - value_count as u64;
        skip_padding(reader, padding)?;
        Ok(Self { values })
    }

    /// Serialize in the on-disk layout, padding included.
    pub fn write_to<W: Write>(&self, writer: &mut W, version: u32) -> io::Result<()> {
        writer.write_all(&self.values)?;
        let padding = byte_count(version, self.values.len(), 8) - self.values.len() as u64;
        write_padding(writer, padding)
    }
}

impl Reader for Direct8 {
    #[inline]
    fn get(&self, index: usize) -> u64 {
        self.values[index] as u64
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn bits_per_value(&self) -> u32 {
        8
    }

    fn ram_bytes_used(&self) -> usize {
        mem::size_of::<Self>() + self.values.capacity()
    }

    fn get_bulk(&self, index: usize, dest: &mut [u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = dest.len().min(self.len() - index);
        for (slot, &v) in dest[..count].iter_mut().zip(&self.values[index..]) {
            *slot = v as u64;
        }
        count
    }
}

impl Mutable for Direct8 {
    #[inline]
    fn set(&mut self, index: usize, value: u64) {
        self.values[index] = value as u8;
    }

    fn set_bulk(&mut self, index: usize, src: &[u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = src.len().min(self.len() - index);
        for (slot, &v) in self.values[index..index + count].iter_mut().zip(src) {
            *slot = v as u8;
        }
        count
    }

    fn fill(&mut self, from: usize, to: usize, value: u64) {
        debug_assert!(from <= to && to <= self.len());
        self.values[from..to].fill(value as u8);
    }
}

// ── Direct32 ─────────────────────────────────────────────────────────────

/// Packed array storing exactly 32 bits per value, one u32 per value.
#[derive(Debug, Clone)]
pub struct Direct32 {
    values: Vec<u32>,
}

impl Direct32 {
    pub fn new(value_count: usize) -> Self {
        Self {
            values: vec![0; value_count],
        }
    }

    /// Deserialize `value_count` big-endian u32 words plus the version's
    /// alignment padding.
    pub fn from_reader<R: Read>(reader: &mut R, version: u32, value_count: usize) -> io::Result<Self> {
        let mut values = vec![0u32; value_count];
        for slot in values.iter_mut() {
            *slot = reader.read_u32::<BigEndian>()?;
        }
        let padding = byte_count(version, value_count, 32) - 4 * value_count as u64;
        skip_padding(reader, padding)?;
        Ok(Self { values })
    }

    /// Serialize in the on-disk layout, padding included.
    pub fn write_to<W: Write>(&self, writer: &mut W, version: u32) -> io::Result<()> {
        for &v in &self.values {
            writer.write_u32::<BigEndian>(v)?;
        }
        let padding = byte_count(version, self.values.len(), 32) - 4 * self.values.len() as u64;
        write_padding(writer, padding)
    }
}

impl Reader for Direct32 {
    #[inline]
    fn get(&self, index: usize) -> u64 {
        self.values[index] as u64
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn bits_per_value(&self) -> u32 {
        32
    }

    fn ram_bytes_used(&self) -> usize {
        mem::size_of::<Self>() + self.values.capacity() * 4
    }

    fn get_bulk(&self, index: usize, dest: &mut [u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = dest.len().min(self.len() - index);
        for (slot, &v) in dest[..count].iter_mut().zip(&self.values[index..]) {
            *slot = v as u64;
        }
        count
    }
}

impl Mutable for Direct32 {
    #[inline]
    fn set(&mut self, index: usize, value: u64) {
        self.values[index] = value as u32;
    }

    fn set_bulk(&mut self, index: usize, src: &[u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = src.len().min(self.len() - index);
        for (slot, &v) in self.values[index..index + count].iter_mut().zip(src) {
            *slot = v as u32;
        }
        count
    }

    fn fill(&mut self, from: usize, to: usize, value: u64) {
        debug_assert!(from <= to && to <= self.len());
        self.values[from..to].fill(value as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{VERSION_CURRENT, VERSION_START};
    use std::io::Cursor;

    #[test]
    fn test_direct8_set_get() {
        let mut arr = Direct8::new(300);
        for i in 0..300 {
            arr.set(i, (i % 256) as u64);
        }
        for i in 0..300 {
            assert_eq!(arr.get(i), (i % 256) as u64);
        }
        assert!(arr.ram_bytes_used() > 0);
    }

    #[test]
    fn test_direct8_truncates() {
        let mut arr = Direct8::new(1);
        arr.set(0, 0x1FF);
        assert_eq!(arr.get(0), 0xFF);
    }

    #[test]
    fn test_direct32_truncates() {
        let mut arr = Direct32::new(1);
        arr.set(0, 0x1_2345_6789);
        assert_eq!(arr.get(0), 0x2345_6789);
    }

    #[test]
    fn test_fill_matches_repeated_set() {
        let mut filled = Direct32::new(100);
        filled.fill(13, 87, 0xDEAD_BEEF);
        let mut manual = Direct32::new(100);
        for i in 13..87 {
            manual.set(i, 0xDEAD_BEEF);
        }
        for i in 0..100 {
            assert_eq!(filled.get(i), manual.get(i));
        }
    }

    #[test]
    fn test_bulk_roundtrip() {
        let mut arr = Direct8::new(64);
        let src: Vec<u64> = (0..40).map(|i| i * 5).collect();
        assert_eq!(arr.set_bulk(10, &src), 40);
        let mut dest = vec![0u64; 40];
        assert_eq!(arr.get_bulk(10, &mut dest), 40);
        assert_eq!(dest, src);
        // clipped at the end of the array
        let mut tail = vec![0u64; 20];
        assert_eq!(arr.get_bulk(60, &mut tail), 4);
    }

    #[test]
    fn test_direct8_legacy_padding_is_three_bytes() {
        // 5 values at 8 bits, version 0: payload rounds up to one 64-bit
        // word, leaving exactly 3 padding bytes
        let mut arr = Direct8::new(5);
        for i in 0..5 {
            arr.set(i, i as u64 + 1);
        }
        let mut buf = Vec::new();
        arr.write_to(&mut buf, VERSION_START).unwrap();
        assert_eq!(buf.len(), 8);

        buf.extend_from_slice(&[0xAA, 0xBB]); // trailing sentinel
        let mut cursor = Cursor::new(&buf);
        let read = Direct8::from_reader(&mut cursor, VERSION_START, 5).unwrap();
        for i in 0..5 {
            assert_eq!(read.get(i), i as u64 + 1);
        }
        // padding consumed exactly: cursor sits on the sentinel
        assert_eq!(cursor.position(), 8);
        let mut rest = [0u8; 2];
        cursor.read_exact(&mut rest).unwrap();
        assert_eq!(rest, [0xAA, 0xBB]);
    }

    #[test]
    fn test_direct32_legacy_padding() {
        // 5 values at 32 bits, version 0: 20 payload bytes round up to 24
        let mut arr = Direct32::new(5);
        for i in 0..5 {
            arr.set(i, 0x0101_0101 * (i as u64 + 1));
        }
        let mut buf = Vec::new();
        arr.write_to(&mut buf, VERSION_START).unwrap();
        assert_eq!(buf.len(), 24);

        buf.push(0x7E);
        let mut cursor = Cursor::new(&buf);
        let read = Direct32::from_reader(&mut cursor, VERSION_START, 5).unwrap();
        for i in 0..5 {
            assert_eq!(read.get(i), arr.get(i));
        }
        assert_eq!(cursor.position(), 24);
        let mut rest = [0u8; 1];
        cursor.read_exact(&mut rest).unwrap();
        assert_eq!(rest, [0x7E]);
    }

    #[test]
    fn test_current_version_has_no_padding() {
        let mut arr = Direct32::new(6);
        for i in 0..6 {
            arr.set(i, i as u64);
        }
        let mut buf = Vec::new();
        arr.write_to(&mut buf, VERSION_CURRENT).unwrap();
        assert_eq!(buf.len(), 24);
        let read = Direct32::from_reader(&mut Cursor::new(&buf), VERSION_CURRENT, 6).unwrap();
        for i in 0..6 {
            assert_eq!(read.get(i), i as u64);
        }
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let buf = vec![0u8; 10];
        assert!(Direct32::from_reader(&mut Cursor::new(&buf), VERSION_CURRENT, 5).is_err());
    }
}
