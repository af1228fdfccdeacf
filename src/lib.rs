//! Intpack - compact packed integer storage for search-index columns
//!
//! The storage layer a segment's numeric columns sit on: posting deltas,
//! norms and per-document values are sequences of non-negative integers
//! that each fit in some fixed number of bits, and this crate stores them
//! using exactly that many bits.
//!
//! - Fixed-width arrays with O(1) random access behind the [`Reader`] /
//!   [`Mutable`] traits: [`Direct8`] and [`Direct32`] for word-aligned
//!   widths, [`Packed64`] for any width 1-64 (values may straddle two
//!   backing words)
//! - [`BulkCodec`] for group-at-a-time encode/decode on the bulk paths
//! - [`BlockPackedWriter`] / [`BlockPackedReaderIterator`] for streaming
//!   sequences as independently-compressed blocks with per-block bit
//!   width and minimum-value offset, supporting skip-ahead without
//!   decoding skipped blocks
//!
//! All on-disk layouts are big-endian and stable across the format
//! versions in [`encoding`]. Arrays are single-threaded by design:
//! immutable arrays may be read concurrently, mutation must be exclusive,
//! and a block iterator is never shared.

pub mod block;
pub mod bulk;
pub mod direct;
pub mod encoding;
pub mod error;
pub mod packed64;

pub use block::{BlockPackedReaderIterator, BlockPackedWriter, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use bulk::BulkCodec;
pub use direct::{Direct8, Direct32};
pub use encoding::{
    VERSION_BYTE_ALIGNED, VERSION_CURRENT, VERSION_START, bits_needed_u64, byte_count,
    zigzag_decode, zigzag_encode,
};
pub use error::{Error, Result};
pub use packed64::Packed64;

use std::io::Read;

/// Random read access to a fixed-width packed array.
///
/// Index bounds are caller preconditions checked by `debug_assert!` only;
/// release builds do not validate them.
pub trait Reader {
    /// Value at `index`.
    fn get(&self, index: usize) -> u64;

    /// Number of values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed width of every value, in bits.
    fn bits_per_value(&self) -> u32;

    /// Approximate memory held by the backing buffer plus fixed overhead.
    fn ram_bytes_used(&self) -> usize;

    /// Fill `dest` with values starting at `index`, returning the count
    /// actually written. Implementations may stop early at an internal
    /// decode-group boundary; callers loop until satisfied.
    fn get_bulk(&self, index: usize, dest: &mut [u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = dest.len().min(self.len() - index);
        for (i, slot) in dest[..count].iter_mut().enumerate() {
            *slot = self.get(index + i);
        }
        count
    }
}

/// In-place mutation of a fixed-width packed array.
///
/// Values wider than the configured width are silently truncated.
pub trait Mutable: Reader {
    /// Store `value` at `index`, truncated to the configured width.
    fn set(&mut self, index: usize, value: u64);

    /// Store values from `src` starting at `index`, returning the count
    /// actually consumed (same early-stop contract as `get_bulk`).
    fn set_bulk(&mut self, index: usize, src: &[u64]) -> usize {
        debug_assert!(index <= self.len());
        let count = src.len().min(self.len() - index);
        for (i, &v) in src[..count].iter().enumerate() {
            self.set(index + i, v);
        }
        count
    }

    /// Set every index in `[from, to)` to `value`. Behaves exactly like
    /// repeated `set` calls; implementations may take a block-aligned path.
    fn fill(&mut self, from: usize, to: usize, value: u64) {
        debug_assert!(from <= to && to <= self.len());
        for i in from..to {
            self.set(i, value);
        }
    }

    /// Reset every value to zero.
    fn clear(&mut self) {
        self.fill(0, self.len(), 0);
    }
}

/// Pick the cheapest mutable implementation for the given width.
///
/// The only place that knows the full set of variants: exactly 8 or 32
/// bits use the word-aligned arrays, everything else packs contiguously.
pub fn mutable_for(value_count: usize, bits_per_value: u32) -> Box<dyn Mutable> {
    assert!(
        bits_per_value >= 1 && bits_per_value <= 64,
        "bits_per_value must be in 1..=64, got {bits_per_value}"
    );
    match bits_per_value {
        8 => Box::new(Direct8::new(value_count)),
        32 => Box::new(Direct32::new(value_count)),
        b => Box::new(Packed64::new(value_count, b)),
    }
}

/// Deserializing twin of [`mutable_for`]: reads the array's on-disk layout
/// (including any legacy-version padding) from `reader`.
pub fn read_mutable<R: Read>(
    reader: &mut R,
    version: u32,
    value_count: usize,
    bits_per_value: u32,
) -> Result<Box<dyn Mutable>> {
    encoding::check_version(version)?;
    if bits_per_value < 1 || bits_per_value > 64 {
        return Err(Error::Corruption(format!(
            "bits_per_value must be in 1..=64, got {bits_per_value}"
        )));
    }
    Ok(match bits_per_value {
        8 => Box::new(Direct8::from_reader(reader, version, value_count)?),
        32 => Box::new(Direct32::from_reader(reader, version, value_count)?),
        b => Box::new(Packed64::from_reader(reader, version, value_count, b)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_factory_dispatch() {
        let arr = mutable_for(10, 8);
        assert_eq!(arr.bits_per_value(), 8);
        let arr = mutable_for(10, 32);
        assert_eq!(arr.bits_per_value(), 32);
        let arr = mutable_for(10, 13);
        assert_eq!(arr.bits_per_value(), 13);
    }

    #[test]
    fn test_factory_arrays_roundtrip() {
        for bpv in [1u32, 8, 13, 32, 57, 64] {
            let mut arr = mutable_for(100, bpv);
            let mask = encoding::max_value(bpv);
            for i in 0..100 {
                arr.set(i, (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) & mask);
            }
            for i in 0..100 {
                assert_eq!(
                    arr.get(i),
                    (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) & mask,
                    "width {bpv}"
                );
            }
            assert_eq!(arr.len(), 100);
            assert!(arr.ram_bytes_used() > 0);
        }
    }

    #[test]
    fn test_trait_defaults_via_dyn() {
        let mut arr = mutable_for(50, 11);
        arr.fill(10, 40, 777);
        arr.set(0, 3);
        let mut dest = vec![0u64; 50];
        let mut read = 0;
        while read < 50 {
            read += arr.get_bulk(read, &mut dest[read..]);
        }
        assert_eq!(dest[0], 3);
        assert_eq!(dest[9], 0);
        assert_eq!(dest[10], 777);
        assert_eq!(dest[39], 777);
        assert_eq!(dest[40], 0);

        arr.clear();
        for i in 0..50 {
            assert_eq!(arr.get(i), 0);
        }
    }

    #[test]
    fn test_read_mutable_roundtrip() {
        let mut packed = Packed64::new(77, 13);
        for i in 0..77 {
            packed.set(i, (i as u64 * 31) & encoding::max_value(13));
        }
        let mut buf = Vec::new();
        packed.write_to(&mut buf, VERSION_CURRENT).unwrap();

        let mut cursor = Cursor::new(&buf);
        let arr = read_mutable(&mut cursor, VERSION_CURRENT, 77, 13).unwrap();
        for i in 0..77 {
            assert_eq!(arr.get(i), packed.get(i));
        }
    }

    #[test]
    fn test_read_mutable_rejects_bad_width() {
        let buf = vec![0u8; 64];
        // .err() rather than .unwrap_err(): Box<dyn Mutable> has no Debug
        let err = read_mutable(&mut Cursor::new(&buf), VERSION_CURRENT, 4, 65)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Corruption(_)));
        let err = read_mutable(&mut Cursor::new(&buf), 9, 4, 8).err().unwrap();
        assert!(matches!(err, Error::Corruption(_)));
    }
}
