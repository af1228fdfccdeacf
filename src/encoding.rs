//! Shared numeric encoding helpers
//!
//! Mask/shift math, zigzag mapping, the full-range variable-length integer
//! used by the block-packed format, and the versioned byte-count formulas
//! that every packed layout shares.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Format version whose payloads were 64-bit-word aligned (not byte aligned).
pub const VERSION_START: u32 = 0;
/// Format version whose payloads are byte aligned.
pub const VERSION_BYTE_ALIGNED: u32 = 1;
/// Version written by this crate.
pub const VERSION_CURRENT: u32 = VERSION_BYTE_ALIGNED;

/// Validate a format version read from a stream.
pub fn check_version(version: u32) -> Result<()> {
    if version > VERSION_CURRENT {
        return Err(Error::Corruption(format!(
            "unsupported packed format version {version}"
        )));
    }
    Ok(())
}

/// Largest value representable in `bits_per_value` bits.
#[inline]
pub fn max_value(bits_per_value: u32) -> u64 {
    debug_assert!(bits_per_value >= 1 && bits_per_value <= 64);
    if bits_per_value == 64 {
        u64::MAX
    } else {
        (1u64 << bits_per_value) - 1
    }
}

/// Number of bits needed to represent `val`.
#[inline]
pub fn bits_needed_u64(val: u64) -> u32 {
    if val == 0 { 0 } else { 64 - val.leading_zeros() }
}

/// Greatest common divisor, used for word-alignment periods.
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Serialized byte count of `value_count` packed values of the given width.
///
/// Version 0 payloads end on a 64-bit word boundary, later versions on a
/// byte boundary. Direct8/Direct32 padding tails follow from the difference.
#[inline]
pub fn byte_count(version: u32, value_count: usize, bits_per_value: u32) -> u64 {
    debug_assert!(bits_per_value <= 64);
    let bits = value_count as u64 * bits_per_value as u64;
    if version < VERSION_BYTE_ALIGNED {
        8 * bits.div_ceil(64)
    } else {
        bits.div_ceil(8)
    }
}

/// Number of 64-bit backing words needed for `value_count` packed values.
#[inline]
pub fn word_count(value_count: usize, bits_per_value: u32) -> usize {
    (value_count as u64 * bits_per_value as u64).div_ceil(64) as usize
}

/// Zigzag-encode an i64 to u64 (small absolute values → small u64).
#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Zigzag-decode a u64 back to i64.
#[inline]
pub fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Write a variable-length integer covering the full u64 range (1-9 bytes).
///
/// 7 payload bits per byte with a high-bit continuation flag; after eight
/// such bytes the ninth carries a full 8 bits and no continuation flag, so
/// 64 bits fit in at most 9 bytes instead of 10.
pub fn write_vlong<W: Write>(writer: &mut W, mut value: u64) -> io::Result<()> {
    let mut written = 0;
    while value & !0x7F != 0 && written < 8 {
        writer.write_u8((value & 0x7F) as u8 | 0x80)?;
        value >>= 7;
        written += 1;
    }
    writer.write_u8(value as u8)
}

/// Read a variable-length integer written by [`write_vlong`].
pub fn read_vlong<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut b = reader.read_u8()?;
    if b & 0x80 == 0 {
        return Ok(b as u64);
    }
    let mut value = (b & 0x7F) as u64;
    for shift in 1..8u32 {
        b = reader.read_u8()?;
        value |= ((b & 0x7F) as u64) << (7 * shift);
        if b & 0x80 == 0 {
            return Ok(value);
        }
    }
    // ninth byte: all 8 bits are payload
    b = reader.read_u8()?;
    value |= (b as u64) << 56;
    Ok(value)
}
