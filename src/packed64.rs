//! Contiguous bit-packing for any width 1-64
//!
//! Logical value `i` occupies the bit range `[i*B, i*B+B)` of an infinite
//! MSB-first bit stream laid over 64-bit words, so a value may straddle two
//! words. The width mask and the `B - 64` shift term are precomputed at
//! construction and every shift is logical, never arithmetic.
//!
//! ## On-disk layout
//!
//! ```text
//! [byte_count(version, value_count, B) bytes]
//! ```
//!
//! Read as whole big-endian u64 words where possible; a final partial word
//! is assembled most-significant-byte-first from the remaining 0-7 bytes.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::mem;

use crate::bulk::BulkCodec;
use crate::encoding::{byte_count, gcd, max_value, word_count};
use crate::{Mutable, Reader};

/// Packed array storing `bits_per_value` bits per value, contiguously
/// across 64-bit words.
#[derive(Debug, Clone)]
pub struct Packed64 {
    words: Vec<u64>,
    value_count: usize,
    bits_per_value: u32,
    /// Right-aligned mask of `bits_per_value` bits.
    mask: u64,
    /// `bits_per_value - 64`, the straddle discriminant.
    bpv_minus_word: i64,
}

impl Packed64 {
    pub fn new(value_count: usize, bits_per_value: u32) -> Self {
        assert!(
            bits_per_value >= 1 && bits_per_value <= 64,
            "bits_per_value must be in 1..=64, got {bits_per_value}"
        );
        Self {
            words: vec![0; word_count(value_count, bits_per_value)],
            value_count,
            bits_per_value,
            mask: max_value(bits_per_value),
            bpv_minus_word: bits_per_value as i64 - 64,
        }
    }

    /// Deserialize `byte_count(version, value_count, B)` bytes: whole
    /// big-endian words, then a trailing partial word byte by byte.
    pub fn from_reader<R: Read>(
        reader: &mut R,
        version: u32,
        value_count: usize,
        bits_per_value: u32,
    ) -> io::Result<Self> {
        let mut arr = Self::new(value_count, bits_per_value);
        let bytes = byte_count(version, value_count, bits_per_value);
        let full_words = (bytes / 8) as usize;
        for slot in arr.words[..full_words].iter_mut() {
            *slot = reader.read_u64::<BigEndian>()?;
        }
        let remaining = (bytes % 8) as usize;
        if remaining != 0 {
            let mut last = 0u64;
            for i in 0..remaining {
                last |= (reader.read_u8()? as u64) << (56 - 8 * i as u32);
            }
            arr.words[full_words] = last;
        }
        Ok(arr)
    }

    /// Serialize in the on-disk layout for `version`.
    pub fn write_to<W: Write>(&self, writer: &mut W, version: u32) -> io::Result<()> {
        let bytes = byte_count(version, self.value_count, self.bits_per_value);
        let full_words = (bytes / 8) as usize;
        for &w in &self.words[..full_words] {
            writer.write_u64::<BigEndian>(w)?;
        }
        let remaining = (bytes % 8) as usize;
        if remaining != 0 {
            let last = self.words[full_words];
            for i in 0..remaining {
                writer.write_u8((last >> (56 - 8 * i as u32)) as u8)?;
            }
        }
        Ok(())
    }
}

impl Reader for Packed64 {
    #[inline]
    fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.value_count);
        let major = index as u64 * self.bits_per_value as u64;
        let w = (major >> 6) as usize;
        let end = (major & 63) as i64 + self.bpv_minus_word;
        if end <= 0 {
            // the value lies entirely in one word
            (self.words[w] >> (-end) as u32) & self.mask
        } else {
            // low bits of words[w], high bits of words[w + 1]
            ((self.words[w] << end as u32) | (self.words[w + 1] >> (64 - end) as u32)) & self.mask
        }
    }

    fn len(&self) -> usize {
        self.value_count
    }

    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    fn ram_bytes_used(&self) -> usize {
        mem::size_of::<Self>() + self.words.capacity() * 8
    }

    fn get_bulk(&self, index: usize, dest: &mut [u64]) -> usize {
        debug_assert!(index <= self.value_count);
        let mut len = dest.len().min(self.value_count - index);
        if len == 0 {
            return 0;
        }
        let original = index;
        let mut index = index;
        let mut off = 0;

        let codec = BulkCodec::of(self.bits_per_value);
        let vpg = codec.values_per_group();

        // scalar head up to the next group boundary
        let misalignment = index % vpg;
        if misalignment != 0 {
            let mut i = misalignment;
            while i < vpg && len > 0 {
                dest[off] = self.get(index);
                off += 1;
                index += 1;
                len -= 1;
                i += 1;
            }
            if len == 0 {
                return index - original;
            }
        }

        // whole aligned groups straight out of the backing words
        debug_assert_eq!(index % vpg, 0);
        let groups = len / vpg;
        if groups > 0 {
            let word_index = (index as u64 * self.bits_per_value as u64 >> 6) as usize;
            codec.decode_words(&self.words, word_index, &mut dest[off..], groups);
            let decoded = groups * vpg;
            index += decoded;
            off += decoded;
            len -= decoded;
        }

        if index > original {
            // stop at the group boundary; the caller loops for the tail
            index - original
        } else {
            // request smaller than one group: plain scalar copy
            for (i, slot) in dest[off..off + len].iter_mut().enumerate() {
                *slot = self.get(index + i);
            }
            len
        }
    }
}

impl Mutable for Packed64 {
    #[inline]
    fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.value_count);
        let value = value & self.mask;
        let major = index as u64 * self.bits_per_value as u64;
        let w = (major >> 6) as usize;
        let end = (major & 63) as i64 + self.bpv_minus_word;
        if end <= 0 {
            let shift = (-end) as u32;
            self.words[w] = self.words[w] & !(self.mask << shift) | (value << shift);
        } else {
            let end = end as u32;
            self.words[w] = self.words[w] & !(self.mask >> end) | (value >> end);
            self.words[w + 1] =
                self.words[w + 1] & (u64::MAX >> end) | (value << (64 - end));
        }
    }

    fn set_bulk(&mut self, index: usize, src: &[u64]) -> usize {
        debug_assert!(index <= self.value_count);
        let mut len = src.len().min(self.value_count - index);
        if len == 0 {
            return 0;
        }
        let original = index;
        let mut index = index;
        let mut off = 0;

        let codec = BulkCodec::of(self.bits_per_value);
        let vpg = codec.values_per_group();

        let misalignment = index % vpg;
        if misalignment != 0 {
            let mut i = misalignment;
            while i < vpg && len > 0 {
                self.set(index, src[off]);
                off += 1;
                index += 1;
                len -= 1;
                i += 1;
            }
            if len == 0 {
                return index - original;
            }
        }

        debug_assert_eq!(index % vpg, 0);
        let groups = len / vpg;
        if groups > 0 {
            let word_index = (index as u64 * self.bits_per_value as u64 >> 6) as usize;
            codec.encode_words(&src[off..], &mut self.words, word_index, groups);
            let encoded = groups * vpg;
            index += encoded;
            off += encoded;
            len -= encoded;
        }

        if index > original {
            index - original
        } else {
            for (i, &v) in src[off..off + len].iter().enumerate() {
                self.set(index + i, v);
            }
            len
        }
    }

    fn fill(&mut self, mut from: usize, to: usize, value: u64) {
        debug_assert!(from <= to && to <= self.value_count);
        let value = value & self.mask;
        let bpv = self.bits_per_value as usize;

        // minimum run of values whose bit pattern repeats on a word boundary
        let period = 64 / gcd(64, bpv);
        if to - from <= 3 * period {
            for i in from..to {
                self.set(i, value);
            }
            return;
        }

        // scalar until the next period boundary
        let head = from % period;
        if head != 0 {
            for _ in head..period {
                self.set(from, value);
                from += 1;
            }
        }

        // pre-pack one period's worth of words, then stamp the pattern
        // across every whole word in the range
        let pattern = {
            let mut tmp = Packed64::new(period, self.bits_per_value);
            for i in 0..period {
                tmp.set(i, value);
            }
            tmp.words
        };
        let pattern_words = (period * bpv) >> 6;
        debug_assert_eq!(pattern.len(), pattern_words);

        let from_word = from * bpv / 64;
        let to_word = to * bpv / 64;
        for w in from_word..to_word {
            self.words[w] = pattern[w % pattern_words];
        }

        // values at or straddling the last stamped word boundary
        for i in (to_word * 64) / bpv..to {
            self.set(i, value);
        }
    }
}
