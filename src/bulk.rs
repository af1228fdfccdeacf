//! Group-at-a-time packed integer codec
//!
//! A `BulkCodec` encodes and decodes runs of fixed-width values in whole
//! groups, where one group is the smallest run whose bit pattern ends
//! exactly on a 64-bit word boundary. Working a group at a time lets the
//! packed-array bulk paths move whole words without any cross-word
//! bookkeeping, and the block-packed codec reuses the byte-stream side for
//! its per-block payloads.
//!
//! Bit layout is a single MSB-first bit stream: value `i` occupies bits
//! `[i*B, i*B+B)` counted from the most significant bit of the first word
//! (or byte). Serializing the words big-endian therefore produces exactly
//! the byte-stream encoding.

use crate::encoding::{gcd, max_value};

/// Paired encoder/decoder for one bit width, operating on whole groups.
#[derive(Debug, Clone, Copy)]
pub struct BulkCodec {
    bits_per_value: u32,
    words_per_group: usize,
    values_per_group: usize,
}

impl BulkCodec {
    /// Codec for the given width (1-64).
    pub fn of(bits_per_value: u32) -> Self {
        debug_assert!(bits_per_value >= 1 && bits_per_value <= 64);
        let g = gcd(64, bits_per_value as usize);
        Self {
            bits_per_value,
            words_per_group: bits_per_value as usize / g,
            values_per_group: 64 / g,
        }
    }

    /// Values encoded/decoded per group.
    #[inline]
    pub fn values_per_group(&self) -> usize {
        self.values_per_group
    }

    /// 64-bit words consumed/produced per group.
    #[inline]
    pub fn words_per_group(&self) -> usize {
        self.words_per_group
    }

    /// Decode `groups` whole groups from `words` starting at `word_offset`
    /// into the head of `dest`.
    pub fn decode_words(&self, words: &[u64], word_offset: usize, dest: &mut [u64], groups: usize) {
        let bpv = self.bits_per_value as u64;
        let mask = max_value(self.bits_per_value);
        let count = groups * self.values_per_group;
        debug_assert!(dest.len() >= count);
        for (i, slot) in dest[..count].iter_mut().enumerate() {
            let major = i as u64 * bpv;
            let w = word_offset + (major >> 6) as usize;
            let end = (major & 63) as i64 + self.bits_per_value as i64 - 64;
            *slot = if end <= 0 {
                (words[w] >> (-end) as u32) & mask
            } else {
                ((words[w] << end as u32) | (words[w + 1] >> (64 - end) as u32)) & mask
            };
        }
    }

    /// Encode the head of `src` as `groups` whole groups into `words`
    /// starting at `word_offset`. The target words are overwritten.
    pub fn encode_words(&self, src: &[u64], words: &mut [u64], word_offset: usize, groups: usize) {
        let bpv = self.bits_per_value as u64;
        let mask = max_value(self.bits_per_value);
        let count = groups * self.values_per_group;
        let nwords = groups * self.words_per_group;
        debug_assert!(src.len() >= count);
        words[word_offset..word_offset + nwords].fill(0);
        for (i, &value) in src[..count].iter().enumerate() {
            let v = value & mask;
            let major = i as u64 * bpv;
            let w = word_offset + (major >> 6) as usize;
            let end = (major & 63) as i64 + self.bits_per_value as i64 - 64;
            if end <= 0 {
                words[w] |= v << (-end) as u32;
            } else {
                words[w] |= v >> end as u32;
                words[w + 1] |= v << (64 - end) as u32;
            }
        }
    }

    /// Decode `dest.len()` values from an MSB-first byte stream.
    ///
    /// `bytes` must hold at least `ceil(dest.len() * B / 8)` bytes.
    pub fn decode_bytes(&self, bytes: &[u8], dest: &mut [u64]) {
        let bpv = self.bits_per_value as usize;
        debug_assert!(bytes.len() * 8 >= dest.len() * bpv);
        let mut bit_pos = 0usize;
        for slot in dest.iter_mut() {
            let mut value = 0u64;
            let mut remaining = bpv;
            while remaining > 0 {
                let byte = bytes[bit_pos / 8] as u64;
                let offset = bit_pos % 8;
                let take = remaining.min(8 - offset);
                let chunk = (byte >> (8 - offset - take)) & ((1u64 << take) - 1);
                value = (value << take) | chunk;
                remaining -= take;
                bit_pos += take;
            }
            *slot = value;
        }
    }

    /// Append the MSB-first byte-stream encoding of `src` to `out`
    /// (`ceil(src.len() * B / 8)` bytes).
    pub fn encode_bytes(&self, src: &[u64], out: &mut Vec<u8>) {
        let bpv = self.bits_per_value as usize;
        let mask = max_value(self.bits_per_value);
        let start = out.len();
        out.resize(start + (src.len() * bpv).div_ceil(8), 0);
        let buf = &mut out[start..];
        let mut bit_pos = 0usize;
        for &value in src {
            let v = value & mask;
            let mut remaining = bpv;
            while remaining > 0 {
                let offset = bit_pos % 8;
                let take = remaining.min(8 - offset);
                let chunk = (v >> (remaining - take)) & ((1u64 << take) - 1);
                buf[bit_pos / 8] |= (chunk as u8) << (8 - offset - take);
                remaining -= take;
                bit_pos += take;
            }
        }
    }
}
