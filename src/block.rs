//! Block-packed streaming codec
//!
//! A sequence of i64 values is written as a concatenation of
//! independently-compressed blocks of `block_size` values (the final block
//! may be shorter). Each block subtracts its own minimum and bitpacks the
//! deltas at the smallest width that fits, so locally skewed ranges such
//! as monotonically increasing doc-value runs compress well.
//!
//! ## Block layout
//!
//! ```text
//! [token: u8]              bits [7:1] = bits_per_value (0-64),
//!                          bit 0     = "min_value == 0"
//! [min: vlong]             only if bit 0 clear; zigzag(min) - 1
//! [payload]                byte_count(version, n, bits_per_value) bytes of
//!                          MSB-first packed deltas
//! ```
//!
//! The reader refills one block at a time and can skip whole blocks by
//! reading only the token and min, then byte-skipping the payload.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::bulk::BulkCodec;
use crate::encoding::{
    bits_needed_u64, byte_count, read_vlong, write_vlong, zigzag_decode, zigzag_encode,
};
use crate::error::{Error, Result};

/// Smallest allowed block size.
pub const MIN_BLOCK_SIZE: usize = 64;
/// Largest allowed block size.
pub const MAX_BLOCK_SIZE: usize = 1 << 27;

/// Token bits above this shift hold the block's bits-per-value.
const BPV_SHIFT: u32 = 1;
/// Token flag: the block's minimum value is exactly zero.
const MIN_VALUE_EQUALS_0: u8 = 1;

fn check_block_size(block_size: usize) {
    assert!(
        block_size.is_power_of_two() && (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size),
        "block_size must be a power of two in [{MIN_BLOCK_SIZE}, {MAX_BLOCK_SIZE}], got {block_size}"
    );
}

// ── Writer ───────────────────────────────────────────────────────────────

/// Streaming encoder for the block-packed format.
///
/// Buffers up to `block_size` values and flushes each full block; call
/// [`finish`](Self::finish) to flush the partial final block and reclaim
/// the sink.
pub struct BlockPackedWriter<W: Write> {
    writer: W,
    block_size: usize,
    buffer: Vec<i64>,
    ord: u64,
}

impl<W: Write> BlockPackedWriter<W> {
    pub fn new(writer: W, block_size: usize) -> Self {
        check_block_size(block_size);
        Self {
            writer,
            block_size,
            buffer: Vec::with_capacity(block_size),
            ord: 0,
        }
    }

    /// Number of values added so far.
    pub fn ord(&self) -> u64 {
        self.ord
    }

    /// Append one value, flushing a block when the buffer fills.
    pub fn add(&mut self, value: i64) -> io::Result<()> {
        self.buffer.push(value);
        self.ord += 1;
        if self.buffer.len() == self.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush any buffered partial block and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        Ok(self.writer)
    }

    fn flush(&mut self) -> io::Result<()> {
        debug_assert!(!self.buffer.is_empty());
        let min = *self.buffer.iter().min().unwrap();
        let max = *self.buffer.iter().max().unwrap();
        // max - min always fits unsigned, even across the signed range
        let delta = max.wrapping_sub(min) as u64;
        let bits_per_value = bits_needed_u64(delta);

        let token = (bits_per_value as u8) << BPV_SHIFT
            | if min == 0 { MIN_VALUE_EQUALS_0 } else { 0 };
        self.writer.write_u8(token)?;
        if min != 0 {
            write_vlong(&mut self.writer, zigzag_encode(min).wrapping_sub(1))?;
        }
        log::debug!(
            "block flush: {} values, bits_per_value={}, min={}",
            self.buffer.len(),
            bits_per_value,
            min
        );

        if bits_per_value > 0 {
            let codec = BulkCodec::of(bits_per_value);
            let deltas: Vec<u64> = self
                .buffer
                .iter()
                .map(|&v| v.wrapping_sub(min) as u64)
                .collect();
            let mut packed = Vec::new();
            codec.encode_bytes(&deltas, &mut packed);
            self.writer.write_all(&packed)?;
        }
        self.buffer.clear();
        Ok(())
    }
}

// ── Reader iterator ──────────────────────────────────────────────────────

/// Streaming decoder over a block-packed byte stream.
///
/// Stateful: tracks the absolute ordinal and the current decoded block.
/// Created bound to a byte-stream cursor and a declared value count;
/// requesting values past that count is [`Error::Eof`], a header declaring
/// an impossible width or a stream ending mid-block is
/// [`Error::Corruption`].
pub struct BlockPackedReaderIterator<R: Read> {
    reader: R,
    version: u32,
    block_size: usize,
    value_count: u64,
    /// Decoded values of the current block, min already added back.
    values: Vec<i64>,
    /// Raw deltas scratch, reused across refills.
    deltas: Vec<u64>,
    /// Packed payload scratch, reused across refills.
    scratch: Vec<u8>,
    /// Read position within `values`; `block_size` means "needs refill".
    off: usize,
    /// Absolute ordinal of the next value.
    ord: u64,
}

impl<R: Read> BlockPackedReaderIterator<R> {
    pub fn new(reader: R, version: u32, block_size: usize, value_count: u64) -> Self {
        check_block_size(block_size);
        Self {
            reader,
            version,
            block_size,
            value_count,
            values: vec![0; block_size],
            deltas: vec![0; block_size],
            scratch: Vec::new(),
            off: block_size,
            ord: 0,
        }
    }

    /// Rebind to a new stream cursor and value count, reusing the buffers.
    pub fn reset(&mut self, reader: R, value_count: u64) {
        self.reader = reader;
        self.value_count = value_count;
        self.off = self.block_size;
        self.ord = 0;
    }

    /// Absolute ordinal of the next value to be returned.
    pub fn ord(&self) -> u64 {
        self.ord
    }

    /// Total number of values in the stream.
    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    /// Next single value.
    pub fn next(&mut self) -> Result<i64> {
        if self.ord == self.value_count {
            return Err(self.eof());
        }
        if self.off == self.block_size {
            self.refill()?;
        }
        let value = self.values[self.off];
        self.off += 1;
        self.ord += 1;
        Ok(value)
    }

    /// View of up to `count` values straight out of the decode buffer,
    /// clipped to the current block and the stream's value count. Re-invoke
    /// for more; the view is never empty.
    pub fn next_values(&mut self, count: usize) -> Result<&[i64]> {
        debug_assert!(count > 0);
        if self.ord == self.value_count {
            return Err(self.eof());
        }
        if self.off == self.block_size {
            self.refill()?;
        }
        let count = count
            .min(self.block_size - self.off)
            .min((self.value_count - self.ord) as usize);
        let view = &self.values[self.off..self.off + count];
        self.off += count;
        self.ord += count as u64;
        Ok(view)
    }

    /// Advance `count` values without materializing them. Whole blocks are
    /// skipped by reading only their header and byte-skipping the payload;
    /// only a partial destination block is actually decoded.
    pub fn skip(&mut self, mut count: u64) -> Result<()> {
        if self.ord + count > self.value_count {
            return Err(self.eof());
        }

        // 1. consume what the current buffer still holds
        let buffered = count.min((self.block_size - self.off) as u64);
        self.off += buffered as usize;
        self.ord += buffered;
        count -= buffered;
        if count == 0 {
            return Ok(());
        }

        // 2. hop over whole blocks, header-only
        debug_assert_eq!(self.off, self.block_size);
        while count >= self.block_size as u64 {
            let token = self.reader.read_u8().map_err(map_header_eof)?;
            let bits_per_value = (token >> BPV_SHIFT) as u32;
            if bits_per_value > 64 {
                return Err(corrupt_bpv(bits_per_value));
            }
            if token & MIN_VALUE_EQUALS_0 == 0 {
                read_vlong(&mut self.reader).map_err(map_header_eof)?;
            }
            self.skip_bytes(byte_count(self.version, self.block_size, bits_per_value))?;
            self.ord += self.block_size as u64;
            count -= self.block_size as u64;
        }
        if count == 0 {
            return Ok(());
        }

        // 3. land inside the destination block
        self.refill()?;
        self.ord += count;
        self.off += count as usize;
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        let token = self.reader.read_u8().map_err(map_header_eof)?;
        let min_equals_0 = token & MIN_VALUE_EQUALS_0 != 0;
        let bits_per_value = (token >> BPV_SHIFT) as u32;
        if bits_per_value > 64 {
            return Err(corrupt_bpv(bits_per_value));
        }
        // an encoder may spell min = 0 explicitly instead of setting the
        // token flag; both forms are wire-valid
        let min_value = if min_equals_0 {
            0
        } else {
            zigzag_decode(read_vlong(&mut self.reader).map_err(map_header_eof)?.wrapping_add(1))
        };

        if bits_per_value == 0 {
            self.values.fill(min_value);
        } else {
            let codec = BulkCodec::of(bits_per_value);
            let values_in_block = (self.value_count - self.ord).min(self.block_size as u64) as usize;
            let payload = byte_count(self.version, values_in_block, bits_per_value) as usize;

            // a short final block still decodes block_size values; the
            // zero padding past `payload` is never observed
            let full = self.block_size * bits_per_value as usize / 8;
            self.scratch.clear();
            self.scratch.resize(full, 0);
            self.reader
                .read_exact(&mut self.scratch[..payload])
                .map_err(map_header_eof)?;

            codec.decode_bytes(&self.scratch, &mut self.deltas);
            if min_value == 0 {
                for (slot, &d) in self.values.iter_mut().zip(self.deltas.iter()) {
                    *slot = d as i64;
                }
            } else {
                for (slot, &d) in self.values.iter_mut().zip(self.deltas.iter()) {
                    *slot = (d as i64).wrapping_add(min_value);
                }
            }
        }
        self.off = 0;
        Ok(())
    }

    fn skip_bytes(&mut self, count: u64) -> Result<()> {
        let skipped = io::copy(&mut self.reader.by_ref().take(count), &mut io::sink())?;
        if skipped < count {
            return Err(Error::Corruption("stream ends mid-block".to_string()));
        }
        Ok(())
    }

    fn eof(&self) -> Error {
        Error::Eof {
            ord: self.ord,
            value_count: self.value_count,
        }
    }
}

fn corrupt_bpv(bits_per_value: u32) -> Error {
    Error::Corruption(format!(
        "block header declares {bits_per_value} bits per value (max 64)"
    ))
}

/// A stream that runs dry inside a block is corruption, not a plain read
/// failure; other I/O errors pass through.
fn map_header_eof(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Corruption("stream ends mid-block".to_string())
    } else {
        Error::Io(e)
    }
}
