// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte cursors for the binary stream.
//!
//! [`ByteWriter`] grows a `Vec<u8>`; [`ByteReader`] is bounds-checked and
//! reports the offset of every failure.

use super::binary::BinaryError;
use crate::config::MAX_VARINT_BYTES;

/// Generate little-endian write methods for fixed-size primitives.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Generate little-endian read methods for fixed-size primitives.
///
/// Each generated method checks bounds, copies the bytes and advances.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, BinaryError> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Map a signed integer onto the unsigned range, small magnitudes first.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Growable output buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_u32_le, u32);
    impl_write_le!(write_f32_le, f32);
    impl_write_le!(write_f64_le, f64);

    /// LEB128: 7 bits per byte, high bit set while more bytes follow.
    pub fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buffer.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buffer.push(value as u8);
    }

    pub fn write_signed(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Varint length followed by the UTF-8 bytes, no terminator.
    pub fn write_str(&mut self, value: &str) {
        self.write_varint(value.len() as u64);
        self.write_bytes(value.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked input cursor.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u32_le, u32, 4);
    impl_read_le!(read_f32_le, f32, 4);
    impl_read_le!(read_f64_le, f64, 8);

    pub fn read_u8(&mut self) -> Result<u8, BinaryError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_varint(&mut self) -> Result<u64, BinaryError> {
        let start = self.offset;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            let bits = u64::from(byte & 0x7f);
            if i == MAX_VARINT_BYTES - 1 && bits > 1 {
                return Err(BinaryError::VarintOverflow { offset: start });
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(BinaryError::VarintOverflow { offset: start })
    }

    pub fn read_signed(&mut self) -> Result<i64, BinaryError> {
        self.read_varint().map(zigzag_decode)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BinaryError> {
        let have = self.remaining();
        if len > have {
            return Err(BinaryError::BufferTooSmall {
                offset: self.offset,
                need: len,
                have,
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Varint length and UTF-8 bytes; lengths above `max_len` are rejected
    /// before reading.
    pub fn read_str(&mut self, max_len: usize) -> Result<&'a str, BinaryError> {
        let start = self.offset;
        let len = self.read_varint()?;
        if len > max_len as u64 {
            return Err(BinaryError::LimitExceeded {
                what: "string length",
                value: len,
                limit: max_len,
            });
        }
        let bytes = self.read_bytes(len as usize)?;
        std::str::from_utf8(bytes).map_err(|_| BinaryError::InvalidUtf8 { offset: start })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}
