// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dictionary-prefixed binary codec.
//!
//! # Stream layout
//!
//! ```text
//! MAGIC:u32 LE | type_count:varint | (name_len:varint, name bytes)* | body
//! ```
//!
//! Each record in the body starts with the varint index of its type in the
//! dictionary. A type with a [`BinaryCodec`] property is followed by the
//! override's bytes only. Any other type is followed by a one-byte field count
//! and then each of its own declared fields, in declaration order. Fields
//! inherited from a base type are not written.
//!
//! Dictionary entries are assigned the first time a type is written, so the
//! header lists each type once in first-use order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::cursor::{ByteReader, ByteWriter};
use crate::config::{DecodeLimits, BINARY_MAGIC, MAX_BINARY_FIELDS};
use crate::error::ReflectError;
use crate::handle::{Ref, RefMut};
use crate::registry::{Registry, TypeKey};

/// Binary codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    /// Input ended early.
    BufferTooSmall {
        offset: usize,
        need: usize,
        have: usize,
    },
    /// Stream does not start with [`BINARY_MAGIC`].
    BadMagic { found: u32 },
    /// Dictionary names a type the registry does not know.
    UnknownType { name: String },
    /// Record refers past the end of the dictionary.
    BadTypeIndex { index: u64, count: usize },
    /// Record type differs from the destination type.
    TypeMismatch {
        expected: String,
        found: String,
        offset: usize,
    },
    /// Stored field count differs from the declared one.
    FieldCount {
        type_name: String,
        expected: usize,
        found: usize,
    },
    /// A record can't hold more than [`MAX_BINARY_FIELDS`] fields.
    TooManyFields { type_name: String, count: usize },
    /// Only declared types can appear in the dictionary.
    Undeclared { type_name: String },
    VarintOverflow { offset: usize },
    InvalidUtf8 { offset: usize },
    /// Decoded integer does not fit the destination type.
    OutOfRange { type_name: &'static str, offset: usize },
    /// A [`DecodeLimits`] bound was hit.
    LimitExceeded {
        what: &'static str,
        value: u64,
        limit: usize,
    },
    Reflect(ReflectError),
}

impl fmt::Display for BinaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { offset, need, have } => write!(
                f,
                "buffer too small at offset {}: need {} bytes, have {}",
                offset, need, have
            ),
            Self::BadMagic { found } => write!(f, "bad magic number 0x{:08x}", found),
            Self::UnknownType { name } => write!(f, "unknown type {} in dictionary", name),
            Self::BadTypeIndex { index, count } => write!(
                f,
                "type index {} out of range (dictionary has {} types)",
                index, count
            ),
            Self::TypeMismatch {
                expected,
                found,
                offset,
            } => write!(
                f,
                "type mismatch at offset {}: expected {}, found {}",
                offset, expected, found
            ),
            Self::FieldCount {
                type_name,
                expected,
                found,
            } => write!(
                f,
                "type {} declares {} fields, stream has {}",
                type_name, expected, found
            ),
            Self::TooManyFields { type_name, count } => write!(
                f,
                "type {} has {} fields, at most {} can be encoded",
                type_name, count, MAX_BINARY_FIELDS
            ),
            Self::Undeclared { type_name } => {
                write!(f, "type {} has no registered name", type_name)
            }
            Self::VarintOverflow { offset } => write!(f, "varint overflow at offset {}", offset),
            Self::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 string at offset {}", offset),
            Self::OutOfRange { type_name, offset } => {
                write!(f, "value at offset {} does not fit {}", offset, type_name)
            }
            Self::LimitExceeded { what, value, limit } => {
                write!(f, "{} {} exceeds limit {}", what, value, limit)
            }
            Self::Reflect(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BinaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reflect(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReflectError> for BinaryError {
    fn from(err: ReflectError) -> Self {
        Self::Reflect(err)
    }
}

// =======================================================================
// Override property
// =======================================================================

pub type BinaryWriteFn = dyn Fn(&mut BinaryEncoder, Ref<'_>) -> Result<(), BinaryError> + Send + Sync;
pub type BinaryReadFn =
    dyn Fn(&mut BinaryDecoder<'_>, RefMut<'_>) -> Result<(), BinaryError> + Send + Sync;

/// Type property replacing the default record encoding.
#[derive(Clone)]
pub struct BinaryCodec {
    write: Arc<BinaryWriteFn>,
    read: Arc<BinaryReadFn>,
}

impl BinaryCodec {
    pub fn new<W, R>(write: W, read: R) -> Self
    where
        W: Fn(&mut BinaryEncoder, Ref<'_>) -> Result<(), BinaryError> + Send + Sync + 'static,
        R: Fn(&mut BinaryDecoder<'_>, RefMut<'_>) -> Result<(), BinaryError> + Send + Sync + 'static,
    {
        Self {
            write: Arc::new(write),
            read: Arc::new(read),
        }
    }

    pub fn write(&self, encoder: &mut BinaryEncoder, value: Ref<'_>) -> Result<(), BinaryError> {
        (self.write)(encoder, value)
    }

    pub fn read(&self, decoder: &mut BinaryDecoder<'_>, value: RefMut<'_>) -> Result<(), BinaryError> {
        (self.read)(decoder, value)
    }
}

impl fmt::Debug for BinaryCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BinaryCodec")
    }
}

// =======================================================================
// Encoder
// =======================================================================

/// Writes records into a body buffer and collects the type dictionary.
#[derive(Debug, Default)]
pub struct BinaryEncoder {
    dictionary: HashMap<TypeKey, u64>,
    names: Vec<String>,
    body: ByteWriter,
}

impl BinaryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one record: type index then override bytes or own fields.
    pub fn write(&mut self, value: Ref<'_>) -> Result<(), BinaryError> {
        self.write_type(value)?;
        let desc = value.descriptor();
        if let Some(codec) = desc.props().get::<BinaryCodec>() {
            return codec.write(self, value);
        }

        let count = desc.fields().len();
        if count > MAX_BINARY_FIELDS {
            return Err(BinaryError::TooManyFields {
                type_name: desc.display_name().to_owned(),
                count,
            });
        }
        self.body.write_u8(count as u8);
        for (_, field) in value.field_refs() {
            self.write(field)?;
        }
        Ok(())
    }

    fn write_type(&mut self, value: Ref<'_>) -> Result<(), BinaryError> {
        let key = value.key();
        let index = match self.dictionary.get(&key) {
            Some(&index) => index,
            None => {
                let name = value.descriptor().name().ok_or_else(|| BinaryError::Undeclared {
                    type_name: value.type_name().to_owned(),
                })?;
                let index = self.names.len() as u64;
                self.names.push(name.to_owned());
                self.dictionary.insert(key, index);
                index
            }
        };
        self.body.write_varint(index);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) {
        self.body.write_u8(value);
    }

    pub fn write_varint(&mut self, value: u64) {
        self.body.write_varint(value);
    }

    /// Zig-zag varint.
    pub fn write_signed(&mut self, value: i64) {
        self.body.write_signed(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.body.write_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.body.write_f64_le(value);
    }

    pub fn write_str(&mut self, value: &str) {
        self.body.write_str(value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.body.write_bytes(data);
    }

    /// Dictionary names in index order.
    pub fn type_names(&self) -> &[String] {
        &self.names
    }

    /// Header followed by the body.
    pub fn finish(self) -> Vec<u8> {
        let names_len: usize = self.names.iter().map(|n| n.len() + 2).sum();
        let mut out = ByteWriter::with_capacity(8 + names_len + self.body.len());
        out.write_u32_le(BINARY_MAGIC);
        out.write_varint(self.names.len() as u64);
        for name in &self.names {
            out.write_str(name);
        }
        out.write_bytes(self.body.as_slice());
        out.into_inner()
    }
}

/// Encode `value` as a complete stream.
pub fn to_binary(value: Ref<'_>) -> Result<Vec<u8>, BinaryError> {
    let mut encoder = BinaryEncoder::new();
    encoder.write(value)?;
    Ok(encoder.finish())
}

// =======================================================================
// Decoder
// =======================================================================

/// Reads records from a stream whose dictionary was resolved up front.
#[derive(Debug)]
pub struct BinaryDecoder<'a> {
    registry: &'a Registry,
    reader: ByteReader<'a>,
    types: Vec<TypeKey>,
    limits: DecodeLimits,
    depth: usize,
}

impl<'a> BinaryDecoder<'a> {
    /// Parse the header of `buffer` with default limits.
    pub fn new(registry: &'a Registry, buffer: &'a [u8]) -> Result<Self, BinaryError> {
        Self::with_limits(registry, buffer, DecodeLimits::default())
    }

    pub fn with_limits(
        registry: &'a Registry,
        buffer: &'a [u8],
        limits: DecodeLimits,
    ) -> Result<Self, BinaryError> {
        let mut reader = ByteReader::new(buffer);
        let magic = reader.read_u32_le()?;
        if magic != BINARY_MAGIC {
            return Err(BinaryError::BadMagic { found: magic });
        }

        let count = reader.read_varint()?;
        if count > limits.max_types as u64 {
            return Err(BinaryError::LimitExceeded {
                what: "type count",
                value: count,
                limit: limits.max_types,
            });
        }
        let mut types = Vec::with_capacity((count as usize).min(reader.remaining()));
        for _ in 0..count {
            let name = reader.read_str(limits.max_string_len)?;
            let key = registry.find(name).ok_or_else(|| {
                log::debug!("[binary] unknown type '{}' in dictionary", name);
                BinaryError::UnknownType {
                    name: name.to_owned(),
                }
            })?;
            types.push(key);
        }

        Ok(Self {
            registry,
            reader,
            types,
            limits,
            depth: 0,
        })
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Read one record into `value`.
    pub fn read(&mut self, value: RefMut<'_>) -> Result<(), BinaryError> {
        let offset = self.reader.offset();
        let index = self.reader.read_varint()?;
        let key = usize::try_from(index)
            .ok()
            .and_then(|i| self.types.get(i).copied())
            .ok_or(BinaryError::BadTypeIndex {
                index,
                count: self.types.len(),
            })?;
        if key != value.key() {
            let found = self.registry.get(key).display_name().to_owned();
            log::debug!(
                "[binary] expected {} at offset {}, found {}",
                value.type_name(),
                offset,
                found
            );
            return Err(BinaryError::TypeMismatch {
                expected: value.type_name().to_owned(),
                found,
                offset,
            });
        }

        if self.depth >= self.limits.max_depth {
            return Err(BinaryError::LimitExceeded {
                what: "nesting depth",
                value: self.depth as u64 + 1,
                limit: self.limits.max_depth,
            });
        }
        self.depth += 1;
        let result = self.read_record(key, value);
        self.depth -= 1;
        result
    }

    fn read_record(&mut self, key: TypeKey, mut value: RefMut<'_>) -> Result<(), BinaryError> {
        let registry = self.registry;
        let desc = registry.get(key);
        if let Some(codec) = desc.props().get::<BinaryCodec>() {
            return codec.read(self, value);
        }

        let found = usize::from(self.reader.read_u8()?);
        let expected = desc.fields().len();
        if found != expected {
            return Err(BinaryError::FieldCount {
                type_name: desc.display_name().to_owned(),
                expected,
                found,
            });
        }
        for field in desc.fields() {
            self.read(value.get_field_mut(field)?)?;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, BinaryError> {
        self.reader.read_u8()
    }

    pub fn read_varint(&mut self) -> Result<u64, BinaryError> {
        self.reader.read_varint()
    }

    /// Zig-zag varint.
    pub fn read_signed(&mut self) -> Result<i64, BinaryError> {
        self.reader.read_signed()
    }

    pub fn read_f32(&mut self) -> Result<f32, BinaryError> {
        self.reader.read_f32_le()
    }

    pub fn read_f64(&mut self) -> Result<f64, BinaryError> {
        self.reader.read_f64_le()
    }

    pub fn read_str(&mut self) -> Result<&'a str, BinaryError> {
        self.reader.read_str(self.limits.max_string_len)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BinaryError> {
        self.reader.read_bytes(len)
    }

    /// Collection length, checked against `max_sequence_len`.
    pub fn read_len(&mut self) -> Result<usize, BinaryError> {
        let len = self.reader.read_varint()?;
        if len > self.limits.max_sequence_len as u64 {
            return Err(BinaryError::LimitExceeded {
                what: "sequence length",
                value: len,
                limit: self.limits.max_sequence_len,
            });
        }
        Ok(len as usize)
    }

    /// Offset of the next byte in the stream.
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    pub fn is_finished(&self) -> bool {
        self.reader.is_eof()
    }
}

/// Decode a complete stream into `value`.
pub fn from_binary(buffer: &[u8], value: RefMut<'_>) -> Result<(), BinaryError> {
    let registry = value.registry();
    let mut decoder = BinaryDecoder::new(registry, buffer)?;
    decoder.read(value)
}
