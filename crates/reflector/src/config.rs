// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reflector configuration - wire constants and decode limits.
//!
//! Every constant that shapes the binary stream or the dispatch tables lives
//! here. **Never hardcode them elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: wire constants shared by encoder and decoder.
//! - **Level 2 (Dynamic)**: [`DecodeLimits`], chosen per decoder, optionally
//!   loaded from JSON.
//!
//! # Example
//!
//! ```rust
//! use reflector::config::DecodeLimits;
//!
//! let limits = DecodeLimits::default().with_max_sequence_len(1024);
//! assert_eq!(limits.max_sequence_len, 1024);
//!
//! let loaded = DecodeLimits::from_json_str(r#"{ "max_depth": 8 }"#).unwrap();
//! assert_eq!(loaded.max_depth, 8);
//! assert_eq!(loaded.max_string_len, DecodeLimits::default().max_string_len);
//! ```

use serde::{Deserialize, Serialize};

// =======================================================================
// Binary stream layout
// =======================================================================

/// Magic number opening every binary stream (written little-endian).
///
/// Layout: `MAGIC:u32 | type_count:varint | (name_len:varint, name)* | body`
pub const BINARY_MAGIC: u32 = 0x5511_4422;

/// Field count of a record is stored in a single byte.
pub const MAX_BINARY_FIELDS: usize = u8::MAX as usize;

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_BYTES: usize = 10;

// =======================================================================
// Dispatch
// =======================================================================

/// Highest method arity accepted by the declaration builder.
pub const MAX_METHOD_ARGS: usize = 4;

/// Name emitted by enum codecs for values missing from their table.
pub const UNKNOWN_ENUM_NAME: &str = "unknown";

// =======================================================================
// Decode limits
// =======================================================================

/// Upper bounds applied while decoding untrusted binary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum record nesting depth.
    pub max_depth: usize,
    /// Maximum element count of a decoded collection.
    pub max_sequence_len: usize,
    /// Maximum byte length of a decoded string.
    pub max_string_len: usize,
    /// Maximum number of entries in the type dictionary.
    pub max_types: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_sequence_len: 1 << 24,
            max_string_len: 1 << 24,
            max_types: 4096,
        }
    }
}

impl DecodeLimits {
    /// No limits beyond what the address space allows.
    pub fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_sequence_len: usize::MAX,
            max_string_len: usize::MAX,
            max_types: usize::MAX,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_sequence_len(mut self, max_sequence_len: usize) -> Self {
        self.max_sequence_len = max_sequence_len;
        self
    }

    pub fn with_max_string_len(mut self, max_string_len: usize) -> Self {
        self.max_string_len = max_string_len;
        self
    }

    pub fn with_max_types(mut self, max_types: usize) -> Self {
        self.max_types = max_types;
        self
    }

    /// Parse limits from JSON. Missing keys keep their default.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
