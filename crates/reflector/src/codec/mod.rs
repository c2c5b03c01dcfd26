// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic codecs driven by the registry.
//!
//! Both codecs walk the declared shape of a value. Types can replace the
//! default walk with a codec property ([`TextCodec`], [`BinaryCodec`]);
//! scalars, containers and enums are all encoded that way.

pub mod binary;
pub mod collection;
pub mod common;
pub mod cursor;
pub mod enums;
pub mod text;

pub use binary::{from_binary, to_binary, BinaryCodec, BinaryDecoder, BinaryEncoder, BinaryError};
pub use collection::{boxed_vec_codecs, declare_boxed_vec, declare_vec, vec_codecs};
pub use common::{register_common_types, serde_text_codec};
pub use enums::{declare_enum, enum_codecs, EnumRepr, NamedValues};
pub use text::{
    encode_into, from_text, from_text_str, to_text, to_text_string, SingleValue, TextCodec,
    TextError,
};
