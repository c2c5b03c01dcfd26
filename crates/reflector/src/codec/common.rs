// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs for the built-in scalar types.
//!
//! | Type            | Text          | Binary                 |
//! |-----------------|---------------|------------------------|
//! | `bool`          | bool          | one byte, 0 or 1       |
//! | `u8..u64`       | number        | varint                 |
//! | `i8..i64`       | number        | zig-zag varint         |
//! | `f32`, `f64`    | number        | raw little-endian      |
//! | `String`        | string        | varint length + UTF-8  |

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::binary::{BinaryCodec, BinaryError};
use super::text::TextCodec;
use crate::registry::{Registry, TypeKey};

/// Text codec converting through `serde_json`.
pub fn serde_text_codec<T>() -> TextCodec
where
    T: Any + Serialize + DeserializeOwned,
{
    TextCodec::new(
        |value, out| {
            *out = serde_json::to_value(value.downcast::<T>()?)?;
            Ok(())
        },
        |input, mut value| {
            value.set(<T as serde::Deserialize<'_>>::deserialize(input)?)?;
            Ok(())
        },
    )
}

macro_rules! unsigned_codec {
    ($type:ty) => {
        BinaryCodec::new(
            |encoder, value| {
                encoder.write_varint(u64::from(*value.downcast::<$type>()?));
                Ok(())
            },
            |decoder, mut value| {
                let offset = decoder.offset();
                let raw = decoder.read_varint()?;
                let v = <$type>::try_from(raw).map_err(|_| BinaryError::OutOfRange {
                    type_name: stringify!($type),
                    offset,
                })?;
                value.set(v)?;
                Ok(())
            },
        )
    };
}

macro_rules! signed_codec {
    ($type:ty) => {
        BinaryCodec::new(
            |encoder, value| {
                encoder.write_signed(i64::from(*value.downcast::<$type>()?));
                Ok(())
            },
            |decoder, mut value| {
                let offset = decoder.offset();
                let raw = decoder.read_signed()?;
                let v = <$type>::try_from(raw).map_err(|_| BinaryError::OutOfRange {
                    type_name: stringify!($type),
                    offset,
                })?;
                value.set(v)?;
                Ok(())
            },
        )
    };
}

fn bool_codec() -> BinaryCodec {
    BinaryCodec::new(
        |encoder, value| {
            encoder.write_u8(u8::from(*value.downcast::<bool>()?));
            Ok(())
        },
        |decoder, mut value| {
            let offset = decoder.offset();
            let v = match decoder.read_u8()? {
                0 => false,
                1 => true,
                _ => {
                    return Err(BinaryError::OutOfRange {
                        type_name: "bool",
                        offset,
                    })
                }
            };
            value.set(v)?;
            Ok(())
        },
    )
}

fn f32_codec() -> BinaryCodec {
    BinaryCodec::new(
        |encoder, value| {
            encoder.write_f32(*value.downcast::<f32>()?);
            Ok(())
        },
        |decoder, mut value| {
            value.set(decoder.read_f32()?)?;
            Ok(())
        },
    )
}

fn f64_codec() -> BinaryCodec {
    BinaryCodec::new(
        |encoder, value| {
            encoder.write_f64(*value.downcast::<f64>()?);
            Ok(())
        },
        |decoder, mut value| {
            value.set(decoder.read_f64()?)?;
            Ok(())
        },
    )
}

fn string_codec() -> BinaryCodec {
    BinaryCodec::new(
        |encoder, value| {
            encoder.write_str(value.downcast::<String>()?);
            Ok(())
        },
        |decoder, mut value| {
            let s = decoder.read_str()?;
            let target = value.downcast_mut::<String>()?;
            target.clear();
            target.push_str(s);
            Ok(())
        },
    )
}

fn declare_scalar<T>(registry: &mut Registry, name: &str, binary: BinaryCodec) -> TypeKey
where
    T: Any + Clone + Serialize + DeserializeOwned,
{
    registry
        .declare::<T>(name)
        .property(serde_text_codec::<T>())
        .property(binary)
        .finish()
}

/// Declare `bool`, the integer types up to 64 bits, `f32`, `f64` and
/// `String` with text and binary codecs.
pub fn register_common_types(registry: &mut Registry) {
    declare_scalar::<bool>(registry, "bool", bool_codec());
    declare_scalar::<i8>(registry, "i8", signed_codec!(i8));
    declare_scalar::<i16>(registry, "i16", signed_codec!(i16));
    declare_scalar::<i32>(registry, "i32", signed_codec!(i32));
    declare_scalar::<i64>(registry, "i64", signed_codec!(i64));
    declare_scalar::<u8>(registry, "u8", unsigned_codec!(u8));
    declare_scalar::<u16>(registry, "u16", unsigned_codec!(u16));
    declare_scalar::<u32>(registry, "u32", unsigned_codec!(u32));
    declare_scalar::<u64>(registry, "u64", unsigned_codec!(u64));
    declare_scalar::<f32>(registry, "f32", f32_codec());
    declare_scalar::<f64>(registry, "f64", f64_codec());
    declare_scalar::<String>(registry, "String", string_codec());
    log::debug!("[registry] common scalar types declared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_binary, from_text, to_binary, to_text};
    use crate::{Ref, RefMut};
    use serde_json::json;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        register_common_types(&mut registry);
        registry
    }

    #[test]
    fn test_all_scalars_declared() {
        let registry = registry();
        for name in [
            "bool", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "String",
        ] {
            assert!(registry.find(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn test_scalar_text() {
        let registry = registry();
        let v = -12i16;
        assert_eq!(to_text(Ref::new(&registry, &v).unwrap()).unwrap(), json!(-12));

        let mut s = String::new();
        from_text(&json!("hi"), RefMut::new(&registry, &mut s).unwrap()).unwrap();
        assert_eq!(s, "hi");

        let mut small = 0u8;
        assert!(from_text(&json!(300), RefMut::new(&registry, &mut small).unwrap()).is_err());
    }

    #[test]
    fn test_signed_binary_uses_zigzag() {
        let registry = registry();
        let v = -1i32;
        let bytes = to_binary(Ref::new(&registry, &v).unwrap()).unwrap();
        // magic, 1 type, "i32", index 0, zig-zag(-1) = 1
        assert_eq!(&bytes[4..], [1, 3, b'i', b'3', b'2', 0, 1]);

        let mut back = 0i32;
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, -1);
    }

    #[test]
    fn test_binary_out_of_range() {
        let registry = registry();
        let wide = 70_000u32;
        let mut bytes = to_binary(Ref::new(&registry, &wide).unwrap()).unwrap();
        // Rename the dictionary entry so the record lands in a u16.
        let at = bytes.windows(3).position(|w| w == b"u32").unwrap();
        bytes[at..at + 3].copy_from_slice(b"u16");

        let mut narrow = 0u16;
        let err = from_binary(&bytes, RefMut::new(&registry, &mut narrow).unwrap()).unwrap_err();
        assert!(matches!(err, BinaryError::OutOfRange { type_name: "u16", .. }));
        assert_eq!(narrow, 0);
    }

    #[test]
    fn test_bool_and_string_binary() {
        let registry = registry();
        let flag = true;
        let bytes = to_binary(Ref::new(&registry, &flag).unwrap()).unwrap();
        let mut back = false;
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert!(back);

        let text = String::from("grüße");
        let bytes = to_binary(Ref::new(&registry, &text).unwrap()).unwrap();
        let mut back = String::from("old");
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, text);
    }
}
