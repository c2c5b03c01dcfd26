// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumerations encoded by name in text and by integer in binary.
//!
//! ```rust
//! use reflector::codec::{declare_enum, to_text, EnumRepr, NamedValues};
//! use reflector::{Ref, Registry};
//!
//! #[derive(Clone, Copy, Default, PartialEq, Debug)]
//! enum Color { #[default] Red, Green }
//!
//! impl EnumRepr for Color {
//!     fn to_repr(self) -> i64 { self as i64 }
//!     fn from_repr(repr: i64) -> Option<Self> {
//!         match repr { 0 => Some(Color::Red), 1 => Some(Color::Green), _ => None }
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! declare_enum(&mut registry, "Color", NamedValues::new([(Color::Red, "Red"), (Color::Green, "Green")]));
//! let c = Color::Green;
//! assert_eq!(to_text(Ref::new(&registry, &c).unwrap()).unwrap(), "Green");
//! ```

use std::any::Any;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::binary::BinaryCodec;
use super::text::{kind_of, TextCodec, TextError};
use crate::config::UNKNOWN_ENUM_NAME;
use crate::registry::{Registry, TypeKey};

/// Integer view of an enumeration.
pub trait EnumRepr: Any + Copy + PartialEq + Default + Send + Sync {
    fn to_repr(self) -> i64;

    /// `None` for integers that name no variant.
    fn from_repr(repr: i64) -> Option<Self>;
}

macro_rules! impl_enum_repr_int {
    ($($type:ty),*) => {
        $(
            impl EnumRepr for $type {
                fn to_repr(self) -> i64 {
                    i64::from(self)
                }

                fn from_repr(repr: i64) -> Option<Self> {
                    <$type>::try_from(repr).ok()
                }
            }
        )*
    };
}

impl_enum_repr_int!(i8, i16, i32, i64, u8, u16, u32);

/// Ordered `(value, name)` table of an enumeration.
#[derive(Debug, Clone)]
pub struct NamedValues<T> {
    entries: Vec<(T, String)>,
}

impl<T: EnumRepr> NamedValues<T> {
    pub fn new<'n>(entries: impl IntoIterator<Item = (T, &'n str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(value, name)| (value, name.to_owned()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (T, &str)> + '_ {
        self.entries.iter().map(|(value, name)| (*value, name.as_str()))
    }

    /// Name of `value`, or `"unknown"`.
    pub fn name_of(&self, value: T) -> &str {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map_or(UNKNOWN_ENUM_NAME, |(_, name)| name.as_str())
    }

    /// Value named `name`, or `T::default()`.
    pub fn value_of(&self, name: &str) -> T {
        self.entries
            .iter()
            .find(|(_, n)| n == name)
            .map_or_else(T::default, |(value, _)| *value)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|(_, n)| n == name)
    }
}

/// Text codec by name and binary codec by zig-zag integer.
///
/// Unknown names and integers decode to `T::default()`.
pub fn enum_codecs<T: EnumRepr>(table: NamedValues<T>) -> (TextCodec, BinaryCodec) {
    let table = Arc::new(table);
    let encode_table = Arc::clone(&table);
    let text_codec = TextCodec::new(
        move |value, out| {
            let v = *value.downcast::<T>()?;
            *out = JsonValue::String(encode_table.name_of(v).to_owned());
            Ok(())
        },
        move |input, mut value| {
            let name = input.as_str().ok_or(TextError::Expected {
                expected: "string",
                found: kind_of(input),
            })?;
            value.set(table.value_of(name))?;
            Ok(())
        },
    );

    let binary_codec = BinaryCodec::new(
        |encoder, value| {
            encoder.write_signed(value.downcast::<T>()?.to_repr());
            Ok(())
        },
        |decoder, mut value| {
            let repr = decoder.read_signed()?;
            value.set(T::from_repr(repr).unwrap_or_default())?;
            Ok(())
        },
    );

    (text_codec, binary_codec)
}

/// Declare `T` under `name` with its enum codecs. The table is also kept as a
/// type property.
pub fn declare_enum<T: EnumRepr>(registry: &mut Registry, name: &str, table: NamedValues<T>) -> TypeKey {
    let (text_codec, binary_codec) = enum_codecs(table.clone());
    registry
        .declare::<T>(name)
        .property(text_codec)
        .property(binary_codec)
        .property(table)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_binary, from_text, to_binary};
    use crate::{Ref, RefMut};
    use serde_json::json;

    #[derive(Clone, Copy, Default, PartialEq, Debug)]
    enum Mode {
        #[default]
        Idle,
        Run,
        Stop,
    }

    impl EnumRepr for Mode {
        fn to_repr(self) -> i64 {
            self as i64
        }

        fn from_repr(repr: i64) -> Option<Self> {
            match repr {
                0 => Some(Self::Idle),
                1 => Some(Self::Run),
                2 => Some(Self::Stop),
                _ => None,
            }
        }
    }

    fn table() -> NamedValues<Mode> {
        NamedValues::new([(Mode::Idle, "Idle"), (Mode::Run, "Run")])
    }

    #[test]
    fn test_table_lookups() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.name_of(Mode::Run), "Run");
        assert_eq!(table.name_of(Mode::Stop), "unknown");
        assert_eq!(table.value_of("Run"), Mode::Run);
        assert_eq!(table.value_of("Bogus"), Mode::Idle);
        assert!(table.contains_name("Idle"));
    }

    #[test]
    fn test_integer_repr() {
        assert_eq!(200u8.to_repr(), 200);
        assert_eq!(u8::from_repr(300), None);
        assert_eq!(i16::from_repr(-5), Some(-5));
    }

    #[test]
    fn test_enum_text_and_binary() {
        let mut registry = Registry::new();
        let key = declare_enum(&mut registry, "Mode", table());
        assert!(registry.get(key).props().get::<NamedValues<Mode>>().is_some());

        let mut m = Mode::Idle;
        from_text(&json!("Run"), RefMut::new(&registry, &mut m).unwrap()).unwrap();
        assert_eq!(m, Mode::Run);
        from_text(&json!("Nope"), RefMut::new(&registry, &mut m).unwrap()).unwrap();
        assert_eq!(m, Mode::Idle);

        let stop = Mode::Stop;
        let bytes = to_binary(Ref::new(&registry, &stop).unwrap()).unwrap();
        let mut back = Mode::Idle;
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, Mode::Stop);
    }
}
