// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec generators for sequence containers.
//!
//! Two flavors share one element walk: `Vec<T>` stores elements by value,
//! `Vec<Box<T>>` stores owned pointers. Text form is a JSON array; binary
//! form is a varint count followed by one record per element. Decoding
//! replaces the container content with freshly defaulted elements and fills
//! each one in place.

use std::any::Any;
use std::marker::PhantomData;

use serde_json::Value as JsonValue;

use super::binary::{BinaryCodec, BinaryError};
use super::text::{self, kind_of, TextCodec, TextError};
use crate::handle::{Ref, RefMut};
use crate::registry::{Registry, TypeKey};

/// Storage strategy of a sequence container.
trait Slots: 'static {
    type Container: Any;
    type Item: Any;

    fn len(container: &Self::Container) -> usize;
    fn item(container: &Self::Container, index: usize) -> &Self::Item;
    fn item_mut(container: &mut Self::Container, index: usize) -> &mut Self::Item;
    /// Drop the content and hold `len` default elements.
    fn reset(container: &mut Self::Container, len: usize);
}

struct ByValue<T>(PhantomData<T>);

impl<T: Any + Default> Slots for ByValue<T> {
    type Container = Vec<T>;
    type Item = T;

    fn len(container: &Vec<T>) -> usize {
        container.len()
    }

    fn item(container: &Vec<T>, index: usize) -> &T {
        &container[index]
    }

    fn item_mut(container: &mut Vec<T>, index: usize) -> &mut T {
        &mut container[index]
    }

    fn reset(container: &mut Vec<T>, len: usize) {
        container.clear();
        container.resize_with(len, T::default);
    }
}

struct Boxed<T>(PhantomData<T>);

impl<T: Any + Default> Slots for Boxed<T> {
    type Container = Vec<Box<T>>;
    type Item = T;

    fn len(container: &Vec<Box<T>>) -> usize {
        container.len()
    }

    fn item(container: &Vec<Box<T>>, index: usize) -> &T {
        &container[index]
    }

    fn item_mut(container: &mut Vec<Box<T>>, index: usize) -> &mut T {
        &mut container[index]
    }

    fn reset(container: &mut Vec<Box<T>>, len: usize) {
        container.clear();
        container.resize_with(len, || Box::new(T::default()));
    }
}

fn codecs<S: Slots>() -> (TextCodec, BinaryCodec) {
    let text_codec = TextCodec::new(
        |value, out| {
            let registry = value.registry();
            let container = value.downcast::<S::Container>()?;
            let mut items = Vec::with_capacity(S::len(container));
            for index in 0..S::len(container) {
                let item = Ref::new(registry, S::item(container, index))?;
                items.push(text::to_text(item)?);
            }
            *out = JsonValue::Array(items);
            Ok(())
        },
        |input, mut value| {
            let items = input.as_array().ok_or(TextError::Expected {
                expected: "array",
                found: kind_of(input),
            })?;
            let registry = value.registry();
            let container = value.downcast_mut::<S::Container>()?;
            S::reset(container, items.len());
            for (index, item) in items.iter().enumerate() {
                text::from_text(item, RefMut::new(registry, S::item_mut(container, index))?)?;
            }
            Ok(())
        },
    );

    let binary_codec = BinaryCodec::new(
        |encoder, value| {
            let registry = value.registry();
            let container = value.downcast::<S::Container>()?;
            encoder.write_varint(S::len(container) as u64);
            for index in 0..S::len(container) {
                encoder.write(Ref::new(registry, S::item(container, index))?)?;
            }
            Ok(())
        },
        |decoder, mut value| {
            let len = decoder.read_len()?;
            // Every element takes at least one byte, so a longer count is
            // truncated input.
            if len > decoder.remaining() {
                return Err(BinaryError::BufferTooSmall {
                    offset: decoder.offset(),
                    need: len,
                    have: decoder.remaining(),
                });
            }
            let registry = value.registry();
            let container = value.downcast_mut::<S::Container>()?;
            S::reset(container, len);
            for index in 0..len {
                decoder.read(RefMut::new(registry, S::item_mut(container, index))?)?;
            }
            Ok(())
        },
    );

    (text_codec, binary_codec)
}

/// Codecs for `Vec<T>`.
pub fn vec_codecs<T: Any + Default>() -> (TextCodec, BinaryCodec) {
    codecs::<ByValue<T>>()
}

/// Codecs for `Vec<Box<T>>`. Decoding drops the previous boxes.
pub fn boxed_vec_codecs<T: Any + Default>() -> (TextCodec, BinaryCodec) {
    codecs::<Boxed<T>>()
}

/// Declare `Vec<T>` under `name` with its codecs.
pub fn declare_vec<T: Any + Clone + Default>(registry: &mut Registry, name: &str) -> TypeKey {
    registry.resolve::<T>();
    let (text_codec, binary_codec) = vec_codecs::<T>();
    registry
        .declare::<Vec<T>>(name)
        .property(text_codec)
        .property(binary_codec)
        .finish()
}

/// Declare `Vec<Box<T>>` under `name` with its codecs.
pub fn declare_boxed_vec<T: Any + Clone + Default>(registry: &mut Registry, name: &str) -> TypeKey {
    registry.resolve::<T>();
    let (text_codec, binary_codec) = boxed_vec_codecs::<T>();
    registry
        .declare::<Vec<Box<T>>>(name)
        .property(text_codec)
        .property(binary_codec)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_binary, from_text, register_common_types, to_binary, to_text};
    use serde_json::json;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        register_common_types(&mut registry);
        declare_vec::<i32>(&mut registry, "Vec<i32>");
        declare_boxed_vec::<String>(&mut registry, "Vec<Box<String>>");
        registry
    }

    #[test]
    fn test_vec_text() {
        let registry = registry();
        let v = vec![3, 1, 2];
        assert_eq!(to_text(Ref::new(&registry, &v).unwrap()).unwrap(), json!([3, 1, 2]));

        let mut back = vec![9; 10];
        from_text(&json!([4, 5]), RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, [4, 5]);

        let err = from_text(&json!({ "a": 1 }), RefMut::new(&registry, &mut back).unwrap());
        assert!(matches!(
            err,
            Err(TextError::Expected {
                expected: "array",
                found: "object"
            })
        ));
    }

    #[test]
    fn test_boxed_vec_binary() {
        let registry = registry();
        let v: Vec<Box<String>> = vec![Box::new("a".into()), Box::new("bc".into())];
        let bytes = to_binary(Ref::new(&registry, &v).unwrap()).unwrap();

        let mut back: Vec<Box<String>> = vec![Box::new("stale".into()); 5];
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_empty_vec() {
        let registry = registry();
        let v: Vec<i32> = Vec::new();
        let bytes = to_binary(Ref::new(&registry, &v).unwrap()).unwrap();
        let mut back = vec![1, 2, 3];
        from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert!(back.is_empty());
        assert_eq!(to_text(Ref::new(&registry, &v).unwrap()).unwrap(), json!([]));
    }

    #[test]
    fn test_hostile_length_is_rejected() {
        let registry = registry();
        let v = vec![1i32];
        let mut bytes = to_binary(Ref::new(&registry, &v).unwrap()).unwrap();
        // Body ends with: element count, i32 type index, value. Claim 100 elements.
        let body = bytes.len() - 3;
        bytes[body] = 100;
        let mut back = Vec::<i32>::new();
        let err = from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap_err();
        assert!(matches!(err, BinaryError::BufferTooSmall { .. }));
    }
}
