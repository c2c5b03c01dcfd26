// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tree-structured text codec over [`serde_json::Value`].
//!
//! Encoding walks the base chain first, so inherited fields land in the same
//! object as the derived ones. A type carrying a [`TextCodec`] property is
//! encoded by it; any other type becomes an object keyed by field name.
//!
//! Decoding mirrors that walk. Keys missing from the input leave their field
//! untouched, except for fields tagged [`SingleValue`], which then receive
//! the whole enclosing value.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::ReflectError;
use crate::handle::{Ref, RefMut};

/// Text codec errors.
#[derive(Debug)]
pub enum TextError {
    /// The input has the wrong JSON shape.
    Expected {
        expected: &'static str,
        found: &'static str,
    },
    /// JSON conversion failed (number out of range, malformed text...).
    Json(serde_json::Error),
    Reflect(ReflectError),
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Self::Json(err) => write!(f, "json error: {}", err),
            Self::Reflect(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Reflect(err) => Some(err),
            Self::Expected { .. } => None,
        }
    }
}

impl From<ReflectError> for TextError {
    fn from(err: ReflectError) -> Self {
        Self::Reflect(err)
    }
}

impl From<serde_json::Error> for TextError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// JSON kind name, for error messages.
pub fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// =======================================================================
// Override property and field tag
// =======================================================================

pub type TextEncodeFn = dyn Fn(Ref<'_>, &mut JsonValue) -> Result<(), TextError> + Send + Sync;
pub type TextDecodeFn = dyn Fn(&JsonValue, RefMut<'_>) -> Result<(), TextError> + Send + Sync;

/// Type property replacing the default object encoding.
///
/// The encoder receives the output slot and replaces its content.
#[derive(Clone)]
pub struct TextCodec {
    encode: Arc<TextEncodeFn>,
    decode: Arc<TextDecodeFn>,
}

impl TextCodec {
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(Ref<'_>, &mut JsonValue) -> Result<(), TextError> + Send + Sync + 'static,
        D: Fn(&JsonValue, RefMut<'_>) -> Result<(), TextError> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    pub fn encode(&self, value: Ref<'_>, out: &mut JsonValue) -> Result<(), TextError> {
        (self.encode)(value, out)
    }

    pub fn decode(&self, input: &JsonValue, value: RefMut<'_>) -> Result<(), TextError> {
        (self.decode)(input, value)
    }
}

impl fmt::Debug for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextCodec")
    }
}

/// Field tag: when the field's key is absent, decode the whole enclosing
/// value into the field. Encoding is unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleValue;

// =======================================================================
// Encode / decode
// =======================================================================

/// Encode `value` into a fresh JSON tree.
pub fn to_text(value: Ref<'_>) -> Result<JsonValue, TextError> {
    let mut out = JsonValue::Null;
    encode_into(value, &mut out)?;
    Ok(out)
}

/// Encode `value` into `out`, merging with what is already there.
pub fn encode_into(value: Ref<'_>, out: &mut JsonValue) -> Result<(), TextError> {
    if let Some(base) = value.as_base() {
        encode_into(base, out)?;
    }
    if let Some(codec) = value.descriptor().props().get::<TextCodec>() {
        return codec.encode(value, out);
    }

    for (field, field_value) in value.field_refs() {
        let mut slot = JsonValue::Null;
        encode_into(field_value, &mut slot)?;
        if !out.is_object() {
            *out = JsonValue::Object(Map::new());
        }
        if let JsonValue::Object(map) = out {
            map.insert(field.name().to_owned(), slot);
        }
    }
    Ok(())
}

/// Decode `input` into the value behind `value`.
pub fn from_text(input: &JsonValue, mut value: RefMut<'_>) -> Result<(), TextError> {
    if let Some(base) = value.as_base_mut() {
        from_text(input, base)?;
    }
    let desc = value.descriptor();
    if let Some(codec) = desc.props().get::<TextCodec>() {
        return codec.decode(input, value);
    }

    for field in desc.fields() {
        match input.get(field.name()) {
            Some(child) => from_text(child, value.get_field_mut(field)?)?,
            None if field.props().contains::<SingleValue>() => {
                from_text(input, value.get_field_mut(field)?)?
            }
            None => {}
        }
    }
    Ok(())
}

/// Encode as pretty-printed JSON text.
pub fn to_text_string(value: Ref<'_>) -> Result<String, TextError> {
    Ok(serde_json::to_string_pretty(&to_text(value)?)?)
}

/// Parse JSON text and decode it into `value`.
pub fn from_text_str(text: &str, value: RefMut<'_>) -> Result<(), TextError> {
    let input: JsonValue = serde_json::from_str(text)?;
    from_text(&input, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field_of, Registry};
    use serde_json::json;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn int_codec() -> TextCodec {
        TextCodec::new(
            |value, out| {
                *out = json!(*value.downcast::<i32>()?);
                Ok(())
            },
            |input, mut value| {
                let n = input.as_i64().ok_or(TextError::Expected {
                    expected: "number",
                    found: kind_of(input),
                })?;
                value.set(n as i32)?;
                Ok(())
            },
        )
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.declare::<i32>("i32").property(int_codec());
        registry
            .declare::<Point>("Point")
            .field("x", field_of!(Point, x))
            .field("y", field_of!(Point, y));
        registry
    }

    #[test]
    fn test_object_encoding() {
        let registry = registry();
        let p = Point { x: 3, y: -4 };
        let text = to_text(Ref::new(&registry, &p).unwrap()).unwrap();
        assert_eq!(text, json!({ "x": 3, "y": -4 }));
    }

    #[test]
    fn test_missing_keys_are_skipped() {
        let registry = registry();
        let mut p = Point { x: 1, y: 2 };
        from_text(&json!({ "y": 20, "z": 5 }), RefMut::new(&registry, &mut p).unwrap()).unwrap();
        assert_eq!(p, Point { x: 1, y: 20 });
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let registry = registry();
        let mut p = Point::default();
        let err = from_text(
            &json!({ "x": "three" }),
            RefMut::new(&registry, &mut p).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TextError::Expected {
                expected: "number",
                found: "string"
            }
        ));
    }

    #[test]
    fn test_string_helpers() {
        let registry = registry();
        let p = Point { x: 10, y: 11 };
        let text = to_text_string(Ref::new(&registry, &p).unwrap()).unwrap();
        let mut back = Point::default();
        from_text_str(&text, RefMut::new(&registry, &mut back).unwrap()).unwrap();
        assert_eq!(back, p);
        assert!(matches!(
            from_text_str("{", RefMut::new(&registry, &mut back).unwrap()),
            Err(TextError::Json(_))
        ));
    }
}
