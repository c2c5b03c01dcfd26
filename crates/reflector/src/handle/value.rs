// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Owned, type-erased value box used for method arguments and results.

use std::any::{Any, TypeId};
use std::fmt;

use super::{Ref, RefMut};
use crate::error::{ReflectError, Result};
use crate::registry::Registry;

/// An owned value of any type, or nothing (void).
///
/// Dropping or replacing the box drops the held value exactly once.
#[derive(Default)]
pub struct Value {
    inner: Option<Boxed>,
}

struct Boxed {
    type_name: &'static str,
    data: Box<dyn Any>,
}

impl Value {
    /// The empty value, used for `()` returns.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Some(Boxed {
                type_name: std::any::type_name::<T>(),
                data: Box::new(value),
            }),
        }
    }

    pub(crate) fn is_unit<T: Any>() -> bool {
        TypeId::of::<T>() == TypeId::of::<()>()
    }

    /// Box a method return value; `()` becomes empty.
    pub(crate) fn from_return<R: Any>(value: R) -> Self {
        if Self::is_unit::<R>() {
            Self::empty()
        } else {
            Self::new(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<T>())
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.as_ref().map(|b| (*b.data).type_id())
    }

    /// Rust name of the held type.
    pub fn type_name(&self) -> Option<&'static str> {
        self.inner.as_ref().map(|b| b.type_name)
    }

    pub fn get<T: Any>(&self) -> Result<&T> {
        let found = self.found();
        self.inner
            .as_ref()
            .and_then(|b| b.data.downcast_ref::<T>())
            .ok_or_else(|| mismatch::<T>(found))
    }

    pub fn get_mut<T: Any>(&mut self) -> Result<&mut T> {
        let found = self.found();
        self.inner
            .as_mut()
            .and_then(|b| b.data.downcast_mut::<T>())
            .ok_or_else(|| mismatch::<T>(found))
    }

    /// Move the held value out. On mismatch the value is dropped.
    pub fn take<T: Any>(self) -> Result<T> {
        let found = self.found();
        match self.inner {
            Some(b) => b
                .data
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| mismatch::<T>(found)),
            None => Err(mismatch::<T>(found)),
        }
    }

    /// Replace the held value, dropping the previous one.
    pub fn set<T: Any>(&mut self, value: T) {
        *self = Self::new(value);
    }

    /// Drop the held value and become empty.
    pub fn clear(&mut self) {
        self.inner = None;
    }

    /// Erased view of the held value.
    pub fn as_any(&self) -> Option<&dyn Any> {
        self.inner.as_ref().map(|b| b.data.as_ref())
    }

    /// Handle over the held value.
    pub fn handle<'a>(&'a self, registry: &'a Registry) -> Result<Ref<'a>> {
        match self.as_any() {
            Some(any) => Ref::from_any(registry, any),
            None => Err(ReflectError::EmptyValue {
                expected: "a value".to_owned(),
            }),
        }
    }

    /// Mutable handle over the held value.
    pub fn handle_mut<'a>(&'a mut self, registry: &'a Registry) -> Result<RefMut<'a>> {
        match self.inner.as_mut() {
            Some(b) => RefMut::from_any(registry, b.data.as_mut()),
            None => Err(ReflectError::EmptyValue {
                expected: "a value".to_owned(),
            }),
        }
    }

    fn found(&self) -> Option<&'static str> {
        self.type_name()
    }
}

fn mismatch<T: Any>(found: Option<&'static str>) -> ReflectError {
    let expected = std::any::type_name::<T>().to_owned();
    match found {
        Some(found) => ReflectError::TypeMismatch {
            expected,
            found: found.to_owned(),
        },
        None => ReflectError::EmptyValue { expected },
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name() {
            Some(name) => write!(f, "Value({})", name),
            None => f.write_str("Value(empty)"),
        }
    }
}

/// Build a `Vec<Value>` argument list.
///
/// ```rust
/// let args = reflector::values![1i32, "two", 3.0f64];
/// assert_eq!(args.len(), 3);
/// assert!(args[1].is::<&str>());
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::Value::new($value)),*]
    };
}
