// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # reflector - runtime reflection and generic serialization
//!
//! Types declare their shape (fields, methods, a single base type and
//! arbitrary properties) in a [`Registry`]. Type-erased handles then walk
//! any declared value by name, and two generic codecs encode it as a JSON
//! tree or as a compact dictionary-prefixed binary stream.
//!
//! ## Quick Start
//!
//! ```rust
//! use reflector::codec::{from_binary, register_common_types, to_binary, to_text};
//! use reflector::{Reflect, Ref, RefMut, Registry};
//!
//! #[derive(Reflect, Clone, Default, Debug, PartialEq)]
//! struct House {
//!     life: i32,
//!     size: f32,
//! }
//!
//! let mut registry = Registry::new();
//! register_common_types(&mut registry);
//! registry.register::<House>();
//!
//! let house = House { life: 10, size: 20.0 };
//! let text = to_text(Ref::new(&registry, &house).unwrap()).unwrap();
//! assert_eq!(text["life"], 10);
//!
//! let bytes = to_binary(Ref::new(&registry, &house).unwrap()).unwrap();
//! let mut back = House::default();
//! from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
//! assert_eq!(back, house);
//! ```
//!
//! ## Layers
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  codec      text (serde_json) | binary | Vec / enum helpers |
//! +-------------------------------------------------------------+
//! |  handle     Ref / RefMut (get, set, invoke, copy) | Value   |
//! +-------------------------------------------------------------+
//! |  registry   TypeDescriptor | Field | Method | PropertyBag   |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`registry`] - type descriptors and the declaration builder
//! - [`handle`] - reference handles and the owned value box
//! - [`codec`] - text and binary codecs
//! - [`config`] - wire constants and decode limits
//! - [`error`] - error types

// Allow the derive macro to work inside this crate's tests
extern crate self as reflector;

/// Generic text and binary codecs.
pub mod codec;
/// Wire constants and decode limits.
pub mod config;
/// Schema and runtime errors.
pub mod error;
/// Reference handles, value box and method dispatch.
pub mod handle;
/// Type registry and declaration builder.
pub mod registry;


pub use error::{ReflectError, Result, SchemaError};
pub use handle::method::MethodFn;
pub use handle::{Ref, RefMut, Value};
pub use registry::{
    global, ArgInfo, BaseLink, Field, FieldAccess, Method, Properties, Property, PropertyBag,
    Reflect, Registry, TypeBuilder, TypeDescriptor, TypeKey,
};

// Derive macro (for #[derive(reflector::Reflect)])
#[cfg(feature = "derive")]
pub use reflector_derive::Reflect;
