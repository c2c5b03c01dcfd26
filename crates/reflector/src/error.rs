// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types shared by the registry and the handles.
//!
//! Two families are kept apart:
//!
//! - [`SchemaError`]: bugs in a type declaration (duplicate names, conflicting
//!   base types). They are routed through the registry's schema error hook,
//!   which logs and panics by default.
//! - [`ReflectError`]: recoverable failures while navigating live values
//!   through handles. Every runtime API returns them in a `Result`.
//!
//! Codec data errors live next to their codec
//! ([`TextError`](crate::codec::TextError),
//! [`BinaryError`](crate::codec::BinaryError)).

use std::fmt;
use std::sync::Arc;

/// Declaration errors. These indicate a programming mistake, not bad data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The type was already declared under another name.
    TypeRenamed { existing: String, requested: String },
    /// Another type already owns this registered name.
    NameTaken { name: String, owner: String },
    /// A field with this name exists on the type or one of its ancestors.
    DuplicateField { type_name: String, field: String },
    /// A method with this name exists on the type.
    DuplicateMethod { type_name: String, method: String },
    /// The type already has a different base type.
    BaseRedefined {
        type_name: String,
        existing: String,
        requested: String,
    },
    /// Declaring this base would make the type its own ancestor.
    CyclicBase { type_name: String, base: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeRenamed {
                existing,
                requested,
            } => write!(
                f,
                "type {} is already declared, can't rename it to {}",
                existing, requested
            ),
            Self::NameTaken { name, owner } => {
                write!(f, "type name {} is already used by {}", name, owner)
            }
            Self::DuplicateField { type_name, field } => {
                write!(f, "field {} is declared twice in type {}", field, type_name)
            }
            Self::DuplicateMethod { type_name, method } => {
                write!(f, "method {} is declared twice in type {}", method, type_name)
            }
            Self::BaseRedefined {
                type_name,
                existing,
                requested,
            } => write!(
                f,
                "can't set base of {} to {}, it is already {}",
                type_name, requested, existing
            ),
            Self::CyclicBase { type_name, base } => {
                write!(f, "{} can't use {} as base, {} derives from it", type_name, base, base)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Callback receiving every schema error raised by a registry.
pub type SchemaErrorHook = Arc<dyn Fn(&SchemaError) + Send + Sync>;

/// Default hook: log the error and abort the declaration by panicking.
pub fn abort_on_schema_error(err: &SchemaError) {
    log::error!("[registry] {}", err);
    panic!("schema error: {}", err);
}

/// Runtime errors raised by handles and value boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectError {
    /// The Rust type was never resolved in this registry.
    Unregistered { type_name: String },
    /// The handle's type neither is nor derives from the requested type.
    TypeMismatch { expected: String, found: String },
    /// No field with this name on the type or its ancestors.
    FieldNotFound { type_name: String, field: String },
    /// The field descriptor belongs to an unrelated type.
    FieldNotInType {
        field: String,
        owner: String,
        type_name: String,
    },
    /// No method with this name on the type or its ancestors.
    MethodNotFound { type_name: String, method: String },
    /// The method descriptor belongs to an unrelated type.
    MethodNotInType {
        method: String,
        owner: String,
        type_name: String,
    },
    /// Wrong number of arguments for a method call.
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },
    /// An argument value has the wrong type.
    ArgumentType {
        method: String,
        index: usize,
        expected: String,
        found: String,
    },
    /// A value box is empty where a value was required.
    EmptyValue { expected: String },
    /// Neither type derives from the other.
    IncompatibleCopy { dst: String, src: String },
    /// The type was resolved but never declared, so it has no copy operation.
    NoCopyOperation { type_name: String },
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered { type_name } => {
                write!(f, "type {} is not known to the registry", type_name)
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Self::FieldNotFound { type_name, field } => {
                write!(f, "type {} has no field named {}", type_name, field)
            }
            Self::FieldNotInType {
                field,
                owner,
                type_name,
            } => write!(
                f,
                "field {} belongs to {}, not part of type {}",
                field, owner, type_name
            ),
            Self::MethodNotFound { type_name, method } => {
                write!(f, "method {} is not defined for type {}", method, type_name)
            }
            Self::MethodNotInType {
                method,
                owner,
                type_name,
            } => write!(
                f,
                "method {} belongs to {}, not part of type {}",
                method, owner, type_name
            ),
            Self::ArgumentCount {
                method,
                expected,
                got,
            } => write!(
                f,
                "method {} expects {} arguments, got {}",
                method, expected, got
            ),
            Self::ArgumentType {
                method,
                index,
                expected,
                found,
            } => write!(
                f,
                "argument {} of method {}: expected {}, found {}",
                index, method, expected, found
            ),
            Self::EmptyValue { expected } => {
                write!(f, "empty value where {} was expected", expected)
            }
            Self::IncompatibleCopy { dst, src } => {
                write!(f, "can't copy {} into unrelated type {}", src, dst)
            }
            Self::NoCopyOperation { type_name } => {
                write!(f, "type {} has no copy operation (not declared)", type_name)
            }
        }
    }
}

impl std::error::Error for ReflectError {}

/// Result alias for handle operations.
pub type Result<T> = std::result::Result<T, ReflectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::DuplicateField {
            type_name: "House".into(),
            field: "life".into(),
        };
        assert_eq!(err.to_string(), "field life is declared twice in type House");

        let err = SchemaError::TypeRenamed {
            existing: "X".into(),
            requested: "Y".into(),
        };
        assert_eq!(
            err.to_string(),
            "type X is already declared, can't rename it to Y"
        );
    }

    #[test]
    fn test_reflect_error_display() {
        let err = ReflectError::ArgumentCount {
            method: "grow".into(),
            expected: 1,
            got: 3,
        };
        assert_eq!(err.to_string(), "method grow expects 1 arguments, got 3");

        let err = ReflectError::FieldNotFound {
            type_name: "City".into(),
            field: "mayor".into(),
        };
        assert_eq!(err.to_string(), "type City has no field named mayor");
    }

    #[test]
    #[should_panic(expected = "schema error")]
    fn test_default_hook_panics() {
        abort_on_schema_error(&SchemaError::DuplicateMethod {
            type_name: "House".into(),
            method: "grow".into(),
        });
    }
}
