// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type, field and method descriptors.
//!
//! Descriptors are owned by the [`Registry`](super::Registry) arena and
//! addressed by [`TypeKey`]. They are built once through
//! [`TypeBuilder`](super::TypeBuilder) and then only read.

use std::any::{Any, TypeId};
use std::fmt;

use super::props::PropertyBag;
use crate::error::ReflectError;
use crate::handle::Value;

/// Copies `src` into `dst`; both point at live values of the descriptor's type.
pub type CopyFn = unsafe fn(dst: *mut u8, src: *const u8);

/// Assigns a type-checked value to the field at `dst`; `false` on type mismatch.
pub type AssignFn = unsafe fn(dst: *mut u8, src: &dyn Any) -> bool;

/// Marshaling trampoline shared by every method of any arity.
pub(crate) type Invoker =
    Box<dyn Fn(*mut u8, Vec<Value>) -> Result<Value, ReflectError> + Send + Sync>;

/// Index of a type descriptor inside one registry.
///
/// Keys carry the id of the registry that issued them, so a key (or a field
/// or method descriptor) never matches a type of another registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub(crate) registry: u32,
    pub(crate) index: u32,
}

impl TypeKey {
    pub(crate) fn new(registry: u32, index: u32) -> Self {
        Self { registry, index }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Id of the registry that issued the key.
    pub fn registry_id(self) -> u32 {
        self.registry
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Parent type and byte offset of its sub-object inside the derived type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseLink {
    pub key: TypeKey,
    pub offset: usize,
}

/// Rust type of a method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl ArgInfo {
    pub fn of<A: Any>() -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
        }
    }
}

/// Clone-assign `src` over `dst`.
///
/// # Safety
/// Both pointers must address live, properly aligned `T` values.
pub(crate) unsafe fn clone_into<T: Clone>(dst: *mut u8, src: *const u8) {
    if dst.cast_const() == src {
        return;
    }
    let src = &*src.cast::<T>();
    (*dst.cast::<T>()).clone_from(src);
}

/// # Safety
/// `dst` must address a live, properly aligned `F`.
unsafe fn assign_from_any<F: Any + Clone>(dst: *mut u8, src: &dyn Any) -> bool {
    match src.downcast_ref::<F>() {
        Some(value) => {
            (*dst.cast::<F>()).clone_from(value);
            true
        }
        None => false,
    }
}

// =======================================================================
// Field
// =======================================================================

/// A named member of a declared type.
pub struct Field {
    name: String,
    owner: TypeKey,
    ty: TypeKey,
    offset: usize,
    assign: AssignFn,
    props: PropertyBag,
}

impl Field {
    pub(crate) fn new<F: Any + Clone>(
        name: &str,
        owner: TypeKey,
        ty: TypeKey,
        offset: usize,
        props: PropertyBag,
    ) -> Self {
        Self {
            name: name.to_owned(),
            owner,
            ty,
            offset,
            assign: assign_from_any::<F>,
            props,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type that declared the field.
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    /// Type of the field value.
    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    /// Byte offset inside the owner.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn props(&self) -> &PropertyBag {
        &self.props
    }

    /// # Safety
    /// `field_addr` must point at this field inside a live owner value, with
    /// no other reference to it alive.
    pub(crate) unsafe fn assign(&self, field_addr: *mut u8, value: &dyn Any) -> bool {
        (self.assign)(field_addr, value)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("ty", &self.ty)
            .field("offset", &self.offset)
            .field("props", &self.props)
            .finish()
    }
}

// =======================================================================
// Method
// =======================================================================

/// A named callable on a declared type.
pub struct Method {
    name: String,
    owner: TypeKey,
    args: Vec<ArgInfo>,
    ret: Option<&'static str>,
    invoker: Invoker,
}

impl Method {
    pub(crate) fn new(
        name: &str,
        owner: TypeKey,
        args: Vec<ArgInfo>,
        ret: Option<&'static str>,
        invoker: Invoker,
    ) -> Self {
        Self {
            name: name.to_owned(),
            owner,
            args,
            ret,
            invoker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    pub fn args(&self) -> &[ArgInfo] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Rust name of the return type, `None` for `()`.
    pub fn return_type(&self) -> Option<&'static str> {
        self.ret
    }

    /// # Safety
    /// `target` must address a live owner value with no other reference to it.
    pub(crate) unsafe fn call(&self, target: *mut u8, args: Vec<Value>) -> Result<Value, ReflectError> {
        (self.invoker)(target, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("args", &self.args)
            .field("ret", &self.ret)
            .finish()
    }
}

// =======================================================================
// TypeDescriptor
// =======================================================================

/// Runtime description of one Rust type.
pub struct TypeDescriptor {
    pub(crate) key: TypeKey,
    pub(crate) name: Option<String>,
    pub(crate) rust_name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) base: Option<BaseLink>,
    pub(crate) fields: Vec<Field>,
    pub(crate) methods: Vec<Method>,
    pub(crate) props: PropertyBag,
    pub(crate) copy: Option<CopyFn>,
}

impl TypeDescriptor {
    pub(crate) fn undeclared<T: Any>(key: TypeKey) -> Self {
        Self {
            key,
            name: None,
            rust_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            base: None,
            fields: Vec::new(),
            methods: Vec::new(),
            props: PropertyBag::new(),
            copy: None,
        }
    }

    /// Drop everything a declaration added, keeping the identity.
    pub(crate) fn reset(&mut self) {
        self.name = None;
        self.base = None;
        self.fields.clear();
        self.methods.clear();
        self.props.clear();
        self.copy = None;
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Registered name, `None` until the type is declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Registered name, or the Rust name for undeclared types.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.rust_name)
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn is_declared(&self) -> bool {
        self.name.is_some()
    }

    pub fn base(&self) -> Option<BaseLink> {
        self.base
    }

    pub fn parent(&self) -> Option<TypeKey> {
        self.base.map(|b| b.key)
    }

    /// Fields declared on this type, parents excluded.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn own_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Methods declared on this type, parents excluded.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn own_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Properties declared on this type, parents excluded.
    pub fn props(&self) -> &PropertyBag {
        &self.props
    }

    pub fn copy_fn(&self) -> Option<CopyFn> {
        self.copy
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("name", &self.display_name())
            .field("size", &self.size)
            .field("base", &self.base)
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("props", &self.props)
            .finish()
    }
}
