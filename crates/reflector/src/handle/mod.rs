// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference handles: type-erased views over live values.
//!
//! A handle pairs an address with the [`TypeKey`] of the value living there
//! and the registry that describes it. [`Ref`] is a shared, copyable view;
//! [`RefMut`] is exclusive and hands out reborrows, so the usual aliasing
//! rules carry over from the value it was built from.
//!
//! Handles never outlive the storage they point to: both are built from a
//! Rust reference and carry its lifetime.

pub mod method;
pub mod value;

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

pub use value::Value;

use crate::error::{ReflectError, Result};
use crate::registry::{Field, Method, Property, Registry, TypeDescriptor, TypeKey};

fn unregistered(type_name: &str) -> ReflectError {
    ReflectError::Unregistered {
        type_name: type_name.to_owned(),
    }
}

/// Address `offset` bytes past `addr`, inside the same value.
fn offset_addr(addr: NonNull<u8>, offset: usize) -> NonNull<u8> {
    // SAFETY: offsets come from `offset_of!` on the value's own type chain,
    // so the result stays inside the allocation `addr` points into.
    unsafe { NonNull::new_unchecked(addr.as_ptr().add(offset)) }
}

/// Offset of the `U` sub-object if the value at `key` is, or derives from, `U`.
fn upcast_offset<U: Any>(registry: &Registry, key: TypeKey) -> Option<usize> {
    let target = registry.lookup::<U>()?;
    registry.base_offset(key, target)
}

/// Display name of `key`, which may come from another registry.
fn key_name(registry: &Registry, key: TypeKey) -> String {
    match registry.try_get(key) {
        Some(desc) => desc.display_name().to_owned(),
        None => format!("{} of registry {}", key, key.registry_id()),
    }
}

fn mismatch<U: Any>(registry: &Registry, key: TypeKey) -> ReflectError {
    ReflectError::TypeMismatch {
        expected: std::any::type_name::<U>().to_owned(),
        found: registry.get(key).display_name().to_owned(),
    }
}

// =======================================================================
// Ref
// =======================================================================

/// Shared handle over a live value.
#[derive(Clone, Copy)]
pub struct Ref<'a> {
    registry: &'a Registry,
    key: TypeKey,
    addr: NonNull<u8>,
    _marker: PhantomData<&'a ()>,
}

impl<'a> Ref<'a> {
    /// Handle over `value`. Fails if `T` was never resolved in `registry`.
    pub fn new<T: Any>(registry: &'a Registry, value: &'a T) -> Result<Self> {
        let key = registry
            .lookup::<T>()
            .ok_or_else(|| unregistered(std::any::type_name::<T>()))?;
        Ok(Self {
            registry,
            key,
            addr: NonNull::from(value).cast(),
            _marker: PhantomData,
        })
    }

    /// Handle over an erased value, keyed by its dynamic type.
    pub fn from_any(registry: &'a Registry, value: &'a dyn Any) -> Result<Self> {
        let id = (*value).type_id();
        let key = registry
            .lookup_id(id)
            .ok_or_else(|| unregistered(&format!("{:?}", id)))?;
        Ok(Self {
            registry,
            key,
            addr: NonNull::from(value).cast(),
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// `addr` must point at a live value of type `key` that stays valid and
    /// unmodified for `'a`.
    pub unsafe fn from_raw(registry: &'a Registry, key: TypeKey, addr: NonNull<u8>) -> Self {
        Self {
            registry,
            key,
            addr,
            _marker: PhantomData,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn descriptor(&self) -> &'a TypeDescriptor {
        self.registry.get(self.key)
    }

    pub fn type_name(&self) -> &'a str {
        self.descriptor().display_name()
    }

    pub fn addr(&self) -> *const u8 {
        self.addr.as_ptr()
    }

    /// True if the value is exactly a `U`.
    pub fn is<U: Any>(&self) -> bool {
        self.descriptor().type_id() == TypeId::of::<U>()
    }

    /// True if the value is a `U` or derives from it.
    pub fn derives_from<U: Any>(&self) -> bool {
        upcast_offset::<U>(self.registry, self.key).is_some()
    }

    /// The value as a `U`, walking up the base chain if needed.
    pub fn try_downcast<U: Any>(&self) -> Option<&'a U> {
        let offset = upcast_offset::<U>(self.registry, self.key)?;
        // SAFETY: the `U` sub-object lives at `offset` and is borrowed for 'a.
        Some(unsafe { offset_addr(self.addr, offset).cast::<U>().as_ref() })
    }

    pub fn downcast<U: Any>(&self) -> Result<&'a U> {
        self.try_downcast::<U>()
            .ok_or_else(|| mismatch::<U>(self.registry, self.key))
    }

    /// Handle over the base sub-object.
    pub fn as_base(&self) -> Option<Ref<'a>> {
        let link = self.descriptor().base()?;
        Some(Ref {
            registry: self.registry,
            key: link.key,
            addr: offset_addr(self.addr, link.offset),
            _marker: PhantomData,
        })
    }

    /// Field by name, searching the base chain.
    pub fn get(&self, name: &str) -> Result<Ref<'a>> {
        let (field, owner_offset) = self
            .registry
            .find_field(self.key, name)
            .ok_or_else(|| ReflectError::FieldNotFound {
                type_name: self.type_name().to_owned(),
                field: name.to_owned(),
            })?;
        Ok(self.project(field, owner_offset))
    }

    /// Field by descriptor. The field must belong to this type's chain.
    pub fn get_field(&self, field: &Field) -> Result<Ref<'a>> {
        let owner_offset = field_owner_offset(self.registry, self.key, field)?;
        Ok(self.project(field, owner_offset))
    }

    /// Own fields with a handle over each value, parents excluded.
    pub fn field_refs(&self) -> impl Iterator<Item = (&'a Field, Ref<'a>)> + 'a {
        let this = *self;
        self.descriptor()
            .fields()
            .iter()
            .map(move |field| (field, this.project(field, 0)))
    }

    /// Properties of the type and its ancestors.
    pub fn props(&self) -> impl Iterator<Item = &'a Property> + 'a {
        self.registry.props(self.key)
    }

    fn project(&self, field: &Field, owner_offset: usize) -> Ref<'a> {
        Ref {
            registry: self.registry,
            key: field.ty(),
            addr: offset_addr(self.addr, owner_offset + field.offset()),
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for Ref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("type", &self.type_name())
            .field("addr", &self.addr)
            .finish()
    }
}

/// Offset of the sub-object owning `field`. Fields of unrelated types, or of
/// another registry, are rejected.
fn field_owner_offset(registry: &Registry, key: TypeKey, field: &Field) -> Result<usize> {
    registry
        .base_offset(key, field.owner())
        .filter(|_| registry.owns(field.ty()))
        .ok_or_else(|| ReflectError::FieldNotInType {
            field: field.name().to_owned(),
            owner: key_name(registry, field.owner()),
            type_name: registry.get(key).display_name().to_owned(),
        })
}

// =======================================================================
// RefMut
// =======================================================================

/// Exclusive handle over a live value.
pub struct RefMut<'a> {
    registry: &'a Registry,
    key: TypeKey,
    addr: NonNull<u8>,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> RefMut<'a> {
    /// Handle over `value`. Fails if `T` was never resolved in `registry`.
    pub fn new<T: Any>(registry: &'a Registry, value: &'a mut T) -> Result<Self> {
        let key = registry
            .lookup::<T>()
            .ok_or_else(|| unregistered(std::any::type_name::<T>()))?;
        Ok(Self {
            registry,
            key,
            addr: NonNull::from(value).cast(),
            _marker: PhantomData,
        })
    }

    pub fn from_any(registry: &'a Registry, value: &'a mut dyn Any) -> Result<Self> {
        let id = (*value).type_id();
        let key = registry
            .lookup_id(id)
            .ok_or_else(|| unregistered(&format!("{:?}", id)))?;
        Ok(Self {
            registry,
            key,
            addr: NonNull::from(value).cast(),
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// `addr` must point at a live value of type `key`, exclusively borrowed
    /// for `'a`.
    pub unsafe fn from_raw(registry: &'a Registry, key: TypeKey, addr: NonNull<u8>) -> Self {
        Self {
            registry,
            key,
            addr,
            _marker: PhantomData,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn descriptor(&self) -> &'a TypeDescriptor {
        self.registry.get(self.key)
    }

    pub fn type_name(&self) -> &'a str {
        self.descriptor().display_name()
    }

    /// Shorter-lived exclusive handle over the same value.
    pub fn reborrow(&mut self) -> RefMut<'_> {
        RefMut {
            registry: self.registry,
            key: self.key,
            addr: self.addr,
            _marker: PhantomData,
        }
    }

    /// Shared view of the same value.
    pub fn as_ref(&self) -> Ref<'_> {
        Ref {
            registry: self.registry,
            key: self.key,
            addr: self.addr,
            _marker: PhantomData,
        }
    }

    pub fn is<U: Any>(&self) -> bool {
        self.as_ref().is::<U>()
    }

    pub fn downcast<U: Any>(&self) -> Result<&U> {
        self.as_ref().downcast::<U>()
    }

    pub fn try_downcast_mut<U: Any>(&mut self) -> Option<&mut U> {
        let offset = upcast_offset::<U>(self.registry, self.key)?;
        // SAFETY: the `U` sub-object lives at `offset`; `&mut self` keeps the
        // borrow exclusive.
        Some(unsafe { offset_addr(self.addr, offset).cast::<U>().as_mut() })
    }

    pub fn downcast_mut<U: Any>(&mut self) -> Result<&mut U> {
        let (registry, key) = (self.registry, self.key);
        self.try_downcast_mut::<U>()
            .ok_or_else(|| mismatch::<U>(registry, key))
    }

    /// Consume the handle into a `&'a mut U`.
    pub fn into_downcast<U: Any>(self) -> Result<&'a mut U> {
        let offset = upcast_offset::<U>(self.registry, self.key)
            .ok_or_else(|| mismatch::<U>(self.registry, self.key))?;
        // SAFETY: as in `try_downcast_mut`, the handle is consumed.
        Ok(unsafe { offset_addr(self.addr, offset).cast::<U>().as_mut() })
    }

    pub fn as_base_mut(&mut self) -> Option<RefMut<'_>> {
        let link = self.descriptor().base()?;
        Some(RefMut {
            registry: self.registry,
            key: link.key,
            addr: offset_addr(self.addr, link.offset),
            _marker: PhantomData,
        })
    }

    pub fn get_mut(&mut self, name: &str) -> Result<RefMut<'_>> {
        self.reborrow().into_field(name)
    }

    /// Consume the handle into one of its fields.
    pub fn into_field(self, name: &str) -> Result<RefMut<'a>> {
        let (field, owner_offset) = self
            .registry
            .find_field(self.key, name)
            .ok_or_else(|| ReflectError::FieldNotFound {
                type_name: self.type_name().to_owned(),
                field: name.to_owned(),
            })?;
        Ok(self.project(field, owner_offset))
    }

    pub fn get_field_mut(&mut self, field: &Field) -> Result<RefMut<'_>> {
        let owner_offset = field_owner_offset(self.registry, self.key, field)?;
        Ok(self.reborrow().project(field, owner_offset))
    }

    /// Overwrite the value. `V` must be the handle's type or one of its bases.
    pub fn set<V: Any>(&mut self, value: V) -> Result<()> {
        *self.downcast_mut::<V>()? = value;
        Ok(())
    }

    /// Assign a field from a typed value.
    pub fn set_field<V: Any>(&mut self, field: &Field, value: &V) -> Result<()> {
        self.assign(field, value)
    }

    /// Assign a field looked up by name.
    pub fn set_by_name<V: Any>(&mut self, name: &str, value: &V) -> Result<()> {
        let registry = self.registry;
        let (field, _) = registry
            .find_field(self.key, name)
            .ok_or_else(|| ReflectError::FieldNotFound {
                type_name: self.type_name().to_owned(),
                field: name.to_owned(),
            })?;
        self.assign(field, value)
    }

    /// Assign a field from a value box.
    pub fn set_value(&mut self, field: &Field, value: &Value) -> Result<()> {
        let owner_offset = field_owner_offset(self.registry, self.key, field)?;
        let any = value.as_any().ok_or_else(|| ReflectError::EmptyValue {
            expected: self.registry.get(field.ty()).display_name().to_owned(),
        })?;
        let found = value.type_name().unwrap_or_default();
        self.assign_at(field, owner_offset, any, found)
    }

    fn assign(&mut self, field: &Field, value: &dyn Any) -> Result<()> {
        let registry = self.registry;
        let found = registry
            .lookup_id((*value).type_id())
            .map(|key| registry.get(key).display_name())
            .unwrap_or("unregistered type");
        let owner_offset = field_owner_offset(registry, self.key, field)?;
        self.assign_at(field, owner_offset, value, found)
    }

    fn assign_at(
        &mut self,
        field: &Field,
        owner_offset: usize,
        value: &dyn Any,
        found: &str,
    ) -> Result<()> {
        let addr = offset_addr(self.addr, owner_offset + field.offset());
        // SAFETY: the field lives at `addr` inside a value we hold exclusively.
        if unsafe { field.assign(addr.as_ptr(), value) } {
            Ok(())
        } else {
            Err(ReflectError::TypeMismatch {
                expected: self.registry.get(field.ty()).display_name().to_owned(),
                found: found.to_owned(),
            })
        }
    }

    /// Call a method by name, searching the base chain.
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let (method, owner_offset) = self
            .registry
            .find_method(self.key, name)
            .ok_or_else(|| ReflectError::MethodNotFound {
                type_name: self.type_name().to_owned(),
                method: name.to_owned(),
            })?;
        let addr = offset_addr(self.addr, owner_offset);
        // SAFETY: `addr` is the owner sub-object, held exclusively.
        unsafe { method.call(addr.as_ptr(), args) }
    }

    /// Call a method by descriptor. The method must belong to this type's chain.
    pub fn invoke_method(&mut self, method: &Method, args: Vec<Value>) -> Result<Value> {
        let owner_offset = self
            .registry
            .base_offset(self.key, method.owner())
            .ok_or_else(|| ReflectError::MethodNotInType {
                method: method.name().to_owned(),
                owner: key_name(self.registry, method.owner()),
                type_name: self.type_name().to_owned(),
            })?;
        let addr = offset_addr(self.addr, owner_offset);
        // SAFETY: as in `invoke`.
        unsafe { method.call(addr.as_ptr(), args) }
    }

    /// Copy `src` into this value.
    ///
    /// Same type: the type's own copy. Related types: the copy of the
    /// less-derived type, applied to the shared base sub-object. Fields
    /// outside it are left untouched.
    pub fn copy_from(&mut self, src: Ref<'_>) -> Result<()> {
        let registry = self.registry;
        if !registry.owns(src.key()) {
            return Err(ReflectError::IncompatibleCopy {
                dst: self.type_name().to_owned(),
                src: src.type_name().to_owned(),
            });
        }
        let (common, dst_offset, src_offset) =
            if let Some(offset) = registry.base_offset(src.key(), self.key) {
                (self.key, 0, offset)
            } else if let Some(offset) = registry.base_offset(self.key, src.key()) {
                (src.key(), offset, 0)
            } else {
                return Err(ReflectError::IncompatibleCopy {
                    dst: self.type_name().to_owned(),
                    src: src.type_name().to_owned(),
                });
            };

        let desc = registry.get(common);
        let copy = desc.copy_fn().ok_or_else(|| ReflectError::NoCopyOperation {
            type_name: desc.display_name().to_owned(),
        })?;
        let dst = offset_addr(self.addr, dst_offset);
        let src = offset_addr(src.addr, src_offset);
        // SAFETY: both addresses hold a live `common` value; `dst` is held
        // exclusively and the copy is a no-op when they coincide.
        unsafe { copy(dst.as_ptr(), src.as_ptr()) };
        Ok(())
    }

    /// Own fields with a shared handle over each value, parents excluded.
    pub fn field_refs(&self) -> impl Iterator<Item = (&'a Field, Ref<'_>)> + '_ {
        let this = self.as_ref();
        self.descriptor()
            .fields()
            .iter()
            .map(move |field| (field, this.project(field, 0)))
    }

    pub fn props(&self) -> impl Iterator<Item = &'a Property> + 'a {
        self.registry.props(self.key)
    }

    fn project(self, field: &Field, owner_offset: usize) -> RefMut<'a> {
        RefMut {
            registry: self.registry,
            key: field.ty(),
            addr: offset_addr(self.addr, owner_offset + field.offset()),
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for RefMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefMut")
            .field("type", &self.type_name())
            .field("addr", &self.addr)
            .finish()
    }
}
