// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent declaration builder.
//!
//! ```rust
//! use reflector::{field_of, Registry, Ref, RefMut, Value};
//!
//! #[derive(Clone, Default)]
//! #[repr(C)]
//! struct Base { score: i32 }
//!
//! #[derive(Clone, Default)]
//! #[repr(C)]
//! struct Derived { base: Base, speed: i32 }
//!
//! impl Derived {
//!     fn boost(&mut self, by: i32) -> i32 {
//!         self.speed += by;
//!         self.speed
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.declare::<i32>("i32");
//! registry.declare::<Base>("Base").field("score", field_of!(Base, score));
//! registry
//!     .declare::<Derived>("Derived")
//!     .base(field_of!(Derived, base))
//!     .field("speed", field_of!(Derived, speed))
//!     .method("boost", Derived::boost);
//!
//! let mut d = Derived::default();
//! let mut r = RefMut::new(&registry, &mut d).unwrap();
//! r.get_mut("score").unwrap().set(5i32).unwrap();
//! let out = r.invoke("boost", vec![Value::new(3i32)]).unwrap();
//! assert_eq!(out.take::<i32>().unwrap(), 3);
//! assert_eq!(d.base.score, 5);
//! ```

use std::any::Any;
use std::marker::PhantomData;

use super::descriptor::{BaseLink, Field, Invoker, Method};
use super::props::{Properties, PropertyBag};
use super::{Registry, TypeKey};
use crate::error::SchemaError;
use crate::handle::method::MethodFn;
use crate::handle::Value;

/// Typed location of a member `F` inside an owner `T`.
///
/// Built by [`field_of!`](crate::field_of); the builder uses it for both
/// fields and base sub-objects.
pub struct FieldAccess<T, F> {
    offset: usize,
    _marker: PhantomData<fn(&T) -> &F>,
}

impl<T, F> FieldAccess<T, F> {
    /// # Safety
    /// `offset` must be the byte offset of a member of type `F` inside `T`.
    /// The projection only pins down `F` and is never called.
    pub unsafe fn new(offset: usize, _projection: fn(&T) -> &F) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<T, F> Clone for FieldAccess<T, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, F> Copy for FieldAccess<T, F> {}

/// Location of `$owner.$member`, for [`TypeBuilder::field`] and
/// [`TypeBuilder::base`].
#[macro_export]
macro_rules! field_of {
    ($owner:ty, $member:tt) => {
        // SAFETY: offset and projection name the same member.
        unsafe {
            $crate::FieldAccess::<$owner, _>::new(
                ::core::mem::offset_of!($owner, $member),
                |owner: &$owner| &owner.$member,
            )
        }
    };
}

/// Declares the shape of `T` in a registry.
///
/// Errors are reported through the registry's schema error hook; the builder
/// keeps going so a recording hook sees every problem.
///
/// A redeclaration under the same name adds nothing new: known fields and
/// methods are skipped and only properties of a new type are appended. When
/// the requested name belongs to another type the builder is detached and
/// ignores every further call, so the type stays undeclared.
pub struct TypeBuilder<'r, T> {
    registry: &'r mut Registry,
    key: TypeKey,
    redeclared: bool,
    detached: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Any> TypeBuilder<'r, T> {
    pub(crate) fn new(
        registry: &'r mut Registry,
        key: TypeKey,
        redeclared: bool,
        detached: bool,
    ) -> Self {
        Self {
            registry,
            key,
            redeclared,
            detached,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Append a type-level property.
    pub fn property<P: Any + Send + Sync>(self, value: P) -> Self {
        self.properties((value,))
    }

    /// Append several type-level properties.
    pub fn properties(self, props: impl Properties) -> Self {
        if self.detached {
            return self;
        }
        let bag = &mut self.registry.get_mut(self.key).props;
        if self.redeclared {
            let mut extra = PropertyBag::new();
            props.attach(&mut extra);
            bag.merge_missing(extra);
        } else {
            props.attach(bag);
        }
        self
    }

    pub fn field<F: Any + Clone>(self, name: &str, access: FieldAccess<T, F>) -> Self {
        self.field_with(name, access, ())
    }

    /// Declare a field carrying properties (codec tags, ranges...).
    pub fn field_with<F: Any + Clone>(
        self,
        name: &str,
        access: FieldAccess<T, F>,
        props: impl Properties,
    ) -> Self {
        if self.detached {
            return self;
        }
        let ty = self.registry.resolve::<F>();
        if let Some((existing, _)) = self.registry.find_field(self.key, name) {
            let same_member = existing.owner() == self.key
                && existing.offset() == access.offset()
                && existing.ty() == ty;
            if !(self.redeclared && same_member) {
                self.registry.report(SchemaError::DuplicateField {
                    type_name: self.type_name(),
                    field: name.to_owned(),
                });
            }
            return self;
        }

        let mut bag = PropertyBag::new();
        props.attach(&mut bag);
        let field = Field::new::<F>(name, self.key, ty, access.offset(), bag);
        self.registry.get_mut(self.key).fields.push(field);
        self
    }

    /// Declare the base sub-object of `T`.
    ///
    /// With `#[repr(C)]` and the base as first member its offset is 0, which
    /// mirrors classic single inheritance.
    pub fn base<B: Any>(self, access: FieldAccess<T, B>) -> Self {
        // SAFETY: `FieldAccess` ties the offset to a `B` member of `T`.
        unsafe { self.base_at::<B>(access.offset()) }
    }

    /// [`base`](Self::base) with a raw offset.
    ///
    /// # Safety
    /// `offset` must be the byte offset of a live, properly aligned `B`
    /// sub-object inside every `T`. Handles read and write the base through
    /// it without further checks.
    ///
    /// ```compile_fail,E0133
    /// use reflector::Registry;
    ///
    /// #[derive(Clone)]
    /// struct Tiny { a: u8 }
    ///
    /// let mut registry = Registry::new();
    /// registry.declare::<Tiny>("Tiny").base_at::<u64>(4096);
    /// ```
    pub unsafe fn base_at<B: Any>(self, offset: usize) -> Self {
        if self.detached {
            return self;
        }
        let base = self.registry.resolve::<B>();
        match self.registry.get(self.key).base {
            Some(link) if link.key == base => {}
            Some(link) => {
                let existing = self.registry.get(link.key).display_name().to_owned();
                let requested = self.registry.get(base).display_name().to_owned();
                self.registry.report(SchemaError::BaseRedefined {
                    type_name: self.type_name(),
                    existing,
                    requested,
                });
            }
            None if self.registry.derives_from(base, self.key) => {
                let base_name = self.registry.get(base).display_name().to_owned();
                self.registry.report(SchemaError::CyclicBase {
                    type_name: self.type_name(),
                    base: base_name,
                });
            }
            None => {
                self.registry.get_mut(self.key).base = Some(BaseLink { key: base, offset });
            }
        }
        self
    }

    /// Declare a method from a closure or fn item taking `&mut T` and up to
    /// four arguments.
    pub fn method<Args, M: MethodFn<T, Args>>(self, name: &str, method: M) -> Self {
        if self.detached {
            return self;
        }
        if self.registry.get(self.key).own_method(name).is_some() {
            if !self.redeclared {
                self.registry.report(SchemaError::DuplicateMethod {
                    type_name: self.type_name(),
                    method: name.to_owned(),
                });
            }
            return self;
        }

        let owned_name = name.to_owned();
        let invoker: Invoker = Box::new(move |target: *mut u8, args: Vec<Value>| {
            // SAFETY: handles only invoke with the address of a live `T`
            // sub-object they hold exclusively.
            let target = unsafe { &mut *target.cast::<T>() };
            method.call(&owned_name, target, args)
        });
        let method = Method::new(name, self.key, M::signature(), M::return_type(), invoker);
        self.registry.get_mut(self.key).methods.push(method);
        self
    }

    /// Finish the declaration.
    pub fn finish(self) -> TypeKey {
        self.key
    }

    fn type_name(&self) -> String {
        self.registry.get(self.key).display_name().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    #[repr(C)]
    struct Base {
        score: i32,
    }

    #[derive(Clone, Default)]
    #[repr(C)]
    struct Derived {
        base: Base,
        score: i32,
        speed: i32,
    }

    #[derive(Clone, Default)]
    struct Tuple(u8, u32);

    fn recording(registry: &mut Registry) -> Arc<Mutex<Vec<SchemaError>>> {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        registry.set_schema_error_hook(move |err| sink.lock().push(err.clone()));
        errors
    }

    #[test]
    fn test_field_offsets() {
        let mut registry = Registry::new();
        let key = registry
            .declare::<Tuple>("Tuple")
            .field("a", field_of!(Tuple, 0))
            .field("b", field_of!(Tuple, 1))
            .finish();
        let desc = registry.get(key);
        assert_eq!(desc.fields().len(), 2);
        assert_eq!(desc.fields()[0].offset(), std::mem::offset_of!(Tuple, 0));
        assert_eq!(desc.fields()[1].ty(), registry.lookup::<u32>().unwrap());
    }

    #[test]
    fn test_inherited_duplicate_field_reports() {
        let mut registry = Registry::new();
        let errors = recording(&mut registry);
        registry.declare::<Base>("Base").field("score", field_of!(Base, score));
        registry
            .declare::<Derived>("Derived")
            .base(field_of!(Derived, base))
            .field("score", field_of!(Derived, score))
            .field("speed", field_of!(Derived, speed));

        assert_eq!(
            errors.lock().as_slice(),
            [SchemaError::DuplicateField {
                type_name: "Derived".into(),
                field: "score".into()
            }]
        );
        let derived = registry.get(registry.lookup::<Derived>().unwrap());
        assert_eq!(derived.fields().len(), 1);
    }

    #[test]
    fn test_redeclaration_keeps_shape() {
        let mut registry = Registry::new();
        let errors = recording(&mut registry);
        for _ in 0..2 {
            registry
                .declare::<Base>("Base")
                .field("score", field_of!(Base, score))
                .method("reset", |b: &mut Base| b.score = 0);
        }
        assert!(errors.lock().is_empty());
        let desc = registry.get(registry.lookup::<Base>().unwrap());
        assert_eq!(desc.fields().len(), 1);
        assert_eq!(desc.methods().len(), 1);
    }

    #[test]
    fn test_base_redefinition_and_cycle() {
        let mut registry = Registry::new();
        let errors = recording(&mut registry);
        registry.declare::<Base>("Base");
        registry.declare::<Derived>("Derived").base(field_of!(Derived, base));
        registry.declare::<Derived>("Derived").base(field_of!(Derived, base));
        assert!(errors.lock().is_empty());

        registry
            .declare::<Derived>("Derived")
            .base(field_of!(Derived, speed));
        // SAFETY: the cycle is rejected before the link is stored.
        unsafe {
            registry.declare::<Base>("Base").base_at::<Derived>(0);
        }
        assert_eq!(
            registry.get(registry.lookup::<Base>().unwrap()).base(),
            None
        );
        let errors = errors.lock();
        assert!(matches!(errors[0], SchemaError::BaseRedefined { .. }));
        assert!(matches!(errors[1], SchemaError::CyclicBase { .. }));
    }

    #[test]
    fn test_base_at_matches_field_offset() {
        let mut registry = Registry::new();
        registry.declare::<Base>("Base");
        // SAFETY: `offset_of!` names the `Base` member of `Derived`.
        let key = unsafe {
            registry
                .declare::<Derived>("Derived")
                .base_at::<Base>(std::mem::offset_of!(Derived, base))
                .finish()
        };
        let link = registry.get(key).base().unwrap();
        assert_eq!(link.key, registry.lookup::<Base>().unwrap());
        assert_eq!(link.offset, 0);
    }

    #[test]
    fn test_name_conflict_detaches_builder() {
        let mut registry = Registry::new();
        let errors = recording(&mut registry);
        registry.declare::<Tuple>("Shared");
        let key = registry
            .declare::<Base>("Shared")
            .property(7u32)
            .field("score", field_of!(Base, score))
            .method("reset", |b: &mut Base| b.score = 0)
            .finish();

        assert!(matches!(
            errors.lock().as_slice(),
            [SchemaError::NameTaken { name, .. }] if name == "Shared"
        ));
        let desc = registry.get(key);
        assert!(!desc.is_declared());
        assert!(desc.fields().is_empty());
        assert!(desc.methods().is_empty());
        assert!(desc.props().is_empty());
    }

    #[test]
    fn test_redeclaration_does_not_grow_properties() {
        let mut registry = Registry::new();
        for _ in 0..3 {
            registry
                .declare::<Base>("Base")
                .property("tag")
                .property(1u32);
        }
        registry.declare::<Base>("Base").property(2.5f32);

        let desc = registry.get(registry.lookup::<Base>().unwrap());
        assert_eq!(desc.props().len(), 3);
        assert_eq!(desc.props().get::<u32>(), Some(&1));
        assert_eq!(desc.props().get::<f32>(), Some(&2.5));
    }

    #[test]
    fn test_method_signature() {
        let mut registry = Registry::new();
        let key = registry
            .declare::<Derived>("Derived")
            .method("add", |d: &mut Derived, a: i32, b: i32| {
                d.speed = a + b;
                d.speed
            })
            .finish();
        let method = registry.get(key).own_method("add").unwrap();
        assert_eq!(method.arity(), 2);
        assert_eq!(method.args()[0].type_name, "i32");
        assert_eq!(method.return_type(), Some("i32"));
    }
}
