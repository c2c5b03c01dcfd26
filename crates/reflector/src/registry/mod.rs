// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry.
//!
//! The [`Registry`] owns one [`TypeDescriptor`] per Rust type it has seen.
//! Types get a [`TypeKey`] the first time they are resolved and a name once
//! they are declared. Declared types are indexed by name for the binary
//! decoder's dictionary lookups.
//!
//! # Lifecycle
//!
//! Declaration needs `&mut Registry`; traversal through handles and codecs
//! only needs `&Registry`. Declare everything first, then share.
//!
//! ```rust
//! use reflector::{field_of, Registry, Ref};
//!
//! #[derive(Clone, Default)]
//! struct House { life: i32 }
//!
//! let mut registry = Registry::new();
//! registry.declare::<i32>("i32");
//! registry.declare::<House>("House").field("life", field_of!(House, life));
//!
//! let house = House { life: 12 };
//! let r = Ref::new(&registry, &house).unwrap();
//! assert_eq!(*r.get("life").unwrap().downcast::<i32>().unwrap(), 12);
//! ```

mod builder;
mod descriptor;
pub mod props;

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

pub use builder::{FieldAccess, TypeBuilder};
pub use descriptor::{ArgInfo, AssignFn, BaseLink, CopyFn, Field, Method, TypeDescriptor, TypeKey};
pub use props::{Properties, Property, PropertyBag};

use crate::codec::text;
use crate::error::{abort_on_schema_error, SchemaError, SchemaErrorHook};
use crate::handle::Ref;

/// Types that know how to declare their own shape.
///
/// Usually derived with `#[derive(Reflect)]`.
pub trait Reflect: Any + Clone {
    fn declare(registry: &mut Registry);
}

/// Source of registry ids stamped into every [`TypeKey`].
static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

fn next_registry_id() -> u32 {
    NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Arena of type descriptors.
pub struct Registry {
    id: u32,
    types: Vec<TypeDescriptor>,
    by_type_id: HashMap<TypeId, TypeKey>,
    by_name: BTreeMap<String, TypeKey>,
    on_schema_error: SchemaErrorHook,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("types", &self.types.len())
            .field("declared", &self.by_name.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            id: next_registry_id(),
            types: Vec::new(),
            by_type_id: HashMap::new(),
            by_name: BTreeMap::new(),
            on_schema_error: Arc::new(abort_on_schema_error),
        }
    }

    // -------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------

    /// Key of `T`, creating an undeclared descriptor on first use.
    pub fn resolve<T: Any>(&mut self) -> TypeKey {
        let id = TypeId::of::<T>();
        if let Some(&key) = self.by_type_id.get(&id) {
            return key;
        }
        let key = TypeKey::new(self.id, self.types.len() as u32);
        self.types.push(TypeDescriptor::undeclared::<T>(key));
        self.by_type_id.insert(id, key);
        key
    }

    /// Key of `T` if it was ever resolved.
    pub fn lookup<T: Any>(&self) -> Option<TypeKey> {
        self.lookup_id(TypeId::of::<T>())
    }

    pub fn lookup_id(&self, id: TypeId) -> Option<TypeKey> {
        self.by_type_id.get(&id).copied()
    }

    /// Id stamped into every key this registry issues.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// True if `key` was issued by this registry since its last
    /// [`clear`](Self::clear).
    pub fn owns(&self, key: TypeKey) -> bool {
        key.registry == self.id && key.index() < self.types.len()
    }

    /// Descriptor of `key`.
    ///
    /// # Panics
    /// If `key` was not produced by this registry.
    pub fn get(&self, key: TypeKey) -> &TypeDescriptor {
        match self.try_get(key) {
            Some(desc) => desc,
            None => panic!("type key {} does not belong to registry {}", key, self.id),
        }
    }

    pub fn try_get(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        if key.registry != self.id {
            return None;
        }
        self.types.get(key.index())
    }

    pub(crate) fn get_mut(&mut self, key: TypeKey) -> &mut TypeDescriptor {
        assert_eq!(key.registry, self.id, "type key {} from another registry", key);
        &mut self.types[key.index()]
    }

    // -------------------------------------------------------------------
    // Declaration
    // -------------------------------------------------------------------

    /// Declare `T` under `name` and return a builder for its shape.
    ///
    /// Declaring again with the same name keeps the existing shape; a
    /// different name is a schema error. A name owned by another type is a
    /// schema error too, and the returned builder then ignores every call.
    pub fn declare<T: Any + Clone>(&mut self, name: &str) -> TypeBuilder<'_, T> {
        let key = self.resolve::<T>();
        let existing = self.get(key).name.clone();
        let mut detached = false;
        let redeclared = match existing {
            None => {
                if let Some(&owner) = self.by_name.get(name) {
                    let err = SchemaError::NameTaken {
                        name: name.to_owned(),
                        owner: self.get(owner).rust_name().to_owned(),
                    };
                    self.report(err);
                    detached = true;
                } else {
                    let desc = self.get_mut(key);
                    desc.name = Some(name.to_owned());
                    desc.copy = Some(descriptor::clone_into::<T>);
                    self.by_name.insert(name.to_owned(), key);
                    log::debug!(
                        "[registry] declared {} as '{}' ({})",
                        std::any::type_name::<T>(),
                        name,
                        key
                    );
                }
                false
            }
            Some(existing) if existing == name => true,
            Some(existing) => {
                self.report(SchemaError::TypeRenamed {
                    existing,
                    requested: name.to_owned(),
                });
                true
            }
        };
        TypeBuilder::new(self, key, redeclared, detached)
    }

    /// [`declare`](Self::declare) with type-level properties.
    pub fn declare_with<T: Any + Clone>(
        &mut self,
        name: &str,
        props: impl Properties,
    ) -> TypeBuilder<'_, T> {
        self.declare::<T>(name).properties(props)
    }

    /// Run `T`'s own declaration.
    pub fn register<T: Reflect>(&mut self) -> TypeKey {
        T::declare(self);
        self.resolve::<T>()
    }

    // -------------------------------------------------------------------
    // Name index
    // -------------------------------------------------------------------

    /// Key of the declared type registered under `name`.
    pub fn find(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.find(name).map(|key| self.get(key))
    }

    /// Put a declared type back into the name index.
    ///
    /// Returns `false` if the type is undeclared or the name is taken.
    pub fn add(&mut self, key: TypeKey) -> bool {
        let Some(name) = self.get(key).name.clone() else {
            return false;
        };
        match self.by_name.get(&name) {
            Some(&existing) => existing == key,
            None => {
                self.by_name.insert(name, key);
                true
            }
        }
    }

    /// Take a type out of the name index. Its descriptor stays valid.
    pub fn remove(&mut self, key: TypeKey) -> bool {
        let Some(name) = self.get(key).name.clone() else {
            return false;
        };
        match self.by_name.get(&name) {
            Some(&existing) if existing == key => {
                self.by_name.remove(&name);
                true
            }
            _ => false,
        }
    }

    /// Forget the declaration of `T` so it can be declared again.
    pub fn unregister<T: Any>(&mut self) {
        let Some(key) = self.lookup::<T>() else {
            return;
        };
        self.remove(key);
        self.get_mut(key).reset();
        log::debug!("[registry] unregistered {}", std::any::type_name::<T>());
    }

    /// Declared types in name order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.by_name.values().map(move |&key| self.get(key))
    }

    /// Number of resolved types, declared or not.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Drop every descriptor. Keys handed out before become invalid and are
    /// rejected like keys of another registry.
    pub fn clear(&mut self) {
        self.id = next_registry_id();
        self.types.clear();
        self.by_type_id.clear();
        self.by_name.clear();
    }

    // -------------------------------------------------------------------
    // Inheritance
    // -------------------------------------------------------------------

    /// True if `key` is `ancestor` or inherits from it.
    pub fn derives_from(&self, key: TypeKey, ancestor: TypeKey) -> bool {
        self.base_offset(key, ancestor).is_some()
    }

    /// Byte offset of the `ancestor` sub-object inside a `key` value.
    pub fn base_offset(&self, key: TypeKey, ancestor: TypeKey) -> Option<usize> {
        let mut current = key;
        let mut offset = 0;
        loop {
            if current == ancestor {
                return Some(offset);
            }
            let link = self.try_get(current)?.base?;
            offset += link.offset;
            current = link.key;
        }
    }

    /// Field `name` on `key` or its ancestors, with the offset of the
    /// owner sub-object.
    pub fn find_field(&self, key: TypeKey, name: &str) -> Option<(&Field, usize)> {
        let mut current = key;
        let mut offset = 0;
        loop {
            let desc = self.get(current);
            if let Some(field) = desc.own_field(name) {
                return Some((field, offset));
            }
            let link = desc.base?;
            offset += link.offset;
            current = link.key;
        }
    }

    /// Method `name` on `key` or its ancestors, with the offset of the
    /// owner sub-object.
    pub fn find_method(&self, key: TypeKey, name: &str) -> Option<(&Method, usize)> {
        let mut current = key;
        let mut offset = 0;
        loop {
            let desc = self.get(current);
            if let Some(method) = desc.own_method(name) {
                return Some((method, offset));
            }
            let link = desc.base?;
            offset += link.offset;
            current = link.key;
        }
    }

    /// Properties of `key` followed by those of its ancestors.
    pub fn props(&self, key: TypeKey) -> impl Iterator<Item = &Property> + '_ {
        self.ancestry(key).flat_map(|desc| desc.props().iter())
    }

    /// `key` and its ancestors, most derived first.
    pub fn ancestry(&self, key: TypeKey) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        std::iter::successors(Some(self.get(key)), move |desc| {
            desc.parent().map(|parent| self.get(parent))
        })
    }

    // -------------------------------------------------------------------
    // Schema errors
    // -------------------------------------------------------------------

    /// Replace the schema error hook, returning the previous one.
    pub fn set_schema_error_hook(
        &mut self,
        hook: impl Fn(&SchemaError) + Send + Sync + 'static,
    ) -> SchemaErrorHook {
        std::mem::replace(&mut self.on_schema_error, Arc::new(hook))
    }

    pub(crate) fn report(&self, err: SchemaError) {
        (self.on_schema_error)(&err);
    }

    // -------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------

    /// Human readable listing of every declared type.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for desc in self.types() {
            let _ = write!(out, "{} (size {})", desc.display_name(), desc.size());
            if let Some(parent) = desc.parent() {
                let _ = write!(out, " : {}", self.get(parent).display_name());
            }
            out.push('\n');
            self.describe_props(&mut out, "  ", desc.props());
            for field in desc.fields() {
                let _ = writeln!(
                    out,
                    "  {}: {} @{}",
                    field.name(),
                    self.get(field.ty()).display_name(),
                    field.offset()
                );
                self.describe_props(&mut out, "    ", field.props());
            }
            for method in desc.methods() {
                let args: Vec<_> = method.args().iter().map(|a| a.type_name).collect();
                let _ = write!(out, "  fn {}({})", method.name(), args.join(", "));
                if let Some(ret) = method.return_type() {
                    let _ = write!(out, " -> {}", ret);
                }
                out.push('\n');
            }
        }
        out
    }

    fn describe_props(&self, out: &mut String, indent: &str, props: &PropertyBag) {
        for property in props {
            let rendered = Ref::from_any(self, property.as_any())
                .ok()
                .filter(|r| r.descriptor().is_declared())
                .and_then(|r| text::to_text(r).ok());
            match rendered {
                Some(json) => {
                    let _ = writeln!(out, "{}[{}] {}", indent, property.type_name(), json);
                }
                None => {
                    let _ = writeln!(out, "{}[{}]", indent, property.type_name());
                }
            }
        }
    }

    /// Log [`describe`](Self::describe) at info level.
    pub fn dump(&self) {
        for line in self.describe().lines() {
            log::info!("[registry] {}", line);
        }
    }
}

/// Process-wide registry.
///
/// Optional: every API takes the registry explicitly, this is only a
/// convenient shared instance.
pub fn global() -> &'static RwLock<Registry> {
    static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Registry::new()))
}
