// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property bags: append-only, type-erased metadata attached to types and
//! fields (codec overrides, tags, value ranges).

use std::any::{Any, TypeId};
use std::fmt;

/// A single owned property value.
pub struct Property {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl Property {
    pub fn new<P: Any + Send + Sync>(value: P) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            value: Box::new(value),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust name of the property type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<P: Any>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }

    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }

    /// The erased value, e.g. to build a [`Ref`](crate::Ref) over it.
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("type", &self.type_name)
            .finish()
    }
}

/// Ordered list of properties. Lookup by type returns the first match.
#[derive(Default)]
pub struct PropertyBag {
    entries: Vec<Property>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<P: Any + Send + Sync>(&mut self, value: P) {
        self.entries.push(Property::new(value));
    }

    pub fn push_property(&mut self, property: Property) {
        self.entries.push(property);
    }

    /// First property of type `P`, if any.
    pub fn get<P: Any>(&self) -> Option<&P> {
        self.entries
            .iter()
            .find(|p| p.is::<P>())
            .and_then(Property::downcast_ref)
    }

    pub fn contains<P: Any>(&self) -> bool {
        self.entries.iter().any(Property::is::<P>)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the entries of `other` whose type is not in the bag yet.
    pub(crate) fn merge_missing(&mut self, other: PropertyBag) {
        let present: Vec<TypeId> = self.entries.iter().map(Property::type_id).collect();
        self.entries
            .extend(other.entries.into_iter().filter(|p| !present.contains(&p.type_id)));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(Property::type_name))
            .finish()
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A heterogeneous set of properties passed at declaration time.
///
/// Implemented for `()`, tuples of up to six values and `Vec<Property>`.
///
/// ```rust
/// use reflector::{PropertyBag, Properties};
///
/// #[derive(Debug, PartialEq)]
/// struct Range(i32, i32);
///
/// let mut bag = PropertyBag::new();
/// (Range(5, 15), "tag").attach(&mut bag);
/// assert_eq!(bag.get::<Range>(), Some(&Range(5, 15)));
/// assert_eq!(bag.get::<&str>(), Some(&"tag"));
/// ```
pub trait Properties {
    fn attach(self, bag: &mut PropertyBag);
}

impl Properties for () {
    fn attach(self, _bag: &mut PropertyBag) {}
}

impl Properties for Vec<Property> {
    fn attach(self, bag: &mut PropertyBag) {
        for property in self {
            bag.push_property(property);
        }
    }
}

macro_rules! impl_properties_tuple {
    ($($name:ident),+) => {
        impl<$($name: Any + Send + Sync),+> Properties for ($($name,)+) {
            #[allow(non_snake_case)]
            fn attach(self, bag: &mut PropertyBag) {
                let ($($name,)+) = self;
                $(bag.push($name);)+
            }
        }
    };
}

impl_properties_tuple!(P1);
impl_properties_tuple!(P1, P2);
impl_properties_tuple!(P1, P2, P3);
impl_properties_tuple!(P1, P2, P3, P4);
impl_properties_tuple!(P1, P2, P3, P4, P5);
impl_properties_tuple!(P1, P2, P3, P4, P5, P6);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag(&'static str);

    #[test]
    fn test_first_match_wins() {
        let mut bag = PropertyBag::new();
        bag.push(Tag("first"));
        bag.push(7u32);
        bag.push(Tag("second"));

        assert_eq!(bag.len(), 3);
        assert_eq!(bag.get::<Tag>(), Some(&Tag("first")));
        assert_eq!(bag.get::<u32>(), Some(&7));
        assert!(bag.get::<i64>().is_none());
        assert!(!bag.contains::<String>());
    }

    #[test]
    fn test_merge_missing_skips_known_types() {
        let mut bag = PropertyBag::new();
        bag.push(Tag("first"));
        let mut extra = PropertyBag::new();
        (Tag("again"), 3u8, 4u8).attach(&mut extra);
        bag.merge_missing(extra);

        assert_eq!(bag.len(), 3);
        assert_eq!(bag.get::<Tag>(), Some(&Tag("first")));
        assert_eq!(bag.iter().filter(|p| p.is::<u8>()).count(), 2);
    }

    #[test]
    fn test_tuple_properties_keep_order() {
        let mut bag = PropertyBag::new();
        (1u8, Tag("x"), 2.5f32).attach(&mut bag);
        let names: Vec<_> = bag.iter().map(Property::type_name).collect();
        assert_eq!(names.len(), 3);
        assert!(names[1].ends_with("Tag"));
        assert_eq!(bag.get::<f32>(), Some(&2.5));
    }

    #[test]
    fn test_erased_access() {
        let property = Property::new(String::from("hello"));
        assert!(property.is::<String>());
        assert_eq!(
            property.as_any().downcast_ref::<String>().map(String::as_str),
            Some("hello")
        );
    }
}
