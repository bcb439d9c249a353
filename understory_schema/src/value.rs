// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boxed values of any thread-safe, cloneable type.

use std::any::{Any, TypeId};
use std::fmt;

/// A value whose concrete type is only known at runtime.
///
/// Container entries, defaults, allowed values and metadata are all stored
/// as `ErasedValue`s. The concrete type must be `Clone + Send + Sync +
/// 'static`, which keeps built containers and schemas shareable between
/// threads.
///
/// ```rust
/// use understory_schema::ErasedValue;
///
/// let answer = ErasedValue::new(42_i32);
/// assert!(answer.is::<i32>());
/// assert_eq!(answer.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(answer.type_name(), "i32");
///
/// let copy = answer.clone_value();
/// assert_eq!(copy.take::<i32>(), Some(42));
/// ```
pub struct ErasedValue {
    boxed: Box<dyn CloneAny>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Boxes `value`.
    #[must_use]
    pub fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self {
            boxed: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the boxed value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the full Rust type name of the boxed value.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the boxed value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns the boxed value as `&dyn Any`.
    #[must_use]
    #[inline]
    pub fn as_any(&self) -> &dyn Any {
        self.boxed.any_ref()
    }

    /// Borrows the boxed value as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.boxed.any_ref().downcast_ref()
    }

    /// Mutably borrows the boxed value as a `T`, if it is one.
    #[must_use]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.boxed.any_mut().downcast_mut()
    }

    /// Unboxes the value as a `T`, if it is one.
    #[must_use]
    pub fn take<T: 'static>(self) -> Option<T> {
        self.boxed.into_any().downcast::<T>().ok().map(|value| *value)
    }

    /// Deep-copies the boxed value.
    #[must_use]
    pub fn clone_value(&self) -> Self {
        Self {
            boxed: self.boxed.box_clone(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        self.clone_value()
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Object-safe cloning and downcasting for boxed values.
trait CloneAny: Any + Send + Sync {
    fn any_ref(&self) -> &dyn Any;
    fn any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn box_clone(&self) -> Box<dyn CloneAny>;
}

impl<T: Clone + Send + Sync + 'static> CloneAny for T {
    fn any_ref(&self) -> &dyn Any {
        self
    }

    fn any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn box_clone(&self) -> Box<dyn CloneAny> {
        Box::new(self.clone())
    }
}
