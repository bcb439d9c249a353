// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property identification.
//!
//! This module provides [`PropertyId`], the reference identity shared by every
//! handle that was derived from the same property declaration.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// A runtime property identifier.
///
/// Every property declaration allocates a fresh id. Handles produced by
/// re-configuring a property (see [`Property::with_metadata`](crate::Property::with_metadata))
/// keep the id of the declaration they came from, so reference identity
/// survives copy-on-write metadata changes.
///
/// # Example
///
/// ```rust
/// use understory_schema::PropertyId;
///
/// let a = PropertyId::next();
/// let b = PropertyId::next();
/// assert_ne!(a, b);
/// assert!(a.index() < b.index());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u32);

impl PropertyId {
    /// Allocates a new, process-unique property id.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` properties are declared.
    #[must_use]
    pub fn next() -> Self {
        let index = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert!(index != u32::MAX, "Too many properties declared");
        Self(index)
    }

    /// Returns the underlying index of this property id.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}
