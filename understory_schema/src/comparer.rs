// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property equality policies.

use core::hash::{Hash, Hasher};

use crate::property::UntypedProperty;
use crate::value_type::eq_ignore_case;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How two properties are considered "the same".
///
/// The comparer is configuration, not a property behavior: the same pair of
/// properties may match under one policy and not under another. Each policy
/// pairs an equality with a hash that agrees with it.
///
/// ```rust
/// use understory_schema::{Property, PropertyComparer};
///
/// let a = Property::<i32>::new("Age");
/// let b = Property::<i32>::new("age");
///
/// assert!(!PropertyComparer::ByReference.eq(a.untyped(), b.untyped()));
/// assert!(!PropertyComparer::ByNameAndType.eq(a.untyped(), b.untyped()));
/// assert!(PropertyComparer::ByNameOrAliasIgnoreCase.eq(a.untyped(), b.untyped()));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyComparer {
    /// Same property instance (same [`PropertyId`](crate::PropertyId)).
    #[default]
    ByReference,
    /// Same name (case-sensitive) and same declared type.
    ByNameAndType,
    /// Any of name or alias equal to any of the other's, ignoring case.
    ByNameOrAliasIgnoreCase,
}

impl PropertyComparer {
    /// Returns `true` if `a` and `b` are the same property under this policy.
    #[must_use]
    pub fn eq(self, a: &UntypedProperty, b: &UntypedProperty) -> bool {
        match self {
            Self::ByReference => a.id() == b.id(),
            Self::ByNameAndType => a.name() == b.name() && a.value_type() == b.value_type(),
            Self::ByNameOrAliasIgnoreCase => a
                .names()
                .any(|name| b.names().any(|other| eq_ignore_case(name, other))),
        }
    }

    /// Feeds the part of `property` that this policy compares into `state`.
    ///
    /// Name-or-alias matching is not transitive over a single key, so that
    /// policy hashes every property to the same bucket.
    pub fn hash<H: Hasher>(self, property: &UntypedProperty, state: &mut H) {
        match self {
            Self::ByReference => property.id().hash(state),
            Self::ByNameAndType => {
                property.name().hash(state);
                property.value_type().hash(state);
            }
            Self::ByNameOrAliasIgnoreCase => 0_u8.hash(state),
        }
    }
}
