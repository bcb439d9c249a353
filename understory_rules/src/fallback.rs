// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handler synthesis for types without an explicit rule.

use std::sync::Arc;

use understory_schema::{CollectionKind, EnumKind, NullableKind, ValueType};

use crate::provider::CollectionFormat;

/// Builds handlers for enum, nullable and collection types on demand.
///
/// Every method defaults to "cannot synthesize". A provider calls these only
/// after explicit property and type rules have missed.
pub trait Fallbacks<H: ?Sized>: Send + Sync {
    /// A handler for an enum, matching variants by case-insensitive name.
    fn enumeration(&self, value_type: ValueType, kind: EnumKind) -> Option<Arc<H>> {
        let _ = (value_type, kind);
        None
    }

    /// A handler for `Option<E>` where `E` is an enum; null is accepted.
    fn nullable_enumeration(
        &self,
        value_type: ValueType,
        nullable: NullableKind,
        kind: EnumKind,
    ) -> Option<Arc<H>> {
        let _ = (value_type, nullable, kind);
        None
    }

    /// A handler for `Option<T>` built around the handler for `T`.
    fn nullable(
        &self,
        value_type: ValueType,
        nullable: NullableKind,
        inner: Arc<H>,
    ) -> Option<Arc<H>> {
        let _ = (value_type, nullable, inner);
        None
    }

    /// A handler for a collection built around the element handler.
    fn collection(
        &self,
        value_type: ValueType,
        kind: CollectionKind,
        element: Arc<H>,
        format: &CollectionFormat,
    ) -> Option<Arc<H>> {
        let _ = (value_type, kind, element, format);
        None
    }
}

/// Synthesizes nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoFallbacks;

impl<H: ?Sized> Fallbacks<H> for NoFallbacks {}
