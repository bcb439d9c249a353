// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deriving validation rules from property metadata.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{trace, warn};
use understory_schema::{
    AllowedValues, HasMetadata, Metadata, MetadataEntry, Nullability, NumericInterval, Schema,
    SchemaError, StringLength, UntypedProperty,
};

use crate::rule::{RuleExt, SharedRule};
use crate::rules::{AllowedValuesRule, LengthRule, NotNull, RangeRule};

/// Rules attached to a property explicitly.
///
/// The synthesizer yields them unchanged, in attachment order.
#[derive(Clone, Debug, Default)]
pub struct ValidationRules(Vec<SharedRule>);

impl ValidationRules {
    /// Creates the list.
    pub fn new(rules: impl IntoIterator<Item = SharedRule>) -> Self {
        Self(rules.into_iter().collect())
    }

    /// Returns the rules.
    #[must_use]
    pub fn rules(&self) -> &[SharedRule] {
        &self.0
    }

    /// Appends a rule.
    #[must_use]
    pub fn with(mut self, rule: SharedRule) -> Self {
        self.0.push(rule);
        self
    }
}

impl Metadata for ValidationRules {}

/// A metadata entry the synthesizer knows how to turn into rules.
#[derive(Copy, Clone, Debug)]
pub enum Constraint<'a> {
    /// See [`Nullability`].
    Nullability(&'a Nullability),
    /// See [`StringLength`].
    Length(&'a StringLength),
    /// See [`AllowedValues`].
    AllowedValues(&'a AllowedValues),
    /// See [`NumericInterval`].
    Interval(&'a NumericInterval),
    /// See [`ValidationRules`].
    Rules(&'a ValidationRules),
}

impl<'a> Constraint<'a> {
    /// Classifies a metadata entry, or returns `None` for other kinds.
    #[must_use]
    pub fn from_entry(entry: &'a MetadataEntry) -> Option<Self> {
        if let Some(nullability) = entry.downcast_ref::<Nullability>() {
            Some(Self::Nullability(nullability))
        } else if let Some(length) = entry.downcast_ref::<StringLength>() {
            Some(Self::Length(length))
        } else if let Some(values) = entry.downcast_ref::<AllowedValues>() {
            Some(Self::AllowedValues(values))
        } else if let Some(interval) = entry.downcast_ref::<NumericInterval>() {
            Some(Self::Interval(interval))
        } else {
            entry.downcast_ref::<ValidationRules>().map(Self::Rules)
        }
    }
}

type RuleFactory = dyn Fn(&UntypedProperty, &MetadataEntry) -> Vec<SharedRule> + Send + Sync;

/// Turns property metadata into validation rules.
///
/// Each call to [`rules_for`](Self::rules_for) walks the property's metadata
/// in attachment order and derives rules on the fly; nothing is cached.
/// Built-in constraint kinds are handled directly; further metadata kinds can
/// be taught with [`with_extension`](Self::with_extension). Other metadata is
/// skipped.
///
/// ```rust
/// use understory_schema::{NumericInterval, Property};
/// use understory_validation::ValidationSynthesizer;
///
/// let age = Property::<i32>::builder("Age")
///     .nullable(false)
///     .interval(NumericInterval::new().min(0.0))
///     .description("Age in years")
///     .build()
///     .unwrap();
///
/// let rules: Vec<_> = ValidationSynthesizer::new().rules_for(age.untyped()).collect();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ValidationSynthesizer {
    extensions: HashMap<TypeId, Arc<RuleFactory>>,
}

impl ValidationSynthesizer {
    /// Creates a synthesizer for the built-in constraint kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives rules from metadata of type `M` with `factory`.
    ///
    /// Built-in kinds always take precedence over an extension for the same type.
    #[must_use]
    pub fn with_extension<M, F>(mut self, factory: F) -> Self
    where
        M: Metadata,
        F: Fn(&UntypedProperty, &M) -> Vec<SharedRule> + Send + Sync + 'static,
    {
        let erased = move |property: &UntypedProperty, entry: &MetadataEntry| {
            entry
                .downcast_ref::<M>()
                .map(|metadata| factory(property, metadata))
                .unwrap_or_default()
        };
        self.extensions.insert(TypeId::of::<M>(), Arc::new(erased));
        self
    }

    /// Returns the rules derived from `property`'s metadata, lazily.
    pub fn rules_for<'a>(
        &'a self,
        property: &'a UntypedProperty,
    ) -> impl Iterator<Item = SharedRule> + 'a {
        property
            .metadata()
            .entries()
            .flat_map(move |entry| self.rules_for_entry(property, entry))
    }

    /// Returns the rules of every property of `schema`, in declaration order.
    #[must_use]
    pub fn rules_for_schema(&self, schema: &Schema) -> Vec<SharedRule> {
        schema
            .properties()
            .flat_map(|property| self.rules_for(property))
            .collect()
    }

    /// Derives the rules for one known constraint.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] of a constraint that does not fit the
    /// property type. Metadata attached through a property builder has already
    /// passed this check.
    pub fn visit(
        property: &UntypedProperty,
        constraint: Constraint<'_>,
    ) -> Result<Vec<SharedRule>, SchemaError> {
        Ok(match constraint {
            Constraint::Nullability(nullability) if nullability.allow_null => Vec::new(),
            Constraint::Nullability(_) => vec![NotNull::new(property).shared()],
            Constraint::Length(length) => vec![LengthRule::new(property, *length)?.shared()],
            Constraint::AllowedValues(values) => {
                vec![AllowedValuesRule::new(property, values.clone())?.shared()]
            }
            Constraint::Interval(interval) => vec![RangeRule::new(property, *interval)?.shared()],
            Constraint::Rules(rules) => rules.rules().to_vec(),
        })
    }

    fn rules_for_entry(
        &self,
        property: &UntypedProperty,
        entry: &MetadataEntry,
    ) -> Vec<SharedRule> {
        if let Some(constraint) = Constraint::from_entry(entry) {
            return Self::visit(property, constraint).unwrap_or_else(|err| {
                warn!(property = property.name(), %err, "skipping ill-typed constraint");
                Vec::new()
            });
        }
        match self.extensions.get(&entry.type_id()) {
            Some(factory) => factory(property, entry),
            None => {
                trace!(
                    property = property.name(),
                    metadata = entry.type_name(),
                    "no rules for metadata"
                );
                Vec::new()
            }
        }
    }
}

impl fmt::Debug for ValidationSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSynthesizer")
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
